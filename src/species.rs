//! Chemical composition: species abundances, their line datasets and the
//! chemistry-wide settings.
//!
//! On disk the chemistry section mixes the two in one mapping, with the
//! reserved `settings` key next to the species formulas:
//!
//! ```yaml
//! CHEMICAL COMPOSITION PARAMETERS:
//!   settings: {resolution: 200, mmw_inert: 28.0}
//!   N2:
//!     prior: {kind: log-uniform, prior_specs: {log_lower: -2.0, log_upper: 0.0}}
//!     truth: 0.78
//! ```
//!
//! In memory `ChemicalComposition` keeps them apart, so species iteration
//! never sees the reserved key.

use retrieval_types::{
    is_known_species, species_name, SectionId, RESERVED_CHEMISTRY_KEY, SPECIES_NAMES,
};
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use tracing::debug;

use crate::document::sections::{decode_value, encode_value, key_text};
use crate::error::{ConfigError, LineTagError, Result};
use crate::line_tag::{parse_line_tags, ParsedLineTags};
use crate::prior::ParameterSpec;

/// Chemistry-wide globals stored under the reserved key.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChemistrySettings {
    /// Opacity resolution shared by all species.
    pub resolution: u32,
    /// Mean molecular weight of the inert filler gas.
    pub mmw_inert: f64,
}

/// One species: its abundance prior and the line datasets it uses.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeciesEntry {
    formula: String,
    abundance: ParameterSpec,
}

impl SpeciesEntry {
    /// Checks the formula against the species table and the shape of its tag list.
    pub fn new(formula: impl Into<String>, abundance: ParameterSpec) -> Result<Self> {
        let formula = formula.into();
        if formula == RESERVED_CHEMISTRY_KEY {
            return Err(ConfigError::ReservedSpeciesKey { key: formula });
        }
        if !is_known_species(&formula) {
            return Err(ConfigError::UnknownSpecies { formula });
        }
        parse_line_tags(abundance.lines().unwrap_or_default(), &formula)?;
        Ok(Self { formula, abundance })
    }

    pub fn formula(&self) -> &str {
        &self.formula
    }

    pub fn common_name(&self) -> &'static str {
        species_name(&self.formula).unwrap_or_default()
    }

    pub fn abundance(&self) -> &ParameterSpec {
        &self.abundance
    }

    pub fn line_tags(&self) -> Result<ParsedLineTags, LineTagError> {
        parse_line_tags(self.abundance.lines().unwrap_or_default(), &self.formula)
    }

    /// Species with no line dataset are left out of opacity calculations.
    pub fn has_lines(&self) -> bool {
        self.abundance.lines().is_some_and(|lines| !lines.is_empty())
    }

    pub fn into_parts(self) -> (String, ParameterSpec) {
        (self.formula, self.abundance)
    }
}

/// One row of the species overview table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeciesRow {
    pub formula: String,
    pub name: String,
    pub lines: String,
    pub prior: String,
    pub truth: String,
}

impl From<&SpeciesEntry> for SpeciesRow {
    fn from(entry: &SpeciesEntry) -> Self {
        let spec = entry.abundance();
        Self {
            formula: entry.formula().to_string(),
            name: entry.common_name().to_string(),
            lines: spec.lines().unwrap_or_default().join("; "),
            prior: spec.prior_summary(),
            truth: spec.truth().map(|t| t.to_string()).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChemicalComposition {
    pub settings: ChemistrySettings,
    species: Vec<SpeciesEntry>,
}

impl ChemicalComposition {
    pub fn new(settings: ChemistrySettings) -> Self {
        Self {
            settings,
            species: Vec::new(),
        }
    }

    /// Split the legacy merged mapping into settings and species.
    pub(crate) fn from_mapping(body: &Mapping) -> Result<Self> {
        let section = SectionId::ChemicalComposition;
        let mut settings = None;
        let mut species = Vec::new();

        for (key, value) in body {
            let name = key_text(section, key)?;
            if name == RESERVED_CHEMISTRY_KEY {
                settings = Some(decode_value::<ChemistrySettings>(section, Some(&name), value)?);
                continue;
            }
            let abundance: ParameterSpec = decode_value(section, Some(&name), value)?;
            let entry = SpeciesEntry::new(name.clone(), abundance)
                .map_err(|e| ConfigError::field(section, Some(&name), e))?;
            species.push(entry);
        }

        let settings = settings.ok_or_else(|| {
            ConfigError::field(section, Some(RESERVED_CHEMISTRY_KEY), "missing chemistry settings")
        })?;
        Ok(Self { settings, species })
    }

    /// Merge settings and species back into the legacy layout, settings first.
    pub(crate) fn to_mapping(&self) -> Result<Mapping> {
        let mut body = Mapping::new();
        body.insert(
            Value::from(RESERVED_CHEMISTRY_KEY),
            encode_value(&self.settings)?,
        );
        for entry in &self.species {
            body.insert(
                Value::String(entry.formula.clone()),
                encode_value(&entry.abundance)?,
            );
        }
        Ok(body)
    }

    pub fn species(&self) -> &[SpeciesEntry] {
        &self.species
    }

    pub fn formulas(&self) -> impl Iterator<Item = &str> {
        self.species.iter().map(|s| s.formula())
    }

    pub fn get(&self, formula: &str) -> Option<&SpeciesEntry> {
        self.species.iter().find(|s| s.formula == formula)
    }

    /// Add a species, or replace it in place if it is already present.
    pub fn upsert(&mut self, entry: SpeciesEntry) {
        match self.species.iter_mut().find(|s| s.formula == entry.formula) {
            Some(existing) => *existing = entry,
            None => self.species.push(entry),
        }
    }

    /// Apply an edit of `original`. When the edit changes the formula the
    /// original entry is dropped and the edited one appended.
    pub fn replace(&mut self, original: &str, entry: SpeciesEntry) {
        if original != entry.formula && self.remove(original).is_some() {
            debug!("Renamed species {} to {}", original, entry.formula);
        }
        self.upsert(entry);
    }

    pub fn remove(&mut self, formula: &str) -> Option<SpeciesEntry> {
        let idx = self.species.iter().position(|s| s.formula == formula)?;
        Some(self.species.remove(idx))
    }

    pub fn clear(&mut self) {
        self.species.clear();
    }

    /// Formulas an editor may offer: those not yet present, plus the one
    /// being edited.
    pub fn available_formulas(&self, editing: Option<&str>) -> Vec<&'static str> {
        SPECIES_NAMES
            .iter()
            .map(|(formula, _)| *formula)
            .filter(|formula| Some(*formula) == editing || self.get(formula).is_none())
            .collect()
    }

    pub fn rows(&self) -> Vec<SpeciesRow> {
        self.species.iter().map(SpeciesRow::from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line_tag::{encode_species_lines, LineSelection};
    use pretty_assertions::assert_eq;
    use retrieval_types::PriorKind;

    fn log_uniform(lower: f64, truth: f64) -> ParameterSpec {
        ParameterSpec::distribution(PriorKind::LogUniform, [lower, 0.0], Some(truth)).unwrap()
    }

    fn composition() -> ChemicalComposition {
        let mut chem = ChemicalComposition::new(ChemistrySettings {
            resolution: 200,
            mmw_inert: 28.0,
        });
        chem.upsert(SpeciesEntry::new("N2", log_uniform(-2.0, 0.78)).unwrap());
        let lines = encode_species_lines("CO2", Some(&LineSelection::default()), true).unwrap();
        chem.upsert(
            SpeciesEntry::new("CO2", log_uniform(-15.0, 0.004).with_lines(lines)).unwrap(),
        );
        chem
    }

    #[test]
    fn test_reserved_key_cannot_be_a_species() {
        let err = SpeciesEntry::new("settings", ParameterSpec::known(1.0)).unwrap_err();
        assert!(matches!(err, ConfigError::ReservedSpeciesKey { .. }));

        let err = SpeciesEntry::new("Xe", ParameterSpec::known(1.0)).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownSpecies { .. }));
    }

    #[test]
    fn test_entry_rejects_malformed_lines() {
        let spec = ParameterSpec::known(0.1).with_lines(vec![
            "CO_mainHN20airC25".into(),
            "CO_UV".into(),
            "CO_allHN20airC25".into(),
        ]);
        let err = SpeciesEntry::new("CO", spec).unwrap_err();
        assert!(matches!(err, ConfigError::LineTag(LineTagError::Malformed { .. })));
    }

    #[test]
    fn test_legacy_layout_round_trip() {
        let chem = composition();
        let body = chem.to_mapping().unwrap();
        let keys: Vec<&str> = body.keys().filter_map(Value::as_str).collect();
        assert_eq!(keys, vec!["settings", "N2", "CO2"]);

        let decoded = ChemicalComposition::from_mapping(&body).unwrap();
        assert_eq!(decoded, chem);
        assert_eq!(decoded.formulas().collect::<Vec<_>>(), vec!["N2", "CO2"]);
    }

    #[test]
    fn test_missing_settings_is_a_field_error() {
        let body: Mapping = serde_yaml::from_str("N2:\n  truth: 0.78\n").unwrap();
        let err = ChemicalComposition::from_mapping(&body).unwrap_err();
        assert!(matches!(err, ConfigError::Field { .. }));
    }

    #[test]
    fn test_edit_with_rename_appends() {
        let mut chem = composition();
        let edited = SpeciesEntry::new("CH4", log_uniform(-15.0, 1.7e-6)).unwrap();
        chem.replace("N2", edited);
        assert_eq!(chem.formulas().collect::<Vec<_>>(), vec!["CO2", "CH4"]);

        let edited = SpeciesEntry::new("CO2", ParameterSpec::known(0.004)).unwrap();
        chem.replace("CO2", edited);
        assert_eq!(chem.formulas().collect::<Vec<_>>(), vec!["CO2", "CH4"]);
        assert!(!chem.get("CO2").unwrap().has_lines());
    }

    #[test]
    fn test_remove_and_clear() {
        let mut chem = composition();
        assert!(chem.remove("N2").is_some());
        assert!(chem.remove("N2").is_none());
        chem.clear();
        assert!(chem.species().is_empty());
        assert_eq!(chem.settings.resolution, 200);
    }

    #[test]
    fn test_available_formulas_skip_existing() {
        let chem = composition();
        let offered = chem.available_formulas(None);
        assert!(!offered.contains(&"N2"));
        assert!(offered.contains(&"H2O"));
        assert!(chem.available_formulas(Some("N2")).contains(&"N2"));
    }

    #[test]
    fn test_table_rows() {
        let rows = composition().rows();
        assert_eq!(
            rows[1],
            SpeciesRow {
                formula: "CO2".into(),
                name: "carbon dioxide".into(),
                lines: "CO2_mainHN20airC25; CO2_UV".into(),
                prior: "log-uniform(-15, 0)".into(),
                truth: "0.004".into(),
            }
        );
        assert_eq!(rows[0].lines, "");
    }
}
