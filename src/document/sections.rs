//! Typed views of individual sections.
//!
//! The document stores raw ordered mappings; these structs are what editors
//! read and write. Decoding happens on access, so a section with a missing or
//! mistyped field only fails when something asks for it.

use retrieval_types::{pt_parameter_names, SectionId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use crate::error::{ConfigError, Result};
use crate::prior::ParameterSpec;

// ---------------------------------------------------------------------------
// GROUND TRUTH DATA
// ---------------------------------------------------------------------------

/// Reference inputs the retrieval is checked against.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroundTruthData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_profile: Option<String>,
    #[serde(default)]
    pub data_files: Vec<String>,
}

impl GroundTruthData {
    pub const KEYS: &'static [&'static str] = &["input_profile", "data_files"];
}

// ---------------------------------------------------------------------------
// RUN SETTINGS
// ---------------------------------------------------------------------------

/// Which light paths the forward model includes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScatteringFlags {
    #[serde(rename = "Rayleigh")]
    pub rayleigh: bool,
    pub thermal: bool,
    pub direct_light: bool,
    pub clouds: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSettings {
    /// Wavelength window in μm, `[lower, upper]`.
    pub wavelength_range: [f64; 2],
    pub output_folder: String,
    pub live_points: u32,
    pub include_scattering: ScatteringFlags,
    #[serde(rename = "include_CIA")]
    pub include_cia: bool,
    pub include_moon: bool,
    pub parameterization: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vae_net: Option<String>,
    pub top_log_pressure: f64,
    pub n_layers: u32,
}

impl RunSettings {
    pub const KEYS: &'static [&'static str] = &[
        "wavelength_range",
        "output_folder",
        "live_points",
        "include_scattering",
        "include_CIA",
        "include_moon",
        "parameterization",
        "vae_net",
        "top_log_pressure",
        "n_layers",
    ];

    /// Temperature coefficients the configured parameterization needs.
    pub fn pt_parameter_names(&self) -> Option<&'static [&'static str]> {
        pt_parameter_names(&self.parameterization)
    }
}

// ---------------------------------------------------------------------------
// Parameter sections (temperature, physical, scattering)
// ---------------------------------------------------------------------------

/// Ordered name → parameter spec mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSection {
    entries: Vec<(String, ParameterSpec)>,
}

impl ParameterSection {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_mapping(section: SectionId, body: &Mapping) -> Result<Self> {
        let mut entries = Vec::with_capacity(body.len());
        for (key, value) in body {
            let name = key_text(section, key)?;
            let spec: ParameterSpec = decode_value(section, Some(&name), value)?;
            entries.push((name, spec));
        }
        Ok(Self { entries })
    }

    pub(crate) fn to_mapping(&self) -> Result<Mapping> {
        let mut body = Mapping::new();
        for (name, spec) in &self.entries {
            body.insert(Value::String(name.clone()), encode_value(spec)?);
        }
        Ok(body)
    }

    /// Insert or replace; a replaced entry keeps its position.
    pub fn insert(&mut self, name: impl Into<String>, spec: ParameterSpec) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = spec,
            None => self.entries.push((name, spec)),
        }
    }

    pub fn with(mut self, name: impl Into<String>, spec: ParameterSpec) -> Self {
        self.insert(name, spec);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ParameterSpec> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, spec)| spec)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParameterSpec)> {
        self.entries.iter().map(|(n, spec)| (n.as_str(), spec))
    }

    /// Names from `required` with no entry in this section.
    pub fn missing<'a>(&self, required: &[&'a str]) -> Vec<&'a str> {
        required
            .iter()
            .copied()
            .filter(|name| self.get(name).is_none())
            .collect()
    }

    /// Names of entries that are sampled rather than fixed.
    pub fn retrieved(&self) -> Vec<&str> {
        self.iter()
            .filter(|(_, spec)| !spec.is_known())
            .map(|(name, _)| name)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// CLOUD PARAMETERS / USER-DEFINED UNITS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudParameters {
    pub composition: String,
}

impl CloudParameters {
    pub const KEYS: &'static [&'static str] = &["composition"];
}

/// Unit symbol → definition, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserUnits {
    entries: Vec<(String, String)>,
}

impl UserUnits {
    pub(crate) fn from_mapping(body: &Mapping) -> Result<Self> {
        let section = SectionId::UserDefinedUnits;
        let mut entries = Vec::with_capacity(body.len());
        for (key, value) in body {
            let name = key_text(section, key)?;
            let definition: String = decode_value(section, Some(&name), value)?;
            entries.push((name, definition));
        }
        Ok(Self { entries })
    }

    pub(crate) fn to_mapping(&self) -> Mapping {
        self.entries
            .iter()
            .map(|(name, definition)| {
                (
                    Value::String(name.clone()),
                    Value::String(definition.clone()),
                )
            })
            .collect()
    }

    pub fn insert(&mut self, name: impl Into<String>, definition: impl Into<String>) {
        let (name, definition) = (name.into(), definition.into());
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = definition,
            None => self.entries.push((name, definition)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, d)| d.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, d)| (n.as_str(), d.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Value helpers
// ---------------------------------------------------------------------------

/// Text form of a mapping key; section keys are expected to be strings.
pub(crate) fn key_text(section: SectionId, key: &Value) -> Result<String> {
    match key {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(ConfigError::field(
            section,
            None,
            format!("unsupported key {:?}", other),
        )),
    }
}

pub(crate) fn decode_value<T: DeserializeOwned>(
    section: SectionId,
    key: Option<&str>,
    value: &Value,
) -> Result<T> {
    serde_yaml::from_value(value.clone()).map_err(|e| ConfigError::field(section, key, e))
}

pub(crate) fn decode_mapping<T: DeserializeOwned>(section: SectionId, body: &Mapping) -> Result<T> {
    decode_value(section, None, &Value::Mapping(body.clone()))
}

pub(crate) fn encode_value<T: Serialize>(value: &T) -> Result<Value> {
    serde_yaml::to_value(value).map_err(|source| ConfigError::Yaml { path: None, source })
}

/// Encode `typed` and merge it into `existing`.
///
/// Keys listed in `owned` belong to the typed view: they take the typed value,
/// or disappear when the typed view omits them. Other keys are kept untouched.
/// Existing keys keep their position; new keys are appended in typed order.
pub(crate) fn merge_owned<T: Serialize>(
    section: SectionId,
    existing: &Mapping,
    typed: &T,
    owned: &[&str],
) -> Result<Mapping> {
    let encoded = match encode_value(typed)? {
        Value::Mapping(m) => m,
        _ => {
            return Err(ConfigError::NotAMapping {
                what: format!("typed view of {}", section),
            })
        }
    };

    let mut merged = Mapping::new();
    for (key, value) in existing {
        if let Some(new_value) = encoded.get(key) {
            merged.insert(key.clone(), new_value.clone());
        } else if !key.as_str().is_some_and(|k| owned.contains(&k)) {
            merged.insert(key.clone(), value.clone());
        }
    }
    for (key, value) in &encoded {
        if !merged.contains_key(key) {
            merged.insert(key.clone(), value.clone());
        }
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use retrieval_types::PriorKind;

    fn mapping(yaml: &str) -> Mapping {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_run_settings_decode_with_python_types() {
        let body = mapping(
            "wavelength_range: [3, 20]\noutput_folder: .\nlive_points: 600\n\
             include_scattering: {Rayleigh: true, thermal: true, direct_light: true, clouds: false}\n\
             include_CIA: true\ninclude_moon: false\nparameterization: polynomial\n\
             top_log_pressure: -6.0\nn_layers: 100\n",
        );
        let settings: RunSettings = decode_mapping(SectionId::RunSettings, &body).unwrap();
        assert_eq!(settings.wavelength_range, [3.0, 20.0]);
        assert!(settings.include_scattering.rayleigh);
        assert!(settings.include_cia);
        assert_eq!(settings.vae_net, None);
        assert_eq!(settings.pt_parameter_names().map(|n| n.len()), Some(5));
    }

    #[test]
    fn test_missing_field_reported_lazily() {
        let body = mapping("output_folder: .\n");
        let err = decode_mapping::<RunSettings>(SectionId::RunSettings, &body).unwrap_err();
        match err {
            ConfigError::Field { section, message, .. } => {
                assert_eq!(section, "RUN SETTINGS");
                assert!(message.contains("missing field"), "{}", message);
            }
            other => panic!("Expected Field error, got {:?}", other),
        }
    }

    #[test]
    fn test_merge_keeps_order_and_foreign_keys() {
        let existing = mapping("composition: haze\nnote: keep me\n");
        let typed = CloudParameters {
            composition: "transparent".into(),
        };
        let merged = merge_owned(
            SectionId::CloudParameters,
            &existing,
            &typed,
            CloudParameters::KEYS,
        )
        .unwrap();
        let keys: Vec<&str> = merged.keys().filter_map(Value::as_str).collect();
        assert_eq!(keys, vec!["composition", "note"]);
        assert_eq!(merged.get("composition"), Some(&Value::from("transparent")));
    }

    #[test]
    fn test_merge_drops_owned_optional_keys() {
        let existing = mapping("input_profile: old.txt\ndata_files: []\n");
        let typed = GroundTruthData::default();
        let merged = merge_owned(
            SectionId::GroundTruthData,
            &existing,
            &typed,
            GroundTruthData::KEYS,
        )
        .unwrap();
        assert!(!merged.contains_key("input_profile"));
        assert!(merged.contains_key("data_files"));
    }

    #[test]
    fn test_parameter_section_insert_keeps_position() {
        let mut section = ParameterSection::new()
            .with("a_1", ParameterSpec::known(1.0))
            .with("a_0", ParameterSpec::known(0.0));
        section.insert(
            "a_1",
            ParameterSpec::distribution(PriorKind::Uniform, [0.0, 2.0], None).unwrap(),
        );
        assert_eq!(section.names().collect::<Vec<_>>(), vec!["a_1", "a_0"]);
        assert_eq!(section.retrieved(), vec!["a_1"]);
        assert_eq!(section.missing(&["a_0", "a_2"]), vec!["a_2"]);
    }

    #[test]
    fn test_parameter_section_decode_error_names_key() {
        let body = mapping("R_pl:\n  prior:\n    kind: cauchy\n    prior_specs: {}\n");
        let err = ParameterSection::from_mapping(SectionId::PhysicalParameters, &body).unwrap_err();
        match err {
            ConfigError::Field { key, message, .. } => {
                assert_eq!(key.as_deref(), Some("R_pl"));
                assert!(message.contains("cauchy"), "{}", message);
            }
            other => panic!("Expected Field error, got {:?}", other),
        }
    }

    #[test]
    fn test_user_units_round_trip() {
        let body = mapping("R_sun: 1m\nM_sun: 2kg\n");
        let units = UserUnits::from_mapping(&body).unwrap();
        assert_eq!(units.get("R_sun"), Some("1m"));
        assert_eq!(units.to_mapping(), body);
    }
}
