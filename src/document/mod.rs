//! Configuration document model.
//!
//! A document is an ordered list of named sections, each an ordered YAML
//! mapping. Order is kept exactly as loaded or built so saved files diff
//! cleanly against reference documents.
//!
//! Validation is shallow: a document exists only if all 8 sections of
//! `SectionId::ALL` are present. Field-level problems surface when a typed
//! view is requested (`run_settings()`, `chemistry()`, ...), as
//! `ConfigError::Field` naming the section and key.
//!
//! Editors never touch the raw mappings directly; they read a typed view,
//! change it, and hand it back through the matching setter. A failed setter
//! leaves the document unchanged.

mod io;
pub mod sections;

use retrieval_types::SectionId;
use serde_yaml::{Mapping, Value};
use tracing::debug;

use crate::error::{ConfigError, Result};
use crate::prior::ParameterSpec;
use crate::species::ChemicalComposition;

pub use io::{load, resolve_output_path, save, DEFAULT_FILE_NAME};
pub use sections::{
    CloudParameters, GroundTruthData, ParameterSection, RunSettings, ScatteringFlags, UserUnits,
};

use sections::{decode_mapping, decode_value, encode_value, merge_owned};

/// Section name with the keys of its body, in document order.
pub type SectionLayout = (String, Vec<String>);

#[derive(Debug, Clone, PartialEq)]
pub struct ConfigurationDocument {
    sections: Vec<(String, Mapping)>,
}

impl ConfigurationDocument {
    /// All required sections, each empty.
    pub fn empty() -> Self {
        Self {
            sections: SectionId::ALL
                .iter()
                .map(|id| (id.as_str().to_string(), Mapping::new()))
                .collect(),
        }
    }

    /// Build from a parsed top-level mapping and validate it.
    ///
    /// A section written with no body (`CLOUD PARAMETERS:`) is read as empty.
    pub fn from_mapping(root: Mapping) -> Result<Self> {
        let mut sections = Vec::with_capacity(root.len());
        for (key, value) in root {
            let name = match key {
                Value::String(name) => name,
                other => {
                    return Err(ConfigError::field(
                        "document",
                        None,
                        format!("section names must be strings, found {:?}", other),
                    ))
                }
            };
            let body = match value {
                Value::Mapping(body) => body,
                Value::Null => Mapping::new(),
                _ => {
                    return Err(ConfigError::NotAMapping {
                        what: format!("Section {}", name),
                    })
                }
            };
            sections.push((name, body));
        }

        let document = Self { sections };
        document.validate()?;
        Ok(document)
    }

    pub fn to_mapping(&self) -> Mapping {
        self.sections
            .iter()
            .map(|(name, body)| (Value::String(name.clone()), Value::Mapping(body.clone())))
            .collect()
    }

    /// Check that every required section is present.
    pub fn validate(&self) -> Result<()> {
        for id in SectionId::ALL {
            if self.raw_section(id.as_str()).is_none() {
                return Err(ConfigError::SectionMissing {
                    section: id.as_str().to_string(),
                });
            }
        }
        debug!("Validated {} sections", self.sections.len());
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Generic access
    // -----------------------------------------------------------------------

    fn raw_section(&self, name: &str) -> Option<&Mapping> {
        self.sections
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, body)| body)
    }

    pub fn section(&self, id: SectionId) -> Result<&Mapping> {
        self.raw_section(id.as_str())
            .ok_or_else(|| ConfigError::SectionMissing {
                section: id.as_str().to_string(),
            })
    }

    fn section_mut(&mut self, id: SectionId) -> Result<&mut Mapping> {
        self.sections
            .iter_mut()
            .find(|(n, _)| n == id.as_str())
            .map(|(_, body)| body)
            .ok_or_else(|| ConfigError::SectionMissing {
                section: id.as_str().to_string(),
            })
    }

    fn replace_section(&mut self, id: SectionId, body: Mapping) -> Result<()> {
        *self.section_mut(id)? = body;
        debug!("Replaced section {}", id);
        Ok(())
    }

    /// All sections in document order, including any beyond the required set.
    pub fn sections(&self) -> impl Iterator<Item = (&str, &Mapping)> {
        self.sections.iter().map(|(n, body)| (n.as_str(), body))
    }

    pub fn get(&self, id: SectionId, key: &str) -> Option<&Value> {
        self.raw_section(id.as_str())?.get(key)
    }

    /// Write one raw setting. An existing key keeps its position.
    pub fn set(&mut self, id: SectionId, key: &str, value: Value) -> Result<()> {
        self.section_mut(id)?.insert(Value::from(key), value);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Typed views
    // -----------------------------------------------------------------------

    pub fn ground_truth(&self) -> Result<GroundTruthData> {
        let id = SectionId::GroundTruthData;
        decode_mapping(id, self.section(id)?)
    }

    pub fn set_ground_truth(&mut self, data: &GroundTruthData) -> Result<()> {
        let id = SectionId::GroundTruthData;
        let body = merge_owned(id, self.section(id)?, data, GroundTruthData::KEYS)?;
        self.replace_section(id, body)
    }

    pub fn run_settings(&self) -> Result<RunSettings> {
        let id = SectionId::RunSettings;
        decode_mapping(id, self.section(id)?)
    }

    pub fn set_run_settings(&mut self, settings: &RunSettings) -> Result<()> {
        let id = SectionId::RunSettings;
        let body = merge_owned(id, self.section(id)?, settings, RunSettings::KEYS)?;
        self.replace_section(id, body)
    }

    fn parameter_section_id(id: SectionId) -> Result<SectionId> {
        if id.holds_parameters() {
            Ok(id)
        } else {
            Err(ConfigError::NotAParameterSection {
                section: id.as_str().to_string(),
            })
        }
    }

    /// Temperature, physical or scattering parameters.
    pub fn parameters(&self, id: SectionId) -> Result<ParameterSection> {
        let id = Self::parameter_section_id(id)?;
        ParameterSection::from_mapping(id, self.section(id)?)
    }

    pub fn set_parameters(&mut self, id: SectionId, parameters: &ParameterSection) -> Result<()> {
        let id = Self::parameter_section_id(id)?;
        let body = parameters.to_mapping()?;
        self.replace_section(id, body)
    }

    /// One parameter, decoded on its own so unrelated bad entries don't block it.
    pub fn parameter(&self, id: SectionId, name: &str) -> Result<ParameterSpec> {
        let id = Self::parameter_section_id(id)?;
        let value = self
            .section(id)?
            .get(name)
            .ok_or_else(|| ConfigError::field(id, Some(name), "missing parameter"))?;
        decode_value(id, Some(name), value)
    }

    pub fn set_parameter(&mut self, id: SectionId, name: &str, spec: &ParameterSpec) -> Result<()> {
        let id = Self::parameter_section_id(id)?;
        let value = encode_value(spec)?;
        self.set(id, name, value)?;
        debug!("Set {} / {} to {}", id, name, spec.prior_summary());
        Ok(())
    }

    pub fn chemistry(&self) -> Result<ChemicalComposition> {
        ChemicalComposition::from_mapping(self.section(SectionId::ChemicalComposition)?)
    }

    pub fn set_chemistry(&mut self, chemistry: &ChemicalComposition) -> Result<()> {
        let body = chemistry.to_mapping()?;
        self.replace_section(SectionId::ChemicalComposition, body)
    }

    pub fn clouds(&self) -> Result<CloudParameters> {
        let id = SectionId::CloudParameters;
        decode_mapping(id, self.section(id)?)
    }

    pub fn set_clouds(&mut self, clouds: &CloudParameters) -> Result<()> {
        let id = SectionId::CloudParameters;
        let body = merge_owned(id, self.section(id)?, clouds, CloudParameters::KEYS)?;
        self.replace_section(id, body)
    }

    pub fn user_units(&self) -> Result<UserUnits> {
        UserUnits::from_mapping(self.section(SectionId::UserDefinedUnits)?)
    }

    pub fn set_user_units(&mut self, units: &UserUnits) -> Result<()> {
        self.replace_section(SectionId::UserDefinedUnits, units.to_mapping())
    }

    // -----------------------------------------------------------------------
    // Comparison
    // -----------------------------------------------------------------------

    /// Section names with their keys, in document order.
    pub fn layout(&self) -> Vec<SectionLayout> {
        self.sections
            .iter()
            .map(|(name, body)| {
                let keys = body
                    .keys()
                    .map(|k| match k.as_str() {
                        Some(s) => s.to_string(),
                        None => format!("{:?}", k),
                    })
                    .collect();
                (name.clone(), keys)
            })
            .collect()
    }

    /// Names of sections whose bodies differ, or that exist in only one document.
    pub fn differing_sections(&self, other: &Self) -> Vec<String> {
        let mut names: Vec<String> = self
            .sections
            .iter()
            .filter(|(name, body)| other.raw_section(name) != Some(body))
            .map(|(name, _)| name.clone())
            .collect();
        names.extend(
            other
                .sections
                .iter()
                .filter(|(name, _)| self.raw_section(name).is_none())
                .map(|(name, _)| name.clone()),
        );
        names
    }
}

impl Default for ConfigurationDocument {
    fn default() -> Self {
        Self::empty()
    }
}
