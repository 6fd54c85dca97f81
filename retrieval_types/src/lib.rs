//! Retrieval Types - Level 1 Foundation Vocabularies
//!
//! This crate holds the closed lookup tables a retrieval configuration document
//! is built from. Every table here is fixed at compile time; the document model,
//! the prior encoder and the line-tag grammar all read from it.
//!
//! ## Contents
//!
//! - Section identifiers (the 8 top-level groupings, in file order)
//! - Prior kinds and their parameter-name table
//! - Line-dataset attribute option tables and defaults
//! - Species formula → common name table
//! - Pressure-temperature parameterization table
//!
//! ## Rules
//!
//! 1. **NO DOCUMENT LOGIC** - tables, lookups and parsing of table keys only
//! 2. **NO WORKSPACE DEPENDENCIES**
//! 3. **ORDER IS DATA** - slice order of every table is significant

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// ERRORS
// ============================================================================

/// Lookup failures against the fixed tables.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VocabularyError {
    #[error("Unknown prior kind '{0}'")]
    UnknownPriorKind(String),

    #[error("Unknown section '{0}'")]
    UnknownSection(String),

    #[error("Unknown line attribute '{0}'")]
    UnknownLineAttribute(String),
}

// ============================================================================
// SECTIONS
// ============================================================================

/// The fixed top-level sections of a configuration document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SectionId {
    #[serde(rename = "GROUND TRUTH DATA")]
    GroundTruthData,
    #[serde(rename = "RUN SETTINGS")]
    RunSettings,
    #[serde(rename = "TEMPERATURE PARAMETERS")]
    TemperatureParameters,
    #[serde(rename = "PHYSICAL PARAMETERS")]
    PhysicalParameters,
    #[serde(rename = "CHEMICAL COMPOSITION PARAMETERS")]
    ChemicalComposition,
    #[serde(rename = "SCATTERING PARAMETERS")]
    ScatteringParameters,
    #[serde(rename = "CLOUD PARAMETERS")]
    CloudParameters,
    #[serde(rename = "USER-DEFINED UNITS")]
    UserDefinedUnits,
}

impl SectionId {
    /// All sections in file order.
    pub const ALL: [SectionId; 8] = [
        SectionId::GroundTruthData,
        SectionId::RunSettings,
        SectionId::TemperatureParameters,
        SectionId::PhysicalParameters,
        SectionId::ChemicalComposition,
        SectionId::ScatteringParameters,
        SectionId::CloudParameters,
        SectionId::UserDefinedUnits,
    ];

    /// Section key as written in the document
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionId::GroundTruthData => "GROUND TRUTH DATA",
            SectionId::RunSettings => "RUN SETTINGS",
            SectionId::TemperatureParameters => "TEMPERATURE PARAMETERS",
            SectionId::PhysicalParameters => "PHYSICAL PARAMETERS",
            SectionId::ChemicalComposition => "CHEMICAL COMPOSITION PARAMETERS",
            SectionId::ScatteringParameters => "SCATTERING PARAMETERS",
            SectionId::CloudParameters => "CLOUD PARAMETERS",
            SectionId::UserDefinedUnits => "USER-DEFINED UNITS",
        }
    }

    /// Sections whose every key maps to a parameter spec.
    pub fn holds_parameters(&self) -> bool {
        matches!(
            self,
            SectionId::TemperatureParameters
                | SectionId::PhysicalParameters
                | SectionId::ScatteringParameters
        )
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SectionId {
    type Err = VocabularyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SectionId::ALL
            .iter()
            .copied()
            .find(|section| section.as_str() == s)
            .ok_or_else(|| VocabularyError::UnknownSection(s.to_string()))
    }
}

// ============================================================================
// PRIOR KINDS
// ============================================================================

/// Distribution family of a parameter, or `(known)` for a fixed value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PriorKind {
    #[default]
    #[serde(rename = "(known)")]
    Known,
    #[serde(rename = "uniform")]
    Uniform,
    #[serde(rename = "log-uniform")]
    LogUniform,
    #[serde(rename = "gaussian")]
    Gaussian,
    #[serde(rename = "log-gaussian")]
    LogGaussian,
    #[serde(rename = "fourth-uniform")]
    FourthUniform,
}

impl PriorKind {
    pub const ALL: [PriorKind; 6] = [
        PriorKind::Known,
        PriorKind::Uniform,
        PriorKind::LogUniform,
        PriorKind::Gaussian,
        PriorKind::LogGaussian,
        PriorKind::FourthUniform,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PriorKind::Known => "(known)",
            PriorKind::Uniform => "uniform",
            PriorKind::LogUniform => "log-uniform",
            PriorKind::Gaussian => "gaussian",
            PriorKind::LogGaussian => "log-gaussian",
            PriorKind::FourthUniform => "fourth-uniform",
        }
    }

    /// Canonical parameter names, in the order values are supplied.
    pub fn param_names(&self) -> &'static [&'static str] {
        match self {
            PriorKind::Known => &[],
            PriorKind::Uniform => &["lower", "upper"],
            PriorKind::LogUniform => &["log_lower", "log_upper"],
            PriorKind::Gaussian => &["mean", "sigma"],
            PriorKind::LogGaussian => &["log_mean", "log_sigma"],
            PriorKind::FourthUniform => &["lower", "upper"],
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, PriorKind::Known)
    }
}

impl fmt::Display for PriorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PriorKind {
    type Err = VocabularyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PriorKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| VocabularyError::UnknownPriorKind(s.to_string()))
    }
}

// ============================================================================
// LINE DATASET ATTRIBUTES
// ============================================================================

/// Separator between formula, attribute block and suffixes in a line tag.
///
/// No option value of any attribute may contain it.
pub const LINE_TAG_SEPARATOR: char = '_';

/// Suffix token marking a UV cross-section dataset.
pub const UV_TOKEN: &str = "UV";

/// Token introducing a non-default resolution suffix.
pub const RESOLUTION_TOKEN: &str = "R";

/// Attributes of an absorption-line dataset, in tag order.
///
/// Resolution is always last and always has a default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LineAttribute {
    Isotope,
    Database,
    Broadening,
    Cutoff,
    Resolution,
}

impl LineAttribute {
    pub const ALL: [LineAttribute; 5] = [
        LineAttribute::Isotope,
        LineAttribute::Database,
        LineAttribute::Broadening,
        LineAttribute::Cutoff,
        LineAttribute::Resolution,
    ];

    /// The attributes packed into the tag body, in positional order.
    pub const POSITIONAL: [LineAttribute; 4] = [
        LineAttribute::Isotope,
        LineAttribute::Database,
        LineAttribute::Broadening,
        LineAttribute::Cutoff,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            LineAttribute::Isotope => "Isotope",
            LineAttribute::Database => "Database",
            LineAttribute::Broadening => "Broadening",
            LineAttribute::Cutoff => "Cutoff",
            LineAttribute::Resolution => "Resolution",
        }
    }

    pub fn options(&self) -> &'static [&'static str] {
        match self {
            LineAttribute::Isotope => &["all", "main"],
            LineAttribute::Database => &["EX21", "HP10", "HN20", "PK95"],
            LineAttribute::Broadening => &["air", "CO2", "HH", "H2O"],
            LineAttribute::Cutoff => &["C25", "C100", "Chubb", "BG69", "HB02", "nocut"],
            LineAttribute::Resolution => &["50", "100", "200", "1000"],
        }
    }

    pub fn default_value(&self) -> &'static str {
        match self {
            LineAttribute::Isotope => "main",
            LineAttribute::Database => "HN20",
            LineAttribute::Broadening => "air",
            LineAttribute::Cutoff => "C25",
            LineAttribute::Resolution => "50",
        }
    }

    pub fn accepts(&self, value: &str) -> bool {
        self.options().contains(&value)
    }
}

impl fmt::Display for LineAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LineAttribute {
    type Err = VocabularyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LineAttribute::ALL
            .iter()
            .copied()
            .find(|attr| attr.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| VocabularyError::UnknownLineAttribute(s.to_string()))
    }
}

// ============================================================================
// SPECIES
// ============================================================================

/// Key inside the chemistry section that holds globals rather than a species.
pub const RESERVED_CHEMISTRY_KEY: &str = "settings";

/// Supported species: formula → common name, sorted by formula.
pub const SPECIES_NAMES: &[(&str, &str)] = &[
    ("CH4", "methane"),
    ("CO", "carbon monoxide"),
    ("CO2", "carbon dioxide"),
    ("H2", "hydrogen"),
    ("H2O", "water"),
    ("H2S", "hydrogen sulfide"),
    ("K", "potassium"),
    ("N2", "nitrogen"),
    ("N2O", "nitrous oxide"),
    ("Na", "sodium"),
    ("NH3", "ammonia"),
    ("O2", "oxygen"),
    ("O3", "ozone"),
    ("OCS", "carbonyl sulfide"),
    ("OH", "hydroxide"),
    ("PH3", "phosphine"),
    ("SiO", "silicon monoxide"),
    ("SO2", "sulfur dioxide"),
];

/// Common name for a formula, if the species is supported.
pub fn species_name(formula: &str) -> Option<&'static str> {
    SPECIES_NAMES
        .iter()
        .find(|(f, _)| *f == formula)
        .map(|(_, name)| *name)
}

pub fn is_known_species(formula: &str) -> bool {
    species_name(formula).is_some()
}

// ============================================================================
// PRESSURE-TEMPERATURE PARAMETERIZATIONS
// ============================================================================

/// Parameterization name → coefficient names it needs.
pub const PT_PARAMETERIZATIONS: &[(&str, &[&str])] = &[
    ("polynomial 4", &["a_0", "a_1", "a_2", "a_3", "a_4"]),
    // run settings spell the 4th-degree polynomial without its degree
    ("polynomial", &["a_0", "a_1", "a_2", "a_3", "a_4"]),
];

pub fn pt_parameter_names(parameterization: &str) -> Option<&'static [&'static str]> {
    PT_PARAMETERIZATIONS
        .iter()
        .find(|(name, _)| *name == parameterization)
        .map(|(_, names)| *names)
}
