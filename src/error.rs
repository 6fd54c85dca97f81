//! Error taxonomy for the configuration model.
//!
//! Each layer has its own `thiserror` enum; `ConfigError` wraps the lower
//! layers so document-level callers handle a single type.
//!
//! ```text
//! prior encoding   → PriorError
//! line-tag grammar → LineTagError
//! document model   → ConfigError (wraps both)
//! ```

use std::path::PathBuf;

use retrieval_types::{LineAttribute, PriorKind, VocabularyError};

/// Failures building or decoding a `ParameterSpec`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PriorError {
    #[error("Unknown prior kind '{kind}'")]
    UnknownPriorKind { kind: String },

    #[error("A truth value must be provided for known parameters")]
    MissingTruth,

    #[error("Prior '{kind}' requires parameters {expected:?}")]
    MissingPriorParams {
        kind: PriorKind,
        expected: &'static [&'static str],
    },

    #[error("Prior '{kind}' takes {expected} parameters, got {found}")]
    PriorParamCount {
        kind: PriorKind,
        expected: usize,
        found: usize,
    },

    #[error("Prior '{kind}' expects parameters {expected:?}, found {found:?}")]
    PriorParamNames {
        kind: PriorKind,
        expected: &'static [&'static str],
        found: Vec<String>,
    },

    #[error("Prior parameter '{name}' is not a number")]
    NonNumericParam { name: String },
}

impl From<VocabularyError> for PriorError {
    fn from(err: VocabularyError) -> Self {
        match err {
            VocabularyError::UnknownPriorKind(kind) => PriorError::UnknownPriorKind { kind },
            other => PriorError::UnknownPriorKind {
                kind: other.to_string(),
            },
        }
    }
}

/// Failures encoding or decoding line-dataset tags.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LineTagError {
    #[error("Malformed line tags: {reason}")]
    Malformed { reason: String },

    #[error("Line tag '{tag}' does not belong to species '{formula}'")]
    ForeignSpecies { tag: String, formula: String },

    #[error("{attribute} value '{value}' contains the tag separator")]
    SeparatorInValue {
        attribute: LineAttribute,
        value: String,
    },

    #[error("{attribute} value is empty")]
    EmptyValue { attribute: LineAttribute },

    #[error("'{value}' is not a known {attribute} option (expected one of {options:?})")]
    UnknownOption {
        attribute: LineAttribute,
        value: String,
        options: &'static [&'static str],
    },

    #[error("Species formula '{formula}' cannot be used in a line tag")]
    InvalidFormula { formula: String },
}

/// Document-level failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Section {section} not found in config")]
    SectionMissing { section: String },

    #[error("{what} must be a mapping")]
    NotAMapping { what: String },

    #[error("[{section}] {field_key}: {message}", field_key = .key.as_deref().unwrap_or("<section>"))]
    Field {
        section: String,
        key: Option<String>,
        message: String,
    },

    #[error("Unknown species '{formula}'")]
    UnknownSpecies { formula: String },

    #[error("'{key}' is reserved for chemistry settings and cannot name a species")]
    ReservedSpeciesKey { key: String },

    #[error("Section {section} does not hold parameter specs")]
    NotAParameterSection { section: String },

    #[error(transparent)]
    Prior(#[from] PriorError),

    #[error(transparent)]
    LineTag(#[from] LineTagError),

    #[error("Failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to process YAML{}: {source}", .path.as_ref().map(|p| format!(" in {}", p.display())).unwrap_or_default())]
    Yaml {
        path: Option<PathBuf>,
        #[source]
        source: serde_yaml::Error,
    },
}

impl ConfigError {
    pub(crate) fn field(
        section: impl ToString,
        key: Option<&str>,
        message: impl ToString,
    ) -> Self {
        ConfigError::Field {
            section: section.to_string(),
            key: key.map(str::to_string),
            message: message.to_string(),
        }
    }
}

pub type Result<T, E = ConfigError> = std::result::Result<T, E>;
