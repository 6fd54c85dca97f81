//! Retrieval Config - configuration document model for exoplanet atmosphere
//! retrievals.
//!
//! A configuration is an 8-section YAML document: ground truth inputs, run
//! settings, three parameter sections, the chemical composition, cloud
//! parameters and user-defined units. Every retrievable quantity is a
//! `ParameterSpec` (a known constant or a named prior distribution); each
//! species additionally names its line datasets with positional tags.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use retrieval_config::{build_default, build_parameter_spec, SectionId};
//!
//! let mut doc = build_default().unwrap();
//! let spec = build_parameter_spec("uniform", Some(&[0.5, 2.0]), Some(1.0), None, None).unwrap();
//! doc.set_parameter(SectionId::PhysicalParameters, "R_pl", &spec).unwrap();
//! doc.save(Some(Path::new("run_config.yaml"))).unwrap();
//! ```

// Core error handling
pub mod error;

// Prior encoding and line-dataset tags
pub mod line_tag;
pub mod prior;

// Document model, typed section views, file I/O
pub mod document;
pub mod species;

// Default document and tool settings
pub mod defaults;
pub mod settings;

pub use retrieval_types::{LineAttribute, PriorKind, SectionId, VocabularyError};

pub use defaults::build_default;
pub use document::{
    load, resolve_output_path, save, CloudParameters, ConfigurationDocument, GroundTruthData,
    ParameterSection, RunSettings, ScatteringFlags, UserUnits, DEFAULT_FILE_NAME,
};
pub use error::{ConfigError, LineTagError, PriorError};
pub use line_tag::{
    encode_species_lines, is_uv_tag, make_line_tag, make_uv_tag, parse_line_tags, LineSelection,
    ParsedLineTags,
};
pub use prior::{build_parameter_spec, ParameterSpec};
pub use species::{ChemicalComposition, ChemistrySettings, SpeciesEntry, SpeciesRow};
