//! Tool settings read from the environment.
//!
//! Only the command-line tool and test harnesses read these; the document
//! model itself never looks at the environment.

use std::path::{Path, PathBuf};

use tracing::debug;

pub const CONFIG_DIR_VAR: &str = "RETRIEVAL_CONFIG_DIR";
pub const REFERENCE_VAR: &str = "RETRIEVAL_REFERENCE";

const REFERENCE_RELATIVE: &str = "config/reference.yaml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSettings {
    /// Where `save` writes when no target is given.
    pub config_dir: PathBuf,
    /// Reference document the default configuration is checked against.
    pub reference: PathBuf,
}

impl ToolSettings {
    /// Load `.env` if present, then read settings from the process environment.
    ///
    /// Reference path resolution order:
    /// 1. RETRIEVAL_REFERENCE environment variable
    /// 2. Relative "config/reference.yaml" (running from the crate root)
    /// 3. The copy shipped next to this crate's manifest
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same resolution as `from_env` with an explicit variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let config_dir = lookup(CONFIG_DIR_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        let reference = match lookup(REFERENCE_VAR) {
            Some(path) => PathBuf::from(path),
            None if Path::new(REFERENCE_RELATIVE).exists() => PathBuf::from(REFERENCE_RELATIVE),
            None => Path::new(env!("CARGO_MANIFEST_DIR")).join(REFERENCE_RELATIVE),
        };

        debug!(
            "Tool settings: config_dir={}, reference={}",
            config_dir.display(),
            reference.display()
        );
        Self {
            config_dir,
            reference,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_explicit_values_win() {
        let settings = ToolSettings::from_lookup(|name| match name {
            CONFIG_DIR_VAR => Some("/tmp/runs".into()),
            REFERENCE_VAR => Some("/tmp/ref.yaml".into()),
            _ => None,
        });
        assert_eq!(settings.config_dir, PathBuf::from("/tmp/runs"));
        assert_eq!(settings.reference, PathBuf::from("/tmp/ref.yaml"));
    }

    #[test]
    fn test_defaults_find_shipped_reference() {
        let settings = ToolSettings::from_lookup(|_| None);
        assert_eq!(settings.config_dir, PathBuf::from("."));
        assert!(settings.reference.ends_with(REFERENCE_RELATIVE));
        assert!(settings.reference.exists());
    }
}
