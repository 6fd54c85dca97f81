//! Reading and writing configuration files.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde_yaml::Value;
use tracing::{debug, info};

use super::ConfigurationDocument;
use crate::error::{ConfigError, Result};

/// File name used when no target, or a directory, is given to `save`.
pub const DEFAULT_FILE_NAME: &str = "config.yaml";

/// Where `save` writes: `./config.yaml` for no path, `<dir>/config.yaml`
/// for an existing directory, otherwise the path itself.
pub fn resolve_output_path(path: Option<&Path>) -> PathBuf {
    match path {
        None => Path::new(".").join(DEFAULT_FILE_NAME),
        Some(p) if p.is_dir() => p.join(DEFAULT_FILE_NAME),
        Some(p) => p.to_path_buf(),
    }
}

/// Read and validate a configuration file.
pub fn load(path: impl AsRef<Path>) -> Result<ConfigurationDocument> {
    ConfigurationDocument::load(path)
}

/// Write `document` and return the path actually written.
pub fn save(document: &ConfigurationDocument, path: Option<&Path>) -> Result<PathBuf> {
    document.save(path)
}

/// Mode for the file `save` writes: an existing target keeps its own,
/// a new one gets a regular 0644 file instead of the private temp file mode.
fn saved_permissions(target: &Path) -> Option<std::fs::Permissions> {
    match std::fs::metadata(target) {
        Ok(meta) => Some(meta.permissions()),
        Err(_) => new_file_permissions(),
    }
}

#[cfg(unix)]
fn new_file_permissions() -> Option<std::fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(std::fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn new_file_permissions() -> Option<std::fs::Permissions> {
    None
}

impl ConfigurationDocument {
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let root: Value =
            serde_yaml::from_str(text).map_err(|source| ConfigError::Yaml { path: None, source })?;
        match root {
            Value::Mapping(root) => Self::from_mapping(root),
            // An empty file parses as null; report the first missing section.
            Value::Null => Self::from_mapping(Default::default()),
            _ => Err(ConfigError::NotAMapping {
                what: "Configuration root".to_string(),
            }),
        }
    }

    /// Block-style YAML with keys in document order.
    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml::to_string(&self.to_mapping())
            .map_err(|source| ConfigError::Yaml { path: None, source })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from {}", path.display());

        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let document = Self::from_yaml_str(&text).map_err(|err| match err {
            ConfigError::Yaml { path: None, source } => ConfigError::Yaml {
                path: Some(path.to_path_buf()),
                source,
            },
            other => other,
        })?;

        debug!("Loaded {} sections", document.sections().count());
        Ok(document)
    }

    /// Write the document, replacing the target atomically.
    ///
    /// The text goes to a temporary file next to the target first, so a failed
    /// write never leaves a truncated config behind.
    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf> {
        self.validate()?;
        let target = resolve_output_path(path);
        let text = self.to_yaml_string()?;

        let dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let io_err = |source| ConfigError::Io {
            path: target.clone(),
            source,
        };

        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(io_err)?;
        tmp.write_all(text.as_bytes()).map_err(io_err)?;
        tmp.flush().map_err(io_err)?;
        if let Some(permissions) = saved_permissions(&target) {
            tmp.as_file().set_permissions(permissions).map_err(io_err)?;
        }
        tmp.persist(&target).map_err(|e| io_err(e.error))?;

        info!("Saved configuration to {}", target.display());
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use retrieval_types::SectionId;

    #[test]
    fn test_resolve_output_path() {
        assert_eq!(resolve_output_path(None), PathBuf::from("./config.yaml"));

        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            resolve_output_path(Some(dir.path())),
            dir.path().join("config.yaml")
        );

        let file = dir.path().join("run_42.yaml");
        assert_eq!(resolve_output_path(Some(file.as_path())), file);
    }

    #[test]
    fn test_empty_text_reports_first_section() {
        let err = ConfigurationDocument::from_yaml_str("").unwrap_err();
        assert_eq!(err.to_string(), "Section GROUND TRUTH DATA not found in config");
    }

    #[test]
    fn test_scalar_root_rejected() {
        let err = ConfigurationDocument::from_yaml_str("42\n").unwrap_err();
        assert!(matches!(err, ConfigError::NotAMapping { .. }));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_bad_yaml_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.yaml");
        std::fs::write(&path, "RUN SETTINGS: [unclosed\n").unwrap();
        match load(&path).unwrap_err() {
            ConfigError::Yaml { path: Some(p), .. } => assert_eq!(p, path),
            other => panic!("Expected Yaml error, got {:?}", other),
        }
    }

    #[test]
    fn test_save_into_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = ConfigurationDocument::empty();
        doc.set(SectionId::UserDefinedUnits, "R_sun", Value::from("1m"))
            .unwrap();

        let written = save(&doc, Some(dir.path())).unwrap();
        assert_eq!(written, dir.path().join(DEFAULT_FILE_NAME));
        assert_eq!(load(&written).unwrap(), doc);
    }

    #[cfg(unix)]
    #[test]
    fn test_saved_file_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let mut doc = ConfigurationDocument::empty();
        doc.set(SectionId::UserDefinedUnits, "R_sun", Value::from("1m"))
            .unwrap();
        let mode = |path: &Path| std::fs::metadata(path).unwrap().permissions().mode() & 0o777;

        let fresh = save(&doc, Some(dir.path().join("fresh.yaml").as_path())).unwrap();
        assert_eq!(mode(&fresh), 0o644);

        let shared = dir.path().join("shared.yaml");
        std::fs::write(&shared, "").unwrap();
        std::fs::set_permissions(&shared, std::fs::Permissions::from_mode(0o640)).unwrap();
        save(&doc, Some(shared.as_path())).unwrap();
        assert_eq!(mode(&shared), 0o640);
    }
}
