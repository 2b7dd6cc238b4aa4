//! Plugin metadata loaded from `plugin.json`.
//!
//! Metadata is read once at startup and sent unchanged with every artifact.
//! Loading never fails: a missing or malformed file yields
//! [`PluginMetadata::default`] and a warning.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Name used when `plugin.json` is unavailable.
const DEFAULT_NAME: &str = "unknown";

/// Version used when `plugin.json` is unavailable.
const DEFAULT_VERSION: &str = "0.0.0";

/// Descriptive plugin metadata.
///
/// Fields other than `name` and `version` are kept verbatim in `extra` and
/// serialized back alongside them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PluginMetadata {
    /// Plugin name.
    #[serde(default = "default_name")]
    pub name: String,
    /// Plugin version.
    #[serde(default = "default_version")]
    pub version: String,
    /// Any other top-level fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_name() -> String {
    DEFAULT_NAME.to_owned()
}

fn default_version() -> String {
    DEFAULT_VERSION.to_owned()
}

impl Default for PluginMetadata {
    fn default() -> Self {
        Self {
            name: default_name(),
            version: default_version(),
            extra: Map::new(),
        }
    }
}

/// Reason metadata could not be loaded.
#[derive(Debug, thiserror::Error)]
enum MetadataError {
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("invalid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

impl PluginMetadata {
    /// Load metadata from a JSON file, falling back to defaults.
    ///
    /// Logs a warning when the file is missing, unreadable or malformed.
    #[must_use]
    pub fn load(path: &Path) -> Self {
        match Self::read(path) {
            Ok(metadata) => {
                tracing::debug!(
                    path = %path.display(),
                    name = %metadata.name,
                    version = %metadata.version,
                    "Loaded plugin metadata"
                );
                metadata
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Could not load plugin metadata, using defaults"
                );
                Self::default()
            }
        }
    }

    fn read(path: &Path) -> Result<Self, MetadataError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn write_plugin_json(content: &str) -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new().unwrap();
        fs::write(file.path(), content).unwrap();
        file
    }

    #[test]
    fn test_default_metadata() {
        let metadata = PluginMetadata::default();
        assert_eq!(metadata.name, "unknown");
        assert_eq!(metadata.version, "0.0.0");
        assert!(metadata.extra.is_empty());
    }

    #[test]
    fn test_load_missing_file_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let metadata = PluginMetadata::load(&dir.path().join("plugin.json"));
        assert_eq!(metadata, PluginMetadata::default());
    }

    #[test]
    fn test_load_malformed_file_returns_default() {
        let file = write_plugin_json("{ name: broken");
        assert_eq!(PluginMetadata::load(file.path()), PluginMetadata::default());
    }

    #[test]
    fn test_load_non_object_returns_default() {
        let file = write_plugin_json("[1, 2, 3]");
        assert_eq!(PluginMetadata::load(file.path()), PluginMetadata::default());
    }

    #[test]
    fn test_load_directory_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(PluginMetadata::load(dir.path()), PluginMetadata::default());
    }

    #[test]
    fn test_load_keeps_extra_fields() {
        let file = write_plugin_json(
            r#"{
                "name": "my-plugin",
                "version": "1.2.0",
                "author": "someone",
                "minAppVersion": "0.40.0",
                "permissions": ["notes"]
            }"#,
        );

        let metadata = PluginMetadata::load(file.path());

        assert_eq!(metadata.name, "my-plugin");
        assert_eq!(metadata.version, "1.2.0");
        assert_eq!(metadata.extra["author"], json!("someone"));
        assert_eq!(metadata.extra["minAppVersion"], json!("0.40.0"));
        assert_eq!(metadata.extra["permissions"], json!(["notes"]));
    }

    #[test]
    fn test_load_partial_object_fills_missing_fields() {
        let file = write_plugin_json(r#"{"name": "only-name"}"#);
        let metadata = PluginMetadata::load(file.path());
        assert_eq!(metadata.name, "only-name");
        assert_eq!(metadata.version, "0.0.0");
    }

    #[test]
    fn test_serialize_flattens_extra() {
        let mut metadata = PluginMetadata::default();
        metadata.name = "my-plugin".to_owned();
        metadata
            .extra
            .insert("displayName".to_owned(), json!("My Plugin"));

        let value = serde_json::to_value(&metadata).unwrap();

        assert_eq!(
            value,
            json!({
                "name": "my-plugin",
                "version": "0.0.0",
                "displayName": "My Plugin"
            })
        );
    }
}
