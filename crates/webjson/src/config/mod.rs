use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, WebJsonError};

/// Serializer settings, loadable from a JSON file.
///
/// Every key is optional in the file; missing keys keep their defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SerializerConfig {
    #[serde(rename = "defaultEncoding")]
    pub default_encoding: String,
    pub pretty: bool,
    #[serde(rename = "reverseListings")]
    pub reverse_listings: bool,
    #[serde(rename = "logPayloads")]
    pub log_payloads: bool,
}

impl Default for SerializerConfig {
    fn default() -> Self {
        Self {
            default_encoding: "UTF-8".into(),
            pretty: false,
            reverse_listings: true,
            log_payloads: true,
        }
    }
}

impl SerializerConfig {
    /// Load settings from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            WebJsonError::Config(format!(
                "Failed to read serializer config {}: {e}",
                path.display()
            ))
        })?;

        serde_json::from_str(&contents).map_err(|e| {
            WebJsonError::Config(format!(
                "Failed to parse serializer config {}: {e}",
                path.display()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = SerializerConfig::default();
        assert_eq!(config.default_encoding, "UTF-8");
        assert!(!config.pretty);
        assert!(config.reverse_listings);
        assert!(config.log_payloads);
    }

    #[test]
    fn test_serde_rename_camel_case() {
        let value = serde_json::to_value(SerializerConfig::default()).unwrap();
        let obj = value.as_object().unwrap();

        assert!(obj.contains_key("defaultEncoding"));
        assert!(obj.contains_key("pretty"));
        assert!(obj.contains_key("reverseListings"));
        assert!(obj.contains_key("logPayloads"));
    }

    #[test]
    fn test_load_partial_file_keeps_defaults() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("webjson.json");
        std::fs::write(&path, r#"{ "pretty": true, "defaultEncoding": "ISO-8859-1" }"#).unwrap();

        let config = SerializerConfig::load(&path).unwrap();
        assert!(config.pretty);
        assert_eq!(config.default_encoding, "ISO-8859-1");
        assert!(config.reverse_listings);
        assert!(config.log_payloads);
    }

    #[test]
    fn test_load_missing_file_is_config_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let err = SerializerConfig::load(tmp.path().join("absent.json")).unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("Failed to read serializer config"));
    }

    #[test]
    fn test_load_corrupt_file_is_config_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("webjson.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = SerializerConfig::load(&path).unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("Failed to parse serializer config"));
    }
}
