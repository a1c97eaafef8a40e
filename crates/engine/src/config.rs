//! Database configuration via `tormenta.toml`
//!
//! Everything has a default, so an empty file (or no file at all) is valid.
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};
use crate::idlist::SortOrder;

/// Config file name conventionally placed next to the data
pub const CONFIG_FILE_NAME: &str = "tormenta.toml";

/// Serializer used for entity payloads
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadCodec {
    /// MessagePack with named fields (rmp-serde)
    #[default]
    Msgpack,
    /// JSON (serde_json)
    Json,
}

/// Database configuration loaded from `tormenta.toml`.
///
/// # Example
///
/// ```toml
/// # Entity payload serializer: "msgpack" (default) or "json"
/// codec = "msgpack"
///
/// # Order of AND / OR results: "newest_first" (default) or "oldest_first"
/// combined_order = "newest_first"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Entity payload serializer
    #[serde(default)]
    pub codec: PayloadCodec,
    /// Default order of combined query results
    #[serde(default)]
    pub combined_order: SortOrder,
}

impl DatabaseConfig {
    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Tormenta database configuration
#
# Entity payload serializer: "msgpack" (default) or "json"
#   "msgpack" = compact binary, field names kept
#   "json"    = human readable, larger
codec = "msgpack"

# Order of AND / OR query results: "newest_first" (default) or "oldest_first"
combined_order = "newest_first"
"#
    }

    /// Parse config from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the content is not valid config TOML.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        toml::from_str(&content).map_err(|e| {
            Error::Config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                Error::Config(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            Error::Config(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}
