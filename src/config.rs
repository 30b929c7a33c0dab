//! Pack configuration.
//!
//! Settings are read from a TOML file. Every field has a default, so an
//! empty file (or no file at all) yields [`PackConfig::default`].

use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Largest number of optional inputs the stack node may declare.
pub const MAX_STACK_SLOTS: usize = 64;

/// Errors raised while loading a configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration value '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Settings shared by every node of the pack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PackConfig {
    /// Prefix added to every display name.
    pub name_prefix: String,
    /// Root of the category menu path.
    pub category_root: String,
    /// Optional image inputs of the stack node.
    pub stack_slots: usize,
    /// Pixel budget of the aspect-ratio resolver.
    pub target_pixels: u64,
}

impl Default for PackConfig {
    fn default() -> Self {
        Self {
            name_prefix: "jk ".to_string(),
            category_root: "jk Nodes".to_string(),
            stack_slots: 4,
            target_pixels: 1024 * 1024,
        }
    }
}

impl PackConfig {
    /// Load and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse and validate configuration text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: PackConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_STACK_SLOTS).contains(&self.stack_slots) {
            return Err(ConfigError::Invalid {
                field: "stack_slots",
                reason: format!("must be between 1 and {}, got {}", MAX_STACK_SLOTS, self.stack_slots),
            });
        }
        if self.target_pixels == 0 {
            return Err(ConfigError::Invalid {
                field: "target_pixels",
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Display name of a node with the configured prefix.
    pub fn display_name(&self, name: &str) -> String {
        format!("{}{}", self.name_prefix, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = PackConfig::default();
        assert_eq!(config.stack_slots, 4);
        assert_eq!(config.target_pixels, 1_048_576);
        assert_eq!(config.display_name("Resize Image"), "jk Resize Image");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_text_is_default() {
        assert_eq!(PackConfig::from_toml_str("").unwrap(), PackConfig::default());
    }

    #[test]
    fn test_defaults_round_trip() {
        let text = toml::to_string(&PackConfig::default()).unwrap();
        assert_eq!(PackConfig::from_toml_str(&text).unwrap(), PackConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config = PackConfig::from_toml_str("stack_slots = 8\nname_prefix = \"\"").unwrap();
        assert_eq!(config.stack_slots, 8);
        assert_eq!(config.name_prefix, "");
        assert_eq!(config.target_pixels, 1024 * 1024);
    }

    #[test]
    fn test_invalid_values() {
        let err = PackConfig::from_toml_str("stack_slots = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "stack_slots", .. }));

        let err = PackConfig::from_toml_str("target_pixels = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "target_pixels", .. }));

        assert!(matches!(
            PackConfig::from_toml_str("unknown = 1"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "target_pixels = 262144").unwrap();

        let config = PackConfig::load(file.path()).unwrap();
        assert_eq!(config.target_pixels, 262_144);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = PackConfig::load(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
