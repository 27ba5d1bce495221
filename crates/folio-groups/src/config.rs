use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::group::DEFAULT_VIRTUAL_REGION_LABEL;

/// Configuration for the group engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Stored when a group is created or edited with a blank schedule.
    pub default_schedule: String,
    /// Label the virtual region renders as (and is searched by).
    pub virtual_region_label: String,
    /// Groups per page in listings.
    pub listing_page_size: usize,
    /// Capacity of the channel emitter queue.
    pub event_buffer: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_schedule: "Schedule TBD".to_string(),
            virtual_region_label: DEFAULT_VIRTUAL_REGION_LABEL.to_string(),
            listing_page_size: 20,
            event_buffer: 256,
        }
    }
}

/// Failure to load an [`EngineConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl EngineConfig {
    /// Parse a JSON config; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.listing_page_size == 0 {
            return Err(ConfigError::Invalid("listing_page_size must be > 0".into()));
        }
        if self.virtual_region_label.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "virtual_region_label must not be empty".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.listing_page_size, 20);
        assert_eq!(config.virtual_region_label, "Online");
        assert_eq!(config.default_schedule, "Schedule TBD");
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = EngineConfig::from_json_str(r#"{"listing_page_size": 5}"#).unwrap();
        assert_eq!(config.listing_page_size, 5);
        assert_eq!(config.event_buffer, 256);
    }

    #[test]
    fn rejects_zero_page_size() {
        let err = EngineConfig::from_json_str(r#"{"listing_page_size": 0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(
            EngineConfig::from_json_str("{not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("folio.json");
        std::fs::write(&path, r#"{"virtual_region_label": "Zoom"}"#).unwrap();
        let config = EngineConfig::from_json_file(&path).unwrap();
        assert_eq!(config.virtual_region_label, "Zoom");
    }
}
