//! Machine and run configuration.
//!
//! Everything has a default, so an empty JSON object is a valid config:
//!
//! ```json
//! { "stack_pointer": 244, "max_cycles": 100000, "trace": false }
//! ```

use std::path::Path;
use serde::{Serialize, Deserialize};
use thiserror::Error;
use crate::cpu::registers::SP_INIT;

/// Settings applied when a CPU is constructed and run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MachineConfig {
    /// Initial value of R7.
    pub stack_pointer: u8,
    /// Stop after this many instructions. `None` runs until HLT.
    pub max_cycles: Option<u64>,
    /// Log every executed instruction.
    pub trace: bool,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            stack_pointer: SP_INIT,
            max_cycles: None,
            trace: false,
        }
    }
}

impl MachineConfig {
    /// Parse a config from JSON text.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load a config from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        let config = Self::from_json(&text)?;
        tracing::debug!(?config, path = %path.display(), "loaded machine config");
        Ok(config)
    }
}

/// Errors that can occur loading a config.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("invalid config: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_is_default() {
        let config = MachineConfig::from_json("{}").unwrap();
        assert_eq!(config, MachineConfig::default());
        assert_eq!(config.stack_pointer, 0xF4);
        assert_eq!(config.max_cycles, None);
    }

    #[test]
    fn test_partial_override() {
        let config = MachineConfig::from_json(r#"{ "max_cycles": 500, "trace": true }"#).unwrap();
        assert_eq!(config.stack_pointer, 0xF4);
        assert_eq!(config.max_cycles, Some(500));
        assert!(config.trace);
    }

    #[test]
    fn test_rejects_unknown_fields() {
        assert!(matches!(
            MachineConfig::from_json(r#"{ "stack": 1 }"#),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_rejects_out_of_range_stack_pointer() {
        assert!(MachineConfig::from_json(r#"{ "stack_pointer": 256 }"#).is_err());
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            MachineConfig::from_json_file("/nonexistent/ls8.json"),
            Err(ConfigError::Io(_))
        ));
    }
}
