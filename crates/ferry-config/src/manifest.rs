//! Contract manifest (`ferry.toml`)
//!
//! The `[contract]` table records the fingerprint of the interface definition
//! the managed side was generated from. The `[runtime]` table holds settings
//! for the boundary layer itself.

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Log filter used when neither `ferry.toml` nor `FERRY_LOG` sets one
pub const DEFAULT_LOG_FILTER: &str = "ferry=info";

/// Parsed contents of `ferry.toml`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Interface contract expected from the native library
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract: Option<ContractManifest>,

    /// Boundary runtime settings
    #[serde(default)]
    pub runtime: RuntimeSettings,
}

/// Expected contract version and checksums
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ContractManifest {
    /// Namespace the generated symbols live under
    pub namespace: String,

    /// Contract version baked into the generated bindings
    pub version: u32,

    /// Checksum per exported function, method and callback symbol
    #[serde(default)]
    pub checksums: BTreeMap<String, u16>,
}

/// Runtime settings for the boundary layer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct RuntimeSettings {
    /// `tracing` filter directive
    pub log_filter: String,

    /// Largest length prefix accepted while decoding strings, byte
    /// sequences, sequences and maps
    pub max_sequence_len: u32,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            max_sequence_len: i32::MAX as u32,
        }
    }
}

impl RuntimeSettings {
    fn validate(&self) -> ConfigResult<()> {
        if self.max_sequence_len > i32::MAX as u32 {
            return Err(ConfigError::ValidationError(format!(
                "runtime.max_sequence_len {} exceeds the 32-bit signed length prefix",
                self.max_sequence_len
            )));
        }
        if self.log_filter.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "runtime.log_filter".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

impl ContractManifest {
    fn validate(&self) -> ConfigResult<()> {
        if self.namespace.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "contract.namespace".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if let Some(symbol) = self.checksums.keys().find(|s| s.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "contract.checksums".to_string(),
                reason: format!("invalid symbol name {:?}", symbol),
            });
        }
        Ok(())
    }
}

impl Manifest {
    /// Load and validate a manifest file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        let manifest: Manifest =
            toml::from_str(&content).map_err(|error| ConfigError::TomlParseError {
                file: path.to_path_buf(),
                error,
            })?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Parse a manifest from a string (no file context)
    pub fn parse(content: &str) -> ConfigResult<Self> {
        let manifest: Manifest =
            toml::from_str(content).map_err(|error| ConfigError::TomlParseError {
                file: "<string>".into(),
                error,
            })?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub(crate) fn validate(&self) -> ConfigResult<()> {
        if let Some(contract) = &self.contract {
            contract.validate()?;
        }
        self.runtime.validate()
    }
}
