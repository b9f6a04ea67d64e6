//! Ferry Configuration
//!
//! Loads the `ferry.toml` file that accompanies a set of generated bindings:
//! - The interface contract the managed side was built against
//!   (namespace, contract version, per-symbol checksums)
//! - Runtime settings (log filter, decode limits)
//!
//! # Precedence
//!
//! 1. `ferry.toml` found by walking up from the start directory
//! 2. Environment variables (`FERRY_*`)
//!
//! # Example
//!
//! ```no_run
//! use ferry_config::ConfigLoader;
//! use std::path::Path;
//!
//! let loader = ConfigLoader::new();
//! let config = loader.load_from_directory(Path::new(".")).unwrap();
//! ```

pub mod loader;
pub mod logging;
pub mod manifest;

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

pub use loader::{ConfigLoader, FerryConfig};
pub use logging::init_logging;
pub use manifest::{ContractManifest, Manifest, RuntimeSettings, DEFAULT_LOG_FILTER};
