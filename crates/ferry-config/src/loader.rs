//! Configuration Loader
//!
//! Finds `ferry.toml` and applies environment overrides on top of it.

use crate::manifest::{ContractManifest, Manifest, RuntimeSettings};
use crate::{ConfigError, ConfigResult};
use std::env;
use std::path::{Path, PathBuf};

/// Name of the manifest file searched for by [`ConfigLoader`]
pub const MANIFEST_FILE: &str = "ferry.toml";

/// Configuration loader
///
/// Sources, lowest priority first:
/// 1. `ferry.toml` in the start directory or the nearest ancestor
/// 2. Environment variables (`FERRY_LOG`, `FERRY_MAX_SEQUENCE_LEN`)
#[derive(Debug, Default)]
pub struct ConfigLoader {
    /// Skip environment overrides (used by hosts that pin settings)
    ignore_env: bool,
}

/// Loaded configuration
#[derive(Debug, Clone, PartialEq)]
pub struct FerryConfig {
    /// Parsed manifest with overrides applied
    pub manifest: Manifest,

    /// Directory containing the manifest, if one was found
    pub root: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self { ignore_env: false }
    }

    /// Create a loader that does not consult `FERRY_*` variables
    pub fn without_env() -> Self {
        Self { ignore_env: true }
    }

    /// Load configuration starting from the given directory
    ///
    /// Walks up the directory tree to find `ferry.toml`. When none is found
    /// the defaults are used and `root` is `None`.
    pub fn load_from_directory(&self, start_dir: &Path) -> ConfigResult<FerryConfig> {
        let (root, manifest) = self.find_manifest(start_dir)?;
        let manifest = self.apply_env_overrides(manifest)?;
        Ok(FerryConfig { manifest, root })
    }

    /// Load configuration from a specific manifest file
    pub fn load_from_file(&self, path: &Path) -> ConfigResult<FerryConfig> {
        let manifest = Manifest::load_from_file(path)?;
        let manifest = self.apply_env_overrides(manifest)?;
        Ok(FerryConfig {
            manifest,
            root: path.parent().map(Path::to_path_buf),
        })
    }

    fn find_manifest(&self, start_dir: &Path) -> ConfigResult<(Option<PathBuf>, Manifest)> {
        let mut current = start_dir.to_path_buf();

        loop {
            let candidate = current.join(MANIFEST_FILE);
            if candidate.exists() {
                let manifest = Manifest::load_from_file(&candidate)?;
                return Ok((Some(current), manifest));
            }

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => return Ok((None, Manifest::default())),
            }
        }
    }

    /// Environment variables follow the pattern `FERRY_<KEY>`
    fn apply_env_overrides(&self, mut manifest: Manifest) -> ConfigResult<Manifest> {
        if self.ignore_env {
            return Ok(manifest);
        }

        if let Ok(filter) = env::var("FERRY_LOG") {
            manifest.runtime.log_filter = filter;
        }

        if let Ok(raw) = env::var("FERRY_MAX_SEQUENCE_LEN") {
            manifest.runtime.max_sequence_len =
                raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                    field: "FERRY_MAX_SEQUENCE_LEN".to_string(),
                    reason: format!("expected an unsigned integer, got {:?}", raw),
                })?;
        }

        manifest.validate()?;
        Ok(manifest)
    }
}

impl FerryConfig {
    /// Contract section, if the manifest declares one
    pub fn contract(&self) -> Option<&ContractManifest> {
        self.manifest.contract.as_ref()
    }

    /// Runtime settings
    pub fn runtime(&self) -> &RuntimeSettings {
        &self.manifest.runtime
    }

    /// Directory the manifest was loaded from
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }
}
