//! Process startup for generated bindings

use crate::codec::CodecLimits;
use crate::contract::{Contract, NativeContract};
use ferry_config::{init_logging, FerryConfig};

/// Bring the boundary up from a loaded `ferry.toml`
///
/// Installs logging, then verifies the native library against the
/// `[contract]` table. A mismatch is raised before any data-plane call can
/// be made. Returns the decode limits configured under `[runtime]`.
#[track_caller]
pub fn start(config: &FerryConfig, native: &impl NativeContract) -> CodecLimits {
    init_logging(&config.runtime().log_filter);

    match config.contract() {
        Some(manifest) => Contract::from_manifest(manifest).verify_at_startup(native),
        None => tracing::warn!(
            root = ?config.root(),
            "no [contract] table in ferry.toml, skipping contract verification"
        ),
    }

    CodecLimits::from(config.runtime())
}
