//! Startup contract verification
//!
//! Both sides are generated from the same interface definition. The native
//! library exports a contract version and one checksum per function, method
//! and callback; the managed side compares them against the values it was
//! built with before making any data-plane call. A mismatch means the two
//! builds are skewed and the process must not continue.

use crate::error::{BridgeFault, ContractViolation};
use ferry_config::ContractManifest;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};

/// What the native library reports about itself
pub trait NativeContract {
    fn contract_version(&self) -> u32;

    /// Checksum exported for `symbol`, if the library has one
    fn checksum(&self, symbol: &str) -> Option<u16>;
}

/// Contract the managed side was built against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contract {
    namespace: String,
    version: u32,
    checksums: BTreeMap<String, u16>,
}

impl Contract {
    pub fn new(namespace: impl Into<String>, version: u32) -> Self {
        Self {
            namespace: namespace.into(),
            version,
            checksums: BTreeMap::new(),
        }
    }

    /// Expect `symbol` to report `checksum`
    pub fn with_checksum(mut self, symbol: impl Into<String>, checksum: u16) -> Self {
        self.checksums.insert(symbol.into(), checksum);
        self
    }

    /// Build from the `[contract]` table of `ferry.toml`
    pub fn from_manifest(manifest: &ContractManifest) -> Self {
        Self {
            namespace: manifest.namespace.clone(),
            version: manifest.version,
            checksums: manifest.checksums.clone(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn checksums(&self) -> &BTreeMap<String, u16> {
        &self.checksums
    }

    /// Compare against what the native library reports
    ///
    /// Every mismatch is logged; the first one (version first, then symbols
    /// in name order) is returned.
    pub fn verify(&self, native: &impl NativeContract) -> Result<(), ContractViolation> {
        let actual = native.contract_version();
        if actual != self.version {
            tracing::error!(
                namespace = %self.namespace,
                expected = self.version,
                actual,
                "contract version mismatch"
            );
            return Err(ContractViolation::ContractVersionMismatch {
                expected: self.version,
                actual,
            });
        }

        let mut first = None;
        for (symbol, &expected) in &self.checksums {
            let violation = match native.checksum(symbol) {
                Some(actual) if actual == expected => continue,
                Some(actual) => ContractViolation::ChecksumMismatch {
                    symbol: symbol.clone(),
                    expected,
                    actual,
                },
                None => ContractViolation::MissingChecksum(symbol.clone()),
            };
            tracing::error!(namespace = %self.namespace, %violation, "checksum verification failed");
            first.get_or_insert(violation);
        }

        match first {
            Some(violation) => Err(violation),
            None => {
                tracing::debug!(
                    namespace = %self.namespace,
                    version = self.version,
                    symbols = self.checksums.len(),
                    "native contract verified"
                );
                Ok(())
            }
        }
    }

    /// Verify, raising any mismatch as a contract fault
    #[track_caller]
    pub fn verify_at_startup(&self, native: &impl NativeContract) {
        if let Err(violation) = self.verify(native) {
            BridgeFault::from(violation).raise()
        }
    }
}

/// Contract entry points resolved from a loaded native library
#[derive(Debug, Clone)]
pub struct ResolvedContract {
    version: unsafe extern "C" fn() -> u32,
    checksums: HashMap<String, unsafe extern "C" fn() -> u16>,
}

impl ResolvedContract {
    /// # Safety
    ///
    /// `version` must be safe to call at any time from any thread.
    pub unsafe fn new(version: unsafe extern "C" fn() -> u32) -> Self {
        Self {
            version,
            checksums: HashMap::new(),
        }
    }

    /// # Safety
    ///
    /// `checksum` must be safe to call at any time from any thread.
    pub unsafe fn with_checksum_fn(
        mut self,
        symbol: impl Into<String>,
        checksum: unsafe extern "C" fn() -> u16,
    ) -> Self {
        self.checksums.insert(symbol.into(), checksum);
        self
    }
}

impl NativeContract for ResolvedContract {
    fn contract_version(&self) -> u32 {
        // Safety: guaranteed by `new`
        unsafe { (self.version)() }
    }

    fn checksum(&self, symbol: &str) -> Option<u16> {
        // Safety: guaranteed by `with_checksum_fn`
        self.checksums.get(symbol).map(|f| unsafe { f() })
    }
}

/// Fingerprint of an interface signature
///
/// SHA-256 of the signature text, folded to 16 bits by XOR of its
/// big-endian 16-bit words. Native libraries written in Rust export these
/// from the same signature text the managed bindings embed.
pub fn checksum(signature: &str) -> u16 {
    Sha256::digest(signature.as_bytes())
        .chunks_exact(2)
        .fold(0, |acc, word| acc ^ u16::from_be_bytes([word[0], word[1]]))
}
