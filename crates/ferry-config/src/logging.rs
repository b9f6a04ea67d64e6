//! Tracing subscriber installation

use std::sync::Once;
use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

/// Install a `fmt` subscriber once per process.
///
/// `FERRY_LOG` wins over `filter` when set. Later calls are no-ops, as is
/// the first call when the host already installed a global subscriber.
pub fn init_logging(filter: &str) {
    INIT.call_once(|| {
        let env_filter = EnvFilter::try_from_env("FERRY_LOG")
            .or_else(|_| EnvFilter::try_new(filter))
            .unwrap_or_else(|_| EnvFilter::new(crate::DEFAULT_LOG_FILTER));

        let _ = fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .compact()
            .try_init();
    });
}
