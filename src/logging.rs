//! Tracing subscriber setup
//!
//! The library only emits `tracing` events. Embedding applications that have
//! no subscriber of their own can call [`init`] once at startup.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable holding the log filter, e.g. `ZYNC_LOG=zync=debug`
pub const LOG_ENV_VAR: &str = "ZYNC_LOG";

/// Filter used when `ZYNC_LOG` is unset
pub const DEFAULT_FILTER: &str = "info";

/// Install a global `fmt` subscriber filtered by `ZYNC_LOG`.
///
/// Returns false if a global subscriber was already installed.
pub fn init() -> bool {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    install(filter)
}

/// Install a global `fmt` subscriber with an explicit filter directive.
pub fn init_with_filter(directives: &str) -> bool {
    let filter = EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    install(filter)
}

fn install(filter: EnvFilter) -> bool {
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .try_init()
        .is_ok()
}
