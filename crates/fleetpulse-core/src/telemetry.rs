//! Tracing setup for the reconciliation binary.
//!
//! The cron deployment runs with JSON lines on so transition events
//! land in the log pipeline as diffable records; interactive use gets
//! the plain formatter.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global tracing subscriber.
///
/// `level` is the default verbosity; `RUST_LOG` overrides it when set.
/// The global subscriber can only be installed once per process, so
/// repeated calls are no-ops.
pub fn init_tracing(json: bool, level: Level) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    let registry = tracing_subscriber::registry().with(env_filter);

    let layer = fmt::layer().with_target(false);
    if json {
        registry.with(layer.json()).try_init().ok();
    } else {
        registry.with(layer).try_init().ok();
    }
}
