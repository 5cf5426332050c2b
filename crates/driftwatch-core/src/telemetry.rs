//! Tracing initialisation for the driftwatch binary.
//!
//! Call [`init_tracing`] once at program start. Respects `RUST_LOG` for
//! fine-grained filtering; falls back to the supplied level otherwise.
//! Safe to call more than once — the global subscriber can only be set
//! once per process and later calls are ignored.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Initialise the global tracing subscriber.
///
/// * `json` — emit newline-delimited JSON log lines for aggregation.
/// * `level` — default verbosity when `RUST_LOG` is not set.
pub fn init_tracing(json: bool, level: Level) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    let output = if json {
        fmt::layer().with_target(false).json().boxed()
    } else {
        fmt::layer().with_target(false).boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(output)
        .try_init()
        .ok();
}
