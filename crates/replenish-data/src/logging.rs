//! Tracing setup for hosts embedding the tracker.
//!
//! Every core component logs under its own target (`tracker`, `ledger`,
//! `exchange`, `disposal`, `magazine`, `consumer`), so `RUST_LOG` can pick
//! them apart, e.g. `RUST_LOG=tracker=info,exchange=debug`.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info";

/// Build the filter from `RUST_LOG`, falling back to `default_filter`.
pub fn env_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}

/// Install a global fmt subscriber. Returns `false` if one was already set.
pub fn init_tracing(default_filter: &str) -> bool {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter(default_filter))
        .with(fmt_layer)
        .try_init()
        .is_ok()
}
