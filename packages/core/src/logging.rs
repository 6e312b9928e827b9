//! Tracing setup
//!
//! The engine only emits `tracing` events; hosts decide where they go. This
//! helper installs the usual fmt subscriber for hosts (and tests) that do not
//! bring their own.

/// Install a fmt subscriber filtered by `RUST_LOG`, or `default_directive`
/// when the variable is unset
///
/// Safe to call more than once: later calls are ignored.
pub fn init_tracing(default_directive: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive)),
        )
        .with_target(false)
        .try_init();
}
