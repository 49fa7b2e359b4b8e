use tracing_subscriber::{fmt, EnvFilter};

/// Installs a process-wide `tracing` subscriber honoring `RUST_LOG`,
/// falling back to the configured `log_level`. Idempotent: a second call
/// after the global subscriber is already set is a silent no-op via
/// `try_init`.
pub fn init_tracing(default_level: &str) {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| default_level.to_string());
    let _ = fmt()
        .with_env_filter(EnvFilter::try_new(&filter).unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init();
}
