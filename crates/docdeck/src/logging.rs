//! Tracing setup for console shells embedding this crate.

use tracing_subscriber::{fmt, EnvFilter};

/// Initializes the global tracing subscriber with an `RUST_LOG`-driven
/// filter (default `info`) and bridges `log` records from dependencies
/// into tracing. Safe to call once per process; subsequent calls are
/// no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // Ignore errors - a subscriber may already be installed (tests).
    let _ = tracing_log::LogTracer::init();
    let _ = fmt().with_env_filter(filter).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_is_reentrant() {
        init_tracing();
        init_tracing();
    }
}
