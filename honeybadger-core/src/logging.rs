//! Logging setup
//!
//! The library only emits `tracing` events. Hosts that already install a
//! subscriber need nothing from here; small programs and the CLI call [`init`].

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Install a stderr subscriber.
///
/// `RUST_LOG` wins over `level` when it is set. Calling this twice returns an
/// error from the second call.
pub fn init(level: &str) -> crate::error::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .try_init()
        .map_err(|e| crate::error::Error::Config(format!("failed to initialize logging: {}", e)))?;

    tracing::debug!(level = %level, "Logging initialized");
    Ok(())
}

/// Initialize logging for tests (logs to the test writer)
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .with_span_events(FmtSpan::CLOSE)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_test_is_idempotent() {
        init_test();
        init_test();
        tracing::info!("still logging");
    }
}
