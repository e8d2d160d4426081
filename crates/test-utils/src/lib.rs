//! Shared helpers for the pipewatch test suites.

pub mod builders;
pub mod fake_executor;

use std::sync::Once;
use std::time::Duration;

use tracing_subscriber::{EnvFilter, fmt};

static INIT: Once = Once::new();

/// Initialise tracing once for a test binary.
///
/// Uses `with_test_writer()`, so output is captured per-test and only shown
/// for failures (or with `-- --nocapture`). Levels come from `RUST_LOG`,
/// defaulting to `info`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Await a future, panicking if it takes longer than five seconds. Session
/// tests use this so a stuck event loop fails fast instead of hanging the
/// suite.
pub async fn with_timeout<F, T>(future: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(Duration::from_secs(5), future)
        .await
        .expect("future did not complete within 5s")
}
