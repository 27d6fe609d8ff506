//! Shared helpers for the `sitepipe` integration tests.

pub mod builders;
pub mod fake_executor;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use tracing_subscriber::fmt;

static INIT: Once = Once::new();

/// Upper bound for any single async test.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Install a test-writer subscriber once per test binary.
///
/// Uses the same `SITEPIPE_LOG` filter as the CLI, so
/// `SITEPIPE_LOG=sitepipe=debug cargo test -- --nocapture` shows pipeline logs.
pub fn init_tracing() {
    INIT.call_once(|| {
        // Another harness may already own the global subscriber.
        let _ = fmt()
            .with_env_filter(sitepipe::logging::env_filter(None))
            .with_test_writer()
            .with_target(true)
            .try_init();
    });
}

/// Run a future, panicking if it takes longer than [`TEST_TIMEOUT`].
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    tokio::time::timeout(TEST_TIMEOUT, f)
        .await
        .unwrap_or_else(|_| panic!("test timed out after {TEST_TIMEOUT:?}"))
}
