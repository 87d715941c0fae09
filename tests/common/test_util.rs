//! Shared helpers for testkit integration tests

use std::sync::{Mutex, MutexGuard, OnceLock};

static CAPTURE_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

/// Serializes tests that redirect the process-wide console sinks.
pub fn capture_lock() -> MutexGuard<'static, ()> {
    CAPTURE_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|e| e.into_inner())
}

/// Installs the diagnostic subscriber once per test binary.
pub fn init_tracing() {
    static TRACING: OnceLock<()> = OnceLock::new();
    TRACING.get_or_init(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::from_default_env()
                    .add_directive(tracing::Level::INFO.into()),
            )
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init();
    });
}
