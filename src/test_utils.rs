//! Shared helpers for unit and integration tests.
//!
//! [`init_test_logging`] installs a `tracing` subscriber once per process,
//! writing through the test harness so output is captured per test. The
//! filter comes from `RUST_LOG` and defaults to `rwgate=debug`.
//!
//! The `test_phase!`, `test_section!` and `test_complete!` macros mark test
//! progress in the log.

use std::sync::Once;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// Upper bound for [`wait_until`] before the test is failed.
pub const WAIT_DEADLINE: Duration = Duration::from_secs(10);

static INIT: Once = Once::new();

/// Installs the test subscriber; later calls are no-ops.
pub fn init_test_logging() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rwgate=debug"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_thread_ids(true)
            .try_init();
    });
}

/// Polls `condition` until it holds, failing the test after [`WAIT_DEADLINE`].
///
/// Used to observe that another thread has reached a blocking point, such as
/// a semaphore queue reaching a given length, before the test proceeds.
///
/// # Panics
///
/// Panics with `what` if the condition does not hold in time.
pub fn wait_until(what: &str, mut condition: impl FnMut() -> bool) {
    let start = Instant::now();
    let mut spins = 0u32;
    while !condition() {
        assert!(
            start.elapsed() < WAIT_DEADLINE,
            "timed out after {WAIT_DEADLINE:?} waiting for: {what}"
        );
        if spins < 64 {
            std::hint::spin_loop();
            spins += 1;
        } else if spins < 128 {
            std::thread::yield_now();
            spins += 1;
        } else {
            std::thread::sleep(Duration::from_micros(200));
        }
    }
}

/// Logs the start of a test phase.
#[macro_export]
macro_rules! test_phase {
    ($name:expr) => {
        $crate::__tracing::info!(phase = %$name, "==== test phase ====");
    };
}

/// Logs the start of a section inside a test.
#[macro_export]
macro_rules! test_section {
    ($name:expr) => {
        $crate::__tracing::info!(section = %$name, "---- section ----");
    };
}

/// Logs test completion with optional `key = value` results.
#[macro_export]
macro_rules! test_complete {
    ($name:expr $(, $key:ident = $value:expr)* $(,)?) => {
        $crate::__tracing::info!(test = %$name, $($key = ?$value,)* "test complete");
    };
}
