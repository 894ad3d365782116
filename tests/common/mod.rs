//! Shared integration-test helpers.

#![allow(dead_code)]

pub use rwgate::test_utils::{init_test_logging, wait_until};

use rwgate::sync::Semaphore;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Waits until `sem` has exactly `n` queued callers.
pub fn wait_for_waiters(sem: &Semaphore, n: usize) {
    wait_until(&format!("{n} waiters queued"), || sem.waiters() == n);
}

/// Waits until `counter` reaches `n`.
pub fn wait_for_count(counter: &AtomicUsize, n: usize) {
    wait_until(&format!("counter reaches {n}"), || {
        counter.load(Ordering::SeqCst) == n
    });
}
