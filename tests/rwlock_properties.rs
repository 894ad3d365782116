//! E2E: reader/writer lock properties for both policies.
//!
//! Mutual exclusion, shared read access, entry/exit pairing, and the
//! starvation contrast between the classical and fair policies.

mod common;

use parking_lot::Mutex;
use rwgate::config::WorkloadConfig;
use rwgate::rwlock::{ClassicalRwLock, FairRwLock, Policy, ReaderWriterLock};
use rwgate::workload::Workload;
use rwgate::{test_complete, test_phase, test_section};
use std::sync::Barrier;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

fn stress_config(policy: Policy) -> WorkloadConfig {
    WorkloadConfig {
        policy,
        readers: 6,
        writers: 3,
        iterations: 150,
        read_hold: Duration::ZERO,
        write_hold: Duration::ZERO,
        remainder: Duration::ZERO,
    }
}

// =========================================================================
// Mutual exclusion
// =========================================================================

fn assert_mutual_exclusion<L: ReaderWriterLock>(lock: &L) {
    let config = stress_config(lock.policy());
    let report = Workload::new(lock, &config).run().expect("workload failed");
    assert!(report.is_clean(), "exclusion violated:\n{report}");
    assert_eq!(report.reads, 6 * 150);
    assert_eq!(report.writes, 3 * 150);
    assert!(lock.snapshot().is_idle(), "lock busy after workload");
}

#[test]
fn e2e_classical_mutual_exclusion() {
    common::init_test_logging();
    test_phase!("Classical mutual exclusion under load");
    assert_mutual_exclusion(&ClassicalRwLock::new());
    test_complete!("e2e_classical_mutual_exclusion");
}

#[test]
fn e2e_fair_mutual_exclusion() {
    common::init_test_logging();
    test_phase!("Fair mutual exclusion under load");
    assert_mutual_exclusion(&FairRwLock::new());
    test_complete!("e2e_fair_mutual_exclusion");
}

// =========================================================================
// Shared read access
// =========================================================================

fn assert_readers_overlap<L: ReaderWriterLock>(lock: &L) {
    const READERS: usize = 8;
    let all_inside = Barrier::new(READERS);
    let entered = AtomicUsize::new(0);

    // Every reader waits at the barrier while inside; the barrier only opens
    // if all of them are admitted at the same time.
    thread::scope(|s| {
        for _ in 0..READERS {
            s.spawn(|| {
                let _read = lock.read();
                entered.fetch_add(1, Ordering::SeqCst);
                all_inside.wait();
            });
        }
    });

    assert_eq!(entered.load(Ordering::SeqCst), READERS);
    assert!(lock.snapshot().is_idle());
}

#[test]
fn e2e_readers_share_critical_section() {
    common::init_test_logging();
    test_phase!("Readers share the critical section");

    test_section!("Classical");
    assert_readers_overlap(&ClassicalRwLock::new());
    test_section!("Fair");
    assert_readers_overlap(&FairRwLock::new());

    test_complete!("e2e_readers_share_critical_section");
}

// =========================================================================
// Entry/exit pairing
// =========================================================================

fn assert_pairs_leave_lock_idle<L: ReaderWriterLock>(lock: &L) {
    const PAIRS: usize = 100;
    let start = Barrier::new(PAIRS);

    thread::scope(|s| {
        for _ in 0..PAIRS {
            s.spawn(|| {
                start.wait();
                lock.enter_read();
                lock.exit_read();
            });
        }
    });

    let snap = lock.snapshot();
    assert_eq!(snap.active_readers, 0);
    assert_eq!(snap.resource.count, 1, "resource left held");
    assert_eq!(snap.resource.waiters, 0);
    assert!(snap.is_idle(), "{snap:?}");

    // The lock must still admit a writer afterwards.
    lock.enter_write();
    lock.exit_write();
}

#[test]
fn e2e_concurrent_enter_exit_pairs_leave_lock_idle() {
    common::init_test_logging();
    test_phase!("100 concurrent enter/exit pairs");

    test_section!("Classical");
    assert_pairs_leave_lock_idle(&ClassicalRwLock::new());
    test_section!("Fair");
    assert_pairs_leave_lock_idle(&FairRwLock::new());

    test_complete!("e2e_concurrent_enter_exit_pairs_leave_lock_idle");
}

// =========================================================================
// Starvation contrast
// =========================================================================

/// Readers hand the lock to each other so the reader count never drops to
/// zero. Under the classical policy every admission succeeds while the writer
/// stays queued on the resource.
#[test]
fn e2e_classical_writer_delayed_by_overlapping_readers() {
    common::init_test_logging();
    test_phase!("Classical writer starvation");

    const RELAYS: usize = 25;
    let lock = ClassicalRwLock::new();
    let writer_in = AtomicBool::new(false);

    lock.enter_read();
    thread::scope(|s| {
        s.spawn(|| {
            lock.enter_write();
            writer_in.store(true, Ordering::SeqCst);
            lock.exit_write();
        });
        common::wait_until("writer queued on resource", || {
            lock.snapshot().resource.waiters == 1
        });

        test_section!("Relay readers past the waiting writer");
        for relay in 0..RELAYS {
            // The next reader enters on another thread before the current one
            // leaves, so the count goes 1 -> 2 -> 1 and never reaches 0.
            thread::scope(|inner| {
                inner.spawn(|| lock.enter_read());
            });
            lock.exit_read();
            assert!(
                !writer_in.load(Ordering::SeqCst),
                "writer admitted after {relay} relays"
            );
            assert_eq!(lock.snapshot().resource.waiters, 1);
        }

        test_section!("Stop the stream");
        lock.exit_read();
    });

    assert!(writer_in.load(Ordering::SeqCst));
    assert!(lock.snapshot().is_idle());
    test_complete!("e2e_classical_writer_delayed_by_overlapping_readers", relays = RELAYS);
}

/// The same relay pattern against the fair lock: the first relay reader
/// queues behind the writer on the entry gate, so the writer gets in as soon
/// as the readers already inside leave.
#[test]
fn e2e_fair_writer_admitted_before_later_readers() {
    common::init_test_logging();
    test_phase!("Fair writer is not starved");

    const LATE_READERS: usize = 5;
    let lock = FairRwLock::new();
    let log = Mutex::new(Vec::new());
    let late_admitted = AtomicUsize::new(0);

    lock.enter_read();
    thread::scope(|s| {
        s.spawn(|| {
            lock.enter_write();
            log.lock().push("writer");
            lock.exit_write();
        });
        common::wait_until("writer waits on resource holding the gate", || {
            let snap = lock.snapshot();
            snap.resource.waiters == 1 && snap.entry_gate.is_some_and(|g| g.count == 0)
        });

        test_section!("Readers arriving after the writer");
        for _ in 0..LATE_READERS {
            s.spawn(|| {
                lock.enter_read();
                late_admitted.fetch_add(1, Ordering::SeqCst);
                log.lock().push("reader");
                lock.exit_read();
            });
        }
        common::wait_until("late readers queued on gate", || {
            lock.snapshot().entry_gate.is_some_and(|g| g.waiters == LATE_READERS)
        });
        assert_eq!(
            late_admitted.load(Ordering::SeqCst),
            0,
            "no reader may overtake the waiting writer"
        );

        test_section!("Drain the reader already inside");
        lock.exit_read();
    });

    let log = log.lock();
    assert_eq!(log.first(), Some(&"writer"), "order: {log:?}");
    assert_eq!(log.len(), LATE_READERS + 1);
    assert!(lock.snapshot().is_idle());
    test_complete!("e2e_fair_writer_admitted_before_later_readers", order = *log);
}

/// Continuous reader pressure on the fair lock: readers loop until the writer
/// finishes all of its writes, so the test only terminates if the writer
/// keeps getting through.
#[test]
fn e2e_fair_writer_progresses_under_continuous_reads() {
    common::init_test_logging();
    test_phase!("Fair writer progress under continuous reads");

    const READERS: usize = 4;
    const WRITES: usize = 20;
    let lock = FairRwLock::new();
    let writes_done = AtomicBool::new(false);
    let reads = AtomicUsize::new(0);

    thread::scope(|s| {
        for _ in 0..READERS {
            s.spawn(|| {
                while !writes_done.load(Ordering::SeqCst) {
                    let _read = lock.read();
                    reads.fetch_add(1, Ordering::Relaxed);
                    thread::yield_now();
                }
            });
        }
        s.spawn(|| {
            // Make sure the reader stream is running before writing.
            common::wait_until("readers running", || reads.load(Ordering::Relaxed) > 0);
            for _ in 0..WRITES {
                let _write = lock.write();
            }
            writes_done.store(true, Ordering::SeqCst);
        });
    });

    assert!(writes_done.load(Ordering::SeqCst));
    assert!(lock.snapshot().is_idle());
    test_complete!(
        "e2e_fair_writer_progresses_under_continuous_reads",
        reads = reads.load(Ordering::Relaxed)
    );
}
