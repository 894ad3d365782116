//! Classical (reader-preferring) reader/writer lock.
//!
//! Readers coordinate through a reader count: the first reader in takes the
//! resource semaphore on behalf of the whole group and the last reader out
//! returns it. Writers take the resource semaphore directly and never look at
//! the reader count.
//!
//! # Writer starvation
//!
//! While at least one reader is inside, new readers only touch the count and
//! walk straight in. If reader arrivals overlap so the count never returns to
//! zero, the resource is never released and a waiting writer is delayed
//! without bound. This is the expected behavior of the policy; use
//! [`FairRwLock`](super::FairRwLock) when writers must make progress.

use super::{LockSnapshot, Policy, ReaderGroup, ReaderWriterLock};
use crate::sync::CallerId;

/// Reader/writer lock using the classical first-reader/last-reader protocol.
#[derive(Debug)]
pub struct ClassicalRwLock {
    readers: ReaderGroup,
}

impl ClassicalRwLock {
    /// Creates an idle lock.
    #[must_use]
    pub fn new() -> Self {
        Self {
            readers: ReaderGroup::new(),
        }
    }
}

impl Default for ClassicalRwLock {
    fn default() -> Self {
        Self::new()
    }
}

impl ReaderWriterLock for ClassicalRwLock {
    fn enter_read(&self) {
        self.readers.enter(CallerId::current());
    }

    fn exit_read(&self) {
        self.readers.exit(CallerId::current());
    }

    fn enter_write(&self) {
        self.readers.resource().acquire(CallerId::current());
    }

    fn exit_write(&self) {
        self.readers.resource().release();
    }

    fn policy(&self) -> Policy {
        Policy::Classical
    }

    fn snapshot(&self) -> LockSnapshot {
        self.readers.snapshot(Policy::Classical, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{init_test_logging, wait_until};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    fn init_test(name: &str) {
        init_test_logging();
        crate::test_phase!(name);
    }

    #[test]
    fn readers_share_the_resource() {
        init_test("readers_share_the_resource");
        let lock = ClassicalRwLock::new();
        lock.enter_read();
        lock.enter_read();
        lock.enter_read();

        let snap = lock.snapshot();
        assert_eq!(snap.active_readers, 3);
        assert_eq!(snap.resource.count, 0, "group holds exactly one unit");
        assert_eq!(snap.entry_gate, None);

        for _ in 0..3 {
            lock.exit_read();
        }
        assert!(lock.snapshot().is_idle());
        crate::test_complete!("readers_share_the_resource");
    }

    #[test]
    fn writer_waits_for_readers_to_drain() {
        init_test("writer_waits_for_readers_to_drain");
        let lock = ClassicalRwLock::new();
        let wrote = AtomicBool::new(false);

        lock.enter_read();
        thread::scope(|s| {
            s.spawn(|| {
                let _w = lock.write();
                wrote.store(true, Ordering::SeqCst);
            });

            wait_until("writer queued on resource", || {
                lock.snapshot().resource.waiters == 1
            });
            assert!(!wrote.load(Ordering::SeqCst));
            lock.exit_read();
        });

        assert!(wrote.load(Ordering::SeqCst));
        assert!(lock.snapshot().is_idle());
        crate::test_complete!("writer_waits_for_readers_to_drain");
    }

    #[test]
    fn first_reader_waits_for_writer() {
        init_test("first_reader_waits_for_writer");
        let lock = ClassicalRwLock::new();
        let read = AtomicBool::new(false);

        lock.enter_write();
        thread::scope(|s| {
            s.spawn(|| {
                let _r = lock.read();
                read.store(true, Ordering::SeqCst);
            });

            // The first reader blocks on the resource while holding the
            // count guard.
            wait_until("reader queued on resource", || {
                lock.snapshot().resource.waiters == 1
            });
            let snap = lock.snapshot();
            assert_eq!(snap.active_readers, 1);
            assert_eq!(snap.count_guard.count, 0);
            assert!(!read.load(Ordering::SeqCst));
            lock.exit_write();
        });

        assert!(read.load(Ordering::SeqCst));
        assert!(lock.snapshot().is_idle());
        crate::test_complete!("first_reader_waits_for_writer");
    }

    #[test]
    fn writers_exclude_each_other() {
        init_test("writers_exclude_each_other");
        let lock = ClassicalRwLock::new();
        let second_in = AtomicBool::new(false);

        lock.enter_write();
        thread::scope(|s| {
            s.spawn(|| {
                lock.enter_write();
                second_in.store(true, Ordering::SeqCst);
                lock.exit_write();
            });
            wait_until("second writer queued", || {
                lock.snapshot().resource.waiters == 1
            });
            assert!(!second_in.load(Ordering::SeqCst));
            lock.exit_write();
        });

        assert!(second_in.load(Ordering::SeqCst));
        crate::test_complete!("writers_exclude_each_other");
    }
}
