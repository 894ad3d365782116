//! One-shot park/unpark token for blocked semaphore callers.
//!
//! Each caller that has to block inside [`Semaphore::acquire`] gets its own
//! [`Parker`]. The semaphore keeps a clone in its FIFO queue and the caller
//! parks on the other one. A later `release` pops the queue head and unparks
//! exactly that caller, so the order of resumption is the order of the queue
//! and never depends on which thread the OS scheduler happens to wake.
//!
//! The notification is a permit: if `unpark` runs before the blocked thread
//! reaches `park`, the permit is consumed on entry and `park` returns
//! immediately. No wakeup is lost in that window.
//!
//! [`Semaphore::acquire`]: super::Semaphore::acquire

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[derive(Debug)]
struct ParkerInner {
    notified: AtomicBool,
    waiting: AtomicUsize,
    mutex: Mutex<()>,
    cvar: Condvar,
}

/// A handle used to suspend one caller and resume it from another thread.
#[derive(Debug, Clone)]
pub(crate) struct Parker {
    inner: Arc<ParkerInner>,
}

impl Parker {
    /// Creates a new, un-notified parker.
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            inner: Arc::new(ParkerInner {
                notified: AtomicBool::new(false),
                waiting: AtomicUsize::new(0),
                mutex: Mutex::new(()),
                cvar: Condvar::new(),
            }),
        }
    }

    #[inline]
    fn consume_permit(&self) -> bool {
        self.inner
            .notified
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Blocks the current thread until [`unpark`](Self::unpark) is called.
    ///
    /// Spurious condvar wakeups are absorbed; this only returns once the
    /// permit has actually been published.
    pub(crate) fn park(&self) {
        if self.consume_permit() {
            return;
        }

        self.inner.waiting.fetch_add(1, Ordering::SeqCst);
        let mut guard = self.inner.mutex.lock();
        while !self.consume_permit() {
            self.inner.cvar.wait(&mut guard);
        }
        self.inner.waiting.fetch_sub(1, Ordering::SeqCst);
        drop(guard);
    }

    /// Publishes the wakeup permit and signals the parked thread, if any.
    pub(crate) fn unpark(&self) {
        if self
            .inner
            .notified
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            // Already notified; the next park() fast path will see it.
            return;
        }
        if self.inner.waiting.load(Ordering::SeqCst) == 0 {
            return;
        }
        // The mutex must be taken before notify_one, otherwise a thread that
        // checked the permit but has not yet waited could miss the signal.
        let _guard = self.inner.mutex.lock();
        self.inner.cvar.notify_one();
    }

    /// Returns true if a permit is published and not yet consumed.
    #[cfg(test)]
    pub(crate) fn is_notified(&self) -> bool {
        self.inner.notified.load(Ordering::Acquire)
    }
}
