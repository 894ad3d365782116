//! Blocking counting semaphore with a FIFO wait queue.
//!
//! `acquire` decrements the count and, if the result is negative, enqueues the
//! caller and suspends it. `release` increments the count and, if the value
//! before the increment was negative, pops the oldest waiter and resumes it.
//! The popped waiter already owns the unit that `release` returned: it does not
//! re-check the count, so no later arrival can slip in between.
//!
//! # Invariants
//!
//! - When `count < 0`, `-count` is exactly the number of queued waiters.
//! - `count + held + queued == capacity`, where `held` is the number of callers
//!   that returned from `acquire` and have not yet released.
//! - Waiters resume strictly in the order they blocked.
//!
//! The second invariant only holds if callers never release more than they
//! acquired. Over-release is not detected; it silently raises the effective
//! capacity.
//!
//! # Example
//!
//! ```
//! use rwgate::sync::{CallerId, Semaphore};
//!
//! let sem = Semaphore::new(1);
//! sem.acquire(CallerId::current());
//! assert_eq!(sem.count(), 0);
//! sem.release();
//! assert_eq!(sem.count(), 1);
//! ```

use parking_lot::Mutex as ParkingMutex;
use serde::Serialize;
use std::cell::Cell;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use super::parker::Parker;

/// Identifies a caller in a semaphore's wait queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct CallerId(u64);

static NEXT_THREAD_CALLER: AtomicU64 = AtomicU64::new(1 << 32);

thread_local! {
    static THREAD_CALLER: Cell<Option<CallerId>> = const { Cell::new(None) };
}

impl CallerId {
    /// Creates a caller id from a raw value chosen by the caller.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the id assigned to the current thread.
    ///
    /// Ids are assigned on first use and stay stable for the thread's
    /// lifetime. They start at `2^32` so they never collide with small ids
    /// handed out explicitly through [`CallerId::new`].
    #[must_use]
    pub fn current() -> Self {
        THREAD_CALLER.with(|slot| {
            if let Some(id) = slot.get() {
                return id;
            }
            let id = Self(NEXT_THREAD_CALLER.fetch_add(1, Ordering::Relaxed));
            slot.set(Some(id));
            id
        })
    }

    /// Returns the raw id value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for CallerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "caller#{}", self.0)
    }
}

/// Point-in-time view of a semaphore, taken under its internal lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SemaphoreSnapshot {
    /// Configured initial capacity.
    pub capacity: usize,
    /// Current count; negative while callers are blocked.
    pub count: isize,
    /// Number of callers in the wait queue.
    pub waiters: usize,
}

impl SemaphoreSnapshot {
    /// Number of acquisitions granted and not yet released.
    ///
    /// Derived from `count + held + waiters == capacity`; meaningless after an
    /// over-release.
    #[must_use]
    pub fn held(&self) -> isize {
        self.capacity as isize - self.count - self.waiters as isize
    }

    /// Returns true if at least one caller holds the semaphore or waits on it.
    #[must_use]
    pub fn is_contended(&self) -> bool {
        self.count < self.capacity as isize
    }
}

#[derive(Debug)]
struct Waiter {
    caller: CallerId,
    parker: Parker,
}

#[derive(Debug)]
struct SemaphoreState {
    count: isize,
    queue: VecDeque<Waiter>,
}

/// A counting semaphore whose blocked callers resume in arrival order.
#[derive(Debug)]
pub struct Semaphore {
    state: ParkingMutex<SemaphoreState>,
    capacity: usize,
}

impl Semaphore {
    /// Creates a semaphore with `capacity` units available.
    ///
    /// A capacity of 1 gives mutual exclusion; 0 gives a pure signal that
    /// blocks every acquirer until someone releases.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` does not fit in an `isize`.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let count = isize::try_from(capacity).expect("semaphore capacity exceeds isize::MAX");
        Self {
            state: ParkingMutex::new(SemaphoreState {
                count,
                queue: VecDeque::with_capacity(4),
            }),
            capacity,
        }
    }

    /// Takes one unit, blocking the calling thread if none is available.
    ///
    /// The decrement and the decision to block happen under one lock, so two
    /// callers can never both see the last unit. Blocking is unconditional:
    /// the caller stays suspended until a matching [`release`](Self::release).
    pub fn acquire(&self, caller: CallerId) {
        let parker = {
            let mut state = self.state.lock();
            state.count -= 1;
            if state.count >= 0 {
                return;
            }
            let parker = Parker::new();
            state.queue.push_back(Waiter {
                caller,
                parker: parker.clone(),
            });
            tracing::trace!(
                %caller,
                count = state.count,
                position = state.queue.len(),
                "semaphore acquire blocked"
            );
            parker
        };
        parker.park();
        tracing::trace!(%caller, "semaphore acquire resumed");
    }

    /// Takes one unit only if it is available right now.
    ///
    /// A positive count implies an empty queue, so a successful `try_acquire`
    /// never overtakes a blocked caller.
    #[must_use]
    pub fn try_acquire(&self) -> bool {
        let mut state = self.state.lock();
        if state.count > 0 {
            state.count -= 1;
            true
        } else {
            false
        }
    }

    /// Returns one unit, resuming the oldest blocked caller if there is one.
    ///
    /// Callers must not release more units than they acquired.
    pub fn release(&self) {
        let woken = {
            let mut state = self.state.lock();
            let previous = state.count;
            state.count += 1;
            if previous < 0 {
                state.queue.pop_front()
            } else {
                None
            }
        };
        if let Some(waiter) = woken {
            tracing::trace!(caller = %waiter.caller, "semaphore release handed off");
            waiter.parker.unpark();
        }
    }

    /// Acquires one unit and returns a guard that releases it on drop.
    pub fn permit(&self, caller: CallerId) -> SemaphorePermit<'_> {
        self.acquire(caller);
        SemaphorePermit { semaphore: self }
    }

    /// Returns the configured initial capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the current count.
    #[must_use]
    pub fn count(&self) -> isize {
        self.state.lock().count
    }

    /// Returns the number of blocked callers.
    #[must_use]
    pub fn waiters(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// Returns the blocked callers, oldest first.
    #[must_use]
    pub fn waiting_callers(&self) -> Vec<CallerId> {
        self.state.lock().queue.iter().map(|w| w.caller).collect()
    }

    /// Returns count and queue length observed together.
    #[must_use]
    pub fn snapshot(&self) -> SemaphoreSnapshot {
        let state = self.state.lock();
        SemaphoreSnapshot {
            capacity: self.capacity,
            count: state.count,
            waiters: state.queue.len(),
        }
    }
}

/// A unit held on a [`Semaphore`], released when dropped.
#[must_use = "permit will be immediately released if not held"]
#[derive(Debug)]
pub struct SemaphorePermit<'a> {
    semaphore: &'a Semaphore,
}

impl SemaphorePermit<'_> {
    /// Keeps the unit taken without releasing it.
    pub fn forget(self) {
        let _ = std::mem::ManuallyDrop::new(self);
    }
}

impl Drop for SemaphorePermit<'_> {
    fn drop(&mut self) {
        self.semaphore.release();
    }
}
