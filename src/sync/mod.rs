//! Blocking synchronization primitives.
//!
//! - [`Semaphore`]: counting semaphore whose blocked callers resume in FIFO
//!   order, with an RAII [`SemaphorePermit`] for scoped use.
//!
//! Blocking is implemented with a per-waiter park token rather than a shared
//! condition variable. A broadcast-style wakeup cannot say *which* thread
//! proceeds; the explicit token queue can.

mod parker;
mod semaphore;

pub use semaphore::{CallerId, Semaphore, SemaphorePermit, SemaphoreSnapshot};
