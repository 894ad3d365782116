//! FIFO counting semaphore and reader/writer locks built on top of it.
//!
//! # Layers
//!
//! - [`sync::Semaphore`]: the only primitive. `acquire` decrements and blocks
//!   on a negative count; `release` increments and resumes the oldest blocked
//!   caller. Resumption order is arrival order.
//! - [`rwlock::ClassicalRwLock`]: shared readers and exclusive writers via the
//!   first-reader/last-reader protocol. Writers can starve.
//! - [`rwlock::FairRwLock`]: the same protocol behind a FIFO entry gate, so a
//!   waiting writer is never overtaken by readers that arrived after it.
//!
//! Both locks implement [`rwlock::ReaderWriterLock`], so callers are
//! policy-agnostic. Locks are plain values: construct one up front and hand a
//! reference (or an `Arc`) to every participant.
//!
//! Around the core sit a bounded demo driver ([`workload`]), its layered
//! configuration ([`config`]), and a CLI behind the `cli` feature.
//!
//! ```
//! use rwgate::rwlock::{ClassicalRwLock, ReaderWriterLock};
//! use std::thread;
//!
//! let lock = ClassicalRwLock::new();
//! thread::scope(|s| {
//!     for _ in 0..4 {
//!         s.spawn(|| {
//!             let _read = lock.read();
//!         });
//!     }
//!     s.spawn(|| {
//!         let _write = lock.write();
//!     });
//! });
//! assert!(lock.snapshot().is_idle());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod rwlock;
pub mod sync;
#[doc(hidden)]
pub mod test_utils;
pub mod workload;

pub use config::{ConfigError, ConfigLoader, DemoProfile, WorkloadConfig};
pub use error::{Error, Result};
pub use rwlock::{
    AnyRwLock, ClassicalRwLock, FairRwLock, LockSnapshot, Policy, ReaderWriterLock,
};
pub use sync::{CallerId, Semaphore, SemaphorePermit, SemaphoreSnapshot};
pub use workload::{Workload, WorkloadReport, run_workload};

#[doc(hidden)]
pub use tracing as __tracing;
