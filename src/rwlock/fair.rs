//! Starvation-free reader/writer lock.
//!
//! Every participant, reader or writer, first passes a single-slot entry gate.
//! The gate is held only through the entry decision:
//!
//! - a reader holds it while it registers in the reader count (and, for the
//!   first reader, while it takes the resource);
//! - a writer holds it while it takes the resource.
//!
//! A writer that finds readers inside therefore blocks on the resource *while
//! holding the gate*. Readers arriving after it queue on the gate behind it,
//! and because the gate resumes callers in FIFO order none of them can get in
//! before the writer. The readers that overtake a waiting writer are bounded
//! by those already past the gate when it arrived.
//!
//! Exit paths are the same as in the classical lock.

use super::{LockSnapshot, Policy, ReaderGroup, ReaderWriterLock};
use crate::sync::{CallerId, Semaphore};

/// Reader/writer lock that admits readers and writers in arrival order.
#[derive(Debug)]
pub struct FairRwLock {
    entry_gate: Semaphore,
    readers: ReaderGroup,
}

impl FairRwLock {
    /// Creates an idle lock.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entry_gate: Semaphore::new(1),
            readers: ReaderGroup::new(),
        }
    }
}

impl Default for FairRwLock {
    fn default() -> Self {
        Self::new()
    }
}

impl ReaderWriterLock for FairRwLock {
    fn enter_read(&self) {
        let caller = CallerId::current();
        self.entry_gate.acquire(caller);
        self.readers.enter(caller);
        self.entry_gate.release();
    }

    fn exit_read(&self) {
        self.readers.exit(CallerId::current());
    }

    fn enter_write(&self) {
        let caller = CallerId::current();
        self.entry_gate.acquire(caller);
        self.readers.resource().acquire(caller);
        tracing::debug!(%caller, "writer admitted, opening entry gate");
        self.entry_gate.release();
    }

    fn exit_write(&self) {
        self.readers.resource().release();
    }

    fn policy(&self) -> Policy {
        Policy::Fair
    }

    fn snapshot(&self) -> LockSnapshot {
        self.readers.snapshot(Policy::Fair, Some(&self.entry_gate))
    }
}
