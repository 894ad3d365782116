//! Reader/writer coordination built from [`Semaphore`]s.
//!
//! Two policies share one four-operation surface, [`ReaderWriterLock`]:
//!
//! | Policy | Readers | Writers | Starvation |
//! |--------|---------|---------|------------|
//! | [`ClassicalRwLock`] | shared, first reader locks the resource | exclusive | writers can starve under a steady reader stream |
//! | [`FairRwLock`] | shared, admitted through the entry gate | exclusive, admitted through the entry gate | none: arrivals pass the gate in FIFO order |
//!
//! Neither lock owns the protected data. Callers pair `enter_*` with the
//! matching `exit_*`, or use the [`read`](ReaderWriterLock::read) /
//! [`write`](ReaderWriterLock::write) guards which do it on drop.
//!
//! # Lock ordering
//!
//! Constituent semaphores are only ever taken in the order
//! entry gate → count guard → resource. Writers never touch the count guard.
//!
//! # Example
//!
//! ```
//! use rwgate::rwlock::{FairRwLock, ReaderWriterLock};
//!
//! let lock = FairRwLock::new();
//! {
//!     let _r1 = lock.read();
//!     let _r2 = lock.read();
//!     assert_eq!(lock.snapshot().active_readers, 2);
//! }
//! let _w = lock.write();
//! ```

mod classical;
mod fair;

pub use classical::ClassicalRwLock;
pub use fair::FairRwLock;

use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::sync::{CallerId, Semaphore, SemaphoreSnapshot};

/// Which reader/writer algorithm a lock runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Policy {
    /// First-reader/last-reader protocol; writers may starve.
    #[default]
    Classical,
    /// Classical protocol behind a FIFO entry gate; starvation-free.
    Fair,
}

impl Policy {
    /// Returns the lowercase policy name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Classical => "classical",
            Self::Fair => "fair",
        }
    }
}

impl std::fmt::Display for Policy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a policy name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown reader/writer policy: {0:?} (expected \"classical\" or \"fair\")")]
pub struct ParsePolicyError(pub String);

impl std::str::FromStr for Policy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "classical" | "classic" => Ok(Self::Classical),
            "fair" | "starve-free" | "starvation-free" => Ok(Self::Fair),
            _ => Err(ParsePolicyError(s.to_string())),
        }
    }
}

/// Diagnostic view of a reader/writer lock.
///
/// Each field is read separately, so a snapshot taken while participants are
/// moving can mix states. It is exact whenever the lock is quiescent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LockSnapshot {
    /// Algorithm in use.
    pub policy: Policy,
    /// Readers currently inside the critical section.
    pub active_readers: usize,
    /// Semaphore guarding the shared resource.
    pub resource: SemaphoreSnapshot,
    /// Semaphore guarding the active reader count.
    pub count_guard: SemaphoreSnapshot,
    /// Arrival-order gate; only present for [`Policy::Fair`].
    pub entry_gate: Option<SemaphoreSnapshot>,
}

impl LockSnapshot {
    /// Returns true if nobody holds or waits on any constituent semaphore.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.active_readers == 0
            && !self.resource.is_contended()
            && !self.count_guard.is_contended()
            && !self.entry_gate.is_some_and(|gate| gate.is_contended())
    }

    /// Returns true if a writer holds the resource.
    ///
    /// A first reader blocked on the resource is already counted in
    /// `active_readers`, so this reads `false` while that reader waits.
    #[must_use]
    pub fn writer_active(&self) -> bool {
        self.active_readers == 0 && self.resource.held() > 0
    }
}

/// The four-operation surface shared by every policy.
///
/// Entry operations block until access is granted; exit operations never
/// block on the resource itself. Each `exit_*` must pair with an earlier
/// `enter_*` of the same kind from the same participant. Unpaired exits are
/// not detected and corrupt the lock.
pub trait ReaderWriterLock: Send + Sync {
    /// Enters the critical section with shared access.
    fn enter_read(&self);

    /// Leaves a section entered with [`enter_read`](Self::enter_read).
    fn exit_read(&self);

    /// Enters the critical section with exclusive access.
    fn enter_write(&self);

    /// Leaves a section entered with [`enter_write`](Self::enter_write).
    fn exit_write(&self);

    /// Returns the algorithm this lock runs.
    fn policy(&self) -> Policy;

    /// Returns a diagnostic view of the lock.
    fn snapshot(&self) -> LockSnapshot;

    /// Enters for reading and returns a guard that exits on drop.
    fn read(&self) -> ReadGuard<'_, Self>
    where
        Self: Sized,
    {
        self.enter_read();
        ReadGuard { lock: self }
    }

    /// Enters for writing and returns a guard that exits on drop.
    fn write(&self) -> WriteGuard<'_, Self>
    where
        Self: Sized,
    {
        self.enter_write();
        WriteGuard { lock: self }
    }
}

/// Shared access held on a [`ReaderWriterLock`].
#[must_use = "read access is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct ReadGuard<'a, L: ReaderWriterLock + ?Sized> {
    lock: &'a L,
}

impl<L: ReaderWriterLock + ?Sized> Drop for ReadGuard<'_, L> {
    fn drop(&mut self) {
        self.lock.exit_read();
    }
}

/// Exclusive access held on a [`ReaderWriterLock`].
#[must_use = "write access is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct WriteGuard<'a, L: ReaderWriterLock + ?Sized> {
    lock: &'a L,
}

impl<L: ReaderWriterLock + ?Sized> Drop for WriteGuard<'_, L> {
    fn drop(&mut self) {
        self.lock.exit_write();
    }
}

/// The first-reader/last-reader protocol common to both policies.
///
/// `active` is only modified while `count_guard` is held; the atomic is there
/// so diagnostics can read it without taking the guard.
#[derive(Debug)]
pub(crate) struct ReaderGroup {
    count_guard: Semaphore,
    active: AtomicUsize,
    resource: Semaphore,
}

impl ReaderGroup {
    pub(crate) fn new() -> Self {
        Self {
            count_guard: Semaphore::new(1),
            active: AtomicUsize::new(0),
            resource: Semaphore::new(1),
        }
    }

    /// Registers a reader; the 0→1 transition takes the resource.
    pub(crate) fn enter(&self, caller: CallerId) {
        self.count_guard.acquire(caller);
        let previous = self.active.fetch_add(1, Ordering::Relaxed);
        if previous == 0 {
            tracing::debug!(%caller, "first reader locking resource");
            self.resource.acquire(caller);
        }
        self.count_guard.release();
    }

    /// Deregisters a reader; the 1→0 transition releases the resource.
    pub(crate) fn exit(&self, caller: CallerId) {
        self.count_guard.acquire(caller);
        let previous = self.active.fetch_sub(1, Ordering::Relaxed);
        debug_assert!(previous > 0, "exit_read without matching enter_read");
        if previous == 1 {
            tracing::debug!(%caller, "last reader releasing resource");
            self.resource.release();
        }
        self.count_guard.release();
    }

    pub(crate) fn resource(&self) -> &Semaphore {
        &self.resource
    }

    pub(crate) fn snapshot(&self, policy: Policy, entry_gate: Option<&Semaphore>) -> LockSnapshot {
        LockSnapshot {
            policy,
            active_readers: self.active.load(Ordering::Relaxed),
            resource: self.resource.snapshot(),
            count_guard: self.count_guard.snapshot(),
            entry_gate: entry_gate.map(Semaphore::snapshot),
        }
    }
}

/// A lock whose policy is picked at run time.
#[derive(Debug)]
pub enum AnyRwLock {
    /// Classical policy.
    Classical(ClassicalRwLock),
    /// Fair policy.
    Fair(FairRwLock),
}

impl AnyRwLock {
    /// Creates an idle lock running `policy`.
    #[must_use]
    pub fn new(policy: Policy) -> Self {
        match policy {
            Policy::Classical => Self::Classical(ClassicalRwLock::new()),
            Policy::Fair => Self::Fair(FairRwLock::new()),
        }
    }

    fn inner(&self) -> &dyn ReaderWriterLock {
        match self {
            Self::Classical(lock) => lock,
            Self::Fair(lock) => lock,
        }
    }
}

impl ReaderWriterLock for AnyRwLock {
    fn enter_read(&self) {
        self.inner().enter_read();
    }

    fn exit_read(&self) {
        self.inner().exit_read();
    }

    fn enter_write(&self) {
        self.inner().enter_write();
    }

    fn exit_write(&self) {
        self.inner().exit_write();
    }

    fn policy(&self) -> Policy {
        self.inner().policy()
    }

    fn snapshot(&self) -> LockSnapshot {
        self.inner().snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::init_test_logging;

    fn init_test(name: &str) {
        init_test_logging();
        crate::test_phase!(name);
    }

    #[test]
    fn policy_parses_and_displays() {
        init_test("policy_parses_and_displays");
        assert_eq!("classical".parse::<Policy>(), Ok(Policy::Classical));
        assert_eq!(" FAIR ".parse::<Policy>(), Ok(Policy::Fair));
        assert_eq!("starve-free".parse::<Policy>(), Ok(Policy::Fair));
        assert!("fifo".parse::<Policy>().is_err());
        assert_eq!(Policy::Fair.to_string(), "fair");
        assert_eq!(Policy::default(), Policy::Classical);
        crate::test_complete!("policy_parses_and_displays");
    }

    #[test]
    fn any_lock_forwards_to_selected_policy() {
        init_test("any_lock_forwards_to_selected_policy");
        for policy in [Policy::Classical, Policy::Fair] {
            let lock = AnyRwLock::new(policy);
            assert_eq!(lock.policy(), policy);
            assert_eq!(lock.snapshot().entry_gate.is_some(), policy == Policy::Fair);

            lock.enter_read();
            assert_eq!(lock.snapshot().active_readers, 1);
            lock.exit_read();

            lock.enter_write();
            assert!(lock.snapshot().writer_active());
            lock.exit_write();
            assert!(lock.snapshot().is_idle());
        }
        crate::test_complete!("any_lock_forwards_to_selected_policy");
    }

    #[test]
    fn guards_work_through_runtime_policy() {
        init_test("guards_work_through_runtime_policy");
        let lock = AnyRwLock::new(Policy::Fair);
        {
            let _a = lock.read();
            let _b = lock.read();
            assert_eq!(lock.snapshot().active_readers, 2);
        }
        {
            let _w = lock.write();
            assert!(lock.snapshot().writer_active());
        }
        assert!(lock.snapshot().is_idle());
        crate::test_complete!("guards_work_through_runtime_policy");
    }

    #[test]
    fn reader_group_locks_resource_only_on_edges() {
        init_test("reader_group_locks_resource_only_on_edges");
        let group = ReaderGroup::new();
        let me = CallerId::current();

        group.enter(me);
        assert_eq!(group.resource().count(), 0);
        group.enter(me);
        assert_eq!(group.resource().count(), 0, "second reader must not re-lock");
        group.exit(me);
        assert_eq!(group.resource().count(), 0, "resource held until last reader");
        group.exit(me);
        assert_eq!(group.resource().count(), 1);

        let snap = group.snapshot(Policy::Classical, None);
        assert!(snap.is_idle());
        crate::test_complete!("reader_group_locks_resource_only_on_edges");
    }
}
