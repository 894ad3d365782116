//! Bounded reader/writer workload driver.
//!
//! Runs a fixed number of reader and writer participants against any
//! [`ReaderWriterLock`], each doing `iterations` cycles of
//! entry → critical section → exit → remainder. Every critical-section entry
//! and exit is reported to a [`CriticalSectionMonitor`], which counts
//! exclusion violations as they happen.
//!
//! # Example
//!
//! ```
//! use rwgate::config::DemoProfile;
//! use rwgate::workload::run_workload;
//!
//! let mut config = DemoProfile::Fair.to_config();
//! config.iterations = 10;
//! let report = run_workload(&config).expect("workload");
//! assert!(report.is_clean());
//! assert_eq!(report.writes, 50);
//! ```

use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crate::config::WorkloadConfig;
use crate::error::{Error, Result};
use crate::rwlock::{AnyRwLock, Policy, ReaderWriterLock};

/// Kind of participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Shared access.
    Reader,
    /// Exclusive access.
    Writer,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reader => f.write_str("reader"),
            Self::Writer => f.write_str("writer"),
        }
    }
}

/// Observes who is inside the critical section.
///
/// Participants call `enter_*` right after the lock admits them and `exit_*`
/// right before they leave it. Occupancy counters use sequentially consistent
/// operations, so of two overlapping entries at least one sees the other.
#[derive(Debug, Default)]
pub struct CriticalSectionMonitor {
    readers_inside: AtomicUsize,
    writers_inside: AtomicUsize,
    max_readers: AtomicUsize,
    violations: AtomicUsize,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl CriticalSectionMonitor {
    /// Creates an empty monitor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a reader entering.
    pub fn enter_read(&self) {
        let inside = self.readers_inside.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_readers.fetch_max(inside, Ordering::Relaxed);
        self.reads.fetch_add(1, Ordering::Relaxed);
        if self.writers_inside.load(Ordering::SeqCst) > 0 {
            self.violation("reader entered while a writer is inside");
        }
    }

    /// Records a reader leaving.
    pub fn exit_read(&self) {
        self.readers_inside.fetch_sub(1, Ordering::SeqCst);
    }

    /// Records a writer entering.
    pub fn enter_write(&self) {
        let writers = self.writers_inside.fetch_add(1, Ordering::SeqCst) + 1;
        self.writes.fetch_add(1, Ordering::Relaxed);
        if writers > 1 {
            self.violation("two writers inside");
        }
        if self.readers_inside.load(Ordering::SeqCst) > 0 {
            self.violation("writer entered while readers are inside");
        }
    }

    /// Records a writer leaving.
    pub fn exit_write(&self) {
        self.writers_inside.fetch_sub(1, Ordering::SeqCst);
    }

    fn violation(&self, what: &'static str) {
        self.violations.fetch_add(1, Ordering::SeqCst);
        tracing::error!(
            readers = self.readers_inside.load(Ordering::SeqCst),
            writers = self.writers_inside.load(Ordering::SeqCst),
            "mutual exclusion violated: {what}"
        );
    }

    /// Exclusion violations seen so far.
    #[must_use]
    pub fn violations(&self) -> usize {
        self.violations.load(Ordering::SeqCst)
    }

    /// Largest number of readers seen inside at once.
    #[must_use]
    pub fn max_concurrent_readers(&self) -> usize {
        self.max_readers.load(Ordering::Relaxed)
    }

    /// Completed reader admissions.
    #[must_use]
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    /// Completed writer admissions.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }
}

/// Outcome of a workload run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkloadReport {
    /// Lock policy that was exercised.
    pub policy: Policy,
    /// Reader participants.
    pub readers: usize,
    /// Writer participants.
    pub writers: usize,
    /// Cycles per participant.
    pub iterations: usize,
    /// Total reader admissions.
    pub reads: usize,
    /// Total writer admissions.
    pub writes: usize,
    /// Largest number of readers inside at once.
    pub max_concurrent_readers: usize,
    /// Exclusion violations observed; zero for a correct lock.
    pub violations: usize,
    /// Longest time a reader waited in `enter_read`, in microseconds.
    pub max_read_wait_us: u64,
    /// Longest time a writer waited in `enter_write`, in microseconds.
    pub max_write_wait_us: u64,
    /// Wall-clock duration of the run, in milliseconds.
    pub elapsed_ms: u64,
}

impl WorkloadReport {
    /// Returns true if no exclusion violation was observed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.violations == 0
    }
}

impl std::fmt::Display for WorkloadReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "policy: {}  readers: {}  writers: {}  iterations: {}",
            self.policy, self.readers, self.writers, self.iterations
        )?;
        writeln!(
            f,
            "reads: {}  writes: {}  max concurrent readers: {}",
            self.reads, self.writes, self.max_concurrent_readers
        )?;
        writeln!(
            f,
            "max wait: read {}us  write {}us",
            self.max_read_wait_us, self.max_write_wait_us
        )?;
        write!(
            f,
            "violations: {}  elapsed: {}ms",
            self.violations, self.elapsed_ms
        )
    }
}

/// A configured workload bound to a lock.
#[derive(Debug)]
pub struct Workload<'a, L: ReaderWriterLock + ?Sized> {
    lock: &'a L,
    config: &'a WorkloadConfig,
    monitor: CriticalSectionMonitor,
    max_read_wait_us: AtomicU64,
    max_write_wait_us: AtomicU64,
}

impl<'a, L: ReaderWriterLock + ?Sized> Workload<'a, L> {
    /// Binds `config` to `lock`.
    ///
    /// `config.policy` is informational here; the lock decides the policy.
    #[must_use]
    pub fn new(lock: &'a L, config: &'a WorkloadConfig) -> Self {
        Self {
            lock,
            config,
            monitor: CriticalSectionMonitor::new(),
            max_read_wait_us: AtomicU64::new(0),
            max_write_wait_us: AtomicU64::new(0),
        }
    }

    /// Runs every participant to completion and reports what happened.
    pub fn run(&self) -> Result<WorkloadReport> {
        self.config.validate()?;
        tracing::info!(
            policy = %self.lock.policy(),
            readers = self.config.readers,
            writers = self.config.writers,
            iterations = self.config.iterations,
            "workload starting"
        );
        let start = Instant::now();

        thread::scope(|scope| {
            let mut handles = Vec::with_capacity(self.config.participants());
            let participants = (1..=self.config.readers)
                .map(|id| (Role::Reader, id))
                .chain((1..=self.config.writers).map(|id| (Role::Writer, id)));
            for (role, id) in participants {
                let handle = thread::Builder::new()
                    .name(format!("{role}-{id}"))
                    .spawn_scoped(scope, move || match role {
                        Role::Reader => self.reader(id),
                        Role::Writer => self.writer(id),
                    })
                    .map_err(|source| Error::Spawn { role, id, source })?;
                handles.push((role, id, handle));
            }
            for (role, id, handle) in handles {
                handle
                    .join()
                    .map_err(|_| Error::ParticipantPanicked { role, id })?;
            }
            Ok::<_, Error>(())
        })?;

        let report = WorkloadReport {
            policy: self.lock.policy(),
            readers: self.config.readers,
            writers: self.config.writers,
            iterations: self.config.iterations,
            reads: self.monitor.reads(),
            writes: self.monitor.writes(),
            max_concurrent_readers: self.monitor.max_concurrent_readers(),
            violations: self.monitor.violations(),
            max_read_wait_us: self.max_read_wait_us.load(Ordering::Relaxed),
            max_write_wait_us: self.max_write_wait_us.load(Ordering::Relaxed),
            elapsed_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
        };
        tracing::info!(
            reads = report.reads,
            writes = report.writes,
            violations = report.violations,
            elapsed_ms = report.elapsed_ms,
            "workload finished"
        );
        Ok(report)
    }

    /// The monitor observing this workload.
    #[must_use]
    pub fn monitor(&self) -> &CriticalSectionMonitor {
        &self.monitor
    }

    fn reader(&self, id: usize) {
        for _ in 0..self.config.iterations {
            let waited = Instant::now();
            self.lock.enter_read();
            record_wait(&self.max_read_wait_us, waited);

            self.monitor.enter_read();
            tracing::info!(reader = id, "reader is reading");
            pause(self.config.read_hold);
            self.monitor.exit_read();

            self.lock.exit_read();
            tracing::info!(reader = id, "reader finished reading");
            pause(self.config.remainder);
        }
    }

    fn writer(&self, id: usize) {
        for _ in 0..self.config.iterations {
            let waited = Instant::now();
            self.lock.enter_write();
            record_wait(&self.max_write_wait_us, waited);

            self.monitor.enter_write();
            tracing::info!(writer = id, "writer is writing");
            pause(self.config.write_hold);
            self.monitor.exit_write();

            self.lock.exit_write();
            tracing::info!(writer = id, "writer finished writing");
            pause(self.config.remainder);
        }
    }
}

fn record_wait(max_us: &AtomicU64, since: Instant) {
    let waited = u64::try_from(since.elapsed().as_micros()).unwrap_or(u64::MAX);
    max_us.fetch_max(waited, Ordering::Relaxed);
}

fn pause(duration: Duration) {
    if duration.is_zero() {
        thread::yield_now();
    } else {
        thread::sleep(duration);
    }
}

/// Builds a lock for `config.policy` and runs the workload on it.
pub fn run_workload(config: &WorkloadConfig) -> Result<WorkloadReport> {
    config.validate()?;
    let lock = AnyRwLock::new(config.policy);
    let report = Workload::new(&lock, config).run()?;
    debug_assert!(lock.snapshot().is_idle(), "lock left busy after workload");
    Ok(report)
}
