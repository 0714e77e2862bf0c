//! A single shared account balance.
//!
//! Writers apply signed deltas with a read, compute, write sequence; readers
//! take point-in-time snapshots. [`RegisterPolicy`] picks how the two are kept
//! apart, from not at all to a readers-preference or task-fair scheme.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_derive::{Deserialize, Serialize};

use crate::jitter::Jitter;

mod readers_preference;
mod task_fair;
mod unsync;

pub use readers_preference::ReadersPreferenceRegister;
pub use task_fair::TaskFairRegister;
pub use unsync::UnsyncRegister;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegisterPolicy {
    Unsynchronized,
    /// Readers share the register and lock writers out for as long as any
    /// reader is inside. Writers can starve.
    ReadersPreference,
    /// Queued writers hold back new readers, so neither side starves.
    TaskFair,
}

impl RegisterPolicy {
    #[inline]
    pub fn is_synchronized(&self) -> bool {
        !matches!(self, RegisterPolicy::Unsynchronized)
    }
}

impl fmt::Display for RegisterPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegisterPolicy::Unsynchronized => write!(f, "NO SYNC"),
            RegisterPolicy::ReadersPreference => write!(f, "SYNC, readers-preference"),
            RegisterPolicy::TaskFair => write!(f, "SYNC, task-fair"),
        }
    }
}

pub trait BalanceRegister: Send + Sync {
    fn policy(&self) -> RegisterPolicy;

    /// Adds `delta` to the balance and returns the value written.
    fn apply_delta(&self, delta: i64, jitter: &mut Jitter) -> i64;

    /// Reads the balance as a reader would.
    fn snapshot(&self, jitter: &mut Jitter) -> i64;

    /// Reads the balance outside of any reader protocol. Only meaningful once
    /// every worker has finished.
    fn balance(&self) -> i64;
}

pub fn build(
    policy: RegisterPolicy,
    initial: i64,
    observer: Arc<dyn AccessObserver>,
) -> Arc<dyn BalanceRegister> {
    match policy {
        RegisterPolicy::Unsynchronized => Arc::new(UnsyncRegister::with_observer(initial, observer)),
        RegisterPolicy::ReadersPreference => {
            Arc::new(ReadersPreferenceRegister::with_observer(initial, observer))
        }
        RegisterPolicy::TaskFair => Arc::new(TaskFairRegister::with_observer(initial, observer)),
    }
}

/// Told whenever a reader or writer enters or leaves the critical section of
/// a register. Calls are made from inside the section.
pub trait AccessObserver: Send + Sync {
    fn reader_entered(&self) {}
    fn reader_left(&self) {}
    fn writer_entered(&self) {}
    fn writer_left(&self) {}
}

pub struct NoopObserver;

impl AccessObserver for NoopObserver {}

/// Counts entries that broke reader/writer exclusion: a writer entering while
/// anyone else is inside, or a reader entering while a writer is.
#[derive(Default)]
pub struct OverlapCounter {
    readers: AtomicUsize,
    writers: AtomicUsize,
    overlaps: AtomicUsize,
    max_readers: AtomicUsize,
}

impl OverlapCounter {
    pub fn new() -> OverlapCounter {
        OverlapCounter::default()
    }

    pub fn overlaps(&self) -> usize {
        self.overlaps.load(Ordering::SeqCst)
    }

    /// Most readers seen inside at once.
    pub fn max_concurrent_readers(&self) -> usize {
        self.max_readers.load(Ordering::SeqCst)
    }
}

impl AccessObserver for OverlapCounter {
    fn reader_entered(&self) {
        let readers = self.readers.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_readers.fetch_max(readers, Ordering::SeqCst);
        if self.writers.load(Ordering::SeqCst) > 0 {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn reader_left(&self) {
        self.readers.fetch_sub(1, Ordering::SeqCst);
    }

    fn writer_entered(&self) {
        let writers = self.writers.fetch_add(1, Ordering::SeqCst) + 1;
        if writers > 1 || self.readers.load(Ordering::SeqCst) > 0 {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn writer_left(&self) {
        self.writers.fetch_sub(1, Ordering::SeqCst);
    }
}
