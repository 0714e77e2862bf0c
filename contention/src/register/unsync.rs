use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use super::{AccessObserver, BalanceRegister, NoopObserver, RegisterPolicy};
use crate::jitter::Jitter;

/// Balance with no coordination between writers or readers.
///
/// A writer reads into a local, pauses, computes, pauses again and stores. Any
/// write landing in that window is overwritten (lost update).
pub struct UnsyncRegister {
    balance: AtomicI64,
    observer: Arc<dyn AccessObserver>,
}

impl UnsyncRegister {
    pub fn new(initial: i64) -> UnsyncRegister {
        UnsyncRegister::with_observer(initial, Arc::new(NoopObserver))
    }

    pub fn with_observer(initial: i64, observer: Arc<dyn AccessObserver>) -> UnsyncRegister {
        UnsyncRegister {
            balance: AtomicI64::new(initial),
            observer,
        }
    }
}

impl BalanceRegister for UnsyncRegister {
    fn policy(&self) -> RegisterPolicy {
        RegisterPolicy::Unsynchronized
    }

    fn apply_delta(&self, delta: i64, jitter: &mut Jitter) -> i64 {
        self.observer.writer_entered();
        let mut local = self.balance.load(Ordering::Relaxed);
        jitter.pause();
        local += delta;
        jitter.pause();
        self.balance.store(local, Ordering::Relaxed);
        self.observer.writer_left();
        local
    }

    fn snapshot(&self, jitter: &mut Jitter) -> i64 {
        self.observer.reader_entered();
        let value = self.balance.load(Ordering::Relaxed);
        jitter.pause();
        self.observer.reader_left();
        value
    }

    fn balance(&self) -> i64 {
        self.balance.load(Ordering::Relaxed)
    }
}
