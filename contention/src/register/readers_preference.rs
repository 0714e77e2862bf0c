use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error};

use super::{AccessObserver, BalanceRegister, NoopObserver, RegisterPolicy};
use crate::jitter::Jitter;
use crate::permit::Semaphore;

/// Balance guarded by the classic readers-preference protocol.
///
/// `reader_count` is only touched under its own mutex. The reader that moves
/// it from 0 to 1 takes `resource`, the single permit writers also need, and
/// the reader that moves it back to 0 returns it. Readers therefore share the
/// register while writers are serialized against everyone.
///
/// As long as some reader is always inside, `resource` is never returned and
/// writers wait indefinitely. That is the defining property of this policy;
/// use [`TaskFairRegister`](super::TaskFairRegister) when writers must not
/// starve.
pub struct ReadersPreferenceRegister {
    // Ordering between the balance loads and stores comes from the permit
    // and mutex hand-offs, so relaxed accesses are enough.
    balance: AtomicI64,
    reader_count: Mutex<usize>,
    resource: Semaphore,
    observer: Arc<dyn AccessObserver>,
}

impl ReadersPreferenceRegister {
    pub fn new(initial: i64) -> ReadersPreferenceRegister {
        ReadersPreferenceRegister::with_observer(initial, Arc::new(NoopObserver))
    }

    pub fn with_observer(
        initial: i64,
        observer: Arc<dyn AccessObserver>,
    ) -> ReadersPreferenceRegister {
        ReadersPreferenceRegister {
            balance: AtomicI64::new(initial),
            reader_count: Mutex::new(0),
            resource: Semaphore::new(1),
            observer,
        }
    }

    /// Readers inside the shared region right now.
    pub fn active_readers(&self) -> usize {
        *self.reader_count.lock()
    }

    fn enter_shared(&self) {
        let mut readers = self.reader_count.lock();
        *readers += 1;
        if *readers == 1 {
            // First reader in locks writers out. Later readers queue on
            // `reader_count` meanwhile.
            self.resource.acquire();
        }
        debug!(readers = *readers, "entered shared read region");
    }

    fn leave_shared(&self) {
        let mut readers = self.reader_count.lock();
        match readers.checked_sub(1) {
            Some(remaining) => {
                *readers = remaining;
                if remaining == 0 {
                    self.resource.release();
                }
            }
            None => error!("*** invalid readCount: leaving reader found no active readers ***"),
        }
    }
}

impl BalanceRegister for ReadersPreferenceRegister {
    fn policy(&self) -> RegisterPolicy {
        RegisterPolicy::ReadersPreference
    }

    fn apply_delta(&self, delta: i64, jitter: &mut Jitter) -> i64 {
        let _exclusive = self.resource.access();
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
        self.enter_shared();
        self.observer.reader_entered();
        let value = self.balance.load(Ordering::Relaxed);
        jitter.pause();
        self.observer.reader_left();
        self.leave_shared();
        value
    }

    fn balance(&self) -> i64 {
        self.balance.load(Ordering::Relaxed)
    }
}
