use std::sync::Arc;

use parking_lot::RwLock;

use super::{AccessObserver, BalanceRegister, NoopObserver, RegisterPolicy};
use crate::jitter::Jitter;

/// Balance behind a task-fair reader/writer lock: once a writer is waiting,
/// new readers queue behind it.
pub struct TaskFairRegister {
    balance: RwLock<i64>,
    observer: Arc<dyn AccessObserver>,
}

impl TaskFairRegister {
    pub fn new(initial: i64) -> TaskFairRegister {
        TaskFairRegister::with_observer(initial, Arc::new(NoopObserver))
    }

    pub fn with_observer(initial: i64, observer: Arc<dyn AccessObserver>) -> TaskFairRegister {
        TaskFairRegister {
            balance: RwLock::new(initial),
            observer,
        }
    }
}

impl BalanceRegister for TaskFairRegister {
    fn policy(&self) -> RegisterPolicy {
        RegisterPolicy::TaskFair
    }

    fn apply_delta(&self, delta: i64, jitter: &mut Jitter) -> i64 {
        let mut balance = self.balance.write();
        self.observer.writer_entered();
        let mut local = *balance;
        jitter.pause();
        local += delta;
        jitter.pause();
        *balance = local;
        self.observer.writer_left();
        local
    }

    fn snapshot(&self, jitter: &mut Jitter) -> i64 {
        let balance = self.balance.read();
        self.observer.reader_entered();
        let value = *balance;
        jitter.pause();
        self.observer.reader_left();
        value
    }

    fn balance(&self) -> i64 {
        *self.balance.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deltas_and_snapshots_agree() {
        let register = TaskFairRegister::new(1_000);
        let jitter = &mut Jitter::none();
        register.apply_delta(10, jitter);
        register.apply_delta(-10, jitter);
        register.apply_delta(10, jitter);
        assert_eq!(register.snapshot(jitter), 1_010);
        assert_eq!(register.balance(), 1_010);
    }
}
