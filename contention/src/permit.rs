//! Blocking primitives shared by the synchronized queue and register.

use parking_lot::{Condvar, Mutex};

/// Counting semaphore.
///
/// Unlike a mutex guard a permit is not tied to the thread that took it: one
/// thread may [`acquire`](Semaphore::acquire) and another
/// [`release`](Semaphore::release). The readers-preference register relies on
/// this, since the first reader in and the last reader out are usually
/// different threads.
pub struct Semaphore {
    permits: Mutex<usize>,
    available: Condvar,
}

impl Semaphore {
    pub fn new(permits: usize) -> Semaphore {
        Semaphore {
            permits: Mutex::new(permits),
            available: Condvar::new(),
        }
    }

    /// Takes one permit, blocking while none is left.
    pub fn acquire(&self) {
        let mut permits = self.permits.lock();
        while *permits == 0 {
            self.available.wait(&mut permits);
        }
        *permits -= 1;
    }

    /// Takes one permit if one is free right now.
    pub fn try_acquire(&self) -> bool {
        let mut permits = self.permits.lock();
        if *permits == 0 {
            return false;
        }
        *permits -= 1;
        true
    }

    /// Returns one permit and wakes a single waiter.
    pub fn release(&self) {
        {
            let mut permits = self.permits.lock();
            *permits += 1;
        }
        self.available.notify_one();
    }

    /// Takes one permit for the lifetime of the returned guard.
    pub fn access(&self) -> SemaphorePermit<'_> {
        self.acquire();
        SemaphorePermit { semaphore: self }
    }

    /// Free permits at this instant. Stale as soon as it returns.
    pub fn available(&self) -> usize {
        *self.permits.lock()
    }
}

pub struct SemaphorePermit<'a> {
    semaphore: &'a Semaphore,
}

impl Drop for SemaphorePermit<'_> {
    fn drop(&mut self) {
        self.semaphore.release();
    }
}
