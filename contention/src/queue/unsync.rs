use std::sync::atomic::{AtomicIsize, AtomicU64, AtomicUsize, Ordering};

use tracing::{info, warn};

use super::{check_occupancy, Order, OrderQueue, QueuePolicy, FIRST_ORDER_ID};
use crate::jitter::Jitter;

// Every field is read and written with separate relaxed loads and stores, never
// a read-modify-write. The atomics only keep the races defined behaviour; they
// do not make any step atomic.

#[derive(Default)]
struct Slot {
    order_id: AtomicU64,
    customer_id: AtomicU64,
}

impl Slot {
    #[inline]
    fn load(&self) -> Order {
        Order {
            order_id: self.order_id.load(Ordering::Relaxed),
            customer_id: self.customer_id.load(Ordering::Relaxed),
        }
    }

    #[inline]
    fn store(&self, order: Order) {
        self.order_id.store(order.order_id, Ordering::Relaxed);
        self.customer_id.store(order.customer_id, Ordering::Relaxed);
    }
}

/// Circular order buffer with no synchronization.
///
/// Inserting into a full buffer overwrites the slot at the write cursor and
/// removing from an empty one hands back whatever the read cursor points at.
/// Both only log a warning. The occupancy counter is updated with a plain
/// load and store, so concurrent callers lose increments and decrements and it
/// drifts outside `[0, capacity]`; each update is followed by a range check.
pub struct UnsyncOrderQueue {
    slots: Box<[Slot]>,
    write_cursor: AtomicUsize,
    read_cursor: AtomicUsize,
    occupancy: AtomicIsize,
    next_order_id: AtomicU64,
}

impl UnsyncOrderQueue {
    pub fn new(capacity: usize) -> UnsyncOrderQueue {
        assert!(capacity > 0, "queue capacity must be at least 1");
        UnsyncOrderQueue {
            slots: (0..capacity).map(|_| Slot::default()).collect(),
            write_cursor: AtomicUsize::new(0),
            read_cursor: AtomicUsize::new(0),
            occupancy: AtomicIsize::new(0),
            next_order_id: AtomicU64::new(FIRST_ORDER_ID),
        }
    }

    #[inline]
    fn next_order_id(&self, jitter: &mut Jitter) -> u64 {
        let order_id = self.next_order_id.load(Ordering::Relaxed);
        jitter.pause();
        self.next_order_id.store(order_id + 1, Ordering::Relaxed);
        order_id
    }

    pub fn try_enqueue(&self, customer_id: u64, jitter: &mut Jitter) -> Order {
        let capacity = self.slots.len();
        let order = Order {
            order_id: self.next_order_id(jitter),
            customer_id,
        };

        let before = self.occupancy.load(Ordering::Relaxed);
        if before >= capacity as isize {
            warn!("WARNING: buffer full but still inserting! count={}", before);
        }

        let at = self.write_cursor.load(Ordering::Relaxed);
        self.slots[at].store(order);
        info!(
            "Produced order {} at index {} (count before={})",
            order.order_id, at, before
        );

        jitter.pause();

        self.write_cursor.store((at + 1) % capacity, Ordering::Relaxed);
        let after = self.occupancy.load(Ordering::Relaxed) + 1;
        self.occupancy.store(after, Ordering::Relaxed);
        check_occupancy(after, capacity);
        order
    }

    pub fn try_dequeue(&self, jitter: &mut Jitter) -> Order {
        let capacity = self.slots.len();
        let before = self.occupancy.load(Ordering::Relaxed);
        if before <= 0 {
            warn!("WARNING: buffer empty but still consuming! count={}", before);
        }

        let at = self.read_cursor.load(Ordering::Relaxed);
        let order = self.slots[at].load();
        info!(
            "Consumed {} at index {} (count before={})",
            order, at, before
        );

        jitter.pause();

        self.read_cursor.store((at + 1) % capacity, Ordering::Relaxed);
        let after = self.occupancy.load(Ordering::Relaxed) - 1;
        self.occupancy.store(after, Ordering::Relaxed);
        check_occupancy(after, capacity);
        order
    }
}

impl OrderQueue for UnsyncOrderQueue {
    fn policy(&self) -> QueuePolicy {
        QueuePolicy::Unsynchronized
    }

    fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn occupancy(&self) -> isize {
        self.occupancy.load(Ordering::Relaxed)
    }

    fn put(&self, customer_id: u64, jitter: &mut Jitter) -> Order {
        self.try_enqueue(customer_id, jitter)
    }

    fn take(&self, jitter: &mut Jitter) -> Order {
        self.try_dequeue(jitter)
    }
}
