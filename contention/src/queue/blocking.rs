use parking_lot::Mutex;
use tracing::{debug, info};

use super::{check_occupancy, Order, OrderQueue, QueuePolicy, FIRST_ORDER_ID};
use crate::jitter::Jitter;
use crate::permit::Semaphore;

struct Ring {
    slots: Vec<Order>,
    write_cursor: usize,
    read_cursor: usize,
    occupancy: usize,
    next_order_id: u64,
}

/// Circular order buffer that blocks instead of overrunning.
///
/// `empty_slots` starts at `capacity`, `filled_slots` at zero. A producer takes
/// an empty permit before entering the ring and hands a filled permit to the
/// consumers after leaving it; a consumer does the mirror image. Whenever no
/// caller is between its two permit operations, `occupancy` equals the filled
/// permits and the two permit counts add up to `capacity`.
pub struct BlockingOrderQueue {
    ring: Mutex<Ring>,
    empty_slots: Semaphore,
    filled_slots: Semaphore,
    capacity: usize,
}

impl BlockingOrderQueue {
    pub fn new(capacity: usize) -> BlockingOrderQueue {
        assert!(capacity > 0, "queue capacity must be at least 1");
        BlockingOrderQueue {
            ring: Mutex::new(Ring {
                slots: vec![Order::default(); capacity],
                write_cursor: 0,
                read_cursor: 0,
                occupancy: 0,
                next_order_id: FIRST_ORDER_ID,
            }),
            empty_slots: Semaphore::new(capacity),
            filled_slots: Semaphore::new(0),
            capacity,
        }
    }

    /// Blocks while the queue is full.
    pub fn enqueue(&self, customer_id: u64) -> Order {
        self.empty_slots.acquire();

        let order = {
            let mut ring = self.ring.lock();
            let order = Order {
                order_id: ring.next_order_id,
                customer_id,
            };
            ring.next_order_id += 1;

            let at = ring.write_cursor;
            ring.slots[at] = order;
            ring.occupancy += 1;
            ring.write_cursor = (at + 1) % self.capacity;
            check_occupancy(ring.occupancy as isize, self.capacity);
            info!(
                "order_id={} inserted into buffer[{}] (count after insert={})",
                order.order_id, at, ring.occupancy
            );
            order
        };

        self.filled_slots.release();
        debug!(order_id = order.order_id, "filled slot released");
        order
    }

    /// Blocks while the queue is empty.
    pub fn dequeue(&self) -> Order {
        self.filled_slots.acquire();

        let order = {
            let mut ring = self.ring.lock();
            let at = ring.read_cursor;
            let order = ring.slots[at];
            ring.occupancy -= 1;
            ring.read_cursor = (at + 1) % self.capacity;
            check_occupancy(ring.occupancy as isize, self.capacity);
            info!(
                "{} taken from buffer[{}] (count after remove={})",
                order, at, ring.occupancy
            );
            order
        };

        self.empty_slots.release();
        debug!(order_id = order.order_id, "empty slot released");
        order
    }

    /// Free `(empty, filled)` permits.
    pub fn permits(&self) -> (usize, usize) {
        (self.empty_slots.available(), self.filled_slots.available())
    }
}

impl OrderQueue for BlockingOrderQueue {
    fn policy(&self) -> QueuePolicy {
        QueuePolicy::Blocking
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn occupancy(&self) -> isize {
        self.ring.lock().occupancy as isize
    }

    fn put(&self, customer_id: u64, _jitter: &mut Jitter) -> Order {
        self.enqueue(customer_id)
    }

    fn take(&self, _jitter: &mut Jitter) -> Order {
        self.dequeue()
    }
}
