//! Fixed-capacity circular queue of orders.
//!
//! Two implementations share the [`OrderQueue`] seam: [`UnsyncOrderQueue`]
//! touches its cursors with no coordination at all and only reports what it
//! sees, [`BlockingOrderQueue`] guards them and blocks producers on a full
//! buffer and consumers on an empty one.

use std::fmt;
use std::sync::Arc;

use serde_derive::{Deserialize, Serialize};
use tracing::error;

use crate::jitter::Jitter;

mod blocking;
mod unsync;

pub use blocking::BlockingOrderQueue;
pub use unsync::UnsyncOrderQueue;

/// Order ids start here; id 0 only ever shows up in a slot nobody wrote.
pub const FIRST_ORDER_ID: u64 = 1;

#[derive(Default, Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Order {
    pub order_id: u64,
    pub customer_id: u64,
}

impl Order {
    /// An order read from a slot that was never written.
    #[inline]
    pub fn is_ghost(&self) -> bool {
        self.order_id == 0
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "order {} (from P{})", self.order_id, self.customer_id)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueuePolicy {
    /// No exclusion and no blocking.
    Unsynchronized,
    /// Empty/filled permits plus one exclusive region.
    Blocking,
}

impl fmt::Display for QueuePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueuePolicy::Unsynchronized => write!(f, "NO SYNC"),
            QueuePolicy::Blocking => write!(f, "SYNC"),
        }
    }
}

pub trait OrderQueue: Send + Sync {
    fn policy(&self) -> QueuePolicy;

    fn capacity(&self) -> usize;

    /// Filled slots as the queue itself counts them. Signed because the
    /// unsynchronized queue can drift below zero.
    fn occupancy(&self) -> isize;

    /// Creates the next order for `customer_id` and puts it in the buffer.
    fn put(&self, customer_id: u64, jitter: &mut Jitter) -> Order;

    /// Removes the order at the read cursor.
    fn take(&self, jitter: &mut Jitter) -> Order;
}

pub fn build(policy: QueuePolicy, capacity: usize) -> Arc<dyn OrderQueue> {
    match policy {
        QueuePolicy::Unsynchronized => Arc::new(UnsyncOrderQueue::new(capacity)),
        QueuePolicy::Blocking => Arc::new(BlockingOrderQueue::new(capacity)),
    }
}

/// Logs an error if `occupancy` left `[0, capacity]`. Returns whether it is in range.
pub(crate) fn check_occupancy(occupancy: isize, capacity: usize) -> bool {
    let in_range = occupancy >= 0 && occupancy as usize <= capacity;
    if !in_range {
        error!(
            "*** invalid count={} (out of range 0..{}) ***",
            occupancy, capacity
        );
    }
    in_range
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ghost_order_is_the_zeroed_slot() {
        assert!(Order::default().is_ghost());
        assert!(!Order {
            order_id: FIRST_ORDER_ID,
            customer_id: 1
        }
        .is_ghost());
    }

    #[test]
    fn occupancy_range_is_inclusive() {
        assert!(check_occupancy(0, 5));
        assert!(check_occupancy(5, 5));
        assert!(!check_occupancy(-1, 5));
        assert!(!check_occupancy(6, 5));
    }

    #[test]
    fn build_honours_policy() {
        let queue = build(QueuePolicy::Unsynchronized, 3);
        assert_eq!(queue.policy(), QueuePolicy::Unsynchronized);
        assert_eq!(queue.capacity(), 3);
        let queue = build(QueuePolicy::Blocking, 4);
        assert_eq!(queue.policy(), QueuePolicy::Blocking);
        assert_eq!(queue.occupancy(), 0);
    }
}
