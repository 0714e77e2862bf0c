use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::{info, info_span};

use super::Workers;
use crate::config::QueueScenarioConfig;
use crate::jitter::Jitter;
use crate::queue::{self, Order, QueuePolicy, FIRST_ORDER_ID};
use crate::Result;

#[derive(Debug, Clone)]
pub struct QueueReport {
    pub policy: QueuePolicy,
    pub capacity: usize,
    /// Occupancy a race-free run ends with: every produced order was consumed.
    pub expected_occupancy: isize,
    pub final_occupancy: isize,
    pub enqueued: usize,
    pub dequeued: usize,
    /// Every order handed to a consumer, grouped by consumer in spawn order.
    pub consumed: Vec<Order>,
}

impl QueueReport {
    /// Order ids handed out more than once, ascending.
    pub fn duplicate_ids(&self) -> Vec<u64> {
        let mut seen = HashMap::new();
        for order in &self.consumed {
            *seen.entry(order.order_id).or_insert(0usize) += 1;
        }
        let mut dups: Vec<u64> = seen
            .into_iter()
            .filter(|&(_, n)| n > 1)
            .map(|(id, _)| id)
            .collect();
        dups.sort_unstable();
        dups
    }

    /// Ids that were issued but never reached a consumer, ascending.
    pub fn missing_ids(&self) -> Vec<u64> {
        let consumed: BTreeSet<u64> = self.consumed.iter().map(|o| o.order_id).collect();
        (FIRST_ORDER_ID..FIRST_ORDER_ID + self.enqueued as u64)
            .filter(|id| !consumed.contains(id))
            .collect()
    }

    pub fn distinct_ids(&self) -> usize {
        self.consumed
            .iter()
            .map(|o| o.order_id)
            .collect::<BTreeSet<_>>()
            .len()
    }

    pub fn is_consistent(&self) -> bool {
        self.final_occupancy == self.expected_occupancy
            && self.enqueued == self.dequeued
            && self.duplicate_ids().is_empty()
            && self.missing_ids().is_empty()
    }

    pub fn log_summary(&self) {
        info!(
            "=== Program finished ({}). Expected final count={}, Final count={}, distinct orders consumed={}/{} ===",
            self.policy,
            self.expected_occupancy,
            self.final_occupancy,
            self.distinct_ids(),
            self.enqueued
        );
    }
}

/// Takes one unit from the shared countdown. False once it is exhausted.
#[inline]
fn claim(remaining: &AtomicUsize) -> bool {
    remaining
        .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
        .is_ok()
}

/// Runs the producer/consumer scenario to completion.
///
/// Consumers share a countdown of the orders still to be taken instead of
/// each running a fixed number of iterations, so together they dequeue
/// exactly what the producers enqueue and none is left blocked on an empty
/// buffer.
pub fn run_order_queue(cfg: &QueueScenarioConfig) -> Result<QueueReport> {
    cfg.validate()?;
    info!(
        "=== Producer/Consumer ({}) - Food Delivery Order Queue ===",
        cfg.policy
    );
    info!(
        "Buffer size={}, Producers={}, Consumers={}, Orders per producer={}",
        cfg.capacity, cfg.producers, cfg.consumers, cfg.orders_per_producer
    );

    let queue = queue::build(cfg.policy, cfg.capacity);
    let remaining = Arc::new(AtomicUsize::new(cfg.total_orders()));
    let mut stream = 0u64;

    let mut producers = Workers::new();
    for id in 1..=cfg.producers {
        let queue = Arc::clone(&queue);
        let mut jitter = Jitter::new(&cfg.jitter, stream);
        stream += 1;
        let orders = cfg.orders_per_producer;
        producers.spawn(
            format!("producer-{}", id),
            info_span!("P", id),
            move || {
                for _ in 0..orders {
                    queue.put(id as u64, &mut jitter);
                    jitter.pause();
                }
                info!("Finished producing.");
                orders
            },
        )?;
    }

    let mut consumers = Workers::new();
    for id in 1..=cfg.consumers {
        let queue = Arc::clone(&queue);
        let remaining = Arc::clone(&remaining);
        let mut jitter = Jitter::new(&cfg.jitter, stream);
        stream += 1;
        consumers.spawn(
            format!("consumer-{}", id),
            info_span!("C", id),
            move || {
                let mut consumed = Vec::new();
                while claim(&remaining) {
                    consumed.push(queue.take(&mut jitter));
                    jitter.pause();
                }
                info!("Finished consuming loop.");
                consumed
            },
        )?;
    }

    let enqueued: usize = producers.join()?.into_iter().sum();
    let consumed: Vec<Order> = consumers.join()?.into_iter().flatten().collect();

    let report = QueueReport {
        policy: cfg.policy,
        capacity: cfg.capacity,
        expected_occupancy: 0,
        final_occupancy: queue.occupancy(),
        enqueued,
        dequeued: consumed.len(),
        consumed,
    };
    report.log_summary();
    Ok(report)
}
