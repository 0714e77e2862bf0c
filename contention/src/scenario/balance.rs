use std::sync::Arc;

use tracing::{info, info_span};

use super::Workers;
use crate::config::BalanceScenarioConfig;
use crate::jitter::Jitter;
use crate::register::{self, OverlapCounter, RegisterPolicy};
use crate::Result;

const WRITER_LOG_EVERY: usize = 2_000;
const READER_LOG_EVERY: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceReport {
    pub policy: RegisterPolicy,
    pub expected: i64,
    pub actual: i64,
    pub writes: usize,
    pub snapshots: usize,
    /// Critical-section entries that broke reader/writer exclusion.
    pub overlaps: usize,
    pub max_concurrent_readers: usize,
}

impl BalanceReport {
    #[inline]
    pub fn lost_update(&self) -> bool {
        self.expected != self.actual
    }

    pub fn is_consistent(&self) -> bool {
        !self.lost_update() && self.overlaps == 0
    }

    pub fn log_summary(&self) {
        info!(
            "=== Program finished ({}). Expected balance={}, Actual balance={} ===",
            self.policy, self.expected, self.actual
        );
        info!(
            "writes={}, snapshots={}, exclusion breaches={}, max concurrent readers={}",
            self.writes, self.snapshots, self.overlaps, self.max_concurrent_readers
        );
    }
}

/// Runs the reader/writer scenario to completion.
///
/// Each writer alternates `+step` and `-step`; readers only sample. The
/// register reports every critical-section entry to an [`OverlapCounter`] so
/// the report can tell whether exclusion held.
pub fn run_balance(cfg: &BalanceScenarioConfig) -> Result<BalanceReport> {
    cfg.validate()?;
    info!("=== Reader/Writer ({}) - Bank Account Balance ===", cfg.policy);
    info!(
        "Initial balance={}, Readers={}, Writers={}, Operations per writer={}",
        cfg.initial_balance, cfg.readers, cfg.writers, cfg.operations_per_writer
    );

    let observer = Arc::new(OverlapCounter::new());
    let register = register::build(cfg.policy, cfg.initial_balance, observer.clone());
    let mut stream = 0u64;

    let mut writers = Workers::new();
    for id in 1..=cfg.writers {
        let register = Arc::clone(&register);
        let mut jitter = Jitter::new(&cfg.jitter, stream);
        stream += 1;
        let cfg = cfg.clone();
        writers.spawn(format!("writer-{}", id), info_span!("W", id), move || {
            for op in 0..cfg.operations_per_writer {
                let written = register.apply_delta(cfg.delta_for(op), &mut jitter);
                if op % WRITER_LOG_EVERY == 0 {
                    info!("operation {}, intermediate balance={}", op, written);
                }
                jitter.pause();
            }
            info!("Finished writing operations.");
            cfg.operations_per_writer
        })?;
    }

    let mut readers = Workers::new();
    for id in 1..=cfg.readers {
        let register = Arc::clone(&register);
        let mut jitter = Jitter::new(&cfg.jitter, stream);
        stream += 1;
        let samples = cfg.samples_per_reader;
        readers.spawn(format!("reader-{}", id), info_span!("R", id), move || {
            for sample in 0..samples {
                let balance = register.snapshot(&mut jitter);
                if sample % READER_LOG_EVERY == 0 {
                    info!("read balance={} (sample {})", balance, sample);
                }
                jitter.pause();
            }
            info!("Finished reading samples.");
            samples
        })?;
    }

    let writes: usize = writers.join()?.into_iter().sum();
    let snapshots: usize = readers.join()?.into_iter().sum();

    let report = BalanceReport {
        policy: cfg.policy,
        expected: cfg.expected_final_balance(),
        actual: register.balance(),
        writes,
        snapshots,
        overlaps: observer.overlaps(),
        max_concurrent_readers: observer.max_concurrent_readers(),
    };
    report.log_summary();
    Ok(report)
}
