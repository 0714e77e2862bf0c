//! Scenario configuration.
//!
//! Every field defaults to the compile-time constants below, so a binary run
//! without `--config` never touches the filesystem. A TOML file loaded through
//! [`load`] only needs the keys it wants to override.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Deserializer;
use serde_derive::{Deserialize, Serialize};

use crate::queue::QueuePolicy;
use crate::register::RegisterPolicy;
use crate::{ContentionError, Result};

pub const QUEUE_CAPACITY: usize = 5;
pub const NUM_PRODUCERS: usize = 3;
pub const NUM_CONSUMERS: usize = 2;
pub const ORDERS_PER_PRODUCER: usize = 20;
pub const QUEUE_MAX_DELAY_MICROS: u64 = 5_000;

pub const INITIAL_BALANCE: i64 = 1_000;
pub const NUM_WRITERS: usize = 3;
pub const NUM_READERS: usize = 5;
pub const OPERATIONS_PER_WRITER: usize = 10_000;
pub const SAMPLES_PER_READER: usize = 1_000;
pub const BALANCE_STEP: i64 = 10;
pub const BALANCE_MAX_DELAY_MICROS: u64 = 2_000;

/// Bounds of the random pause injected between the halves of a critical step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JitterConfig {
    /// Upper bound (inclusive) of each pause. Zero disables the pauses.
    pub max_delay_micros: u64,
    /// Fixed seed for reproducible runs. When absent the process-wide seed is used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl JitterConfig {
    pub fn new(max_delay_micros: u64) -> JitterConfig {
        JitterConfig {
            max_delay_micros,
            seed: None,
        }
    }

    pub fn disabled() -> JitterConfig {
        JitterConfig::new(0)
    }

    pub fn seeded(mut self, seed: u64) -> JitterConfig {
        self.seed = Some(seed);
        self
    }
}

/// A `[jitter]` table as written in a file; absent keys fall back to the
/// defaults of the scenario that owns the table.
#[derive(Deserialize)]
struct JitterOverrides {
    max_delay_micros: Option<u64>,
    seed: Option<u64>,
}

impl JitterOverrides {
    fn over(self, default_max_delay_micros: u64) -> JitterConfig {
        JitterConfig {
            max_delay_micros: self.max_delay_micros.unwrap_or(default_max_delay_micros),
            seed: self.seed,
        }
    }
}

fn queue_jitter<'de, D>(deserializer: D) -> std::result::Result<JitterConfig, D::Error>
where
    D: Deserializer<'de>,
{
    let overrides = <JitterOverrides as serde::Deserialize>::deserialize(deserializer)?;
    Ok(overrides.over(QUEUE_MAX_DELAY_MICROS))
}

fn balance_jitter<'de, D>(deserializer: D) -> std::result::Result<JitterConfig, D::Error>
where
    D: Deserializer<'de>,
{
    let overrides = <JitterOverrides as serde::Deserialize>::deserialize(deserializer)?;
    Ok(overrides.over(BALANCE_MAX_DELAY_MICROS))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueScenarioConfig {
    pub policy: QueuePolicy,
    pub capacity: usize,
    pub producers: usize,
    pub consumers: usize,
    pub orders_per_producer: usize,
    #[serde(deserialize_with = "queue_jitter")]
    pub jitter: JitterConfig,
}

impl Default for QueueScenarioConfig {
    fn default() -> QueueScenarioConfig {
        QueueScenarioConfig {
            policy: QueuePolicy::Blocking,
            capacity: QUEUE_CAPACITY,
            producers: NUM_PRODUCERS,
            consumers: NUM_CONSUMERS,
            orders_per_producer: ORDERS_PER_PRODUCER,
            jitter: JitterConfig::new(QUEUE_MAX_DELAY_MICROS),
        }
    }
}

impl QueueScenarioConfig {
    #[inline]
    pub fn total_orders(&self) -> usize {
        self.producers.saturating_mul(self.orders_per_producer)
    }

    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(invalid("queue capacity must be at least 1"));
        }
        if self.producers == 0 {
            return Err(invalid("at least one producer is required"));
        }
        let total = match self.producers.checked_mul(self.orders_per_producer) {
            Some(total) if i64::try_from(total).is_ok() => total,
            _ => return Err(invalid("total order count overflows the order id range")),
        };
        if self.consumers == 0 && total > 0 {
            return Err(invalid("orders are produced but there is no consumer"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BalanceScenarioConfig {
    pub policy: RegisterPolicy,
    pub initial_balance: i64,
    pub writers: usize,
    pub readers: usize,
    pub operations_per_writer: usize,
    pub samples_per_reader: usize,
    /// Magnitude of each deposit/withdrawal; writers alternate `+step`, `-step`.
    pub step: i64,
    #[serde(deserialize_with = "balance_jitter")]
    pub jitter: JitterConfig,
}

impl Default for BalanceScenarioConfig {
    fn default() -> BalanceScenarioConfig {
        BalanceScenarioConfig {
            policy: RegisterPolicy::ReadersPreference,
            initial_balance: INITIAL_BALANCE,
            writers: NUM_WRITERS,
            readers: NUM_READERS,
            operations_per_writer: OPERATIONS_PER_WRITER,
            samples_per_reader: SAMPLES_PER_READER,
            step: BALANCE_STEP,
            jitter: JitterConfig::new(BALANCE_MAX_DELAY_MICROS),
        }
    }
}

impl BalanceScenarioConfig {
    /// Delta applied by a writer on its `op`-th operation.
    #[inline]
    pub fn delta_for(&self, op: usize) -> i64 {
        if op % 2 == 0 {
            self.step
        } else {
            -self.step
        }
    }

    /// Balance a lost-update-free run must end with. Only meaningful for a
    /// config that passed [`validate`](Self::validate).
    pub fn expected_final_balance(&self) -> i64 {
        let net_per_writer = if self.operations_per_writer % 2 == 0 {
            0
        } else {
            self.step
        };
        self.initial_balance + net_per_writer * self.writers as i64
    }

    /// Lowest and highest balance any interleaving can produce, lost updates
    /// included: every written value is an earlier value plus or minus `step`.
    /// `None` when that range does not fit an `i64`.
    pub fn balance_range(&self) -> Option<(i64, i64)> {
        let writes = i64::try_from(self.writers.checked_mul(self.operations_per_writer)?).ok()?;
        let span = self.step.checked_mul(writes)?;
        Some((
            self.initial_balance.checked_sub(span)?,
            self.initial_balance.checked_add(span)?,
        ))
    }

    pub fn validate(&self) -> Result<()> {
        if self.writers == 0 {
            return Err(invalid("at least one writer is required"));
        }
        if self.step < 0 {
            return Err(invalid("step must not be negative"));
        }
        if self.balance_range().is_none() {
            return Err(invalid("balance could overflow with this initial balance and step"));
        }
        Ok(())
    }
}

#[inline]
fn invalid(reason: &str) -> ContentionError {
    ContentionError::InvalidConfig(reason.to_string())
}

/// Loads `T` from `path` when given, otherwise returns the built-in defaults.
pub fn load<T>(path: Option<&Path>) -> Result<T>
where
    T: serde::Serialize + DeserializeOwned + Default,
{
    match path {
        Some(p) => Ok(confy::load_path(p)?),
        None => Ok(T::default()),
    }
}
