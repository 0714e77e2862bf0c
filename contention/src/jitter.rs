//! Random pauses used to perturb the scheduler.
//!
//! The pauses carry no meaning of their own; they widen the window between the
//! read and the write half of a step so that interleavings which are rare on an
//! idle machine become common. Each worker owns its own [`Jitter`], derived
//! from one seed per process so a run can be replayed by pinning the seed.

use std::thread;
use std::time::Duration;

use once_cell::sync::Lazy;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::JitterConfig;

static PROCESS_SEED: Lazy<u64> = Lazy::new(rand::random::<u64>);

const STREAM_MIX: u64 = 0x9E37_79B9_7F4A_7C15;

/// Seed drawn once when first asked for and shared by every worker afterwards.
pub fn process_seed() -> u64 {
    *PROCESS_SEED
}

pub struct Jitter {
    max_delay_micros: u64,
    rng: StdRng,
}

impl Jitter {
    /// Jitter for one worker. `stream` must differ between the workers of a run.
    pub fn new(cfg: &JitterConfig, stream: u64) -> Jitter {
        let seed = cfg.seed.unwrap_or_else(process_seed);
        Jitter {
            max_delay_micros: cfg.max_delay_micros,
            rng: StdRng::seed_from_u64(seed ^ stream.wrapping_add(1).wrapping_mul(STREAM_MIX)),
        }
    }

    /// Jitter that never pauses.
    pub fn none() -> Jitter {
        Jitter::new(&JitterConfig::disabled(), 0)
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.max_delay_micros > 0
    }

    pub fn next_delay(&mut self) -> Duration {
        if !self.is_enabled() {
            return Duration::ZERO;
        }
        Duration::from_micros(self.rng.gen_range(0..=self.max_delay_micros))
    }

    pub fn pause(&mut self) {
        let delay = self.next_delay();
        if !delay.is_zero() {
            thread::sleep(delay);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_and_stream_replay_the_same_delays() {
        let cfg = JitterConfig::new(500).seeded(42);
        let mut a = Jitter::new(&cfg, 3);
        let mut b = Jitter::new(&cfg, 3);
        for _ in 0..32 {
            assert_eq!(a.next_delay(), b.next_delay());
        }
    }

    #[test]
    fn streams_diverge() {
        let cfg = JitterConfig::new(1_000_000).seeded(42);
        let mut a = Jitter::new(&cfg, 0);
        let mut b = Jitter::new(&cfg, 1);
        let a: Vec<_> = (0..16).map(|_| a.next_delay()).collect();
        let b: Vec<_> = (0..16).map(|_| b.next_delay()).collect();
        assert_ne!(a, b);
    }

    #[test]
    fn delays_stay_within_bound() {
        let cfg = JitterConfig::new(250).seeded(9);
        let mut jitter = Jitter::new(&cfg, 0);
        for _ in 0..1_000 {
            assert!(jitter.next_delay() <= Duration::from_micros(250));
        }
    }

    #[test]
    fn disabled_jitter_never_pauses() {
        let mut jitter = Jitter::none();
        assert!(!jitter.is_enabled());
        assert_eq!(jitter.next_delay(), Duration::ZERO);
    }
}
