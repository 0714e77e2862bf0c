use std::error::Error;
use std::sync::Arc;
use std::thread;

use tracing_test::traced_test;

use crate::config::{BalanceScenarioConfig, JitterConfig};
use crate::jitter::Jitter;
use crate::register::{BalanceRegister, OverlapCounter, ReadersPreferenceRegister, RegisterPolicy};
use crate::scenario::run_balance;

fn scenario(
    policy: RegisterPolicy,
    operations: usize,
    jitter: JitterConfig,
) -> BalanceScenarioConfig {
    BalanceScenarioConfig {
        policy,
        initial_balance: 1_000,
        writers: 3,
        readers: 5,
        operations_per_writer: operations,
        samples_per_reader: 200,
        step: 10,
        jitter,
    }
}

#[test]
#[traced_test]
fn readers_preference_reference_scenario_keeps_the_balance() {
    let report = run_balance(&scenario(
        RegisterPolicy::ReadersPreference,
        10_000,
        JitterConfig::disabled(),
    ))
    .expect("scenario failed");
    assert_eq!(report.expected, 1_000);
    assert_eq!(report.actual, 1_000);
    assert_eq!(report.writes, 30_000);
    assert_eq!(report.snapshots, 1_000);
    assert_eq!(report.overlaps, 0);
    assert!(logs_contain("Expected balance=1000, Actual balance=1000"));
}

#[test]
fn synchronized_policies_hold_under_jitter() -> Result<(), Box<dyn Error>> {
    for policy in [RegisterPolicy::ReadersPreference, RegisterPolicy::TaskFair] {
        let report = run_balance(&scenario(policy, 101, JitterConfig::new(60).seeded(11)))?;
        assert_eq!(report.expected, 1_030, "{}", policy);
        assert!(report.is_consistent(), "{}: {:?}", policy, report);
    }
    Ok(())
}

#[test]
fn task_fair_reference_scenario_keeps_the_balance() -> Result<(), Box<dyn Error>> {
    let report = run_balance(&scenario(
        RegisterPolicy::TaskFair,
        10_000,
        JitterConfig::disabled(),
    ))?;
    assert_eq!(report.actual, 1_000);
    assert_eq!(report.overlaps, 0);
    Ok(())
}

#[test]
fn unsynchronized_register_loses_updates() -> Result<(), Box<dyn Error>> {
    // Statistical: a single run may happen to net out, five rarely all do.
    let mut lost = 0;
    let mut breached = 0;
    for trial in 0..5u64 {
        let cfg = BalanceScenarioConfig {
            readers: 2,
            samples_per_reader: 50,
            ..scenario(
                RegisterPolicy::Unsynchronized,
                200,
                JitterConfig::new(200).seeded(trial),
            )
        };
        let report = run_balance(&cfg)?;
        if report.lost_update() {
            lost += 1;
        }
        if report.overlaps > 0 {
            breached += 1;
        }
    }
    assert!(lost > 0, "final balance matched in every unsynchronized run");
    assert!(breached > 0, "no writer ever overlapped another section");
    Ok(())
}

#[test]
fn readers_overlap_each_other_but_never_a_writer() {
    let counter = Arc::new(OverlapCounter::new());
    let register = Arc::new(ReadersPreferenceRegister::with_observer(0, counter.clone()));

    let writers: Vec<_> = (0..2)
        .map(|seed| {
            let register = Arc::clone(&register);
            thread::spawn(move || {
                let mut jitter = Jitter::new(&JitterConfig::new(30).seeded(seed), 0);
                for op in 0..300 {
                    register.apply_delta(if op % 2 == 0 { 7 } else { -7 }, &mut jitter);
                }
            })
        })
        .collect();
    let readers: Vec<_> = (0..4)
        .map(|seed| {
            let register = Arc::clone(&register);
            thread::spawn(move || {
                let mut jitter = Jitter::new(&JitterConfig::new(30).seeded(100 + seed), 1);
                for _ in 0..300 {
                    let seen = register.snapshot(&mut jitter);
                    // Each writer nets to zero after an even number of ops and
                    // is +7 in between, so two writers can only leave 0, 7 or 14.
                    assert!(matches!(seen, 0 | 7 | 14), "torn snapshot {}", seen);
                }
            })
        })
        .collect();

    for h in writers.into_iter().chain(readers) {
        h.join().expect("worker panicked");
    }
    assert_eq!(counter.overlaps(), 0);
    assert_eq!(register.balance(), 0);
    assert_eq!(register.active_readers(), 0);
}
