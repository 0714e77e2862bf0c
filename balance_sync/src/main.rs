use std::error::Error;
use std::path::Path;

use clap::Parser;
use tracing::{error, warn};

use contention::config::{self, BalanceScenarioConfig};
use contention::register::RegisterPolicy;
use contention::{scenario, telemetry};

#[derive(clap::Parser)]
#[clap()]
struct Opts {
    #[clap(short = 'c', long = "config")]
    config: Option<String>,
}

fn main() -> Result<(), Box<dyn Error>> {
    telemetry::init();
    let opts: Opts = Opts::parse();
    let mut cfg: BalanceScenarioConfig = config::load(opts.config.as_deref().map(Path::new))?;
    if !cfg.policy.is_synchronized() {
        warn!(
            "policy {} is not available here, using readers-preference",
            cfg.policy
        );
        cfg.policy = RegisterPolicy::ReadersPreference;
    }

    let report = scenario::run_balance(&cfg)?;
    if !report.is_consistent() {
        error!(
            "synchronized register broke exclusion: expected={}, actual={}, breaches={}",
            report.expected, report.actual, report.overlaps
        );
    }
    Ok(())
}
