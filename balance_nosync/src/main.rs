use std::error::Error;
use std::path::Path;

use clap::Parser;
use tracing::info;

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
    cfg.policy = RegisterPolicy::Unsynchronized;

    let report = scenario::run_balance(&cfg)?;
    if report.lost_update() {
        info!(
            "-> balance is off by {}: updates were lost to a race",
            report.actual - report.expected
        );
    }
    Ok(())
}
