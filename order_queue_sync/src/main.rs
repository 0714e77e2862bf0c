use std::error::Error;
use std::path::Path;

use clap::Parser;
use tracing::{error, info};

use contention::config::{self, QueueScenarioConfig};
use contention::queue::QueuePolicy;
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
    let mut cfg: QueueScenarioConfig = config::load(opts.config.as_deref().map(Path::new))?;
    cfg.policy = QueuePolicy::Blocking;
    info!("Producers wait on a full buffer and consumers on an empty one; no WARNING or ERROR line is expected.");

    let report = scenario::run_order_queue(&cfg)?;
    if !report.is_consistent() {
        error!(
            "synchronized queue lost or duplicated orders: duplicated={:?}, missing={:?}",
            report.duplicate_ids(),
            report.missing_ids()
        );
    }
    Ok(())
}
