use anyhow::{bail, Result};
use colored::*;
use framecheck_core::{
    scenarios,
    sim::{self, SimConfig},
    EthConfig, Harness, HarnessError, RunReport, Timing,
};
use tracing::info;

/// Directed scenario selectable from the command line
#[derive(Copy, Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Scenario {
    /// Single, repeated, short and 64-byte frames
    Basic,
    /// Odd-sized frames under the fixed-cycle pause pattern
    Idles,
}

impl Scenario {
    fn name(&self) -> &'static str {
        match self {
            Scenario::Basic => "basic",
            Scenario::Idles => "idles",
        }
    }
}

async fn run_one(
    scenario: Scenario,
    config: EthConfig,
    timing: Timing,
    sim: SimConfig,
    debug: bool,
) -> Result<RunReport, HarnessError> {
    let bench = sim::spawn(config, sim)?;
    let mut harness = Harness::new(bench, timing).with_debug(debug);
    harness.launch().await?;

    match scenario {
        Scenario::Basic => scenarios::basic(&mut harness).await?,
        Scenario::Idles => scenarios::idles(&mut harness).await?,
    }

    harness.finish().await
}

/// Run the selected scenarios, each on a fresh module; returns how many failed
pub fn run_scenarios(
    scenarios: &[Scenario],
    config: EthConfig,
    timing: Timing,
    sim: SimConfig,
    debug: bool,
) -> Result<usize> {
    let runtime = crate::sim_runtime()?;
    let mut failed = 0;

    for scenario in scenarios {
        info!("Running directed scenario {}", scenario.name());

        match runtime.block_on(run_one(*scenario, config, timing, sim, debug)) {
            Ok(report) => println!(
                "{} {:<8} {} frames",
                "✓".green(),
                scenario.name(),
                report.counters.received
            ),
            Err(e) => {
                failed += 1;
                println!("{} {:<8} {}", "✗".red(), scenario.name(), e);
            }
        }
    }

    Ok(failed)
}

pub fn execute(
    scenarios: &[Scenario],
    config: EthConfig,
    timing: Timing,
    sim: SimConfig,
    debug: bool,
) -> Result<()> {
    let failed = run_scenarios(scenarios, config, timing, sim, debug)?;
    if failed > 0 {
        bail!("{} of {} directed scenarios failed", failed, scenarios.len());
    }
    Ok(())
}
