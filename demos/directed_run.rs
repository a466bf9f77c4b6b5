//! Directed run against the simulated encapsulator

use framecheck_core::{bus::DeviceUnderTest, scenarios, sim, EthConfig, Harness, Timing};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Framecheck Directed Run Example\n");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()?;

    let report = runtime.block_on(async {
        let bench = sim::spawn(EthConfig::default(), sim::SimConfig::default())?;
        let config = bench.dut.config();
        println!("Module header: dst {}, src {}, type {:#06x}", config.dst, config.src, config.ethertype);

        let mut harness = Harness::new(bench, Timing::default());
        harness.launch().await?;
        scenarios::basic(&mut harness).await?;
        harness.finish().await
    })?;

    println!(
        "Sent {} frames, received {}, {} errors",
        report.counters.sent, report.counters.received, report.counters.errors
    );
    println!("Use 'framecheck run' to drive the full stimulus matrix");

    Ok(())
}
