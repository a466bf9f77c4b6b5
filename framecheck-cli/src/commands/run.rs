use anyhow::{bail, Context, Result};
use colored::*;
use framecheck_core::{
    factory::{CaseResult, PauseOption, PayloadOption, TestFactory},
    scoreboard::Counters,
    sim::{self, SimConfig},
    EthConfig, Timing,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::fs;
use tracing::info;

/// Options of the `run` subcommand
#[derive(Clone, Debug)]
pub struct RunOptions {
    /// Header fields of the simulated module
    pub config: EthConfig,
    /// Pause options; empty means the standard three
    pub pause: Vec<String>,
    /// Payload options; empty means counter plus random
    pub payload: Vec<String>,
    /// Payloads per case
    pub items: usize,
    /// Upper bound for the default random payload option
    pub max_size: usize,
    /// Base seed, entropy when absent
    pub seed: Option<u64>,
    /// Harness timing
    pub timing: Timing,
    /// Simulated module parameters
    pub sim: SimConfig,
    /// JSON report destination
    pub report: Option<String>,
    /// Show a progress bar
    pub progress: bool,
    /// Per-frame debug logging
    pub debug: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            config: EthConfig::default(),
            pause: Vec::new(),
            payload: Vec::new(),
            items: framecheck_core::constants::DEFAULT_ITEMS_PER_CASE,
            max_size: framecheck_core::constants::DEFAULT_MAX_PAYLOAD,
            seed: None,
            timing: Timing::default(),
            sim: SimConfig::default(),
            report: None,
            progress: false,
            debug: false,
        }
    }
}

/// One line of the JSON report
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CaseRecord {
    pub name: String,
    pub pause: String,
    pub payload: String,
    pub seed: Option<u64>,
    pub passed: bool,
    pub error: Option<String>,
    pub counters: Option<Counters>,
    pub dut_frames: Option<u64>,
}

/// Whole-run JSON report
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RunSummary {
    pub config: EthConfig,
    pub timing: Timing,
    pub sim: SimConfig,
    pub cases: Vec<CaseRecord>,
    pub passed: usize,
    pub failed: usize,
}

impl From<CaseResult> for CaseRecord {
    fn from(result: CaseResult) -> Self {
        let case = result.case;
        let (counters, dut_frames, error) = match result.outcome {
            Ok(report) => (Some(report.counters), Some(report.dut_frames), None),
            Err(e) => (None, None, Some(e.to_string())),
        };

        Self {
            name: case.name(),
            pause: case.pause.to_string(),
            payload: case.payload.to_string(),
            seed: case.seed,
            passed: error.is_none(),
            error,
            counters,
            dut_frames,
        }
    }
}

fn build_factory(opts: &RunOptions) -> Result<TestFactory> {
    let pause = if opts.pause.is_empty() {
        PauseOption::all()
    } else {
        opts.pause
            .iter()
            .map(|s| s.parse::<PauseOption>())
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to parse --pause")?
    };

    let payload = if opts.payload.is_empty() {
        vec![
            PayloadOption::Counter,
            PayloadOption::Random {
                max_size: opts.max_size,
            },
        ]
    } else {
        opts.payload
            .iter()
            .map(|s| s.parse::<PayloadOption>())
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to parse --payload")?
    };

    Ok(TestFactory::new()
        .pause_options(pause)
        .payload_options(payload)
        .items(opts.items)
        .seed(opts.seed)
        .timing(opts.timing)
        .debug(opts.debug))
}

/// Run the stimulus matrix against the simulated module and collect the results
pub fn run_matrix(opts: &RunOptions) -> Result<RunSummary> {
    let factory = build_factory(opts)?;
    let cases = factory.cases();
    if cases.is_empty() {
        bail!("No test cases to run");
    }

    info!(
        "Running {} cases of {} items against dst {} src {} type {:#06x}",
        cases.len(),
        opts.items,
        opts.config.dst,
        opts.config.src,
        opts.config.ethertype
    );

    let progress = if opts.progress {
        let pb = ProgressBar::new(cases.len() as u64);
        pb.set_style(
            ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        Some(pb)
    } else {
        None
    };

    let runtime = crate::sim_runtime()?;
    let results = runtime.block_on(factory.run_all(
        |_| sim::spawn(opts.config, opts.sim),
        |result| {
            if let Some(pb) = &progress {
                pb.set_message(result.case.name());
                pb.inc(1);
            }
        },
    ));

    let records: Vec<CaseRecord> = results.into_iter().map(CaseRecord::from).collect();

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    let passed = records.iter().filter(|r| r.passed).count();
    Ok(RunSummary {
        config: opts.config,
        timing: opts.timing,
        sim: opts.sim,
        failed: records.len() - passed,
        passed,
        cases: records,
    })
}

pub fn execute(opts: &RunOptions) -> Result<()> {
    let summary = run_matrix(opts)?;

    println!("\n=== Run Results ===");
    for record in &summary.cases {
        let label = format!(
            "{} (pause={}, payload={})",
            record.name, record.pause, record.payload
        );
        match (&record.counters, &record.error) {
            (Some(c), _) => println!("{} {}  {}/{} frames", "✓".green(), label, c.received, c.sent),
            (None, Some(e)) => println!("{} {}  {}", "✗".red(), label, e),
            (None, None) => println!("{} {}", "?".yellow(), label),
        }
    }

    println!("\n=== Summary ===");
    println!("Passed: {}", summary.passed.to_string().green());
    if summary.failed > 0 {
        println!("Failed: {}", summary.failed.to_string().red());
    } else {
        println!("Failed: {}", summary.failed);
    }

    if let Some(path) = &opts.report {
        let json = serde_json::to_string_pretty(&summary)
            .with_context(|| "Failed to serialize run report")?;
        fs::write(path, json).with_context(|| format!("Failed to write report file: {}", path))?;
        info!("Report written to: {}", path);
    }

    if summary.failed > 0 {
        bail!("{} of {} cases failed", summary.failed, summary.cases.len());
    }

    Ok(())
}
