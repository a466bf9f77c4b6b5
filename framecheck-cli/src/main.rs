use anyhow::Result;
use clap::{Parser, Subcommand};
use framecheck_cli::{
    commands::{self, directed::Scenario, run::RunOptions},
    load_timing, HeaderArgs,
};
use framecheck_core::sim::{Fault, SimConfig};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "framecheck")]
#[command(about = "Framecheck - Verification harness for an Ethernet header encapsulator", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pause × payload matrix against the simulated encapsulator
    Run {
        #[command(flatten)]
        header: HeaderArgs,

        /// Pause option: none, cycle, random[:p] (repeatable)
        #[arg(long)]
        pause: Vec<String>,

        /// Payload option: counter, random[:max_size] (repeatable)
        #[arg(long)]
        payload: Vec<String>,

        /// Payloads per case
        #[arg(long, default_value = "64")]
        items: usize,

        /// Upper bound (exclusive) for random payload length
        #[arg(long, default_value = "64")]
        max_size: usize,

        /// Base seed for random generators
        #[arg(long)]
        seed: Option<u64>,

        /// JSON file with harness timing overrides
        #[arg(long)]
        timing: Option<String>,

        /// Bytes per bus beat
        #[arg(long, default_value = "8")]
        width: usize,

        /// Inject a fault: corrupt:N[:OFFSET], drop:N or duplicate:N
        #[arg(long)]
        fault: Option<Fault>,

        /// Write a JSON report
        #[arg(short, long)]
        report: Option<String>,

        /// Show progress bar
        #[arg(long)]
        progress: bool,
    },

    /// Run the directed scenarios
    Directed {
        #[command(flatten)]
        header: HeaderArgs,

        /// Scenarios to run (default: all)
        #[arg(long, value_enum)]
        scenario: Vec<Scenario>,

        /// JSON file with harness timing overrides
        #[arg(long)]
        timing: Option<String>,

        /// Inject a fault: corrupt:N[:OFFSET], drop:N or duplicate:N
        #[arg(long)]
        fault: Option<Fault>,
    },

    /// Print the frame expected for a payload
    Expect {
        #[command(flatten)]
        header: HeaderArgs,

        /// Payload as hex, e.g. 01020304
        #[arg(short, long)]
        payload: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    // Execute command
    match cli.command {
        Commands::Run {
            header,
            pause,
            payload,
            items,
            max_size,
            seed,
            timing,
            width,
            fault,
            report,
            progress,
        } => {
            let opts = RunOptions {
                config: header.config(),
                pause,
                payload,
                items,
                max_size,
                seed,
                timing: load_timing(timing.as_deref())?,
                sim: SimConfig {
                    width,
                    fault,
                    ..SimConfig::default()
                },
                report,
                progress,
                debug: cli.verbose,
            };
            commands::run::execute(&opts)
        }

        Commands::Directed {
            header,
            scenario,
            timing,
            fault,
        } => {
            let scenarios = if scenario.is_empty() {
                vec![Scenario::Basic, Scenario::Idles]
            } else {
                scenario
            };
            let sim = SimConfig {
                fault,
                ..SimConfig::default()
            };
            commands::directed::execute(
                &scenarios,
                header.config(),
                load_timing(timing.as_deref())?,
                sim,
                cli.verbose,
            )
        }

        Commands::Expect { header, payload } => commands::expect::execute(&payload, &header.config()),
    }
}
