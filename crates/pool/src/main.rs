//! BiLend CLI - Main entry point

use bilend_events::{EventSink, JsonLinesSink};
use bilend_pool::{ProtocolConfig, Scenario};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "bilend")]
#[command(about = "BiLend - Multi-asset lending core", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print an example protocol configuration
    Config,

    /// Run a JSON scenario against a fresh in-memory pool
    Simulate {
        /// Scenario file path
        #[arg(short, long)]
        scenario: PathBuf,

        /// Also append every event to this JSONL file
        #[arg(long)]
        events: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config => {
            let config = ProtocolConfig::example();
            println!("{}", serde_json::to_string_pretty(&config)?);
        }

        Commands::Simulate { scenario, events } => {
            let scenario = Scenario::from_file(&scenario)?;

            let mut sinks: Vec<Box<dyn EventSink>> = Vec::new();
            if let Some(path) = events {
                sinks.push(Box::new(JsonLinesSink::open(path)?));
            }

            let report = scenario.run(sinks)?;
            println!("{}", serde_json::to_string_pretty(&report)?);

            let rejected = report.rejected().count();
            if rejected > 0 {
                eprintln!("{rejected} step(s) rejected");
            }
        }
    }

    Ok(())
}
