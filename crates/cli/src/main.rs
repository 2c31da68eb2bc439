use anyhow::Result;
use auditor_core::config;
use auditor_core::pipeline::{self, PipelineSummary, Selection};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run { json } => report(pipeline::run(&cfg, Selection::All).await?, json),
        Commands::Submission { number, json } => {
            report(pipeline::run(&cfg, Selection::One(number)).await?, json)
        }
        Commands::Range { start, end, json } => {
            report(pipeline::run(&cfg, Selection::Range(start, end)).await?, json)
        }
        Commands::Batch { file, json } => {
            report(pipeline::run(&cfg, Selection::FromFile(file)).await?, json)
        }
    }
}

#[derive(Parser)]
#[command(name = "device-auditor")]
#[command(about = "Security analysis of AI-enabled medical device filings", long_about = None)]
struct Cli {
    /// Path to config TOML
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyse every filing in the device index
    Run {
        /// Output JSON summary
        #[arg(long)]
        json: bool,
    },
    /// Analyse a single filing by submission number
    Submission {
        /// Submission number, e.g. K213456
        number: String,
        /// Output JSON summary
        #[arg(long)]
        json: bool,
    },
    /// Analyse a row range of the device index (zero-based, end exclusive)
    Range {
        start: usize,
        end: usize,
        /// Output JSON summary
        #[arg(long)]
        json: bool,
    },
    /// Analyse the submissions listed in a file, one per line
    Batch {
        /// Path to the submission list
        file: PathBuf,
        /// Output JSON summary
        #[arg(long)]
        json: bool,
    },
}

fn report(summary: PipelineSummary, json: bool) -> Result<()> {
    if json {
        let summary_json = serde_json::json!({
            "status": "ok",
            "processed": summary.processed,
            "succeeded": summary.succeeded,
            "failed": summary.failed,
            "output_csv": summary.output_csv,
            "finished_at": chrono::Utc::now().to_rfc3339(),
        });
        println!("{}", serde_json::to_string_pretty(&summary_json)?);
    } else {
        println!(
            "analysed {} filings: {} succeeded, {} failed, report at {}",
            summary.processed, summary.succeeded, summary.failed, summary.output_csv
        );
    }
    Ok(())
}
