//! Funnelsync CLI - refresh the funnel dashboard
//!
//! # Commands
//!
//! ```bash
//! funnelsync process                  # Report -> aggregated daily CSV
//! funnelsync publish                  # Aggregated CSV -> Google Sheets
//! funnelsync run                      # Both stages back to back
//! funnelsync inspect report.xlsx      # Show what the loader sees (debug)
//! ```
//!
//! Paths and destination ids come from flags, with environment-variable
//! fallbacks (`FUNNEL_REPORT`, `FUNNEL_PROCESSED`, `FUNNEL_SPREADSHEET_ID`,
//! `FUNNEL_SHEET_RANGE`, `FUNNEL_TOKEN_PATH`); a `.env` file is honored.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use funnelsync::error::PipelineResult;
use funnelsync::pipeline::{process_to_csv, publish_csv};
use funnelsync::sheets::{CredentialStore, SheetTarget};

#[derive(Parser)]
#[command(name = "funnelsync")]
#[command(about = "Aggregate the funnel report and publish it to the dashboard sheet", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read the funnel report and write the aggregated daily CSV
    Process {
        /// Funnel report to read (xlsx or csv)
        #[arg(short, long, env = "FUNNEL_REPORT", default_value = "data/funnel_report.xlsx")]
        input: PathBuf,

        /// Where to write the aggregated CSV
        #[arg(short, long, env = "FUNNEL_PROCESSED", default_value = "data/daily_funnel.csv")]
        output: PathBuf,
    },

    /// Push an aggregated CSV to the dashboard spreadsheet
    Publish {
        /// Aggregated CSV to publish
        #[arg(short, long, env = "FUNNEL_PROCESSED", default_value = "data/daily_funnel.csv")]
        input: PathBuf,

        /// Destination spreadsheet id
        #[arg(long, env = "FUNNEL_SPREADSHEET_ID")]
        spreadsheet_id: String,

        /// Destination range, e.g. "Sheet1!A1"
        #[arg(long, env = "FUNNEL_SHEET_RANGE", default_value = "Sheet1!A1")]
        range: String,

        /// Token file for the Sheets API
        #[arg(long, env = "FUNNEL_TOKEN_PATH", default_value = "token.json")]
        token: PathBuf,
    },

    /// Process the report, then publish the result
    Run {
        /// Funnel report to read (xlsx or csv)
        #[arg(short, long, env = "FUNNEL_REPORT", default_value = "data/funnel_report.xlsx")]
        input: PathBuf,

        /// Where to write the aggregated CSV
        #[arg(short, long, env = "FUNNEL_PROCESSED", default_value = "data/daily_funnel.csv")]
        output: PathBuf,

        /// Destination spreadsheet id
        #[arg(long, env = "FUNNEL_SPREADSHEET_ID")]
        spreadsheet_id: String,

        /// Destination range, e.g. "Sheet1!A1"
        #[arg(long, env = "FUNNEL_SHEET_RANGE", default_value = "Sheet1!A1")]
        range: String,

        /// Token file for the Sheets API
        #[arg(long, env = "FUNNEL_TOKEN_PATH", default_value = "token.json")]
        token: PathBuf,
    },

    /// Load the report and print a summary of what the loader sees
    Inspect {
        /// Report file to inspect
        input: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Process { input, output } => cmd_process(&input, &output),

        Commands::Publish {
            input,
            spreadsheet_id,
            range,
            token,
        } => cmd_publish(&input, spreadsheet_id, range, &token).await,

        Commands::Run {
            input,
            output,
            spreadsheet_id,
            range,
            token,
        } => match cmd_process(&input, &output) {
            Ok(()) => cmd_publish(&output, spreadsheet_id, range, &token).await,
            Err(e) => Err(e),
        },

        Commands::Inspect { input } => cmd_inspect(&input),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_process(input: &Path, output: &Path) -> PipelineResult<()> {
    let outcome = process_to_csv(input, output)?;
    println!(
        "{} report rows -> {} daily records -> {}",
        outcome.rows_read,
        outcome.records.len(),
        output.display()
    );
    Ok(())
}

async fn cmd_publish(
    input: &Path,
    spreadsheet_id: String,
    range: String,
    token: &Path,
) -> PipelineResult<()> {
    let target = SheetTarget {
        spreadsheet_id,
        range,
    };
    let store = CredentialStore::new(token);

    let updated_cells = publish_csv(input, &target, &store).await?;
    println!("{} cells updated", updated_cells);
    Ok(())
}

fn cmd_inspect(input: &Path) -> PipelineResult<()> {
    let table = funnelsync::load_report(input)?;

    println!("{}", input.display());
    println!("  Rows: {}", table.len());
    println!("  Columns ({}):", table.headers.len());
    for (i, header) in table.headers.iter().enumerate() {
        println!("    [{:2}] {}", i + 1, header);
    }
    Ok(())
}
