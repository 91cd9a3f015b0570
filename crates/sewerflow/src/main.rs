use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::area::{handle_area_command, AreaArgs};
use commands::hydraulics::{handle_hydraulics_command, HydraulicsArgs};
use commands::qc::{handle_qc_command, QcArgs};
use commands::summarize::{handle_summarize_command, SummarizeArgs};

#[derive(Parser, Debug)]
#[command(author, version, about = "Sewer monitor quality control and hydraulics", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run range, spike, flatline and gap checks over monitor exports
    Qc(QcArgs),
    /// Derive flow area, discharge and velocity from depth readings
    Hydraulics(HydraulicsArgs),
    /// Print per-parameter statistics for monitor exports
    Summarize(SummarizeArgs),
    /// Single-point wetted area calculation
    Area(AreaArgs),
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Qc(args) => handle_qc_command(&args),
        Command::Hydraulics(args) => handle_hydraulics_command(&args),
        Command::Summarize(args) => handle_summarize_command(&args),
        Command::Area(args) => handle_area_command(&args),
    }
}
