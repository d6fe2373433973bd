mod cmd;
mod core;
mod forecast;
mod import;
mod matching;
mod store;
mod tax;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "cgtau", version, about = "Australian Capital Gains Tax calculator for share trading")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse and validate a trades CSV
    Import(cmd::import::ImportCommand),
    /// Match sells against parcels and show the allocations
    Match(cmd::matching::MatchCommand),
    /// Compare CGT outcomes for a hypothetical sell
    Forecast(cmd::forecast::ForecastCommand),
    /// Financial-year CGT summary
    Report(cmd::report::ReportCommand),
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Command::Import(cmd) => cmd.exec(),
        Command::Match(cmd) => cmd.exec(),
        Command::Forecast(cmd) => cmd.exec(),
        Command::Report(cmd) => cmd.exec(),
    }
}
