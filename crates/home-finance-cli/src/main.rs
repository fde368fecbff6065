mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::analysis::{AnalyzeArgs, RiskArgs, StressArgs};
use commands::loan::{AmortizeArgs, StrategiesArgs};

/// Mortgage and buy-vs-rent decision analytics
#[derive(Parser)]
#[command(
    name = "hfa",
    version,
    about = "Mortgage and buy-vs-rent decision analytics",
    long_about = "A CLI for modelling a mortgage against a rent-and-invest \
                  alternative with decimal precision. Supports composite-loan \
                  amortization, prepayment strategy comparison, opportunity-cost \
                  simulation, affordability risk scoring, and stress testing."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Amortize a single loan, optionally with a lump-sum prepayment
    Amortize(AmortizeArgs),
    /// Compare prepayment strategies against the no-prepayment baseline
    Strategies(StrategiesArgs),
    /// Run the full buy-vs-rent investment analysis
    Analyze(AnalyzeArgs),
    /// Rerun an analysis under adverse stress scenarios
    Stress(StressArgs),
    /// Score affordability risk
    Risk(RiskArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    let cli = Cli::parse();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Amortize(args) => commands::loan::run_amortize(args),
        Commands::Strategies(args) => commands::loan::run_strategies(args),
        Commands::Analyze(args) => commands::analysis::run_analyze(args),
        Commands::Stress(args) => commands::analysis::run_stress(args),
        Commands::Risk(args) => commands::analysis::run_risk(args),
        Commands::Version => {
            println!("hfa {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
