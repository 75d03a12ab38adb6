mod commands;
mod config;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use chipfin_core::dashboard::ArtifactCache;
use commands::collect::CollectArgs;
use commands::dashboard::{MetricArgs, OverviewArgs, RowsArgs};
use commands::normalize::{NormalizeArgs, TidyArgs};

/// Quarterly financials for a semiconductor peer group
#[derive(Parser)]
#[command(
    name = "chipfin",
    version,
    about = "Quarterly financials for a semiconductor peer group",
    long_about = "Collects quarterly Revenue, COGS, Gross Profit, Inventory and Cash \
                  for WDC, MU, TSM and INTC, normalizes them to millions with a derived \
                  Inventory Turnover, and answers dashboard queries over the saved \
                  artifact with decimal precision."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log progress to stderr (RUST_LOG overrides)
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch facts from the configured sources and save the wide artifact
    Collect(CollectArgs),
    /// Normalize raw facts into per-company-period records
    Normalize(NormalizeArgs),
    /// Melt an artifact into Company, Date, Metric, Value rows
    Tidy(TidyArgs),
    /// Headline averages and portfolio inventory turnover
    Overview(OverviewArgs),
    /// Average of one metric per company
    Compare(MetricArgs),
    /// Count, mean, median, std, min and max of one metric per company
    Stats(MetricArgs),
    /// Quarter-over-quarter growth of one metric
    Growth(MetricArgs),
    /// Correlation of one metric between companies
    Correlation(MetricArgs),
    /// Filtered tidy rows
    Rows(RowsArgs),
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

fn init_tracing(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut cache = ArtifactCache::new();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Collect(args) => commands::collect::run_collect(args),
        Commands::Normalize(args) => commands::normalize::run_normalize(args),
        Commands::Tidy(args) => commands::normalize::run_tidy(args),
        Commands::Overview(args) => commands::dashboard::run_overview(args, &mut cache),
        Commands::Compare(args) => commands::dashboard::run_compare(args, &mut cache),
        Commands::Stats(args) => commands::dashboard::run_stats(args, &mut cache),
        Commands::Growth(args) => commands::dashboard::run_growth(args, &mut cache),
        Commands::Correlation(args) => commands::dashboard::run_correlation(args, &mut cache),
        Commands::Rows(args) => commands::dashboard::run_rows(args, &mut cache),
        Commands::Version => {
            println!("chipfin {}", env!("CARGO_PKG_VERSION"));
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
