mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use commands::cmo::{CmoArgs, PacArgs};
use commands::collateral::{ArmArgs, PoIoArgs};
use commands::export::ExportArgs;
use commands::fixed_income::{FloaterArgs, SpotCurveArgs};
use commands::prepayment::{CompositionArgs, CprCurveArgs};
use commands::waterfall::WaterfallArgs;

/// Environment variable holding a tracing filter directive.
const LOG_ENV: &str = "MBS_LOG";

/// Mortgage pass-through and CMO cash-flow waterfalls
#[derive(Parser)]
#[command(
    name = "mbs",
    version,
    about = "Mortgage pass-through and CMO cash-flow waterfalls",
    long_about = "Projects monthly collateral cash flows under CPR/PSA prepayment curves, \
                  allocates them to sequential, accrual, PAC and support tranches, and \
                  exports the schedule as data_result.csv."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log level when MBS_LOG is unset (error, warn, info, debug, trace)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Project the collateral pass-through waterfall
    Waterfall(WaterfallArgs),
    /// Write a schedule to data_result.csv
    Export(ExportArgs),
    /// Build a monthly CPR/SMM curve from a description
    CprCurve(CprCurveArgs),
    /// Pool prepayment speed from a fast/slow borrower mix
    Composition(CompositionArgs),
    /// Sequential-pay CMO with optional accrual bond and pro-rata splits
    Cmo(CmoArgs),
    /// PAC/support split from PSA protection bands
    Pac(PacArgs),
    /// Principal-only / interest-only split of pool cohorts
    PoIo(PoIoArgs),
    /// ARM coupon resets with periodic caps
    Arm(ArmArgs),
    /// Bootstrap annual spot rates from par yields
    SpotCurve(SpotCurveArgs),
    /// Floater / inverse floater coupons at an index level
    Floater(FloaterArgs),
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

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Waterfall(args) => commands::waterfall::run_waterfall(args),
        Commands::Export(args) => commands::export::run_export(args),
        Commands::CprCurve(args) => commands::prepayment::run_cpr_curve(args),
        Commands::Composition(args) => commands::prepayment::run_composition(args),
        Commands::Cmo(args) => commands::cmo::run_cmo(args),
        Commands::Pac(args) => commands::cmo::run_pac(args),
        Commands::PoIo(args) => commands::collateral::run_po_io(args),
        Commands::Arm(args) => commands::collateral::run_arm(args),
        Commands::SpotCurve(args) => commands::fixed_income::run_spot_curve(args),
        Commands::Floater(args) => commands::fixed_income::run_floater(args),
        Commands::Version => {
            println!("mbs {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result.and_then(|value| output::format_output(&cli.output, &value)) {
        Ok(()) => process::exit(0),
        Err(e) => {
            tracing::debug!(error = ?e, "command failed");
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
