//! Entry point for the clinic payroll binary.
//!
//! `serve` (the default) starts the HTTP API.  `compute` runs one
//! period from a JSON input file or a directory of CSV exports and
//! prints the breakdown.  Settings come from the environment (see
//! [`clinic_payroll::settings`]); flags override them.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use clinic_payroll::engine::run_payroll;
use clinic_payroll::provider::{
    assemble_input, load_period_input, CsvPeriodProvider, DEFAULT_MASK_PRODUCT,
};
use clinic_payroll::settings::AppSettings;
use clinic_payroll::{api, report, telemetry};
use std::collections::BTreeSet;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "clinic-payroll",
    about = "Monthly payroll and seasonal bonus calculator for clinic staff",
    version
)]
struct Cli {
    /// JSON rule file; overrides PAYROLL_RULES_FILE
    #[arg(long, global = true)]
    rules: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve {
        /// Listen address; overrides PAYROLL_BIND_ADDR
        #[arg(long)]
        addr: Option<String>,
    },
    /// Compute one period and print the result
    Compute(ComputeArgs),
}

#[derive(Args, Debug)]
struct ComputeArgs {
    /// Complete period input as JSON
    #[arg(long, conflicts_with = "period_dir")]
    input: Option<PathBuf>,
    /// Directory holding daily.csv, roster.csv and sales.csv
    #[arg(long)]
    period_dir: Option<PathBuf>,
    /// Formal-staff identifiers (roster positions), comma separated
    #[arg(long, value_delimiter = ',')]
    formal: Vec<String>,
    /// Team-bonus headcount; defaults to the number of formal staff
    #[arg(long)]
    headcount: Option<u32>,
    /// Product name counted as a mask sale
    #[arg(long, default_value = DEFAULT_MASK_PRODUCT)]
    mask_product: String,
    /// Print a plain-text summary instead of JSON
    #[arg(long)]
    text: bool,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let mut settings = AppSettings::load();
    if let Some(rules) = cli.rules {
        settings.rules_file = Some(rules);
    }
    telemetry::init(&settings.log_level)?;

    let rules = settings
        .payroll_rules()
        .context("failed to load payroll rules")?;

    match cli.command.unwrap_or(Command::Serve { addr: None }) {
        Command::Serve { addr } => {
            if let Some(addr) = addr {
                settings.bind_addr = addr;
            }
            api::serve(&settings, rules).await
        }
        Command::Compute(args) => {
            let input = match (&args.input, &args.period_dir) {
                (Some(path), _) => {
                    let mut input = load_period_input(path)
                        .with_context(|| format!("failed to read {}", path.display()))?;
                    if !args.formal.is_empty() {
                        input.formal_staff =
                            args.formal.iter().map(|id| id.trim().to_string()).collect();
                    }
                    if args.headcount.is_some() {
                        input.team_headcount = args.headcount;
                    }
                    input
                }
                (None, Some(dir)) => {
                    let provider =
                        CsvPeriodProvider::new(dir).with_mask_product(args.mask_product.clone());
                    let formal: BTreeSet<String> =
                        args.formal.iter().map(|id| id.trim().to_string()).collect();
                    assemble_input(&provider, formal, args.headcount)
                        .with_context(|| format!("failed to read period {}", dir.display()))?
                }
                (None, None) => bail!("compute needs --input or --period-dir"),
            };

            let result = run_payroll(&input, &rules)?;
            if args.text {
                print!("{}", report::render_text(&result));
            } else {
                println!("{}", serde_json::to_string_pretty(&result)?);
            }
            Ok(())
        }
    }
}
