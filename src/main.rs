use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::{json, Value};

use cyclecalc::commands::{self, AppState, CommandError, Settings};
use cyclecalc::config::Config;
use cyclecalc::logging;
use cyclecalc::storage::Vault;
use cyclecalc::validation::CalculationRequest;

const PASSPHRASE_ENV: &str = "CYCLECALC_PASSPHRASE";

/// Period, ovulation and fertile-window predictions with a private local history.
#[derive(Parser, Debug)]
#[command(name = "cyclecalc", version, about)]
struct Cli {
    /// Config file (defaults to <config_dir>/cyclecalc/config.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase log verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the encrypted history vault
    Setup,
    /// Predict the current cycle and save it to history
    Calculate {
        #[command(flatten)]
        cycle: CycleArgs,

        /// Do not save the result
        #[arg(long)]
        no_save: bool,
    },
    /// Day-by-day calendar starting at the last period date
    Calendar {
        #[command(flatten)]
        cycle: CycleArgs,
    },
    /// Most recent saved calculations
    History,
    /// Show one saved calculation
    Show { id: u64 },
    /// Delete one saved calculation
    Delete { id: u64 },
    /// Dump the whole history as JSON
    Export,
    /// Permanently delete the vault
    Wipe,
}

#[derive(Args, Debug)]
struct CycleArgs {
    /// Days between period starts (21-45)
    #[arg(long)]
    cycle_length: i64,

    /// Days of bleeding (2-10)
    #[arg(long)]
    period_duration: i64,

    /// First day of the last period (YYYY-MM-DD)
    #[arg(long)]
    last_period_date: String,

    /// Age in years (10-60)
    #[arg(long)]
    age: i64,
}

impl From<CycleArgs> for CalculationRequest {
    fn from(args: CycleArgs) -> Self {
        Self {
            cycle_length: Some(args.cycle_length),
            period_duration: Some(args.period_duration),
            last_period_date: Some(args.last_period_date),
            age: Some(args.age),
        }
    }
}

fn passphrase() -> Result<String> {
    std::env::var(PASSPHRASE_ENV).with_context(|| format!("{PASSPHRASE_ENV} is not set"))
}

fn unlock(state: &AppState) -> Result<()> {
    if !commands::is_setup(state) {
        bail!("no history vault yet; run `cyclecalc setup` first");
    }
    if !commands::unlock(passphrase()?, state)? {
        bail!("wrong passphrase");
    }
    Ok(())
}

fn run(command: Command, state: &AppState) -> Result<Value> {
    let today = chrono::Local::now().date_naive();

    let output = match command {
        Command::Setup => {
            if commands::is_setup(state) {
                bail!("a history vault already exists");
            }
            commands::setup(passphrase()?, state)?;
            json!({ "success": true, "message": "Vault created" })
        }
        Command::Calculate { cycle, no_save } => {
            if !no_save {
                unlock(state)?;
            }
            let response = commands::calculate(&cycle.into(), today, !no_save, state)?;
            json!({ "success": true, "data": response.data, "record_id": response.record_id })
        }
        Command::Calendar { cycle } => {
            let response = commands::calendar(&cycle.into(), today, state)?;
            json!({ "success": true, "data": response })
        }
        Command::History => {
            unlock(state)?;
            json!({ "success": true, "data": commands::history(state)? })
        }
        Command::Show { id } => {
            unlock(state)?;
            json!({ "success": true, "data": commands::show(id, state)? })
        }
        Command::Delete { id } => {
            unlock(state)?;
            commands::destroy(id, state)?;
            json!({ "success": true, "message": "Record deleted successfully" })
        }
        Command::Export => {
            unlock(state)?;
            let exported: Value = serde_json::from_str(&commands::export_data(state)?)?;
            json!({ "success": true, "data": exported })
        }
        Command::Wipe => {
            commands::wipe_all_data(state)?;
            json!({ "success": true, "message": "All data wiped" })
        }
    };

    commands::lock(state);
    Ok(output)
}

fn failure(err: &anyhow::Error) -> Value {
    match err.downcast_ref::<CommandError>() {
        Some(CommandError::Validation(v)) => {
            json!({ "success": false, "message": "Validation failed", "errors": v.errors })
        }
        _ => json!({ "success": false, "message": err.to_string() }),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config_path = cli.config.clone().or_else(Config::default_path);
    let config = match config_path {
        Some(path) => Config::load(&path),
        None => Ok(Config::default()),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    logging::init(
        &logging::effective_level(&config.log, cli.verbose),
        config.log.format,
    );

    let result = config
        .data_dir()
        .map_err(anyhow::Error::from)
        .and_then(|dir| {
            tracing::debug!(data_dir = %dir.display(), "using data directory");
            let settings = Settings {
                history_limit: config.history_limit,
                calendar_months: config.calendar_months,
                user_id: config.user_id,
            };
            let state = AppState::new(Vault::new(dir), settings);
            run(cli.command, &state)
        });

    match result {
        Ok(output) => {
            println!("{output:#}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            println!("{:#}", failure(&e));
            ExitCode::FAILURE
        }
    }
}
