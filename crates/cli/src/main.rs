mod config;
mod error;
mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::{Local, TimeZone};
use clap::{Parser, Subcommand};
use harness::family::permission_family;
use harness::{CaseReport, Report, Runner};
use policy::PermissionSet;
use storage::{ReportStore, RunId};
use tracing::info;

use config::Config;
use error::{Error, Result};

const CONFIG_FILE: &str = "permbench.toml";
const DB_FILE: &str = "runs.db";

#[derive(Parser)]
#[command(name = "permbench")]
#[command(about = "Run cases under single-permission grants", long_about = None)]
#[command(version)]
struct Cli {
    /// Log level when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the permission family and report each case
    Run {
        /// Raise the ceiling by this permission (repeatable)
        #[arg(short, long)]
        allow: Vec<String>,
        /// Time budget per case in milliseconds (0 disables it)
        #[arg(short, long)]
        timeout_ms: Option<u64>,
        /// Do not persist the report
        #[arg(long)]
        no_store: bool,
    },
    /// List stored runs
    Runs {
        /// Show only the last N runs
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
    /// Show the cases of a stored run
    Show {
        /// Run ID (prefix match supported)
        #[arg(short, long)]
        run: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = load_config()?;

    match cli.command {
        Some(Commands::Run {
            allow,
            timeout_ms,
            no_store,
        }) => cmd_run(&config, &allow, timeout_ms, no_store).await,
        None => cmd_run(&config, &[], None, false).await,
        Some(Commands::Runs { limit }) => cmd_runs(&config, limit).map(|()| ExitCode::SUCCESS),
        Some(Commands::Show { run }) => cmd_show(&config, &run).map(|()| ExitCode::SUCCESS),
    }
}

async fn cmd_run(
    config: &Config,
    allow: &[String],
    timeout_ms: Option<u64>,
    no_store: bool,
) -> Result<ExitCode> {
    let registry = permission_family()?;
    let ceiling = config
        .runner
        .ceiling()
        .union(&PermissionSet::from_names(allow)?);

    let mut runner = Runner::new().with_ceiling(ceiling);
    let timeout = match timeout_ms {
        Some(0) => None,
        Some(ms) => Some(std::time::Duration::from_millis(ms)),
        None => config.runner.timeout(),
    };
    runner = match timeout {
        Some(timeout) => runner.with_timeout(timeout),
        None => runner.without_timeout(),
    };

    println!("permbench v{}", env!("CARGO_PKG_VERSION"));
    println!("Ceiling: {ceiling}\n");

    let report = runner.run_all(&registry).await;
    print_report(&report);

    if !no_store {
        let db_path = db_path(config);
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let store = ReportStore::open(&db_path)?;
        let run_id = store.save_report(&report)?;
        info!(run = %run_id, path = %db_path.display(), "Report stored");
        println!("\nRun ID: {run_id}");
    }

    Ok(if report.all_passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn cmd_runs(config: &Config, limit: usize) -> Result<()> {
    let store = open_store(config)?;
    let runs = store.list_runs()?;

    if runs.is_empty() {
        println!("No runs found.");
        return Ok(());
    }

    println!(
        "{:<36}  {:<20}  {:<6}  {:<10}  STATUS",
        "RUN ID", "STARTED", "CASES", "NOT PASSED"
    );
    println!("{}", "-".repeat(90));

    for summary in runs.into_iter().take(limit) {
        let started = Local
            .from_utc_datetime(&summary.started_at.naive_utc())
            .format("%Y-%m-%d %H:%M");
        let status = if summary.finished_at.is_some() {
            "finished"
        } else {
            "incomplete"
        };
        println!(
            "{:<36}  {:<20}  {:<6}  {:<10}  {status}",
            summary.id, started, summary.case_count, summary.not_passed
        );
    }

    Ok(())
}

fn cmd_show(config: &Config, run_prefix: &str) -> Result<()> {
    let store = open_store(config)?;

    // Find run by prefix
    let runs = store.list_runs()?;
    let matching: Vec<_> = runs
        .iter()
        .filter(|r| r.id.to_string().starts_with(run_prefix))
        .collect();

    let run_id: RunId = match matching.len() {
        0 => {
            return Err(Error::RunNotFound {
                prefix: run_prefix.to_string(),
            });
        }
        1 => matching[0].id,
        _ => {
            return Err(Error::AmbiguousRun {
                prefix: run_prefix.to_string(),
                matches: matching.iter().map(|r| r.id.to_string()).collect(),
            });
        }
    };

    let report = store.load_report(run_id)?;
    if report.is_empty() {
        println!("No cases recorded for run {run_id}");
        return Ok(());
    }

    println!("Run: {run_id}\n");
    print_report(&report);
    Ok(())
}

fn print_report(report: &Report) {
    for case in report.iter() {
        print_case(case);
    }
    println!(
        "\n{} cases, {} passed, {} not passed",
        report.len(),
        report.len() - report.not_passed(),
        report.not_passed()
    );
}

fn print_case(case: &CaseReport) {
    let timing = case
        .elapsed_ms
        .map(|ms| format!(" ({ms}ms)"))
        .unwrap_or_default();
    println!("{:<8} {}{timing}", case.name, case.outcome);
}

fn open_store(config: &Config) -> Result<ReportStore> {
    let db_path = db_path(config);

    if !db_path.exists() {
        return Err(Error::DatabaseNotFound { path: db_path });
    }

    Ok(ReportStore::open(&db_path)?)
}

fn db_path(config: &Config) -> PathBuf {
    config.storage.path.clone().unwrap_or_else(|| {
        dirs_data_dir()
            .unwrap_or_else(|| ".permbench".into())
            .join(DB_FILE)
    })
}

fn dirs_data_dir() -> Option<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".local/share/permbench"))
    }
    #[cfg(target_os = "linux")]
    {
        std::env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".local/share")))
            .map(|p| p.join("permbench"))
    }
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|h| PathBuf::from(h).join("permbench"))
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        None
    }
}

fn load_config() -> Result<Config> {
    let config_path = PathBuf::from(CONFIG_FILE);

    if config_path.exists() {
        Ok(Config::load(&config_path)?)
    } else {
        Ok(Config::default())
    }
}
