//! `scribe` command-line entry point.

mod cli;

use anyhow::Context as _;
use clap::Parser as _;
use cli::{Cli, Command};
use scribe_browser::ChromiumFactory;
use scribe_core::AppConfig;
use scribe_harvester::{Harvester, RunOptions, RunSummary};
use scribe_ledger::Ledger;
use std::process::ExitCode;
use std::sync::Arc;

/// Conventional exit status after SIGINT.
const EXIT_INTERRUPTED: u8 = 130;

fn init_tracing(debug: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let default = if debug { "debug" } else { "info,scribe=debug" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();
}

fn load_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path)
            .with_context(|| format!("load config {}", path.display()))?,
        None => AppConfig::load().context("load config")?,
    };
    Ok(config.with_env())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);
    tracing::debug!(?cli, "parsed cli");

    tokio::select! {
        result = try_main(cli) => match result {
            Ok(code) => code,
            Err(err) => {
                tracing::error!("{err:#}");
                ExitCode::FAILURE
            }
        },
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted, progress so far is saved in the ledger");
            ExitCode::from(EXIT_INTERRUPTED)
        }
    }
}

async fn try_main(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = load_config(&cli)?;

    match cli.command {
        Command::Status => {
            print_status(&config);
            Ok(ExitCode::SUCCESS)
        }
        Command::Run(args) => {
            tracing::info!("Starting Scribe v{}", env!("CARGO_PKG_VERSION"));
            let harvester = harvester(config);
            let options = RunOptions {
                reset: args.reset,
                quick: args.quick,
                limit: args.num,
            };
            let summary = harvester.run(&options).await.context("sequential run")?;
            Ok(report(&summary))
        }
        Command::Parallel(args) => {
            tracing::info!("Starting Scribe v{} (parallel)", env!("CARGO_PKG_VERSION"));
            let workers = args.workers.unwrap_or(config.download.workers);
            let harvester = harvester(config);
            let summary = harvester
                .run_parallel(workers)
                .await
                .context("parallel run")?;
            Ok(report(&summary))
        }
    }
}

fn harvester(config: AppConfig) -> Harvester {
    let factory = Arc::new(ChromiumFactory::new(config.browser.clone()));
    Harvester::new(config, factory)
}

fn report(summary: &RunSummary) -> ExitCode {
    println!(
        "Processed {}: {} successful, {} failed",
        summary.processed, summary.successful, summary.failed
    );
    println!("Ledger: {}", summary.stats);
    if summary.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn print_status(config: &AppConfig) {
    let ledger = Ledger::load(&config.paths.state_file);
    println!("Ledger: {}", ledger.path().display());
    println!("{}", ledger.stats());
    println!("Last discovery found {} items", ledger.total_found());
    if let Some(created) = ledger.session_created() {
        println!("Session created: {}", created.to_rfc3339());
    }
    if let Some(last) = ledger.last_run() {
        println!("Last saved: {}", last.to_rfc3339());
    }
    if let Some(run) = ledger.run_history().last() {
        println!(
            "Last run {}: {} processed, {} successful, {} failed",
            run.timestamp.to_rfc3339(),
            run.processed,
            run.successful,
            run.failed
        );
    }
}
