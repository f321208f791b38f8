use std::process::ExitCode;
use std::thread;

use clap::{Parser, Subcommand};
use error_stack::{bail, Report, Result, ResultExt};
use thiserror::Error;
use tracing::{error, info, warn, Level};
use tracing_subscriber::{filter::Targets, layer::SubscriberExt, util::SubscriberInitExt, Registry};

use pge_balance::application::{check_credentials, BalanceMonitor, RefreshOutcome};
use pge_balance::infrastructure::config::{AppConfig, DEFAULT_CONFIG_FILE};
use pge_balance::infrastructure::portal::PortalEndpoints;
use pge_balance::BalanceRetriever;

#[derive(Parser)]
#[command(
    name = "pge-balance",
    about = "Reads the outstanding balance of a PGE eBOK account",
    version
)]
struct Cli {
    /// Configuration file, without or with extension
    #[arg(long, short, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: String,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the current balance once
    Fetch {
        /// Print the balance as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check that the configured credentials are accepted by the portal
    Check,
    /// Keep refreshing the balance on the configured schedule
    Watch,
}

#[derive(Error, Debug)]
enum CliError {
    #[error("Failed to load configuration")]
    Config,
    #[error("Failed to set up the balance retriever")]
    Setup,
    #[error("Failed to fetch balance")]
    Fetch,
    #[error("Credentials were not accepted")]
    Credentials,
    #[error("Failed to serialize output")]
    Output,
    #[error("Monitoring halted, fix the login problem and restart")]
    Halted,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(report) => {
            error!("{:?}", report);
            ExitCode::FAILURE
        }
    }
}

fn setup_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };

    Registry::default()
        .with(Targets::new().with_target("pge_balance", level))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = AppConfig::load(&cli.config).change_context(CliError::Config)?;
    let mut retriever = build_retriever(&config)?;

    match cli.command {
        Commands::Fetch { json } => {
            let balance = retriever
                .get_balance_details()
                .change_context(CliError::Fetch)?;
            if json {
                let output = serde_json::to_string_pretty(&balance).change_context(CliError::Output)?;
                println!("{}", output);
            } else {
                println!("{}", balance);
            }
            Ok(())
        }
        Commands::Check => {
            let check = check_credentials(&mut retriever);
            println!("{}", check.user_message());
            if !check.is_valid() {
                bail!(CliError::Credentials);
            }
            Ok(())
        }
        Commands::Watch => watch(BalanceMonitor::new(retriever, config.refresh.policy())),
    }
}

fn build_retriever(config: &AppConfig) -> Result<BalanceRetriever, CliError> {
    let endpoints =
        PortalEndpoints::from_base(&config.portal.base_url).change_context(CliError::Setup)?;
    BalanceRetriever::with_endpoints(
        &config.portal.username,
        &config.portal.password,
        config.portal.timeout(),
        endpoints,
    )
    .change_context(CliError::Setup)
}

fn watch(mut monitor: BalanceMonitor<BalanceRetriever>) -> Result<(), CliError> {
    loop {
        let outcome = monitor.refresh();
        match &outcome {
            RefreshOutcome::Updated { balance, .. } => println!("{}", balance),
            RefreshOutcome::Failed { error, .. } => match monitor.last_good() {
                Some(last_good) => warn!(%error, "Update failed, last known balance: {}", last_good),
                None => warn!(%error, "Update failed, no balance known yet"),
            },
            RefreshOutcome::Halted { error } => {
                return Err(Report::new(CliError::Halted).attach_printable(error.to_string()));
            }
        }

        if let Some(next_in) = outcome.next_in() {
            info!("Next refresh in {} minutes", next_in.as_secs() / 60);
            thread::sleep(next_in);
        }
    }
}
