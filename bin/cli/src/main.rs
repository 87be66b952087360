mod errors;

use std::{net::SocketAddr, path::PathBuf};

use clap::{Parser, Subcommand};
use engine::{
    CycleOutcome, LiquidityEngine, RankingPolicy,
    config::{EngineConfig, EngineConfigBuilder},
    telemetry::init_tracing,
    watcher::start_counter_watch,
};
use ledger::{adapter::IdentitySource, snapshot::SnapshotLedger};
use metrics_exporter_prometheus::PrometheusBuilder;
use serde::Serialize;
use tracing::info;
use types::{
    decimal::parse_u256,
    deposit::DepositIdSet,
    units::RateOrientation,
};

use crate::errors::CliError;

const CONFIG_ENV: &str = "LIQUIDITY_CONFIG";

#[derive(Parser)]
#[command(name = "liquidity-cli")]
#[command(about = "Mirror escrow deposits from a ledger and quote against them.")]
#[command(version)]
struct Cli {
    /// Config file or directory; falls back to $LIQUIDITY_CONFIG, then the
    /// platform config directory.
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// The ledger to read: a JSON snapshot file and the identity it is stored
/// under.
#[derive(Debug, clap::Args)]
struct LedgerArgs {
    #[arg(short, long)]
    ledger: PathBuf,
    #[arg(short, long)]
    identity: String,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Write a config file with the given settings
    Setup {
        #[arg(short, long)]
        output: Option<String>,
        #[arg(long)]
        database_directory: Option<PathBuf>,
        #[arg(long)]
        log_file_path: Option<PathBuf>,
        #[arg(long, default_value = "venmo")]
        rail: String,
        #[arg(long)]
        batch_size: Option<usize>,
        #[arg(long)]
        deepest_liquidity: bool,
        #[arg(long)]
        fiat_per_settlement: bool,
        #[arg(long)]
        identity_by_hash: bool,
        #[arg(long)]
        deny: Vec<String>,
        #[arg(long)]
        metrics_port: Option<u16>,
    },
    /// Run one synchronization cycle and print the engine status
    Sync {
        #[command(flatten)]
        ledger: LedgerArgs,
    },
    /// Sync, then quote a settlement amount such as 12.5
    Quote {
        #[command(flatten)]
        ledger: LedgerArgs,
        amount: String,
        /// Depositor identity that must not be matched (the requester)
        #[arg(short, long, default_value = "")]
        exclude: String,
        /// Only consider these deposit ids; defaults to the targeted set
        #[arg(short, long)]
        restrict: Vec<String>,
    },
    /// Sync, then quote the largest transfer currently available
    MaxQuote {
        #[command(flatten)]
        ledger: LedgerArgs,
        #[arg(short, long, default_value = "")]
        exclude: String,
    },
    /// Replace the targeted deposit ids of a ledger
    Target {
        #[command(flatten)]
        ledger: LedgerArgs,
        ids: Vec<String>,
    },
    /// Keep syncing whenever the ledger's deposit counter moves
    Watch {
        #[command(flatten)]
        ledger: LedgerArgs,
    },
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config_path = cli.config.or_else(|| std::env::var(CONFIG_ENV).ok());

    match cli.command {
        Commands::Setup {
            output,
            database_directory,
            log_file_path,
            rail,
            batch_size,
            deepest_liquidity,
            fiat_per_settlement,
            identity_by_hash,
            deny,
            metrics_port,
        } => {
            let mut builder = EngineConfigBuilder::new()
                .config_file_path(EngineConfig::get_config_file_path(
                    output.or(config_path).as_deref(),
                )?)
                .database_directory(match database_directory {
                    Some(path) => path,
                    None => EngineConfig::default_database_directory()?,
                })
                .log_file_path(log_file_path)
                .rail(rail)
                .deny_list(deny)
                .metrics_port(metrics_port);
            if let Some(batch_size) = batch_size {
                builder = builder.batch_size(batch_size);
            }
            if deepest_liquidity {
                builder = builder.ranking_policy(RankingPolicy::DeepestLiquidity);
            }
            if fiat_per_settlement {
                builder = builder.rate_orientation(RateOrientation::FiatPerSettlement);
            }
            if identity_by_hash {
                builder = builder.identity_source(IdentitySource::DepositorIdHash);
            }

            let config = builder.build()?;
            config.save()?;
            println!(
                "Config has been saved to {}",
                config.config_file_path.display()
            );
        }
        Commands::Sync { ledger } => {
            let (engine, outcome) = start(config_path.as_deref(), &ledger).await?;
            print_json(&SyncReport {
                outcome: describe(&outcome),
                status: engine.status(),
                targeted: engine.get_targeted_ids().iter().map(ToString::to_string).collect(),
            })?;
        }
        Commands::Quote {
            ledger,
            amount,
            exclude,
            restrict,
        } => {
            let restrict = parse_ids(&restrict)?;
            let (engine, _) = start(config_path.as_deref(), &ledger).await?;
            let restrict_to = (!restrict.is_empty()).then_some(&restrict);
            print_json(&engine.get_quote(&amount, &exclude, restrict_to))?;
        }
        Commands::MaxQuote { ledger, exclude } => {
            let (engine, _) = start(config_path.as_deref(), &ledger).await?;
            print_json(&engine.get_quote_for_max_available(&exclude, None))?;
        }
        Commands::Target { ledger, ids } => {
            let ids = parse_ids(&ids)?;
            let (engine, _) = start(config_path.as_deref(), &ledger).await?;
            let targeted = engine.set_targeted_ids(ids).await?;
            print_json(&targeted.iter().map(ToString::to_string).collect::<Vec<_>>())?;
        }
        Commands::Watch { ledger } => {
            watch(config_path.as_deref(), &ledger).await?;
        }
    }

    Ok(())
}

#[derive(Serialize)]
struct SyncReport {
    outcome: String,
    status: engine::SyncStatus,
    targeted: Vec<String>,
}

fn describe(outcome: &CycleOutcome) -> String {
    match outcome {
        CycleOutcome::Published {
            cycle,
            live,
            newly_pruned,
        } => format!("cycle {cycle} published {live} live deposits, pruned {newly_pruned}"),
        CycleOutcome::Stale { cycle } => format!("cycle {cycle} was superseded"),
        CycleOutcome::NoLedger => "no active ledger".to_string(),
        CycleOutcome::Failed { cycle, reason } => format!("cycle {cycle} failed: {reason}"),
    }
}

fn print_json(value: &impl Serialize) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_ids(values: &[String]) -> Result<DepositIdSet, CliError> {
    values
        .iter()
        .map(|value| {
            parse_u256(value)
                .map_err(|_| CliError::InvalidArgument(format!("not a deposit id: {value}")))
        })
        .collect::<Result<DepositIdSet, CliError>>()
}

/// Existing config at `path`, or defaults with the platform database
/// directory when there is none yet.
fn load_config(path: Option<&str>) -> Result<EngineConfig, CliError> {
    let config_file_path = EngineConfig::get_config_file_path(path)?;
    if config_file_path.exists() {
        return Ok(EngineConfig::load(&config_file_path)?);
    }
    Ok(EngineConfigBuilder::new()
        .config_file_path(config_file_path)
        .database_directory(EngineConfig::default_database_directory()?)
        .build()?)
}

async fn start(
    config_path: Option<&str>,
    ledger: &LedgerArgs,
) -> Result<(LiquidityEngine, CycleOutcome), CliError> {
    let config = load_config(config_path)?;
    init_tracing(config.log_file_path.as_deref())?;

    let engine = LiquidityEngine::from_config(&config)?;
    let cycle = engine
        .switch_ledger(
            ledger.identity.clone(),
            Box::new(SnapshotLedger::new(&ledger.ledger)),
        )
        .await;
    let outcome = cycle
        .await
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok((engine, outcome))
}

async fn watch(config_path: Option<&str>, ledger: &LedgerArgs) -> Result<(), CliError> {
    let config = load_config(config_path)?;
    init_tracing(config.log_file_path.as_deref())?;

    if let Some(port) = config.metrics_port {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .map_err(|e| CliError::Metrics(e.to_string()))?;
        info!("Serving metrics on {addr}");
    }

    let engine = LiquidityEngine::from_config(&config)?;
    drop(
        engine
            .switch_ledger(
                ledger.identity.clone(),
                Box::new(SnapshotLedger::new(&ledger.ledger)),
            )
            .await,
    );
    let watcher = start_counter_watch(engine.clone(), config.poll_interval());
    info!(
        identity = %ledger.identity,
        ledger = %ledger.ledger.display(),
        "Watching ledger, press Ctrl+C to stop"
    );

    tokio::signal::ctrl_c().await?;
    info!("Received SIGINT, shutting down gracefully...");
    watcher.abort();
    Ok(())
}
