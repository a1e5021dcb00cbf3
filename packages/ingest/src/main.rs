#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the mandi price sync.

use std::process::ExitCode;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use mandi_sync_database::memory::MemoryStore;
use mandi_sync_database::{PriceStore, db, queries};
use mandi_sync_database_models::{PruneResult, WriteMode};
use mandi_sync_ingest::progress::ProgressFile;
use mandi_sync_ingest::{SyncContext, config, partition, sync_partition};
use mandi_sync_ingest_models::RunConfig;
use mandi_sync_source::data_gov::DataGovClient;
use mandi_sync_source_models::PartitionKey;

#[derive(Parser)]
#[command(
    name = "mandi_sync",
    about = "Resumable daily sync of mandi prices from data.gov.in",
    version
)]
struct Cli {
    #[command(flatten)]
    run: RunArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Clone, Copy)]
enum Commands {
    /// Sync the target date until it is drained or the runtime cap is hit (default)
    Sync,
    /// Drop the oldest date if the store is over its row cap
    Prune,
    /// Show the target date, saved progress, and store row counts
    Status,
}

#[derive(Args)]
#[allow(clippy::struct_excessive_bools)]
struct RunArgs {
    /// Date to sync (YYYY-MM-DD). Defaults to today, or yesterday before
    /// the rollover hour
    #[arg(long, global = true)]
    date: Option<PartitionKey>,
    /// How pages are written: `upsert` or `insert-only`
    #[arg(long, global = true)]
    write_mode: Option<WriteMode>,
    /// Skip retention pruning before syncing
    #[arg(long, global = true)]
    no_prune: bool,
    /// Resume from the progress file only, ignoring the store's row count
    #[arg(long, global = true)]
    no_resume_from_store: bool,
    /// Write to an in-memory store instead of Supabase
    #[arg(long, global = true)]
    dry_run: bool,
    /// Records requested per page
    #[arg(long, global = true)]
    page_size: Option<u32>,
    /// Connect timeout in seconds
    #[arg(long, global = true)]
    connect_timeout: Option<u64>,
    /// Read timeout in seconds
    #[arg(long, global = true)]
    read_timeout: Option<u64>,
    /// First retry delay in seconds
    #[arg(long, global = true)]
    initial_backoff: Option<u64>,
    /// Retry delay ceiling in seconds
    #[arg(long, global = true)]
    max_backoff: Option<u64>,
    /// Relative jitter applied to every delay (e.g. 0.2)
    #[arg(long, global = true)]
    jitter_ratio: Option<f64>,
    /// Wall-clock budget for the run in seconds
    #[arg(long, global = true)]
    max_runtime: Option<u64>,
    /// Consecutive failures after which the run aborts
    #[arg(long, global = true)]
    max_consecutive_errors: Option<u32>,
    /// Empty pages after which the date is considered complete
    #[arg(long, global = true)]
    max_empty_page_retries: Option<u32>,
    /// Store size at which the oldest date is pruned
    #[arg(long, global = true)]
    max_total_rows: Option<u64>,
    /// Dates kept in the progress file
    #[arg(long, global = true)]
    max_state_partitions: Option<usize>,
    /// Local hour before which the previous day is targeted
    #[arg(long, global = true)]
    rollover_hour: Option<u32>,
    /// IANA timezone for the rollover hour
    #[arg(long, global = true)]
    timezone: Option<String>,
    /// Pause after each written page, in seconds
    #[arg(long, global = true)]
    success_sleep: Option<u64>,
}

impl RunArgs {
    fn to_config(&self) -> RunConfig {
        let defaults = RunConfig::default();
        let secs = |value: Option<u64>, default: Duration| value.map_or(default, Duration::from_secs);

        RunConfig {
            page_size: self.page_size.unwrap_or(defaults.page_size),
            connect_timeout: secs(self.connect_timeout, defaults.connect_timeout),
            read_timeout: secs(self.read_timeout, defaults.read_timeout),
            initial_backoff: secs(self.initial_backoff, defaults.initial_backoff),
            max_backoff: secs(self.max_backoff, defaults.max_backoff),
            jitter_ratio: self.jitter_ratio.unwrap_or(defaults.jitter_ratio),
            max_runtime: secs(self.max_runtime, defaults.max_runtime),
            max_consecutive_errors: self
                .max_consecutive_errors
                .unwrap_or(defaults.max_consecutive_errors),
            max_empty_page_retries: self
                .max_empty_page_retries
                .unwrap_or(defaults.max_empty_page_retries),
            max_total_rows: self.max_total_rows.unwrap_or(defaults.max_total_rows),
            max_state_partitions: self
                .max_state_partitions
                .unwrap_or(defaults.max_state_partitions),
            rollover_hour: self.rollover_hour.unwrap_or(defaults.rollover_hour),
            timezone: self.timezone.clone().unwrap_or(defaults.timezone),
            success_sleep: secs(self.success_sleep, defaults.success_sleep),
            resume_from_store: !self.no_resume_from_store,
            write_mode: self.write_mode.unwrap_or(defaults.write_mode),
            prune: !self.no_prune,
        }
    }
}

fn open_store(
    config: &RunConfig,
    dry_run: bool,
) -> Result<Box<dyn PriceStore>, Box<dyn std::error::Error>> {
    if dry_run {
        log::warn!("Dry run: records are kept in memory and discarded on exit");
        return Ok(Box::new(MemoryStore::new()));
    }

    let store = db::connect_from_env(config.read_timeout)?;
    log::info!("Writing to table {}", store.table());
    Ok(Box::new(store))
}

async fn run(cli: Cli) -> Result<u8, Box<dyn std::error::Error>> {
    let config = cli.run.to_config();
    config::validate(&config)?;

    let tz = config::parse_timezone(&config.timezone)?;
    let partition = cli
        .run
        .date
        .unwrap_or_else(|| partition::current_partition(tz, config.rollover_hour));
    let progress = ProgressFile::new(config::state_file_from_env(), config.max_state_partitions);

    match cli.command.unwrap_or(Commands::Sync) {
        Commands::Sync => {
            let reader = DataGovClient::new(&config::data_gov_from_env(&config)?)?;
            let store = open_store(&config, cli.run.dry_run)?;
            let ctx = SyncContext {
                config: &config,
                reader: &reader,
                store: store.as_ref(),
                progress: &progress,
            };

            let report = sync_partition(&ctx, partition).await?;
            Ok(report.outcome.exit_code())
        }
        Commands::Prune => {
            let store = open_store(&config, cli.run.dry_run)?;
            match queries::prune_if_needed(store.as_ref(), config.max_total_rows).await? {
                PruneResult::Skipped { total } => {
                    println!(
                        "Nothing to prune: {total} rows (cap {})",
                        config.max_total_rows
                    );
                }
                PruneResult::Pruned {
                    partition,
                    deleted,
                    total_before,
                } => {
                    println!("Pruned {deleted} rows for {partition} ({total_before} rows before)");
                }
            }
            Ok(0)
        }
        Commands::Status => {
            println!("Target date:   {partition} (API filter {})", partition.api_filter());
            println!("Progress file: {}", progress.path().display());

            let state = progress.load();
            if state.is_empty() {
                println!("  (no saved progress)");
            }
            for (date, offset) in &state {
                println!("  {date}  next offset {offset}");
            }

            if !cli.run.dry_run {
                let store = open_store(&config, false)?;
                let for_date = store.count_for_partition(partition).await?;
                let total = store.total_count().await?;
                println!("Store rows:    {for_date} for {partition}, {total} total");
            }
            Ok(0)
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    mandi_sync_cli_utils::init_logger();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            log::error!("{e}");
            ExitCode::from(1)
        }
    }
}
