//! `filetrail`: record every file created under a directory tree.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use filetrail_audit::logging::{DEFAULT_LOG_FILE, init_file_logging};
use filetrail_audit::{AgentOptions, AuditAgent, AuditError, DispatchMode, QueueFullPolicy};
use filetrail_directory_watcher::WatchConfig;
use filetrail_directory_watcher::config::DEFAULT_CHANNEL_CAPACITY;
use filetrail_record_sink::StoreConfig;
use tracing::{error, info, warn};

/// Configuration file looked up in the working directory when `--config`
/// is not given.
const DEFAULT_CONFIG_FILE: &str = "conf.json";

#[derive(Parser, Debug)]
#[command(name = "filetrail")]
#[command(about = "Watch a directory tree and record newly created files", long_about = None)]
struct Cli {
    /// Directory tree to watch
    root: PathBuf,

    /// Store configuration document (JSON, or TOML with a .toml extension)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Append-only log file
    #[arg(long, default_value = DEFAULT_LOG_FILE)]
    log_file: PathBuf,

    /// Also watch directories created after startup
    #[arg(long)]
    watch_new_dirs: bool,

    /// Decouple the store from event reception with a queue of this size
    #[arg(long)]
    queue_capacity: Option<usize>,

    /// What to do when the queue is full
    #[arg(long, value_enum, default_value_t = QueueFullPolicy::Block, requires = "queue_capacity")]
    queue_full: QueueFullPolicy,

    /// Capacity of the watcher's event and error streams
    #[arg(long, default_value_t = DEFAULT_CHANNEL_CAPACITY)]
    channel_capacity: usize,
}

enum ConfigSource {
    File(PathBuf),
    Embedded,
}

fn load_store_config(explicit: Option<&Path>) -> Result<(StoreConfig, ConfigSource), AuditError> {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => Some(PathBuf::from(DEFAULT_CONFIG_FILE)).filter(|p| p.is_file()),
    };

    match path {
        Some(path) => StoreConfig::load(&path)
            .map(|config| (config, ConfigSource::File(path)))
            .map_err(AuditError::Config),
        None => StoreConfig::embedded()
            .map(|config| (config, ConfigSource::Embedded))
            .map_err(AuditError::Config),
    }
}

async fn wait_for_ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Cannot listen for Ctrl-C, running until killed: {e}");
        std::future::pending::<()>().await;
    }
    info!("Received Ctrl-C");
}

async fn run(cli: Cli, store: StoreConfig) -> anyhow::Result<()> {
    let watch = WatchConfig::new(&cli.root)
        .with_new_directory_watching(cli.watch_new_dirs)
        .with_channel_capacity(cli.channel_capacity);
    let dispatch = match cli.queue_capacity {
        Some(capacity) => DispatchMode::Queued {
            capacity,
            policy: cli.queue_full,
        },
        None => DispatchMode::Inline,
    };

    let agent = AuditAgent::start(AgentOptions::new(watch).with_dispatch(dispatch))
        .context("starting watcher")?;

    let sink = filetrail_record_sink::connect(&store)
        .await
        .map_err(AuditError::Connect)
        .context("connecting to record store")?;

    let report = agent
        .run_until(sink, wait_for_ctrl_c())
        .await
        .context("shutting down")?;

    info!("Walk: {:?}", report.walk);
    info!("Dispatch: {:?}", report.dispatch);
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let (store, source) = match load_store_config(cli.config.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("filetrail: {e}");
            return ExitCode::from(e.exit_code());
        }
    };

    let _guard = match init_file_logging(&cli.log_file) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("filetrail: {e}");
            return ExitCode::from(e.exit_code());
        }
    };

    match &source {
        ConfigSource::File(path) => info!("Using store configuration {}", path.display()),
        ConfigSource::Embedded => warn!("No configuration file found, using built-in defaults"),
    }

    match run(cli, store).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            let code = e.downcast_ref::<AuditError>().map_or(1, AuditError::exit_code);
            ExitCode::from(code)
        }
    }
}
