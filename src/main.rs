//! `batchwire` - submit a record file to the server and fetch the result.
//!
//! ## Configuration
//!
//! Settings come from an optional TOML file (`--config` / `CLI_CONFIG`).
//! Every setting can be overridden by a flag or its environment variable:
//! - `CLI_ID`, `CLI_SERVER_ADDRESS`
//! - `CLI_LOOP_AMOUNT`, `CLI_LOOP_PERIOD_MS`
//! - `CLI_BATCH_MAX_AMOUNT`, `CLI_BATCH_MAX_BYTES`
//! - `CLI_DATA_PATH`, `CLI_POLL_STRATEGY`, `CLI_SEND_IDENTITY`
//! - `CLI_LOG_LEVEL` (ignored when `RUST_LOG` is set)
//!
//! SIGINT and SIGTERM abort the current session and exit with status 0.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use batchwire_client::batch::partition;
use batchwire_client::input::read_records;
use batchwire_client::shutdown::{self, ShutdownTrigger};
use batchwire_client::{Batch, ClientBuilder, PollStrategy, Settings};

#[derive(Parser)]
#[command(name = "batchwire")]
#[command(about = "Batched record submission client", long_about = None)]
struct Cli {
    /// TOML settings file
    #[arg(short, long, env = "CLI_CONFIG")]
    config: Option<PathBuf>,

    /// Client identifier
    #[arg(long, env = "CLI_ID")]
    id: Option<String>,

    /// Server address (host:port)
    #[arg(long, env = "CLI_SERVER_ADDRESS")]
    server_address: Option<String>,

    /// Number of sessions to run
    #[arg(long, env = "CLI_LOOP_AMOUNT")]
    loop_amount: Option<u32>,

    /// Pause between sessions and poll attempts, in milliseconds
    #[arg(long, env = "CLI_LOOP_PERIOD_MS")]
    loop_period_ms: Option<u64>,

    /// Maximum records per batch
    #[arg(long, env = "CLI_BATCH_MAX_AMOUNT")]
    batch_max_amount: Option<usize>,

    /// Maximum serialized bytes per batch
    #[arg(long, env = "CLI_BATCH_MAX_BYTES")]
    batch_max_bytes: Option<usize>,

    /// Record file to submit
    #[arg(long, env = "CLI_DATA_PATH")]
    data_path: Option<PathBuf>,

    /// persistent or reconnect-per-attempt
    #[arg(long, env = "CLI_POLL_STRATEGY")]
    poll_strategy: Option<PollStrategy>,

    /// Send the identity frame before reading the result
    #[arg(long, env = "CLI_SEND_IDENTITY")]
    send_identity: Option<bool>,

    /// Log filter directive
    #[arg(long, env = "CLI_LOG_LEVEL")]
    log_level: Option<String>,
}

impl Cli {
    fn settings(self) -> Result<Settings> {
        let mut settings = Settings::load(self.config.as_deref())?;

        if let Some(id) = self.id {
            settings.id = id;
        }
        if let Some(address) = self.server_address {
            settings.server_address = address;
        }
        if let Some(amount) = self.loop_amount {
            settings.loop_amount = amount;
        }
        if let Some(period) = self.loop_period_ms {
            settings.loop_period_ms = period;
        }
        if let Some(amount) = self.batch_max_amount {
            settings.batch_max_amount = amount;
        }
        if let Some(bytes) = self.batch_max_bytes {
            settings.batch_max_bytes = bytes;
        }
        if let Some(path) = self.data_path {
            settings.data_path = Some(path);
        }
        if let Some(strategy) = self.poll_strategy {
            settings.poll_strategy = strategy;
        }
        if let Some(send) = self.send_identity {
            settings.send_identity = send;
        }
        if let Some(level) = self.log_level {
            settings.log_level = level;
        }

        Ok(settings)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Cli::parse().settings()?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_level))
        .context("Invalid log level")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = settings.client_config()?;
    let limits = settings.batch_limits()?;
    let data_path = settings.data_path();

    tracing::info!(
        client_id = %config.id,
        server_address = %config.server_address,
        loop_amount = config.loop_amount,
        loop_period_ms = settings.loop_period_ms,
        batch_max_amount = limits.max_records(),
        batch_max_bytes = limits.max_bytes(),
        poll_strategy = %config.poll_strategy,
        "Configuration loaded"
    );

    let records = read_records(&data_path)
        .with_context(|| format!("Failed to read records from {}", data_path.display()))?;
    let batches: Vec<Batch> = partition(records, limits).collect();
    tracing::info!(
        client_id = %config.id,
        batches = batches.len(),
        "Records partitioned"
    );

    let (trigger, listener) = shutdown::channel();
    tokio::spawn(watch_signals(trigger));

    let client_id = config.id.clone();
    let client = ClientBuilder::new(config).shutdown(listener).build()?;

    match client.run_loop(&batches).await {
        Ok(_) => Ok(()),
        Err(e) if e.is_cancelled() => {
            tracing::info!(
                client_id = %client_id,
                action = "shutdown",
                result = "success",
                "Interrupted, exiting"
            );
            Ok(())
        }
        Err(e) => Err(e).context("Client loop failed"),
    }
}

/// Fire `trigger` on SIGINT or SIGTERM.
async fn watch_signals(trigger: ShutdownTrigger) {
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            if let Err(e) = res {
                tracing::warn!("Failed to listen for SIGINT: {}", e);
                return;
            }
        }
        _ = terminate => {}
    }

    tracing::info!("Shutdown signal received");
    trigger.shutdown();
}
