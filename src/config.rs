//! File-backed settings for the `batchwire` binary.
//!
//! Every key is optional; missing keys take the defaults below. The binary
//! layers command-line and environment overrides on top before calling
//! [`Settings::client_config`].
//!
//! ```toml
//! id = "3"
//! server_address = "server:12345"
//! loop_amount = 5
//! loop_period_ms = 2000
//! batch_max_amount = 50
//! poll_strategy = "reconnect-per-attempt"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::batch::BatchLimits;
use crate::client::{ClientConfig, PollStrategy};
use crate::error::{BatchwireError, Result};
use crate::protocol::DEFAULT_MAX_PAYLOAD_SIZE;

/// Default records per batch.
pub const DEFAULT_BATCH_MAX_AMOUNT: usize = 100;

/// Default serialized bytes per batch.
pub const DEFAULT_BATCH_MAX_BYTES: usize = 8 * 1024;

/// Everything the binary needs to run, as read from the settings file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Client identifier.
    pub id: String,
    /// `host:port` of the server.
    pub server_address: String,
    /// Number of sessions to run.
    pub loop_amount: u32,
    /// Pause between sessions and between poll attempts, in milliseconds.
    pub loop_period_ms: u64,
    /// Records per batch.
    pub batch_max_amount: usize,
    /// Serialized bytes per batch.
    pub batch_max_bytes: usize,
    /// Input file; defaults to `/data/agency-{id}.csv`.
    pub data_path: Option<PathBuf>,
    /// `persistent` or `reconnect-per-attempt`.
    pub poll_strategy: PollStrategy,
    /// Send the identity frame after `PollReady`.
    pub send_identity: bool,
    /// Largest result frame accepted, in bytes.
    pub max_result_bytes: u32,
    /// Filter directive used when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        let client = ClientConfig::default();
        Self {
            id: client.id,
            server_address: client.server_address,
            loop_amount: client.loop_amount,
            loop_period_ms: client.loop_period.as_millis() as u64,
            batch_max_amount: DEFAULT_BATCH_MAX_AMOUNT,
            batch_max_bytes: DEFAULT_BATCH_MAX_BYTES,
            data_path: None,
            poll_strategy: client.poll_strategy,
            send_identity: client.send_identity,
            max_result_bytes: DEFAULT_MAX_PAYLOAD_SIZE,
            log_level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from `path`, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let contents = std::fs::read_to_string(path).map_err(|e| {
            BatchwireError::Config(format!("Cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Parse settings from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| BatchwireError::Config(e.to_string()))
    }

    /// Validated partitioning limits.
    pub fn batch_limits(&self) -> Result<BatchLimits> {
        BatchLimits::new(self.batch_max_amount, self.batch_max_bytes)
    }

    /// The input file, falling back to the per-client default.
    pub fn data_path(&self) -> PathBuf {
        match &self.data_path {
            Some(path) => path.clone(),
            None => PathBuf::from(format!("/data/agency-{}.csv", self.id)),
        }
    }

    /// Validate and convert into the client's runtime configuration.
    pub fn client_config(&self) -> Result<ClientConfig> {
        if self.id.is_empty() {
            return Err(BatchwireError::Config("id must not be empty".to_string()));
        }
        if self.loop_amount == 0 {
            return Err(BatchwireError::Config(
                "loop_amount must be at least 1".to_string(),
            ));
        }
        if self.max_result_bytes == 0 {
            return Err(BatchwireError::Config(
                "max_result_bytes must be positive".to_string(),
            ));
        }

        Ok(ClientConfig {
            id: self.id.clone(),
            server_address: self.server_address.clone(),
            loop_amount: self.loop_amount,
            loop_period: Duration::from_millis(self.loop_period_ms),
            poll_strategy: self.poll_strategy,
            send_identity: self.send_identity,
            max_result_bytes: self.max_result_bytes,
        })
    }
}
