//! Client builder and session loop.
//!
//! The [`ClientBuilder`] wires a [`ClientConfig`] to a connector, a clock and
//! a shutdown listener. The [`Client`] then runs each iteration as one session:
//! 1. Dial the server
//! 2. Send `SubmitBegin`, then every batch, reading one ack per batch
//! 3. Send the termination sentinel
//! 4. Poll with `PollRequest` until the server answers `PollReady`
//! 5. Read and decode the result, close, sleep `loop_period`
//!
//! # Poll states
//!
//! ```text
//!            ┌──────────── sleep(loop_period) ───────────┐
//!            ▼                                           │
//!       ┌─────────┐  'R'                           ┌───────┐
//!  ───► │ Polling │ ─────────────────────────────► │ Retry │
//!       └─────────┘                                └───────┘
//!         │     │ 'S'     ┌───────┐
//!         │     └───────► │ Ready │ ──► result frame, close, done
//!         │               └───────┘
//!         │ other byte / I/O error
//!         ▼
//!       ┌────────┐
//!       │ Failed │ ──► close, error returned to caller
//!       └────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use batchwire_client::{ClientBuilder, ClientConfig};
//!
//! let config = ClientConfig {
//!     id: "1".to_string(),
//!     server_address: "server:12345".to_string(),
//!     ..ClientConfig::default()
//! };
//! let client = ClientBuilder::new(config).build()?;
//! let report = client.run_loop(&batches).await?;
//! ```

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::batch::Batch;
use crate::env::{Clock, TokioClock};
use crate::error::{BatchwireError, Result};
use crate::protocol::{
    decode_entries, AckCode, ClientId, Command, Frame, DEFAULT_MAX_PAYLOAD_SIZE,
};
use crate::shutdown::Shutdown;
use crate::transport::{Connection, Connector, TcpConnector};

/// Default pause between iterations and between poll attempts.
pub const DEFAULT_LOOP_PERIOD: Duration = Duration::from_secs(5);

/// Whether poll attempts reuse the submit connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PollStrategy {
    /// Keep the submit connection open and poll over it.
    #[default]
    Persistent,
    /// Close after submitting and dial a fresh connection for every poll attempt.
    ReconnectPerAttempt,
}

impl FromStr for PollStrategy {
    type Err = BatchwireError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "persistent" => Ok(PollStrategy::Persistent),
            "reconnect-per-attempt" => Ok(PollStrategy::ReconnectPerAttempt),
            other => Err(BatchwireError::Config(format!(
                "Unknown poll strategy {:?} (expected persistent or reconnect-per-attempt)",
                other
            ))),
        }
    }
}

impl fmt::Display for PollStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollStrategy::Persistent => f.write_str("persistent"),
            PollStrategy::ReconnectPerAttempt => f.write_str("reconnect-per-attempt"),
        }
    }
}

/// Settings for one client run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Client identifier, used in logs and the identity frame.
    pub id: String,
    /// `host:port` of the server.
    pub server_address: String,
    /// Number of sessions to run.
    pub loop_amount: u32,
    /// Pause after each session and between poll attempts.
    pub loop_period: Duration,
    /// Connection reuse while polling.
    pub poll_strategy: PollStrategy,
    /// Send the identity frame after `PollReady`.
    pub send_identity: bool,
    /// Largest result frame accepted.
    pub max_result_bytes: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            id: "1".to_string(),
            server_address: "server:12345".to_string(),
            loop_amount: 1,
            loop_period: DEFAULT_LOOP_PERIOD,
            poll_strategy: PollStrategy::default(),
            send_identity: true,
            max_result_bytes: DEFAULT_MAX_PAYLOAD_SIZE,
        }
    }
}

/// Outcome of one completed session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IterationReport {
    /// Ack for each submitted batch, in order.
    pub acks: Vec<AckCode>,
    /// `PollNotReady` answers received before the result.
    pub poll_retries: u32,
    /// Decoded result entries.
    pub winners: Vec<String>,
}

/// Outcome of [`Client::run_loop`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopReport {
    /// One report per iteration, in order.
    pub iterations: Vec<IterationReport>,
}

/// Answer to a single poll attempt.
enum PollStep {
    NotReady,
    Ready(Vec<String>),
}

/// Builder for configuring and creating a client.
pub struct ClientBuilder<C = TcpConnector, K = TokioClock> {
    config: ClientConfig,
    connector: C,
    clock: K,
    shutdown: Shutdown,
}

impl ClientBuilder {
    /// Create a builder that dials TCP and sleeps on the tokio timer.
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            connector: TcpConnector,
            clock: TokioClock,
            shutdown: Shutdown::never(),
        }
    }
}

impl<C, K> ClientBuilder<C, K>
where
    C: Connector,
    K: Clock,
{
    /// Use a different connector.
    pub fn connector<C2: Connector>(self, connector: C2) -> ClientBuilder<C2, K> {
        ClientBuilder {
            config: self.config,
            connector,
            clock: self.clock,
            shutdown: self.shutdown,
        }
    }

    /// Use a different clock.
    pub fn clock<K2: Clock>(self, clock: K2) -> ClientBuilder<C, K2> {
        ClientBuilder {
            config: self.config,
            connector: self.connector,
            clock,
            shutdown: self.shutdown,
        }
    }

    /// Abort in-flight I/O and sleeps when `shutdown` fires.
    pub fn shutdown(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Validate the configuration and build the client.
    pub fn build(self) -> Result<Client<C, K>> {
        let config = self.config;

        if config.loop_amount == 0 {
            return Err(BatchwireError::Config(
                "loop_amount must be at least 1".to_string(),
            ));
        }
        if config.server_address.is_empty() {
            return Err(BatchwireError::Config(
                "server_address must not be empty".to_string(),
            ));
        }

        let identity = if config.send_identity {
            Some(ClientId::parse(&config.id)?)
        } else {
            None
        };

        Ok(Client {
            config,
            identity,
            connector: self.connector,
            clock: self.clock,
            shutdown: self.shutdown,
        })
    }
}

/// A configured client, ready to run sessions.
pub struct Client<C = TcpConnector, K = TokioClock> {
    config: ClientConfig,
    identity: Option<ClientId>,
    connector: C,
    clock: K,
    shutdown: Shutdown,
}

impl<C, K> Client<C, K>
where
    C: Connector,
    K: Clock,
{
    /// The configuration this client runs with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Run `loop_amount` sessions, sleeping `loop_period` after each.
    ///
    /// The first failed session stops the loop; its error is returned after
    /// the pacing sleep, even if shutdown interrupts that sleep.
    pub async fn run_loop(&self, batches: &[Batch]) -> Result<LoopReport> {
        let mut report = LoopReport::default();

        for iteration in 1..=self.config.loop_amount {
            let outcome = self.run_once(batches).await;

            match &outcome {
                Ok(_) => {}
                Err(e) if e.is_cancelled() => return Err(BatchwireError::Cancelled),
                Err(e) => {
                    tracing::error!(
                        client_id = %self.config.id,
                        iteration,
                        action = "loop_iteration",
                        result = "fail",
                        error = %e,
                        "Session failed"
                    );
                }
            }

            // A session error outranks a shutdown during the pacing sleep.
            let paused = self.pause(self.config.loop_period).await;
            report.iterations.push(outcome?);
            paused?;
        }

        tracing::info!(
            client_id = %self.config.id,
            action = "loop_finished",
            result = "success",
            "Client loop finished"
        );
        Ok(report)
    }

    /// Run a single session: submit every batch, then poll for the result.
    pub async fn run_once(&self, batches: &[Batch]) -> Result<IterationReport> {
        let mut conn = self.connect().await?;

        let acks = match self.submit(&mut conn, batches).await {
            Ok(acks) => acks,
            Err(e) => {
                conn.close().await;
                return Err(e);
            }
        };

        let (poll_retries, winners) = self.poll(conn).await?;

        Ok(IterationReport {
            acks,
            poll_retries,
            winners,
        })
    }

    async fn connect(&self) -> Result<Connection<C::Stream>> {
        let address = &self.config.server_address;
        let mut shutdown = self.shutdown.clone();

        let stream = tokio::select! {
            res = self.connector.connect(address) => match res {
                Ok(stream) => stream,
                Err(source) => {
                    tracing::error!(
                        client_id = %self.config.id,
                        action = "connect",
                        result = "fail",
                        error = %source,
                        "Could not connect to {}",
                        address
                    );
                    return Err(BatchwireError::Connect {
                        address: address.clone(),
                        source,
                    });
                }
            },
            _ = shutdown.triggered() => return Err(BatchwireError::Cancelled),
        };

        tracing::debug!(
            client_id = %self.config.id,
            action = "connect",
            result = "success",
            "Connected to {}",
            address
        );

        Ok(Connection::new(stream, address.clone(), self.shutdown.clone())
            .with_max_payload(self.config.max_result_bytes))
    }

    async fn submit(
        &self,
        conn: &mut Connection<C::Stream>,
        batches: &[Batch],
    ) -> Result<Vec<AckCode>> {
        conn.send(&Frame::Command(Command::SubmitBegin)).await?;

        let mut acks = Vec::with_capacity(batches.len());
        for batch in batches {
            conn.send(&Frame::Batch(batch.clone())).await?;
            let ack = conn.recv_ack().await?;

            if ack.is_success() {
                tracing::info!(
                    client_id = %self.config.id,
                    action = "send_batch",
                    result = %ack,
                    records = batch.record_count(),
                    "Batch acknowledged"
                );
            } else {
                tracing::warn!(
                    client_id = %self.config.id,
                    action = "send_batch",
                    result = %ack,
                    records = batch.record_count(),
                    "Batch not fully accepted"
                );
            }
            acks.push(ack);
        }

        conn.send(&Frame::Termination).await?;
        Ok(acks)
    }

    /// Poll until the result is ready. Consumes and closes `conn`.
    async fn poll(&self, conn: Connection<C::Stream>) -> Result<(u32, Vec<String>)> {
        let reconnect = self.config.poll_strategy == PollStrategy::ReconnectPerAttempt;

        let mut held = if reconnect {
            conn.close().await;
            None
        } else {
            Some(conn)
        };
        let mut retries = 0u32;

        loop {
            let mut active = match held.take() {
                Some(conn) => conn,
                None => self.connect().await?,
            };

            match self.poll_attempt(&mut active).await {
                Ok(PollStep::Ready(winners)) => {
                    active.close().await;
                    tracing::info!(
                        client_id = %self.config.id,
                        action = "consulta_ganadores",
                        result = "success",
                        cant_ganadores = winners.len(),
                        "Result received"
                    );
                    return Ok((retries, winners));
                }
                Ok(PollStep::NotReady) => {
                    retries += 1;
                    tracing::debug!(
                        client_id = %self.config.id,
                        action = "poll_winners",
                        result = "not_ready",
                        retries,
                        "Result not ready, retrying"
                    );

                    if reconnect {
                        active.close().await;
                    } else {
                        held = Some(active);
                    }

                    if let Err(e) = self.pause(self.config.loop_period).await {
                        if let Some(conn) = held.take() {
                            conn.close().await;
                        }
                        return Err(e);
                    }
                }
                Err(e) => {
                    active.close().await;
                    tracing::error!(
                        client_id = %self.config.id,
                        action = "consulta_ganadores",
                        result = "fail",
                        error = %e,
                        "Polling failed"
                    );
                    return Err(e);
                }
            }
        }
    }

    async fn poll_attempt(&self, conn: &mut Connection<C::Stream>) -> Result<PollStep> {
        conn.send(&Frame::Command(Command::PollRequest)).await?;

        match conn.recv_command().await? {
            Command::PollNotReady => Ok(PollStep::NotReady),
            Command::PollReady => {
                if let Some(identity) = self.identity {
                    conn.send(&Frame::Identity(identity)).await?;
                }
                let payload = conn.recv_result().await?;
                Ok(PollStep::Ready(decode_entries(&payload)?))
            }
            other => Err(BatchwireError::Protocol(format!(
                "Unexpected {:?} while polling",
                other
            ))),
        }
    }

    async fn pause(&self, duration: Duration) -> Result<()> {
        let mut shutdown = self.shutdown.clone();
        tokio::select! {
            _ = self.clock.sleep(duration) => Ok(()),
            _ = shutdown.triggered() => Err(BatchwireError::Cancelled),
        }
    }
}
