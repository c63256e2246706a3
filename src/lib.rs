//! # batchwire-client
//!
//! Client for a batched record-submission protocol over TCP.
//!
//! The client reads records, packs them into size-bounded batches, streams the
//! batches to a server with one ack per batch, then polls until the server has
//! an aggregate result ready and downloads it.
//!
//! ## Architecture
//!
//! - **Batching** ([`batch`]): records → length-bounded `;`/`|` payloads
//! - **Protocol** ([`protocol`]): command bytes, 8-byte batch headers,
//!   acks, identity and length-prefixed result frames
//! - **Transport** ([`transport`]): exact reads and writes over an owned
//!   connection, dialed through a [`Connector`]
//! - **Session** ([`client`]): submit, poll, download, repeat
//!
//! ## Example
//!
//! ```ignore
//! use batchwire_client::batch::{partition, BatchLimits};
//! use batchwire_client::input::read_records;
//! use batchwire_client::{ClientBuilder, ClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> batchwire_client::Result<()> {
//!     let records = read_records("/data/agency-1.csv".as_ref())?;
//!     let batches: Vec<_> = partition(records, BatchLimits::new(100, 8 * 1024)?).collect();
//!
//!     let client = ClientBuilder::new(ClientConfig::default()).build()?;
//!     let report = client.run_loop(&batches).await?;
//!     println!("{:?}", report.iterations[0].winners);
//!     Ok(())
//! }
//! ```

pub mod batch;
pub mod client;
pub mod config;
pub mod env;
pub mod error;
pub mod input;
pub mod protocol;
pub mod shutdown;
pub mod transport;

pub use batch::{partition, Batch, BatchLimits, Record};
pub use client::{Client, ClientBuilder, ClientConfig, IterationReport, LoopReport, PollStrategy};
pub use config::Settings;
pub use env::{Clock, TokioClock};
pub use error::{BatchwireError, Result};
pub use shutdown::{Shutdown, ShutdownTrigger};
pub use transport::{Connector, TcpConnector};
