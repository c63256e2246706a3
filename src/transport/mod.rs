//! Transport module - dialing, exact I/O, and the owned connection.
//!
//! Provides:
//! - [`write_exact`] / [`read_exact`]: full transfer or explicit failure
//! - [`Connection`]: the only path from the frame codec to the socket
//! - [`Connector`]: how a fresh stream is dialed (TCP in production)

mod connection;
mod exact;
mod tcp;

pub use connection::Connection;
pub use exact::{read_exact, read_exact_into, write_exact};
pub use tcp::{Connector, TcpConnector};
