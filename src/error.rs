//! Error types for batchwire-client.

use std::fmt;

use thiserror::Error;

/// Direction of an exact transfer that came up short.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoOp {
    /// Reading from the peer.
    Read,
    /// Writing to the peer.
    Write,
}

impl fmt::Display for IoOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IoOp::Read => f.write_str("read"),
            IoOp::Write => f.write_str("write"),
        }
    }
}

/// Main error type for all batchwire operations.
#[derive(Debug, Error)]
pub enum BatchwireError {
    /// Dialing the server failed.
    #[error("Connect to {address} failed: {source}")]
    Connect {
        /// Address that was dialed.
        address: String,
        /// Underlying socket error.
        #[source]
        source: std::io::Error,
    },

    /// Peer closed or stalled in the middle of a frame.
    #[error("Short {op}: transferred {transferred} of {expected} bytes")]
    ShortIo {
        /// Which direction stalled.
        op: IoOp,
        /// Bytes the frame required.
        expected: usize,
        /// Bytes moved before the stream stopped.
        transferred: usize,
    },

    /// I/O error during socket operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Protocol error (malformed header, unexpected ack, oversized frame).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Command byte outside the protocol alphabet.
    #[error("Unknown command byte: {0:#04x}")]
    UnknownCommand(u8),

    /// Result payload could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Record field contains a delimiter or the record is empty.
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// Configuration value out of range.
    #[error("Config error: {0}")]
    Config(String),

    /// Shutdown was requested while the operation was in progress.
    #[error("Cancelled by shutdown")]
    Cancelled,
}

impl BatchwireError {
    /// Returns true if the error came from a shutdown request rather than a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, BatchwireError::Cancelled)
    }
}

/// Result type alias using BatchwireError.
pub type Result<T> = std::result::Result<T, BatchwireError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_io_message() {
        let err = BatchwireError::ShortIo {
            op: IoOp::Read,
            expected: 4,
            transferred: 2,
        };
        assert_eq!(err.to_string(), "Short read: transferred 2 of 4 bytes");
    }

    #[test]
    fn test_unknown_command_formats_hex() {
        let err = BatchwireError::UnknownCommand(b'X');
        assert_eq!(err.to_string(), "Unknown command byte: 0x58");
    }

    #[test]
    fn test_is_cancelled() {
        assert!(BatchwireError::Cancelled.is_cancelled());
        assert!(!BatchwireError::Protocol("x".to_string()).is_cancelled());
    }
}
