//! Wire format encoding and decoding.
//!
//! Implements the fixed-width pieces of the protocol:
//! ```text
//! Command:      ┌────────┐
//!               │ 1 byte │  'B' | 'W' | 'R' | 'S'
//!               └────────┘
//! Batch header: ┌───────────┬──────────────┐
//!               │ Length    │ Record count │
//!               │ uint32 BE │ uint32 BE    │
//!               └───────────┴──────────────┘
//! Ack:          1 byte (0 = success, 1 = fail, 2 = partial)
//! Identity:     4 bytes, client id left-padded with '0'
//! ```
//!
//! All multi-byte integers are Big Endian.

use std::fmt;

use crate::error::{BatchwireError, Result};

/// Batch header size in bytes (length + record count).
pub const HEADER_SIZE: usize = 8;

/// Size of the length prefix on length-prefixed frames.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Identity frame size in bytes.
pub const IDENTITY_SIZE: usize = 4;

/// Default maximum accepted length for a length-prefixed frame (64 MiB).
pub const DEFAULT_MAX_PAYLOAD_SIZE: u32 = 64 * 1024 * 1024;

/// Separates fields within a record.
pub const FIELD_DELIMITER: u8 = b'|';

/// Separates records within a batch and entries within a result.
pub const RECORD_DELIMITER: u8 = b';';

/// Control byte exchanged between client and server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    /// Client is about to submit batches.
    SubmitBegin = b'B',
    /// Client asks whether the result is available.
    PollRequest = b'W',
    /// Server: result not ready, retry later.
    PollNotReady = b'R',
    /// Server: result ready, frame follows.
    PollReady = b'S',
}

impl Command {
    /// Wire byte for this command.
    #[inline]
    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Command {
    type Error = BatchwireError;

    fn try_from(byte: u8) -> Result<Self> {
        match byte {
            b'B' => Ok(Command::SubmitBegin),
            b'W' => Ok(Command::PollRequest),
            b'R' => Ok(Command::PollNotReady),
            b'S' => Ok(Command::PollReady),
            other => Err(BatchwireError::UnknownCommand(other)),
        }
    }
}

/// Per-batch acknowledgment sent by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AckCode {
    /// Every record in the batch was stored.
    Success = 0,
    /// The batch was rejected.
    Fail = 1,
    /// Some records in the batch were rejected.
    Partial = 2,
}

impl AckCode {
    /// Wire byte for this ack.
    #[inline]
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// Check if the batch was fully accepted.
    #[inline]
    pub fn is_success(self) -> bool {
        self == AckCode::Success
    }
}

impl TryFrom<u8> for AckCode {
    type Error = BatchwireError;

    fn try_from(byte: u8) -> Result<Self> {
        match byte {
            0 => Ok(AckCode::Success),
            1 => Ok(AckCode::Fail),
            2 => Ok(AckCode::Partial),
            other => Err(BatchwireError::Protocol(format!(
                "Unknown ack byte {}",
                other
            ))),
        }
    }
}

impl fmt::Display for AckCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AckCode::Success => f.write_str("success"),
            AckCode::Fail => f.write_str("fail"),
            AckCode::Partial => f.write_str("partial"),
        }
    }
}

/// Decoded batch header from wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchHeader {
    /// Serialized batch length in bytes.
    pub byte_length: u32,
    /// Number of records in the batch.
    pub record_count: u32,
}

impl BatchHeader {
    /// The termination sentinel: no more batches follow.
    pub const TERMINATION: BatchHeader = BatchHeader {
        byte_length: 0,
        record_count: 0,
    };

    /// Create a new header.
    pub fn new(byte_length: u32, record_count: u32) -> Self {
        Self {
            byte_length,
            record_count,
        }
    }

    /// Encode header to bytes (Big Endian).
    ///
    /// # Example
    ///
    /// ```
    /// use batchwire_client::protocol::BatchHeader;
    ///
    /// let bytes = BatchHeader::new(300, 2).encode();
    /// assert_eq!(bytes, [0, 0, 1, 44, 0, 0, 0, 2]);
    /// ```
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.byte_length.to_be_bytes());
        buf[4..8].copy_from_slice(&self.record_count.to_be_bytes());
        buf
    }

    /// Decode header from bytes (Big Endian).
    ///
    /// Returns `None` if buffer is too short.
    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < HEADER_SIZE {
            return None;
        }
        Some(Self {
            byte_length: u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]),
            record_count: u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]),
        })
    }

    /// Check if this header is the termination sentinel.
    #[inline]
    pub fn is_termination(&self) -> bool {
        *self == Self::TERMINATION
    }

    /// Validate the header for protocol compliance.
    ///
    /// Checks:
    /// - Length and count are both zero (termination) or both non-zero
    /// - Length doesn't exceed max
    pub fn validate(&self, max_payload_size: u32) -> Result<()> {
        if self.is_termination() {
            return Ok(());
        }

        if self.byte_length == 0 || self.record_count == 0 {
            return Err(BatchwireError::Protocol(format!(
                "Empty batch header (length {}, records {}) is not a termination",
                self.byte_length, self.record_count
            )));
        }

        if self.byte_length > max_payload_size {
            return Err(BatchwireError::Protocol(format!(
                "Payload size {} exceeds maximum {}",
                self.byte_length, max_payload_size
            )));
        }

        Ok(())
    }
}

/// Fixed-width client identity sent after `PollReady`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId([u8; IDENTITY_SIZE]);

impl ClientId {
    /// Build an identity from a textual client id.
    ///
    /// The id is left-padded with `'0'` to four bytes.
    ///
    /// # Example
    ///
    /// ```
    /// use batchwire_client::protocol::ClientId;
    ///
    /// let id = ClientId::parse("7").unwrap();
    /// assert_eq!(id.as_bytes(), b"0007");
    /// ```
    pub fn parse(id: &str) -> Result<Self> {
        let raw = id.as_bytes();
        if raw.is_empty() || raw.len() > IDENTITY_SIZE {
            return Err(BatchwireError::Config(format!(
                "Client id {:?} must be 1 to {} bytes",
                id, IDENTITY_SIZE
            )));
        }
        if !raw.is_ascii() {
            return Err(BatchwireError::Config(format!(
                "Client id {:?} must be ASCII",
                id
            )));
        }

        let mut buf = [b'0'; IDENTITY_SIZE];
        buf[IDENTITY_SIZE - raw.len()..].copy_from_slice(raw);
        Ok(Self(buf))
    }

    /// Wrap four raw identity bytes.
    pub fn from_bytes(bytes: [u8; IDENTITY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Wire bytes of the identity.
    #[inline]
    pub fn as_bytes(&self) -> &[u8; IDENTITY_SIZE] {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}
