//! Protocol module - wire format and frames.
//!
//! This module implements the binary protocol spoken with the server:
//! - Command bytes, per-batch acks, and the identity frame
//! - 8-byte batch header encoding/decoding and the termination sentinel
//! - Length-prefixed result frames and their decoding

mod frame;
mod wire_format;

pub use frame::{decode_entries, read_frame, Frame, FrameKind};
pub use wire_format::{
    AckCode, BatchHeader, ClientId, Command, DEFAULT_MAX_PAYLOAD_SIZE, FIELD_DELIMITER,
    HEADER_SIZE, IDENTITY_SIZE, LENGTH_PREFIX_SIZE, RECORD_DELIMITER,
};
