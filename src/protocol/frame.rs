//! Frame enum with encoding and exact-read decoding.
//!
//! Every unit on the wire is one [`Frame`]. Single-byte frames (commands and
//! acks) are not self-describing, so decoding takes the [`FrameKind`] the
//! caller expects at that point of the exchange.
//!
//! # Example
//!
//! ```
//! use batchwire_client::protocol::{Command, Frame};
//!
//! let bytes = Frame::Command(Command::PollRequest).encode().unwrap();
//! assert_eq!(&bytes[..], b"W");
//!
//! let bytes = Frame::Result(b"alice;bob".to_vec().into()).encode().unwrap();
//! assert_eq!(&bytes[..4], &[0, 0, 0, 9]);
//! ```

use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::AsyncRead;

use super::wire_format::{
    AckCode, BatchHeader, ClientId, Command, HEADER_SIZE, IDENTITY_SIZE, LENGTH_PREFIX_SIZE,
    RECORD_DELIMITER,
};
use crate::batch::Batch;
use crate::error::{BatchwireError, Result};
use crate::transport::{read_exact, read_exact_into};

/// A complete protocol frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Control byte.
    Command(Command),
    /// Batch header followed by its payload.
    Batch(Batch),
    /// Zero/zero header: no more batches.
    Termination,
    /// Per-batch acknowledgment byte.
    Ack(AckCode),
    /// Fixed-width client identity.
    Identity(ClientId),
    /// Length-prefixed result payload.
    Result(Bytes),
}

/// What the reader expects next on the stream.
///
/// The client itself only reads `Command`, `Ack` and `Result` frames;
/// `Batch` and `Identity` are decoded by the codec tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// One command byte.
    Command,
    /// A batch frame or the termination sentinel.
    Batch,
    /// One ack byte.
    Ack,
    /// Four identity bytes.
    Identity,
    /// A length-prefixed result.
    Result,
}

impl Frame {
    /// Size of the encoded frame in bytes.
    pub fn encoded_len(&self) -> usize {
        match self {
            Frame::Command(_) | Frame::Ack(_) => 1,
            Frame::Batch(batch) => HEADER_SIZE + batch.byte_len(),
            Frame::Termination => HEADER_SIZE,
            Frame::Identity(_) => IDENTITY_SIZE,
            Frame::Result(payload) => LENGTH_PREFIX_SIZE + payload.len(),
        }
    }

    /// Encode the frame into a contiguous buffer.
    ///
    /// Fails with [`BatchwireError::Protocol`] if a payload is too long for
    /// its 32-bit length field.
    pub fn encode(&self) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(self.encoded_len());

        match self {
            Frame::Command(cmd) => buf.put_u8(cmd.as_byte()),
            Frame::Ack(ack) => buf.put_u8(ack.as_byte()),
            Frame::Batch(batch) => {
                let length = frame_length(batch.byte_len())?;
                let header = BatchHeader::new(length, batch.record_count());
                buf.put_slice(&header.encode());
                buf.put_slice(batch.payload());
            }
            Frame::Termination => buf.put_slice(&BatchHeader::TERMINATION.encode()),
            Frame::Identity(id) => buf.put_slice(id.as_bytes()),
            Frame::Result(payload) => {
                buf.put_u32(frame_length(payload.len())?);
                buf.put_slice(payload);
            }
        }

        Ok(buf.freeze())
    }
}

/// Convert a payload length to its 32-bit wire field.
fn frame_length(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| {
        BatchwireError::Protocol(format!(
            "Payload size {} does not fit a 32-bit length field",
            len
        ))
    })
}

/// Read one frame of the expected kind.
///
/// Declared lengths above `max_payload_size` are rejected before the payload
/// is read.
pub async fn read_frame<R>(reader: &mut R, kind: FrameKind, max_payload_size: u32) -> Result<Frame>
where
    R: AsyncRead + Unpin + ?Sized,
{
    match kind {
        FrameKind::Command => Ok(Frame::Command(Command::try_from(read_byte(reader).await?)?)),
        FrameKind::Ack => Ok(Frame::Ack(AckCode::try_from(read_byte(reader).await?)?)),
        FrameKind::Identity => {
            let mut buf = [0u8; IDENTITY_SIZE];
            read_exact_into(reader, &mut buf).await?;
            Ok(Frame::Identity(ClientId::from_bytes(buf)))
        }
        FrameKind::Batch => {
            let mut buf = [0u8; HEADER_SIZE];
            read_exact_into(reader, &mut buf).await?;
            let header = BatchHeader::decode(&buf)
                .ok_or_else(|| BatchwireError::Protocol("Truncated batch header".to_string()))?;
            header.validate(max_payload_size)?;

            if header.is_termination() {
                return Ok(Frame::Termination);
            }

            let payload = read_exact(reader, header.byte_length as usize).await?;
            Ok(Frame::Batch(Batch::from_wire(payload, header.record_count)))
        }
        FrameKind::Result => {
            let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
            read_exact_into(reader, &mut prefix).await?;
            let length = u32::from_be_bytes(prefix);

            if length > max_payload_size {
                return Err(BatchwireError::Protocol(format!(
                    "Payload size {} exceeds maximum {}",
                    length, max_payload_size
                )));
            }

            Ok(Frame::Result(read_exact(reader, length as usize).await?))
        }
    }
}

async fn read_byte<R>(reader: &mut R) -> Result<u8>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut buf = [0u8; 1];
    read_exact_into(reader, &mut buf).await?;
    Ok(buf[0])
}

/// Split a result payload into its `;`-delimited entries.
///
/// An empty payload is an empty set, not one empty entry.
///
/// # Example
///
/// ```
/// use batchwire_client::protocol::decode_entries;
///
/// assert_eq!(decode_entries(b"alice;bob;carol").unwrap(), vec!["alice", "bob", "carol"]);
/// assert!(decode_entries(b"").unwrap().is_empty());
/// ```
pub fn decode_entries(payload: &[u8]) -> Result<Vec<String>> {
    if payload.is_empty() {
        return Ok(Vec::new());
    }

    let text = std::str::from_utf8(payload)
        .map_err(|e| BatchwireError::Decode(format!("result is not UTF-8: {}", e)))?;

    Ok(text
        .split(RECORD_DELIMITER as char)
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::DEFAULT_MAX_PAYLOAD_SIZE;

    async fn decode(bytes: &[u8], kind: FrameKind) -> Result<Frame> {
        let mut reader = bytes;
        read_frame(&mut reader, kind, DEFAULT_MAX_PAYLOAD_SIZE).await
    }

    #[tokio::test]
    async fn test_roundtrip_every_kind() {
        let cases: Vec<(Vec<u8>, FrameKind)> = vec![
            (b"B".to_vec(), FrameKind::Command),
            (b"W".to_vec(), FrameKind::Command),
            (b"R".to_vec(), FrameKind::Command),
            (b"S".to_vec(), FrameKind::Command),
            (vec![0], FrameKind::Ack),
            (vec![1], FrameKind::Ack),
            (vec![2], FrameKind::Ack),
            (b"0012".to_vec(), FrameKind::Identity),
            (vec![0; 8], FrameKind::Batch),
            (
                [&[0u8, 0, 0, 5, 0, 0, 0, 2][..], &b"a|b;c"[..]].concat(),
                FrameKind::Batch,
            ),
            (vec![0, 0, 0, 0], FrameKind::Result),
            (
                [&[0u8, 0, 0, 15][..], &b"alice;bob;carol"[..]].concat(),
                FrameKind::Result,
            ),
        ];

        for (bytes, kind) in cases {
            let frame = decode(&bytes, kind).await.unwrap();
            assert_eq!(&frame.encode().unwrap()[..], &bytes[..], "kind {kind:?}");
            assert_eq!(frame.encoded_len(), bytes.len());
        }
    }

    #[tokio::test]
    async fn test_termination_decodes_as_sentinel() {
        let frame = decode(&[0; 8], FrameKind::Batch).await.unwrap();
        assert_eq!(frame, Frame::Termination);
    }

    #[tokio::test]
    async fn test_zero_length_batch_with_records_rejected() {
        let err = decode(&[0, 0, 0, 0, 0, 0, 0, 4], FrameKind::Batch)
            .await
            .unwrap_err();
        assert!(matches!(err, BatchwireError::Protocol(_)));
    }

    #[tokio::test]
    async fn test_unknown_command_rejected() {
        let err = decode(b"Z", FrameKind::Command).await.unwrap_err();
        assert!(matches!(err, BatchwireError::UnknownCommand(b'Z')));
    }

    #[tokio::test]
    async fn test_truncated_header_is_short_io() {
        // Only 2 of the 4 length bytes arrive before close.
        let err = decode(&[0, 0], FrameKind::Result).await.unwrap_err();
        assert!(matches!(
            err,
            BatchwireError::ShortIo {
                expected: 4,
                transferred: 2,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_truncated_payload_is_short_io() {
        let err = decode(&[0, 0, 0, 10, b'a', b'b'], FrameKind::Result)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BatchwireError::ShortIo {
                expected: 10,
                transferred: 2,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_oversized_result_rejected_before_read() {
        let mut reader: &[u8] = &[0xFF, 0xFF, 0xFF, 0xFF];
        let err = read_frame(&mut reader, FrameKind::Result, 1024)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("exceeds maximum"));
    }

    #[test]
    fn test_decode_entries() {
        assert_eq!(
            decode_entries(b"alice;bob;carol").unwrap(),
            vec!["alice", "bob", "carol"]
        );
        assert_eq!(decode_entries(b"single").unwrap(), vec!["single"]);
        assert_eq!(decode_entries(b"").unwrap(), Vec::<String>::new());
    }

    #[test]
    fn test_decode_entries_invalid_utf8() {
        let err = decode_entries(&[0xFF, 0xFE]).unwrap_err();
        assert!(matches!(err, BatchwireError::Decode(_)));
    }

    #[test]
    fn test_batch_frame_encoding() {
        let batch = Batch::from_wire(Bytes::from_static(b"x|y"), 1);
        let bytes = Frame::Batch(batch).encode().unwrap();
        assert_eq!(&bytes[..], &[0, 0, 0, 3, 0, 0, 0, 1, b'x', b'|', b'y']);
    }

    #[test]
    fn test_frame_length_rejects_oversized_payload() {
        assert_eq!(frame_length(0).unwrap(), 0);
        assert_eq!(frame_length(u32::MAX as usize).unwrap(), u32::MAX);

        #[cfg(target_pointer_width = "64")]
        {
            let err = frame_length(u32::MAX as usize + 1).unwrap_err();
            assert!(matches!(err, BatchwireError::Protocol(_)));
        }
    }
}
