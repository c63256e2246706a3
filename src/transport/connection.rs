//! Exclusively-owned connection to the server.
//!
//! Every frame the client sends or receives goes through a [`Connection`],
//! which encodes/decodes via the frame codec and moves bytes with exact I/O.
//! Each operation is raced against the shutdown notification so a signal
//! unblocks a peer that never answers.

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use super::exact::write_exact;
use crate::error::{BatchwireError, Result};
use crate::protocol::{read_frame, AckCode, Command, Frame, FrameKind, DEFAULT_MAX_PAYLOAD_SIZE};
use crate::shutdown::Shutdown;

/// A live stream to the server.
///
/// Dropping the connection closes the stream; [`Connection::close`] also
/// shuts down the write side first so the peer sees an orderly close.
pub struct Connection<S> {
    stream: S,
    peer: String,
    shutdown: Shutdown,
    max_payload_size: u32,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wrap a connected stream.
    pub fn new(stream: S, peer: impl Into<String>, shutdown: Shutdown) -> Self {
        Self {
            stream,
            peer: peer.into(),
            shutdown,
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
        }
    }

    /// Set the largest length-prefixed frame this connection will accept.
    pub fn with_max_payload(mut self, max_payload_size: u32) -> Self {
        self.max_payload_size = max_payload_size;
        self
    }

    /// Address of the peer.
    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Write one frame in full.
    pub async fn send(&mut self, frame: &Frame) -> Result<()> {
        let bytes = frame.encode()?;
        tokio::select! {
            res = write_exact(&mut self.stream, &bytes) => res,
            _ = self.shutdown.triggered() => Err(BatchwireError::Cancelled),
        }
    }

    /// Read one frame of the expected kind.
    pub async fn recv(&mut self, kind: FrameKind) -> Result<Frame> {
        let max_payload_size = self.max_payload_size;
        tokio::select! {
            res = read_frame(&mut self.stream, kind, max_payload_size) => res,
            _ = self.shutdown.triggered() => Err(BatchwireError::Cancelled),
        }
    }

    /// Read one command byte.
    pub async fn recv_command(&mut self) -> Result<Command> {
        match self.recv(FrameKind::Command).await? {
            Frame::Command(cmd) => Ok(cmd),
            other => Err(unexpected("command", &other)),
        }
    }

    /// Read one per-batch ack byte.
    pub async fn recv_ack(&mut self) -> Result<AckCode> {
        match self.recv(FrameKind::Ack).await? {
            Frame::Ack(ack) => Ok(ack),
            other => Err(unexpected("ack", &other)),
        }
    }

    /// Read a length-prefixed result payload.
    pub async fn recv_result(&mut self) -> Result<Bytes> {
        match self.recv(FrameKind::Result).await? {
            Frame::Result(payload) => Ok(payload),
            other => Err(unexpected("result", &other)),
        }
    }

    /// Close the connection.
    pub async fn close(mut self) {
        if let Err(e) = self.stream.shutdown().await {
            tracing::debug!("Shutdown of connection to {} failed: {}", self.peer, e);
        }
    }
}

fn unexpected(expected: &str, frame: &Frame) -> BatchwireError {
    BatchwireError::Protocol(format!("Expected {} frame, got {:?}", expected, frame))
}
