//! Exact reads and writes over a byte stream.
//!
//! A single `read`/`write` call on a socket may move fewer bytes than asked.
//! These helpers loop until the whole buffer is transferred, and turn a
//! zero-byte transfer with bytes still outstanding into
//! [`BatchwireError::ShortIo`] instead of spinning or returning a truncated
//! message.

use std::io::ErrorKind;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{BatchwireError, IoOp, Result};

/// Write all of `buf`, then flush.
pub async fn write_exact<W>(writer: &mut W, buf: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut written = 0;

    while written < buf.len() {
        match writer.write(&buf[written..]).await {
            Ok(0) => {
                return Err(BatchwireError::ShortIo {
                    op: IoOp::Write,
                    expected: buf.len(),
                    transferred: written,
                })
            }
            Ok(n) => written += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(BatchwireError::Io(e)),
        }
    }

    writer.flush().await?;
    Ok(())
}

/// Fill `buf` completely from `reader`.
pub async fn read_exact_into<R>(reader: &mut R, buf: &mut [u8]) -> Result<()>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut filled = 0;

    while filled < buf.len() {
        match reader.read(&mut buf[filled..]).await {
            Ok(0) => {
                return Err(BatchwireError::ShortIo {
                    op: IoOp::Read,
                    expected: buf.len(),
                    transferred: filled,
                })
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(BatchwireError::Io(e)),
        }
    }

    Ok(())
}

/// Read exactly `n` bytes from `reader`.
pub async fn read_exact<R>(reader: &mut R, n: usize) -> Result<Bytes>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut buf = BytesMut::zeroed(n);
    read_exact_into(reader, &mut buf).await?;
    Ok(buf.freeze())
}
