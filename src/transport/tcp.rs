//! Stream dialing.
//!
//! # Example
//!
//! ```ignore
//! use batchwire_client::transport::{Connector, TcpConnector};
//!
//! let stream = TcpConnector.connect("server:12345").await?;
//! ```

use std::io;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

/// Opens a byte stream to the server.
///
/// The client dials through this trait so tests can hand it in-memory
/// streams instead of sockets.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Type of the connected stream.
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Connect to `address`.
    ///
    /// # Errors
    ///
    /// Returns `std::io::Error` if the address does not resolve or the peer
    /// refuses the connection.
    async fn connect(&self, address: &str) -> io::Result<Self::Stream>;
}

/// Dials plain TCP with `TCP_NODELAY` set.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

#[async_trait]
impl Connector for TcpConnector {
    type Stream = TcpStream;

    async fn connect(&self, address: &str) -> io::Result<TcpStream> {
        let stream = TcpStream::connect(address).await?;
        // Frames are small and each one waits on a reply.
        stream.set_nodelay(true)?;
        Ok(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_tcp_connector_dials_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1];
            socket.read_exact(&mut buf).await.unwrap();
            buf[0]
        });

        let mut stream = TcpConnector.connect(&address).await.unwrap();
        assert!(stream.nodelay().unwrap());
        stream.write_all(b"B").await.unwrap();

        assert_eq!(server.await.unwrap(), b'B');
    }

    #[tokio::test]
    async fn test_tcp_connector_refused() {
        // Bind then drop to get a port nobody listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        drop(listener);

        assert!(TcpConnector.connect(&address).await.is_err());
    }
}
