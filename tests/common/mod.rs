//! Shared fixtures: an in-memory connector, a recording clock, and the
//! server side of the wire protocol.

#![allow(dead_code)]

use std::future::Future;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::sync::mpsc;

use batchwire_client::batch::{partition, Batch, BatchLimits, Record};
use batchwire_client::{Clock, Connector};

const BUFFER_SIZE: usize = 64 * 1024;

/// Hands the server end of every dialed stream to the test.
#[derive(Clone)]
pub struct DuplexConnector {
    peers: mpsc::UnboundedSender<DuplexStream>,
    dials: Arc<AtomicUsize>,
}

impl DuplexConnector {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<DuplexStream>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let connector = Self {
            peers: tx,
            dials: Arc::new(AtomicUsize::new(0)),
        };
        (connector, rx)
    }

    pub fn dials(&self) -> usize {
        self.dials.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for DuplexConnector {
    type Stream = DuplexStream;

    async fn connect(&self, _address: &str) -> io::Result<DuplexStream> {
        let (client, server) = duplex(BUFFER_SIZE);
        self.peers
            .send(server)
            .map_err(|_| io::Error::new(io::ErrorKind::ConnectionRefused, "no server"))?;
        self.dials.fetch_add(1, Ordering::SeqCst);
        Ok(client)
    }
}

/// Records every requested sleep and returns immediately.
#[derive(Clone, Default)]
pub struct RecordingClock {
    sleeps: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingClock {
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

impl Clock for RecordingClock {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        self.sleeps.lock().unwrap().push(duration);
        std::future::ready(())
    }
}

/// `count` records of the form `name{i}|{i}`, cut into batches of `per_batch`.
pub fn batches(count: usize, per_batch: usize) -> Vec<Batch> {
    let records = (0..count).map(|i| Record::new(vec![format!("name{i}"), i.to_string()]).unwrap());
    partition(records, BatchLimits::new(per_batch, 8 * 1024).unwrap()).collect()
}

/// Server half of one connection.
pub struct Peer {
    stream: DuplexStream,
}

impl Peer {
    pub async fn accept(rx: &mut mpsc::UnboundedReceiver<DuplexStream>) -> Self {
        let stream = rx.recv().await.expect("client never dialed");
        Self { stream }
    }

    pub async fn read_byte(&mut self) -> u8 {
        self.stream.read_u8().await.unwrap()
    }

    pub async fn write(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).await.unwrap();
    }

    /// Read `B`, then `batch_count` batches answering each with the next ack,
    /// then the termination sentinel. Returns the payloads received.
    pub async fn receive_submission(&mut self, acks: &[u8]) -> Vec<(u32, Vec<u8>)> {
        assert_eq!(self.read_byte().await, b'B');

        let mut received = Vec::new();
        for &ack in acks {
            received.push(self.read_batch().await);
            self.write(&[ack]).await;
        }

        let mut termination = [0xffu8; 8];
        self.stream.read_exact(&mut termination).await.unwrap();
        assert_eq!(termination, [0u8; 8]);

        received
    }

    /// Read one batch frame without answering it.
    pub async fn read_batch(&mut self) -> (u32, Vec<u8>) {
        let length = self.stream.read_u32().await.unwrap();
        let count = self.stream.read_u32().await.unwrap();
        assert!(length > 0 && count > 0, "unexpected termination");

        let mut payload = vec![0u8; length as usize];
        self.stream.read_exact(&mut payload).await.unwrap();
        (count, payload)
    }

    /// Read one `W` and answer with `reply`.
    pub async fn answer_poll(&mut self, reply: u8) {
        assert_eq!(self.read_byte().await, b'W');
        self.write(&[reply]).await;
    }

    pub async fn read_identity(&mut self) -> [u8; 4] {
        let mut identity = [0u8; 4];
        self.stream.read_exact(&mut identity).await.unwrap();
        identity
    }

    /// Write a length-prefixed result frame.
    pub async fn send_result(&mut self, payload: &[u8]) {
        self.stream.write_u32(payload.len() as u32).await.unwrap();
        self.write(payload).await;
    }

    /// Wait for the client to close and return anything it sent meanwhile.
    pub async fn drain(mut self) -> Vec<u8> {
        let mut rest = Vec::new();
        self.stream.read_to_end(&mut rest).await.unwrap();
        rest
    }
}
