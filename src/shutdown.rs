//! Shutdown notification shared between the signal listener and the client.
//!
//! The listener holds the [`ShutdownTrigger`]; every [`Connection`] and sleep
//! holds a [`Shutdown`] and races its blocking work against
//! [`Shutdown::triggered`]. Once triggered, in-flight exact reads and writes
//! fail with [`BatchwireError::Cancelled`] and the connection is closed.
//!
//! [`Connection`]: crate::transport::Connection
//! [`BatchwireError::Cancelled`]: crate::error::BatchwireError::Cancelled

use tokio::sync::watch;

/// Sending half: fires the shutdown notification.
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl ShutdownTrigger {
    /// Notify every [`Shutdown`] listener.
    pub fn shutdown(&self) {
        self.tx.send_replace(true);
    }
}

/// Receiving half, cheap to clone.
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    /// A listener that never fires.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    /// Check whether shutdown has been requested.
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once shutdown is requested.
    ///
    /// Pends forever if the trigger is dropped without firing.
    pub async fn triggered(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Create a connected trigger/listener pair.
pub fn channel() -> (ShutdownTrigger, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, Shutdown { rx })
}
