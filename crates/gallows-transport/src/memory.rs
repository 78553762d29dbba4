//! In-memory connection pair.
//!
//! Each end carries whole frames over unbounded channels, so no header
//! is involved. Closing one end makes the other end's `recv` return
//! `Ok(None)` and its sends fail, like a TCP peer hanging up.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{mpsc, Mutex};

use crate::{next_connection_id, Connection, ConnectionId, TransportError};

/// One end of an in-memory connection.
pub struct MemoryConnection {
    id: ConnectionId,
    outbound: std::sync::Mutex<Option<mpsc::UnboundedSender<Vec<u8>>>>,
    inbound: Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
    closed: AtomicBool,
}

impl MemoryConnection {
    /// Creates two connected ends.
    pub fn pair() -> (Self, Self) {
        let (a_tx, a_rx) = mpsc::unbounded_channel();
        let (b_tx, b_rx) = mpsc::unbounded_channel();
        (Self::new(a_tx, b_rx), Self::new(b_tx, a_rx))
    }

    fn new(
        outbound: mpsc::UnboundedSender<Vec<u8>>,
        inbound: mpsc::UnboundedReceiver<Vec<u8>>,
    ) -> Self {
        Self {
            id: next_connection_id(),
            outbound: std::sync::Mutex::new(Some(outbound)),
            inbound: Mutex::new(inbound),
            closed: AtomicBool::new(false),
        }
    }

    fn closed_error(&self) -> TransportError {
        TransportError::ConnectionClosed(format!("{} closed", self.id))
    }
}

impl Connection for MemoryConnection {
    type Error = TransportError;

    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        if self.is_closed() {
            return Err(self.closed_error());
        }
        let outbound = self
            .outbound
            .lock()
            .map_err(|_| self.closed_error())?;
        match outbound.as_ref() {
            Some(tx) if tx.send(data.to_vec()).is_ok() => Ok(()),
            _ => {
                self.closed.store(true, Ordering::Release);
                Err(self.closed_error())
            }
        }
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        if self.is_closed() {
            return Err(self.closed_error());
        }
        let frame = self.inbound.lock().await.recv().await;
        if frame.is_none() {
            self.closed.store(true, Ordering::Release);
        }
        Ok(frame)
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.closed.store(true, Ordering::Release);
        // Dropping the sender ends the peer's stream.
        if let Ok(mut outbound) = self.outbound.lock() {
            outbound.take();
        }
        if let Ok(mut inbound) = self.inbound.try_lock() {
            inbound.close();
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn peer_hung_up(&self) -> bool {
        let gone = match self.outbound.lock() {
            Ok(outbound) => outbound.as_ref().is_none_or(|tx| tx.is_closed()),
            Err(_) => true,
        };
        if gone {
            self.closed.store(true, Ordering::Release);
        }
        gone
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pair_delivers_frames_both_ways() {
        let (a, b) = MemoryConnection::pair();
        a.send(b"ping").await.unwrap();
        assert_eq!(b.recv().await.unwrap().unwrap(), b"ping");
        b.send(b"pong").await.unwrap();
        assert_eq!(a.recv().await.unwrap().unwrap(), b"pong");
    }

    #[tokio::test]
    async fn test_close_ends_peer_stream() {
        let (a, b) = MemoryConnection::pair();
        a.close().await.unwrap();
        assert!(a.is_closed());
        assert!(b.recv().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_peer_hung_up_after_peer_closes() {
        let (a, b) = MemoryConnection::pair();
        assert!(!b.peer_hung_up());
        a.close().await.unwrap();
        assert!(b.peer_hung_up());
        assert!(b.send(b"late").await.is_err());
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (a, _b) = MemoryConnection::pair();
        a.close().await.unwrap();
        a.close().await.unwrap();
        assert!(a.send(b"x").await.is_err());
    }
}
