//! TCP transport: one stream per player, frames delimited by a fixed
//! 64-byte length header.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::FutureExt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::sync::Mutex;

use crate::frame::{self, HEADER_WIDTH, MAX_PAYLOAD_LEN};
use crate::{next_connection_id, Connection, ConnectionId, Transport, TransportError};

/// Default pause between writing a header and writing its payload.
pub const DEFAULT_FRAME_DELAY: Duration = Duration::from_millis(100);

/// A TCP [`Transport`] that listens for incoming players.
pub struct TcpTransport {
    listener: TcpListener,
    frame_delay: Duration,
}

impl TcpTransport {
    /// Binds a listener to `addr` with the given accept backlog.
    ///
    /// `addr` may be a host name; the first resolved address is used.
    pub async fn bind(addr: &str, backlog: u32) -> Result<Self, TransportError> {
        let bind_err = |source| TransportError::BindFailed {
            addr: addr.to_string(),
            source,
        };

        let resolved = tokio::net::lookup_host(addr)
            .await
            .map_err(bind_err)?
            .next()
            .ok_or_else(|| {
                bind_err(std::io::Error::new(
                    std::io::ErrorKind::AddrNotAvailable,
                    "address did not resolve",
                ))
            })?;

        let socket = if resolved.is_ipv4() {
            TcpSocket::new_v4()
        } else {
            TcpSocket::new_v6()
        }
        .map_err(bind_err)?;

        socket.set_reuseaddr(true).map_err(bind_err)?;
        socket.bind(resolved).map_err(bind_err)?;
        let listener = socket.listen(backlog).map_err(bind_err)?;

        tracing::info!(%resolved, backlog, "TCP transport listening");
        Ok(Self {
            listener,
            frame_delay: DEFAULT_FRAME_DELAY,
        })
    }

    /// Sets the header/payload pause applied to accepted connections.
    pub fn with_frame_delay(mut self, delay: Duration) -> Self {
        self.frame_delay = delay;
        self
    }

    /// Returns the address the listener is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

impl Transport for TcpTransport {
    type Connection = TcpConnection;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<Self::Connection, Self::Error> {
        let (stream, addr) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;

        let conn = TcpConnection::from_stream(stream, addr, self.frame_delay);
        tracing::debug!(id = %conn.id(), %addr, "accepted TCP connection");
        Ok(conn)
    }

    async fn shutdown(&self) -> Result<(), Self::Error> {
        // The socket closes when the transport is dropped; nothing to
        // flush beforehand.
        tracing::info!("TCP transport shutting down");
        Ok(())
    }
}

/// A single framed TCP connection.
///
/// Reads and writes go through separate halves so a task blocked in
/// [`recv`](Connection::recv) never stalls a concurrent `send`.
pub struct TcpConnection {
    id: ConnectionId,
    peer: SocketAddr,
    reader: Mutex<OwnedReadHalf>,
    writer: Mutex<OwnedWriteHalf>,
    frame_delay: Duration,
    /// Set on local close or on the first I/O failure.
    closed: AtomicBool,
    /// Set once the write half has been shut down.
    shut_down: AtomicBool,
}

impl TcpConnection {
    /// Wraps an established stream.
    pub fn from_stream(
        stream: TcpStream,
        peer: SocketAddr,
        frame_delay: Duration,
    ) -> Self {
        let _ = stream.set_nodelay(true);
        let (reader, writer) = stream.into_split();
        Self {
            id: next_connection_id(),
            peer,
            reader: Mutex::new(reader),
            writer: Mutex::new(writer),
            frame_delay,
            closed: AtomicBool::new(false),
            shut_down: AtomicBool::new(false),
        }
    }

    /// Opens a client-side connection to `addr`.
    pub async fn connect(
        addr: &str,
        frame_delay: Duration,
    ) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| TransportError::ConnectionClosed(e.to_string()))?;
        let peer = stream
            .peer_addr()
            .map_err(|e| TransportError::ConnectionClosed(e.to_string()))?;
        Ok(Self::from_stream(stream, peer, frame_delay))
    }

    /// Returns the remote address.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    fn mark_closed(&self) {
        self.closed.store(true, Ordering::Release);
    }

    async fn write_frame(&self, data: &[u8]) -> std::io::Result<()> {
        // Hold the writer across the pause so two frames never interleave.
        let mut writer = self.writer.lock().await;
        writer.write_all(&frame::encode_header(data.len())).await?;
        writer.flush().await?;
        if !self.frame_delay.is_zero() {
            tokio::time::sleep(self.frame_delay).await;
        }
        writer.write_all(data).await?;
        writer.flush().await
    }
}

impl Connection for TcpConnection {
    type Error = TransportError;

    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        if self.is_closed() {
            return Err(TransportError::ConnectionClosed(format!(
                "{} already closed",
                self.id
            )));
        }
        if data.len() > MAX_PAYLOAD_LEN {
            return Err(TransportError::FrameTooLarge(data.len()));
        }

        self.write_frame(data).await.map_err(|e| {
            self.mark_closed();
            TransportError::SendFailed(e)
        })
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        if self.is_closed() {
            return Err(TransportError::ConnectionClosed(format!(
                "{} already closed",
                self.id
            )));
        }

        let mut reader = self.reader.lock().await;

        let mut header = [0u8; HEADER_WIDTH];
        match reader.read_exact(&mut header).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                self.mark_closed();
                return Ok(None);
            }
            Err(e) => {
                self.mark_closed();
                return Err(TransportError::ReceiveFailed(e));
            }
        }

        // A bad header leaves the stream desynchronized; nothing after it
        // can be trusted, so the connection is finished.
        let len = frame::decode_header(&header).inspect_err(|_| {
            self.mark_closed();
        })?;
        if len > MAX_PAYLOAD_LEN {
            self.mark_closed();
            return Err(TransportError::FrameTooLarge(len));
        }

        let mut payload = vec![0u8; len];
        reader.read_exact(&mut payload).await.map_err(|e| {
            self.mark_closed();
            TransportError::ReceiveFailed(e)
        })?;

        Ok(Some(payload))
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.mark_closed();
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        // The peer may already be gone; a failed shutdown still leaves
        // the connection closed.
        if let Err(e) = self.writer.lock().await.shutdown().await {
            tracing::debug!(id = %self.id, error = %e, "shutdown failed");
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn peer_hung_up(&self) -> bool {
        // Someone is blocked in recv(); they will observe the hang-up.
        let Ok(mut reader) = self.reader.try_lock() else {
            return false;
        };

        let mut probe = [0u8; 1];
        match reader.peek(&mut probe).now_or_never() {
            Some(Ok(0)) | Some(Err(_)) => {
                self.mark_closed();
                true
            }
            // Pending (nothing to read) or unread data waiting.
            _ => false,
        }
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}
