//! The connected player: who they are, plus the one connection that
//! reaches them.
//!
//! A `Player` owns its connection outright. Lobbies and games share the
//! player through an `Arc<Player<C>>`, so every frame to a given player
//! goes through the same object and the connection's own locks keep
//! frames whole.

use std::time::Duration;

use gallows_protocol::{ClientMessage, PlayerDescriptor, PlayerId, ProtocolError, ServerMessage};
use gallows_transport::Connection;

use crate::prompt::{self, receive_message, revoke_connection, send_message};
use crate::SessionError;

/// A player who made it through the handshake.
pub struct Player<C> {
    id: PlayerId,
    descriptor: PlayerDescriptor,
    conn: C,
}

impl<C: Connection> Player<C> {
    /// Binds a descriptor to the connection it arrived on. The
    /// player's id is taken from the connection.
    pub fn new(conn: C, descriptor: PlayerDescriptor) -> Self {
        Self {
            id: PlayerId::from(conn.id()),
            descriptor,
            conn,
        }
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    /// The `P=name,size` this player introduced themselves with.
    pub fn descriptor(&self) -> &PlayerDescriptor {
        &self.descriptor
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn preferred_party_size(&self) -> u8 {
        self.descriptor.party_size
    }

    pub fn is_closed(&self) -> bool {
        self.conn.is_closed()
    }

    /// Sends one command.
    pub async fn send(&self, msg: &ServerMessage) -> Result<(), SessionError> {
        send_message(&self.conn, msg).await
    }

    /// Waits for the next command from this player.
    pub async fn receive(&self) -> Result<Result<ClientMessage, ProtocolError>, SessionError> {
        receive_message(&self.conn).await
    }

    /// Asks until the player gives an answer `accept` takes.
    ///
    /// Unbounded: in a running game a player can get it wrong as often
    /// as they like. Ends early only if the connection does.
    pub async fn prompt<T, F>(&self, request: &ServerMessage, accept: F) -> Result<T, SessionError>
    where
        F: FnMut(ClientMessage) -> Option<T>,
    {
        prompt::prompt(&self.conn, request, None, accept).await
    }

    /// Checks that the player is still there without waiting for an
    /// answer.
    ///
    /// Fails if the connection is already closed, if the peer has hung
    /// up, or if an `HB` cannot be written within `timeout`. Never closes
    /// the connection itself.
    pub async fn probe(&self, timeout: Duration) -> bool {
        if self.conn.is_closed() || self.conn.peer_hung_up() {
            return false;
        }
        match tokio::time::timeout(timeout, self.send(&ServerMessage::Heartbeat)).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                tracing::debug!(player_id = %self.id, error = %e, "probe failed");
                false
            }
            Err(_) => {
                tracing::debug!(player_id = %self.id, "probe timed out");
                false
            }
        }
    }

    /// Closes the connection. Safe to call more than once.
    pub async fn close(&self) {
        if let Err(e) = self.conn.close().await {
            tracing::debug!(player_id = %self.id, error = %e, "close failed");
        }
    }

    /// Tells the player they are being dropped, then closes.
    pub async fn revoke(&self) {
        revoke_connection(&self.conn).await;
        tracing::debug!(player_id = %self.id, name = %self.name(), "revoked");
    }
}

impl<C> std::fmt::Debug for Player<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Player")
            .field("id", &self.id)
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}
