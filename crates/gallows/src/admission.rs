//! Per-connection admission: greeting, player descriptor, lobby placement.
//!
//! Each accepted connection gets its own Tokio task running [`admit`].
//! The flow is:
//!   1. Send `HI`
//!   2. Ask for `P=name,size` with `RP`, re-asking on bad answers up to
//!      [`MAX_CORRECTIONS`] times
//!   3. Place the player in a lobby and send `ATQ`
//!
//! From then on the connection belongs to the lobby; the supervisor and
//! the game session do all further talking.

use std::sync::Arc;

use gallows_protocol::{ClientMessage, PlayerDescriptor, ServerMessage};
use gallows_session::{prompt, revoke_connection, send_message, Player, SessionError};
use gallows_transport::Connection;

use crate::server::ServerState;
use crate::GallowsError;

/// Malformed descriptors tolerated before the connection is revoked.
pub const MAX_CORRECTIONS: u32 = 5;

/// Handles a single connection from accept to lobby placement.
pub(crate) async fn admit<C: Connection>(
    conn: C,
    state: Arc<ServerState<C>>,
) -> Result<(), GallowsError> {
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "admitting connection");

    let handshake = tokio::time::timeout(
        state.config.handshake_timeout(),
        handshake(&conn, &state),
    )
    .await;

    let descriptor = match handshake {
        Ok(Ok(descriptor)) => descriptor,
        Ok(Err(e @ SessionError::TooManyCorrections(_))) => {
            tracing::info!(%conn_id, error = %e, "revoking connection");
            revoke_connection(&conn).await;
            return Err(e.into());
        }
        Ok(Err(e)) => {
            tracing::debug!(%conn_id, error = %e, "left during handshake");
            revoke_connection(&conn).await;
            return Err(e.into());
        }
        Err(_) => {
            tracing::info!(%conn_id, "handshake timed out");
            revoke_connection(&conn).await;
            return Err(GallowsError::HandshakeTimeout);
        }
    };

    let player = Arc::new(Player::new(conn, descriptor));
    let player_id = player.id();

    // Shutdown is checked under the lock: once the server has drained the
    // registry, nothing may be placed into it.
    let mut registry = state.registry.lock().await;
    if state.shutdown.is_triggered() {
        drop(registry);
        tracing::debug!(%player_id, "server closing; not queued");
        player.revoke().await;
        return Ok(());
    }

    // ATQ goes out under the lock: the supervisor cannot promote this
    // lobby, and so no START can reach the player, before it.
    let (lobby_id, _) = registry.lobbies.place(Arc::clone(&player))?;
    player.send(&ServerMessage::Queued).await?;
    drop(registry);

    tracing::info!(%player_id, %lobby_id, name = %player.name(), "player queued");
    Ok(())
}

/// Greets the connection and asks for a player descriptor.
async fn handshake<C: Connection>(
    conn: &C,
    state: &ServerState<C>,
) -> Result<PlayerDescriptor, SessionError> {
    send_message(conn, &ServerMessage::Welcome).await?;
    tokio::time::sleep(state.config.frame_delay()).await;

    prompt(
        conn,
        &ServerMessage::RequestPlayer,
        Some(MAX_CORRECTIONS),
        |msg| match msg {
            ClientMessage::Player(descriptor) => Some(descriptor),
            _ => None,
        },
    )
    .await
}
