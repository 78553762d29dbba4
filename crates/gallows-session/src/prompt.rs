//! Typed send/receive over a raw connection, and the re-prompt loop.
//!
//! These work on a bare [`Connection`] rather than a [`Player`](crate::Player)
//! because the handshake has to ask questions before there is a player
//! to ask them of.

use gallows_protocol::{ClientMessage, ProtocolError, ServerMessage};
use gallows_transport::Connection;

use crate::SessionError;

/// Encodes and sends one command.
pub async fn send_message<C: Connection>(
    conn: &C,
    msg: &ServerMessage,
) -> Result<(), SessionError> {
    let payload = msg.encode();
    tracing::debug!(id = %conn.id(), %payload, "send");
    conn.send(payload.as_bytes())
        .await
        .map_err(SessionError::disconnected)
}

/// Waits for one frame and decodes it.
///
/// The outer `Result` is the connection; the inner one is the payload.
/// A frame that arrived but made no sense is `Ok(Err(_))` so the caller
/// can ask again.
pub async fn receive_message<C: Connection>(
    conn: &C,
) -> Result<Result<ClientMessage, ProtocolError>, SessionError> {
    match conn.recv().await {
        Ok(Some(bytes)) => {
            let decoded = ClientMessage::from_bytes(&bytes);
            if let Err(e) = &decoded {
                tracing::debug!(id = %conn.id(), error = %e, "undecodable frame");
            }
            Ok(decoded)
        }
        Ok(None) => Err(SessionError::disconnected(format!("{} hung up", conn.id()))),
        Err(e) => Err(SessionError::disconnected(e)),
    }
}

/// Sends `REVOKE` if the connection still looks open, then closes it.
///
/// Best-effort: a peer that is already gone simply doesn't hear it.
pub async fn revoke_connection<C: Connection>(conn: &C) {
    if !conn.is_closed() {
        let _ = send_message(conn, &ServerMessage::Revoke).await;
    }
    if let Err(e) = conn.close().await {
        tracing::debug!(id = %conn.id(), error = %e, "close failed");
    }
}

/// Sends `request`, then keeps asking until `accept` takes an answer.
///
/// Every answer that fails to decode, or that `accept` turns down, earns
/// an `ERR=input` followed by `request` again. With `max_corrections`
/// set, the loop gives up with [`SessionError::TooManyCorrections`] once
/// that many answers have been refused; with `None` it never gives up on
/// its own, and only a closed connection ends it.
///
/// ```text
/// → RP
/// ← P=bob         (no size)
/// → ERR=input
/// → RP
/// ← P=bob,2       accepted
/// ```
pub async fn prompt<C, T, F>(
    conn: &C,
    request: &ServerMessage,
    max_corrections: Option<u32>,
    mut accept: F,
) -> Result<T, SessionError>
where
    C: Connection,
    F: FnMut(ClientMessage) -> Option<T>,
{
    let mut refused = 0u32;

    loop {
        send_message(conn, request).await?;

        if let Ok(answer) = receive_message(conn).await? {
            if let Some(value) = accept(answer) {
                return Ok(value);
            }
        }

        refused += 1;
        if max_corrections.is_some_and(|max| refused >= max) {
            tracing::debug!(id = %conn.id(), refused, "prompt exhausted");
            return Err(SessionError::TooManyCorrections(refused));
        }
        send_message(conn, &ServerMessage::InvalidInput).await?;
    }
}
