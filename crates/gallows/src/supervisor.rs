//! The lobby supervisor: promotes full lobbies, evicts broken ones, and
//! reclaims finished games.
//!
//! One task runs [`run_supervisor`] for the life of the server. Every
//! `supervisor_interval` it takes the registry lock and runs one
//! [`supervise`] pass:
//!
//! ```text
//! for each waiting lobby, oldest first:
//!     probe every member ──any failed──→ REVOKE all, drop lobby
//!            │
//!         all alive ──is_ready──→ start(), spawn game session
//! then: drop every finished game and its lobby
//! ```
//!
//! The supervisor never waits on a game; it only reads its `finished`
//! flag.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use futures_util::future::join_all;
use gallows_protocol::LobbyId;
use gallows_transport::Connection;
use tokio::time::MissedTickBehavior;

use crate::game::run_game;
use crate::server::{GameHandle, Registry, ServerState};
use crate::shutdown;
use crate::GallowsError;

/// Runs supervision passes until the stop signal fires.
pub(crate) async fn run_supervisor<C: Connection>(state: Arc<ServerState<C>>) {
    let mut interval = tokio::time::interval(state.config.supervisor_interval());
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut stop = state.shutdown.subscribe();

    tracing::info!(
        interval_ms = state.config.supervisor_interval_ms,
        "lobby supervisor running"
    );

    loop {
        tokio::select! {
            _ = shutdown::wait(&mut stop) => break,
            _ = interval.tick() => supervise(&state).await,
        }
    }

    tracing::info!("lobby supervisor stopped");
}

/// One supervision pass, entirely under the registry lock.
pub(crate) async fn supervise<C: Connection>(state: &Arc<ServerState<C>>) {
    let mut registry = state.registry.lock().await;
    let probe_timeout = state.config.probe_timeout();

    for lobby_id in registry.lobbies.waiting_ids() {
        let Ok(lobby) = registry.lobbies.get(lobby_id) else {
            continue;
        };
        let players = lobby.players();

        let alive = join_all(players.iter().map(|p| p.probe(probe_timeout))).await;
        if players.is_empty() || alive.contains(&false) {
            evict(&mut registry, lobby_id).await;
            continue;
        }

        let ready = registry
            .lobbies
            .get(lobby_id)
            .is_ok_and(|lobby| lobby.is_ready());
        if ready {
            if let Err(e) = promote(state, &mut registry, lobby_id) {
                tracing::warn!(%lobby_id, error = %e, "could not start game");
            }
        }
    }

    reclaim(&mut registry);
}

/// Revokes every member of a lobby and removes it.
async fn evict<C: Connection>(registry: &mut Registry<C>, lobby_id: LobbyId) {
    let Ok(lobby) = registry.lobbies.remove(lobby_id) else {
        return;
    };
    tracing::info!(%lobby_id, players = lobby.len(), "evicting lobby with a lost player");
    for player in lobby.players() {
        player.revoke().await;
    }
}

/// Freezes a full lobby and spawns its game session.
fn promote<C: Connection>(
    state: &Arc<ServerState<C>>,
    registry: &mut Registry<C>,
    lobby_id: LobbyId,
) -> Result<(), GallowsError> {
    registry.lobbies.get_mut(lobby_id)?.start()?;

    let finished = Arc::new(AtomicBool::new(false));
    let task = tokio::spawn(run_game(
        Arc::clone(state),
        lobby_id,
        Arc::clone(&finished),
    ));
    registry.games.insert(lobby_id, GameHandle { finished, task });

    tracing::info!(%lobby_id, "game started");
    Ok(())
}

/// Drops finished games and their lobbies.
fn reclaim<C: Connection>(registry: &mut Registry<C>) {
    let done: Vec<LobbyId> = registry
        .games
        .iter()
        .filter(|(_, handle)| handle.is_finished())
        .map(|(&lobby_id, _)| lobby_id)
        .collect();

    for lobby_id in done {
        registry.games.remove(&lobby_id);
        match registry.lobbies.remove(lobby_id) {
            Ok(_) => tracing::info!(%lobby_id, "game reclaimed"),
            Err(e) => tracing::warn!(%lobby_id, error = %e, "finished game had no lobby"),
        }
    }
}
