//! The game session: plays rounds for one promoted lobby until the
//! players stop voting to continue.
//!
//! A round, as each player sees it:
//!
//! ```text
//! all       ← START
//! guessers  ← CP;P=picker,n
//! picker    ← RMT → MT=n,  YT → SEC=word
//! repeat until the word is found or the budget is spent:
//!     all     ← M=*,a,*
//!     guesser ← T;P=guesser,n → G=x → C=1      (others also get T)
//! winners ← W;S=…   losers ← L;S=…
//! all     ← AR → AR=1 / AR=0
//! ```
//!
//! The registry lock is taken only to read the roster, rotate, and
//! score; never while waiting on a player.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::future::join_all;
use gallows_lobby::Lobby;
use gallows_protocol::{normalize_guess, ClientMessage, LobbyId, PlayerId, ServerMessage};
use gallows_round::{Outcome, Round};
use gallows_session::Player;
use gallows_transport::Connection;

use crate::server::ServerState;
use crate::GallowsError;

/// Runs a game to completion, then revokes every player and raises
/// `finished` for the supervisor.
pub(crate) async fn run_game<C: Connection>(
    state: Arc<ServerState<C>>,
    lobby_id: LobbyId,
    finished: Arc<AtomicBool>,
) {
    let mut session = GameSession {
        state,
        lobby_id,
        picker: None,
    };

    match session.play().await {
        Ok(rounds) => tracing::info!(%lobby_id, rounds, "game over"),
        Err(e) => tracing::warn!(%lobby_id, error = %e, "game aborted"),
    }

    session.revoke_all().await;
    finished.store(true, Ordering::Release);
}

struct GameSession<C: Connection> {
    state: Arc<ServerState<C>>,
    lobby_id: LobbyId,
    /// Picker of the latest round; the next round rotates from here.
    picker: Option<PlayerId>,
}

impl<C: Connection> GameSession<C> {
    /// Plays rounds while everyone votes to continue. Returns the number
    /// of rounds played.
    async fn play(&mut self) -> Result<u32, GallowsError> {
        let mut rounds = 0;
        loop {
            self.play_round().await?;
            rounds += 1;
            if !self.vote().await? {
                return Ok(rounds);
            }
        }
    }

    async fn play_round(&mut self) -> Result<(), GallowsError> {
        let pacing = self.state.config.pacing_delay();

        // -- Picker ----------------------------------------------------------
        let (players, picker) = self
            .with_lobby(|lobby| {
                let picker_id = lobby.next_picker(self.picker)?;
                Some((lobby.players(), lobby.player(picker_id)?))
            })
            .await?;
        let picker_id = picker.id();
        self.picker = Some(picker_id);

        tracing::info!(lobby_id = %self.lobby_id, %picker_id, "round starting");
        broadcast(&players, &ServerMessage::GameStart).await;
        tokio::time::sleep(pacing).await;
        let choosing = ServerMessage::ChoosingPlayer(picker.descriptor().clone());
        broadcast_except(&players, picker_id, &choosing).await;

        // -- Word ------------------------------------------------------------
        let mut round = picker
            .prompt(&ServerMessage::RequestMaxTries, |msg| match msg {
                ClientMessage::MaxTries(tries) => Round::new(tries).ok(),
                _ => None,
            })
            .await?;
        picker
            .prompt(&ServerMessage::RequestSecret, |msg| match msg {
                ClientMessage::Secret(word) => round.set_secret(&word).ok(),
                _ => None,
            })
            .await?;

        // -- Guessing --------------------------------------------------------
        let mut guesser_id = self
            .with_lobby(|lobby| lobby.first_guesser(picker_id))
            .await?;

        while !round.is_over() {
            let guesser = self
                .with_lobby(|lobby| {
                    let next = lobby.next_guesser(picker_id, guesser_id)?;
                    lobby.player(next)
                })
                .await?;
            guesser_id = guesser.id();

            broadcast(&players, &ServerMessage::Mask(round.mask())).await;
            tokio::time::sleep(pacing).await;

            let turn = ServerMessage::Turn {
                player: guesser.descriptor().clone(),
                tries_left: round.tries_left(),
            };
            broadcast_except(&players, guesser_id, &turn).await;

            let letter = guesser
                .prompt(&turn, |msg| match msg {
                    ClientMessage::Guess(letter) => normalize_guess(letter),
                    _ => None,
                })
                .await?;
            let correct = round.guess(letter)?;
            guesser.send(&ServerMessage::Correct(correct)).await?;
        }

        // -- Scoring ---------------------------------------------------------
        let outcome = round.outcome();
        let scores = self
            .with_lobby_mut(|lobby| {
                if outcome == Outcome::PickerWon {
                    lobby.award(picker_id, 1).ok()?;
                }
                Some(lobby.scores())
            })
            .await?;

        tracing::info!(
            lobby_id = %self.lobby_id,
            word = %round.secret(),
            tries_used = round.tries_used(),
            ?outcome,
            ?scores,
            "round finished"
        );

        let (to_picker, to_guessers) = match outcome {
            Outcome::GuessersWon => {
                (ServerMessage::Loss(scores.clone()), ServerMessage::Win(scores))
            }
            Outcome::PickerWon => {
                (ServerMessage::Win(scores.clone()), ServerMessage::Loss(scores))
            }
        };
        broadcast_except(&players, picker_id, &to_guessers).await;
        if let Err(e) = picker.send(&to_picker).await {
            tracing::debug!(%picker_id, error = %e, "result not delivered");
        }
        Ok(())
    }

    /// Asks everyone whether to play again. Only a unanimous `AR=1`
    /// continues; a no, a garbled answer or a lost player ends the game.
    async fn vote(&self) -> Result<bool, GallowsError> {
        let players = self.with_lobby(|lobby| Some(lobby.players())).await?;
        let ballots = join_all(players.iter().map(|p| ballot(p))).await;
        let again = ballots.iter().all(|&yes| yes);
        tracing::debug!(lobby_id = %self.lobby_id, ?ballots, again, "continuation vote");
        Ok(again)
    }

    /// Sends `REVOKE` to everyone left in the lobby and closes them.
    async fn revoke_all(&self) {
        let players = {
            let registry = self.state.registry.lock().await;
            match registry.lobbies.get(self.lobby_id) {
                Ok(lobby) => lobby.players(),
                Err(_) => Vec::new(),
            }
        };
        for player in players {
            player.revoke().await;
        }
    }

    /// Reads the lobby under the registry lock. `None` from `f` means the
    /// lobby has run out of eligible players.
    async fn with_lobby<T>(
        &self,
        f: impl FnOnce(&Lobby<C>) -> Option<T>,
    ) -> Result<T, GallowsError> {
        let registry = self.state.registry.lock().await;
        let lobby = registry.lobbies.get(self.lobby_id)?;
        f(lobby).ok_or(GallowsError::NoEligiblePlayer(self.lobby_id))
    }

    async fn with_lobby_mut<T>(
        &self,
        f: impl FnOnce(&mut Lobby<C>) -> Option<T>,
    ) -> Result<T, GallowsError> {
        let mut registry = self.state.registry.lock().await;
        let lobby = registry.lobbies.get_mut(self.lobby_id)?;
        f(lobby).ok_or(GallowsError::NoEligiblePlayer(self.lobby_id))
    }
}

/// One player's continuation vote.
async fn ballot<C: Connection>(player: &Player<C>) -> bool {
    if player.send(&ServerMessage::ContinuePrompt).await.is_err() {
        return false;
    }
    matches!(player.receive().await, Ok(Ok(ClientMessage::Continue(true))))
}

/// Best-effort send to every player; a failure here surfaces on that
/// player's next prompt or vote.
async fn broadcast<C: Connection>(players: &[Arc<Player<C>>], msg: &ServerMessage) {
    for player in players {
        if let Err(e) = player.send(msg).await {
            tracing::debug!(player_id = %player.id(), error = %e, "broadcast not delivered");
        }
    }
}

async fn broadcast_except<C: Connection>(
    players: &[Arc<Player<C>>],
    skip: PlayerId,
    msg: &ServerMessage,
) {
    for player in players.iter().filter(|p| p.id() != skip) {
        if let Err(e) = player.send(msg).await {
            tracing::debug!(player_id = %player.id(), error = %e, "broadcast not delivered");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use gallows_protocol::PlayerDescriptor;
    use gallows_transport::MemoryConnection;

    use super::*;
    use crate::{ServerConfig, ShutdownHandle};

    fn state() -> Arc<ServerState<MemoryConnection>> {
        let config = ServerConfig {
            frame_delay_ms: 0,
            pacing_delay_ms: 0,
            ..ServerConfig::default()
        };
        Arc::new(ServerState::new(config, ShutdownHandle::new()))
    }

    /// Seats the players in one lobby and starts it.
    async fn started_lobby(
        state: &ServerState<MemoryConnection>,
        names: &[&str],
    ) -> (LobbyId, Vec<MemoryConnection>) {
        let size = names.len() as u8;
        let mut registry = state.registry.lock().await;
        let mut clients = Vec::new();
        let mut lobby_id = None;
        for name in names {
            let (server, client) = MemoryConnection::pair();
            let player = Player::new(server, PlayerDescriptor::new(*name, size).unwrap());
            let (id, _) = registry.lobbies.place(Arc::new(player)).unwrap();
            lobby_id = Some(id);
            clients.push(client);
        }
        let lobby_id = lobby_id.unwrap();
        registry.lobbies.get_mut(lobby_id).unwrap().start().unwrap();
        (lobby_id, clients)
    }

    async fn next(conn: &MemoryConnection) -> Option<ServerMessage> {
        let frame = tokio::time::timeout(Duration::from_secs(1), conn.recv())
            .await
            .unwrap()
            .unwrap()?;
        Some(ServerMessage::from_bytes(&frame).unwrap())
    }

    async fn expect(conn: &MemoryConnection, msg: ServerMessage) {
        assert_eq!(next(conn).await, Some(msg));
    }

    async fn send(conn: &MemoryConnection, text: &str) {
        conn.send(text.as_bytes()).await.unwrap();
    }

    #[tokio::test]
    async fn test_guessers_alternate_and_picker_scores() {
        let state = state();
        let (lobby_id, clients) = started_lobby(&state, &["ann", "bob", "cat"]).await;
        let finished = Arc::new(AtomicBool::new(false));
        let game = tokio::spawn(run_game(Arc::clone(&state), lobby_id, Arc::clone(&finished)));

        let [ann, bob, cat] = &clients[..] else { unreachable!() };
        for client in [ann, bob, cat] {
            expect(client, ServerMessage::GameStart).await;
        }
        for client in [bob, cat] {
            assert!(matches!(next(client).await, Some(ServerMessage::ChoosingPlayer(_))));
        }
        expect(ann, ServerMessage::RequestMaxTries).await;
        send(ann, "MT=5").await;
        expect(ann, ServerMessage::RequestSecret).await;
        send(ann, "SEC=zz").await;

        let mut turns = Vec::new();
        for _ in 0..6 {
            assert!(matches!(next(ann).await, Some(ServerMessage::Mask(_))));
            let Some(ServerMessage::Turn { player, .. }) = next(ann).await else {
                panic!("expected a turn");
            };
            let (guesser, watcher) = if player.name == "bob" { (bob, cat) } else { (cat, bob) };
            for client in [guesser, watcher] {
                assert!(matches!(next(client).await, Some(ServerMessage::Mask(_))));
                assert!(matches!(next(client).await, Some(ServerMessage::Turn { .. })));
            }
            send(guesser, "G=q").await;
            expect(guesser, ServerMessage::Correct(false)).await;
            turns.push(player.name);
        }
        assert!(turns.windows(2).all(|pair| pair[0] != pair[1]));

        expect(ann, ServerMessage::Win(vec![1, 0, 0])).await;
        for client in [bob, cat] {
            expect(client, ServerMessage::Loss(vec![1, 0, 0])).await;
        }

        for client in [ann, bob, cat] {
            expect(client, ServerMessage::ContinuePrompt).await;
            send(client, "AR=0").await;
        }
        for client in [ann, bob, cat] {
            expect(client, ServerMessage::Revoke).await;
            assert_eq!(next(client).await, None);
        }

        game.await.unwrap();
        assert!(finished.load(Ordering::Acquire));
    }

    #[tokio::test]
    async fn test_lost_picker_aborts_game() {
        let state = state();
        let (lobby_id, clients) = started_lobby(&state, &["ann", "bob"]).await;
        let finished = Arc::new(AtomicBool::new(false));
        let game = tokio::spawn(run_game(Arc::clone(&state), lobby_id, Arc::clone(&finished)));

        let [ann, bob] = &clients[..] else { unreachable!() };
        expect(ann, ServerMessage::GameStart).await;
        expect(ann, ServerMessage::RequestMaxTries).await;
        ann.close().await.unwrap();

        expect(bob, ServerMessage::GameStart).await;
        assert!(matches!(next(bob).await, Some(ServerMessage::ChoosingPlayer(_))));
        expect(bob, ServerMessage::Revoke).await;
        assert_eq!(next(bob).await, None);

        game.await.unwrap();
        assert!(finished.load(Ordering::Acquire));
    }
}
