//! A single lobby: one party's roster, scores and turn order.

use std::sync::Arc;

use gallows_protocol::{LobbyId, PlayerId};
use gallows_session::Player;
use gallows_transport::Connection;
use rand::Rng;

use crate::LobbyError;

/// Fewest players a lobby is ever created for: a picker and a guesser.
pub const MIN_LOBBY_SIZE: usize = 2;

/// The party size a lobby opened for this preference will wait for.
///
/// A player who asks for a party of one still needs someone to guess
/// their word, so they are matched as if they had asked for two.
pub fn lobby_target(preferred: u8) -> usize {
    usize::from(preferred).max(MIN_LOBBY_SIZE)
}

// ---------------------------------------------------------------------------
// Member
// ---------------------------------------------------------------------------

/// A player's seat in a lobby, with the score they have earned there.
struct Member<C> {
    player: Arc<Player<C>>,
    score: u32,
}

// ---------------------------------------------------------------------------
// Lobby
// ---------------------------------------------------------------------------

/// A party of players, waiting to fill up or playing together.
///
/// The roster is kept in join order, and that order is the turn order:
/// pickers and guessers are chosen by walking it cyclically.
///
/// ```text
///   waiting (len < target) ──add──→ ready (len == target) ──start──→ in game
/// ```
///
/// Once in game the roster only shrinks; nobody can join.
pub struct Lobby<C> {
    id: LobbyId,
    target: usize,
    members: Vec<Member<C>>,
    in_game: bool,
}

impl<C: Connection> Lobby<C> {
    /// Creates an empty lobby waiting for `target` players.
    pub fn new(id: LobbyId, target: usize) -> Self {
        Self {
            id,
            target,
            members: Vec::with_capacity(target),
            in_game: false,
        }
    }

    pub fn id(&self) -> LobbyId {
        self.id
    }

    /// The party size this lobby was opened for.
    pub fn target(&self) -> usize {
        self.target
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn in_game(&self) -> bool {
        self.in_game
    }

    /// Whether the lobby has enough players to start.
    pub fn is_ready(&self) -> bool {
        self.members.len() >= self.target
    }

    pub fn contains(&self, player_id: PlayerId) -> bool {
        self.position(player_id).is_some()
    }

    /// Seats a player at the end of the turn order, with a score of 0.
    pub fn add(&mut self, player: Arc<Player<C>>) -> Result<(), LobbyError> {
        if self.in_game {
            return Err(LobbyError::InGame(self.id));
        }
        if self.contains(player.id()) {
            return Err(LobbyError::AlreadyMember(player.id(), self.id));
        }
        if self.members.len() >= self.target {
            return Err(LobbyError::Full(self.id));
        }
        self.members.push(Member { player, score: 0 });
        Ok(())
    }

    /// Removes a player, returning them if they were seated here.
    pub fn remove(&mut self, player_id: PlayerId) -> Option<Arc<Player<C>>> {
        let index = self.position(player_id)?;
        Some(self.members.remove(index).player)
    }

    /// Freezes the roster and marks the lobby as playing.
    pub fn start(&mut self) -> Result<(), LobbyError> {
        if self.in_game {
            return Err(LobbyError::InGame(self.id));
        }
        self.in_game = true;
        Ok(())
    }

    /// The players, in turn order.
    pub fn players(&self) -> Vec<Arc<Player<C>>> {
        self.members.iter().map(|m| Arc::clone(&m.player)).collect()
    }

    pub fn player(&self, player_id: PlayerId) -> Option<Arc<Player<C>>> {
        self.position(player_id)
            .map(|i| Arc::clone(&self.members[i].player))
    }

    /// Score snapshot in turn order, as sent in `S=…`.
    pub fn scores(&self) -> Vec<u32> {
        self.members.iter().map(|m| m.score).collect()
    }

    /// Adds `points` to a player's score and returns the new total.
    pub fn award(&mut self, player_id: PlayerId, points: u32) -> Result<u32, LobbyError> {
        let index = self
            .position(player_id)
            .ok_or(LobbyError::NotMember(player_id, self.id))?;
        let member = &mut self.members[index];
        member.score = member.score.saturating_add(points);
        Ok(member.score)
    }

    // -- Rotation ----------------------------------------------------------

    /// The next player to pick a word.
    ///
    /// Walks the roster cyclically from `current`. With no current picker,
    /// or one who has since left, the first player picks. `None` if
    /// there are too few players for a round.
    pub fn next_picker(&self, current: Option<PlayerId>) -> Option<PlayerId> {
        if self.members.len() < MIN_LOBBY_SIZE {
            return None;
        }
        let next = match current.and_then(|id| self.position(id)) {
            Some(i) => (i + 1) % self.members.len(),
            None => 0,
        };
        Some(self.members[next].player.id())
    }

    /// A random guesser to open the round, never the picker.
    pub fn first_guesser(&self, picker: PlayerId) -> Option<PlayerId> {
        let guessers = self.guessers(picker);
        if guessers.is_empty() {
            return None;
        }
        let pick = rand::rng().random_range(0..guessers.len());
        Some(guessers[pick])
    }

    /// The guesser after `current`, skipping the picker.
    ///
    /// Cycles through the roster order with the picker left out. If
    /// `current` is not an eligible guesser the first eligible one is
    /// returned.
    pub fn next_guesser(&self, picker: PlayerId, current: PlayerId) -> Option<PlayerId> {
        let guessers = self.guessers(picker);
        if guessers.is_empty() {
            return None;
        }
        let next = match guessers.iter().position(|&id| id == current) {
            Some(i) => (i + 1) % guessers.len(),
            None => 0,
        };
        Some(guessers[next])
    }

    fn guessers(&self, picker: PlayerId) -> Vec<PlayerId> {
        self.members
            .iter()
            .map(|m| m.player.id())
            .filter(|&id| id != picker)
            .collect()
    }

    fn position(&self, player_id: PlayerId) -> Option<usize> {
        self.members.iter().position(|m| m.player.id() == player_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gallows_protocol::PlayerDescriptor;
    use gallows_transport::MemoryConnection;

    fn player(name: &str) -> Arc<Player<MemoryConnection>> {
        let (conn, _peer) = MemoryConnection::pair();
        Arc::new(Player::new(conn, PlayerDescriptor::new(name, 2).unwrap()))
    }

    fn lobby_of(n: usize) -> (Lobby<MemoryConnection>, Vec<PlayerId>) {
        let mut lobby = Lobby::new(LobbyId(1), n);
        let mut ids = Vec::new();
        for i in 0..n {
            let p = player(&format!("p{i}"));
            ids.push(p.id());
            lobby.add(p).unwrap();
        }
        (lobby, ids)
    }

    #[test]
    fn test_lobby_target_is_at_least_two() {
        assert_eq!(lobby_target(1), 2);
        assert_eq!(lobby_target(2), 2);
        assert_eq!(lobby_target(4), 4);
    }

    #[test]
    fn test_add_until_ready_then_full() {
        let mut lobby = Lobby::new(LobbyId(1), 2);
        lobby.add(player("a")).unwrap();
        assert!(!lobby.is_ready());
        lobby.add(player("b")).unwrap();
        assert!(lobby.is_ready());
        assert_eq!(lobby.add(player("c")), Err(LobbyError::Full(LobbyId(1))));
    }

    #[test]
    fn test_add_same_player_twice_rejected() {
        let mut lobby = Lobby::new(LobbyId(1), 3);
        let p = player("a");
        lobby.add(Arc::clone(&p)).unwrap();
        assert_eq!(
            lobby.add(p.clone()),
            Err(LobbyError::AlreadyMember(p.id(), LobbyId(1)))
        );
    }

    #[test]
    fn test_roster_frozen_once_in_game() {
        let (mut lobby, _) = lobby_of(2);
        lobby.start().unwrap();
        assert!(lobby.in_game());
        assert_eq!(lobby.add(player("late")), Err(LobbyError::InGame(LobbyId(1))));
        assert_eq!(lobby.start(), Err(LobbyError::InGame(LobbyId(1))));
    }

    #[test]
    fn test_remove_returns_player() {
        let (mut lobby, ids) = lobby_of(2);
        let removed = lobby.remove(ids[0]).unwrap();
        assert_eq!(removed.id(), ids[0]);
        assert_eq!(lobby.len(), 1);
        assert!(lobby.remove(ids[0]).is_none());
    }

    #[test]
    fn test_award_and_scores_in_roster_order() {
        let (mut lobby, ids) = lobby_of(3);
        assert_eq!(lobby.award(ids[1], 1), Ok(1));
        assert_eq!(lobby.award(ids[1], 1), Ok(2));
        assert_eq!(lobby.scores(), vec![0, 2, 0]);
        assert_eq!(
            lobby.award(PlayerId(u64::MAX), 1),
            Err(LobbyError::NotMember(PlayerId(u64::MAX), LobbyId(1)))
        );
    }

    #[test]
    fn test_next_picker_cycles_roster() {
        let (lobby, ids) = lobby_of(3);
        assert_eq!(lobby.next_picker(None), Some(ids[0]));
        assert_eq!(lobby.next_picker(Some(ids[0])), Some(ids[1]));
        assert_eq!(lobby.next_picker(Some(ids[1])), Some(ids[2]));
        assert_eq!(lobby.next_picker(Some(ids[2])), Some(ids[0]));
    }

    #[test]
    fn test_next_picker_unknown_current_starts_over() {
        let (lobby, ids) = lobby_of(2);
        assert_eq!(lobby.next_picker(Some(PlayerId(u64::MAX))), Some(ids[0]));
    }

    #[test]
    fn test_next_guesser_skips_picker_and_cycles() {
        let (lobby, ids) = lobby_of(4);
        let picker = ids[1];
        assert_eq!(lobby.next_guesser(picker, ids[0]), Some(ids[2]));
        assert_eq!(lobby.next_guesser(picker, ids[2]), Some(ids[3]));
        assert_eq!(lobby.next_guesser(picker, ids[3]), Some(ids[0]));
        // The picker is never a guesser, so it is an unknown current.
        assert_eq!(lobby.next_guesser(picker, picker), Some(ids[0]));
    }

    #[test]
    fn test_two_players_guesser_is_always_the_other() {
        let (lobby, ids) = lobby_of(2);
        for _ in 0..10 {
            assert_eq!(lobby.first_guesser(ids[0]), Some(ids[1]));
        }
        assert_eq!(lobby.next_guesser(ids[0], ids[1]), Some(ids[1]));
    }

    #[test]
    fn test_first_guesser_never_picker() {
        let (lobby, ids) = lobby_of(4);
        for _ in 0..50 {
            let g = lobby.first_guesser(ids[2]).unwrap();
            assert_ne!(g, ids[2]);
            assert!(ids.contains(&g));
        }
    }

    #[test]
    fn test_rotation_needs_two_players() {
        let (mut lobby, ids) = lobby_of(2);
        lobby.remove(ids[1]);
        assert_eq!(lobby.next_picker(None), None);
        assert_eq!(lobby.first_guesser(ids[0]), None);
        assert_eq!(lobby.next_guesser(ids[0], ids[0]), None);
    }
}
