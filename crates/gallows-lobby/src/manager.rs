//! Lobby manager: creates, tracks, and places players into lobbies.

use std::collections::BTreeMap;
use std::sync::Arc;

use gallows_protocol::LobbyId;
use gallows_session::Player;
use gallows_transport::Connection;

use crate::{lobby_target, Lobby, LobbyError};

/// Every lobby on the server, waiting or in game.
///
/// Lobbies are kept in creation order, so matchmaking always offers a
/// newcomer the oldest lobby that fits them.
///
/// Not thread-safe by itself: the server keeps it behind the same mutex
/// as its game handles, so placement, promotion and eviction never
/// interleave.
pub struct LobbyManager<C> {
    lobbies: BTreeMap<LobbyId, Lobby<C>>,
    next_id: u64,
}

impl<C: Connection> LobbyManager<C> {
    pub fn new() -> Self {
        Self {
            lobbies: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Opens an empty lobby for `target` players.
    pub fn create(&mut self, target: usize) -> LobbyId {
        let lobby_id = LobbyId(self.next_id);
        self.next_id += 1;
        self.lobbies.insert(lobby_id, Lobby::new(lobby_id, target));
        tracing::info!(%lobby_id, target, "lobby created");
        lobby_id
    }

    /// The oldest waiting lobby a player with this preference fits in.
    ///
    /// A lobby fits when, with the newcomer, it would hold no more than
    /// its own target and no more than the newcomer wants.
    pub fn find_compatible(&self, preferred: u8) -> Option<LobbyId> {
        let preferred = lobby_target(preferred);
        self.lobbies
            .values()
            .find(|lobby| {
                let size = lobby.len() + 1;
                !lobby.in_game() && size <= lobby.target() && size <= preferred
            })
            .map(Lobby::id)
    }

    /// Seats a player in a compatible lobby, opening one if none fits.
    ///
    /// Returns the lobby and whether it was created for this player.
    pub fn place(&mut self, player: Arc<Player<C>>) -> Result<(LobbyId, bool), LobbyError> {
        let preferred = player.preferred_party_size();
        let (lobby_id, created) = match self.find_compatible(preferred) {
            Some(id) => (id, false),
            None => (self.create(lobby_target(preferred)), true),
        };

        let player_id = player.id();
        self.get_mut(lobby_id)?.add(player)?;
        tracing::info!(%player_id, %lobby_id, created, "player placed");
        Ok((lobby_id, created))
    }

    pub fn get(&self, lobby_id: LobbyId) -> Result<&Lobby<C>, LobbyError> {
        self.lobbies
            .get(&lobby_id)
            .ok_or(LobbyError::NotFound(lobby_id))
    }

    pub fn get_mut(&mut self, lobby_id: LobbyId) -> Result<&mut Lobby<C>, LobbyError> {
        self.lobbies
            .get_mut(&lobby_id)
            .ok_or(LobbyError::NotFound(lobby_id))
    }

    /// Drops a lobby from the registry and hands it back.
    pub fn remove(&mut self, lobby_id: LobbyId) -> Result<Lobby<C>, LobbyError> {
        let lobby = self
            .lobbies
            .remove(&lobby_id)
            .ok_or(LobbyError::NotFound(lobby_id))?;
        tracing::info!(%lobby_id, "lobby removed");
        Ok(lobby)
    }

    /// Lobbies still filling up, oldest first.
    pub fn waiting_ids(&self) -> Vec<LobbyId> {
        self.lobbies
            .values()
            .filter(|lobby| !lobby.in_game())
            .map(Lobby::id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lobbies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lobbies.is_empty()
    }
}

impl<C: Connection> Default for LobbyManager<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gallows_protocol::PlayerDescriptor;
    use gallows_transport::MemoryConnection;

    fn player(name: &str, size: u8) -> Arc<Player<MemoryConnection>> {
        let (conn, _peer) = MemoryConnection::pair();
        Arc::new(Player::new(conn, PlayerDescriptor::new(name, size).unwrap()))
    }

    #[test]
    fn test_create_allocates_increasing_ids() {
        let mut mgr = LobbyManager::<MemoryConnection>::new();
        let a = mgr.create(2);
        let b = mgr.create(3);
        assert!(a < b);
        assert_eq!(mgr.len(), 2);
        assert_eq!(mgr.get(b).unwrap().target(), 3);
    }

    #[test]
    fn test_place_first_player_creates_lobby() {
        let mut mgr = LobbyManager::new();
        let (id, created) = mgr.place(player("a", 3)).unwrap();
        assert!(created);
        assert_eq!(mgr.get(id).unwrap().target(), 3);
    }

    #[test]
    fn test_place_joins_compatible_lobby() {
        let mut mgr = LobbyManager::new();
        let (first, _) = mgr.place(player("a", 2)).unwrap();
        let (second, created) = mgr.place(player("b", 2)).unwrap();
        assert_eq!(first, second);
        assert!(!created);
        assert!(mgr.get(first).unwrap().is_ready());
    }

    #[test]
    fn test_place_skips_lobby_larger_than_preference() {
        let mut mgr = LobbyManager::new();
        let (four, _) = mgr.place(player("a", 4)).unwrap();
        mgr.place(player("b", 4)).unwrap();
        // Joining would make three; a player who wants two won't fit.
        let (two, created) = mgr.place(player("c", 2)).unwrap();
        assert!(created);
        assert_ne!(four, two);
    }

    #[test]
    fn test_place_larger_preference_fits_smaller_lobby() {
        let mut mgr = LobbyManager::new();
        let (small, _) = mgr.place(player("a", 2)).unwrap();
        let (joined, created) = mgr.place(player("b", 4)).unwrap();
        assert_eq!(small, joined);
        assert!(!created);
    }

    #[test]
    fn test_solo_preference_is_matched_as_two() {
        let mut mgr = LobbyManager::new();
        let (a, created_a) = mgr.place(player("a", 1)).unwrap();
        let (b, created_b) = mgr.place(player("b", 1)).unwrap();
        assert!(created_a);
        assert!(!created_b);
        assert_eq!(a, b);
        assert_eq!(mgr.get(a).unwrap().target(), 2);
    }

    #[test]
    fn test_place_skips_lobbies_in_game() {
        let mut mgr = LobbyManager::new();
        let (id, _) = mgr.place(player("a", 3)).unwrap();
        mgr.get_mut(id).unwrap().start().unwrap();
        let (other, created) = mgr.place(player("b", 3)).unwrap();
        assert!(created);
        assert_ne!(id, other);
    }

    #[test]
    fn test_find_compatible_prefers_oldest() {
        let mut mgr = LobbyManager::<MemoryConnection>::new();
        let old = mgr.create(4);
        mgr.create(4);
        assert_eq!(mgr.find_compatible(4), Some(old));
    }

    #[test]
    fn test_waiting_ids_excludes_in_game() {
        let mut mgr = LobbyManager::<MemoryConnection>::new();
        let a = mgr.create(2);
        let b = mgr.create(2);
        mgr.get_mut(a).unwrap().start().unwrap();
        assert_eq!(mgr.waiting_ids(), vec![b]);
    }

    #[test]
    fn test_remove_and_lookup_missing() {
        let mut mgr = LobbyManager::<MemoryConnection>::new();
        let id = mgr.create(2);
        assert!(mgr.remove(id).is_ok());
        assert!(matches!(mgr.get(id), Err(LobbyError::NotFound(_))));
        assert!(matches!(mgr.remove(id), Err(LobbyError::NotFound(_))));
        assert!(mgr.is_empty());
    }
}
