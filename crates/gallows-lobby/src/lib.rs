//! Lobbies for Gallows.
//!
//! A lobby is one party of players: it fills up while waiting, then plays
//! round after round with the same roster until the game ends.
//!
//! # Key types
//!
//! - [`Lobby`]: roster in turn order, per-player scores, and the
//!   picker/guesser rotation
//! - [`LobbyManager`]: every lobby on the server, and matchmaking
//!   ([`LobbyManager::place`])
//! - [`LobbyError`]: what can go wrong

mod error;
mod lobby;
mod manager;

pub use error::LobbyError;
pub use lobby::{lobby_target, Lobby, MIN_LOBBY_SIZE};
pub use manager::LobbyManager;
