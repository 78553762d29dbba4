//! Error types for the lobby layer.

use gallows_protocol::{LobbyId, PlayerId};

/// Errors that can occur during lobby operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LobbyError {
    /// The lobby does not exist (never created, or already reclaimed).
    #[error("lobby {0} not found")]
    NotFound(LobbyId),

    /// The lobby already has its target number of players.
    #[error("lobby {0} is full")]
    Full(LobbyId),

    /// The lobby's game has started; the roster is frozen.
    #[error("lobby {0} is already in game")]
    InGame(LobbyId),

    /// The player is already in this lobby.
    #[error("player {0} already in lobby {1}")]
    AlreadyMember(PlayerId, LobbyId),

    /// The player is not in this lobby.
    #[error("player {0} not in lobby {1}")]
    NotMember(PlayerId, LobbyId),
}
