//! Core protocol types: identities, the player descriptor, and the
//! limits both sides of the wire agree on.

use std::fmt;

use gallows_transport::ConnectionId;

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Fewest guesses a picker may allow.
pub const MIN_TURNS: u32 = 5;

/// Most guesses a picker may allow.
pub const MAX_TURNS: u32 = 25;

/// Longest secret word accepted.
pub const MAX_WORD_LENGTH: usize = 25;

/// Smallest party size a player may ask for.
pub const MIN_PARTY_SIZE: u8 = 1;

/// Largest party size a player may ask for.
pub const MAX_PARTY_SIZE: u8 = 4;

/// Marker for a letter that has not been guessed yet.
pub const UNKNOWN: char = '*';

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a connected player.
///
/// Derived from the connection that carries the player, so two players
/// who pick the same display name are still two different players.
/// Names are for humans; `PlayerId` is for equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerId(pub u64);

impl From<ConnectionId> for PlayerId {
    fn from(id: ConnectionId) -> Self {
        Self(id.into_inner())
    }
}

/// `tracing::info!("player {} joined", player_id)` prints "player P-42 joined".
impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// A unique identifier for a lobby (one party, waiting or in game).
///
/// Ordered, so lobbies can be scanned in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LobbyId(pub u64);

impl fmt::Display for LobbyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// PlayerDescriptor: the `P=name,size` field
// ---------------------------------------------------------------------------

/// What a player tells the server about themselves, and what the server
/// echoes back when announcing a picker or a turn.
///
/// On the wire: `P=alice,2`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerDescriptor {
    /// Display name: non-empty, ASCII letters and digits only.
    pub name: String,
    /// How many players this player wants in their party (1–4).
    pub party_size: u8,
}

impl PlayerDescriptor {
    /// Builds a descriptor, checking the same rules the decoder enforces.
    pub fn new(
        name: impl Into<String>,
        party_size: u8,
    ) -> Result<Self, ProtocolError> {
        let name = name.into();
        if !is_valid_name(&name) {
            return Err(ProtocolError::malformed(
                "P",
                format!("name {name:?} must be non-empty and alphanumeric"),
            ));
        }
        if !(MIN_PARTY_SIZE..=MAX_PARTY_SIZE).contains(&party_size) {
            return Err(ProtocolError::malformed(
                "P",
                format!(
                    "party size {party_size} outside \
                     {MIN_PARTY_SIZE}-{MAX_PARTY_SIZE}"
                ),
            ));
        }
        Ok(Self { name, party_size })
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_alphanumeric())
}

// ---------------------------------------------------------------------------
// Input normalization
// ---------------------------------------------------------------------------

/// Returns the max-tries value if it lies in `MIN_TURNS..=MAX_TURNS`.
pub fn validate_max_tries(tries: u32) -> Option<u32> {
    (MIN_TURNS..=MAX_TURNS).contains(&tries).then_some(tries)
}

/// Lower-cases a secret word, or rejects it.
///
/// Accepted: 1 to [`MAX_WORD_LENGTH`] ASCII letters.
pub fn normalize_secret(word: &str) -> Option<String> {
    let valid = !word.is_empty()
        && word.len() <= MAX_WORD_LENGTH
        && word.bytes().all(|b| b.is_ascii_alphabetic());
    valid.then(|| word.to_ascii_lowercase())
}

/// Lower-cases a guessed letter, or rejects anything but an ASCII letter.
pub fn normalize_guess(letter: char) -> Option<char> {
    letter
        .is_ascii_alphabetic()
        .then(|| letter.to_ascii_lowercase())
}
