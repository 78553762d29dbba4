//! Wire protocol for Gallows.
//!
//! This crate defines the "language" that clients and the server speak:
//!
//! - **Types** ([`PlayerId`], [`LobbyId`], [`PlayerDescriptor`]) and the
//!   limits both sides agree on ([`MIN_TURNS`], [`MAX_WORD_LENGTH`], …).
//! - **Messages** ([`ServerMessage`], [`ClientMessage`]): the command
//!   vocabulary, with strict text encode/decode.
//! - **Errors** ([`ProtocolError`]): what can go wrong during decoding.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (length-framed bytes) and
//! session (player identity). It doesn't know about sockets or lobbies;
//! it only turns frame payloads into commands and back.
//!
//! ```text
//! Transport (bytes) → Protocol (ServerMessage / ClientMessage) → Session (player)
//! ```
//!
//! A payload is semicolon-separated fields, each `TAG` or `TAG=value`,
//! with list values separated by commas: `T;P=alice,2;7`.

// ---------------------------------------------------------------------------
// Module declarations
// ---------------------------------------------------------------------------

mod codec;
mod error;
mod message;
mod types;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use codec::{ASSIGNMENT, DELIM, LIST_DELIMITER};
pub use error::ProtocolError;
pub use message::{ClientMessage, ServerMessage};
pub use types::{
    normalize_guess, normalize_secret, validate_max_tries, LobbyId, PlayerDescriptor,
    PlayerId, MAX_PARTY_SIZE, MAX_TURNS, MAX_WORD_LENGTH, MIN_PARTY_SIZE, MIN_TURNS,
    UNKNOWN,
};
