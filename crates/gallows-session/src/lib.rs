//! Connected players for Gallows.
//!
//! This crate turns a raw framed connection into someone you can talk to
//! in commands:
//!
//! 1. **Typed I/O**: [`send_message`] / [`receive_message`] encode and
//!    decode [`ServerMessage`](gallows_protocol::ServerMessage) and
//!    [`ClientMessage`](gallows_protocol::ClientMessage) frames.
//! 2. **Re-prompting**: [`prompt`] asks, answers nonsense with
//!    `ERR=input`, and asks again, optionally up to a limit.
//! 3. **Players**: [`Player`] ties a [`PlayerId`](gallows_protocol::PlayerId)
//!    and descriptor to the connection that carries them.
//!
//! # How it fits in the stack
//!
//! ```text
//! Lobby Layer (above)  ← groups players into parties and rotates turns
//!     ↕
//! Session Layer (this crate)  ← player identity and typed conversation
//!     ↕
//! Protocol Layer (below)  ← command vocabulary
//! ```

mod error;
mod player;
mod prompt;

pub use error::SessionError;
pub use player::Player;
pub use prompt::{prompt, receive_message, revoke_connection, send_message};
