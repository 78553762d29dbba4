//! # Gallows
//!
//! A multiplayer hangman server over length-framed TCP.
//!
//! Players connect, introduce themselves with a name and a preferred
//! party size, and wait in a lobby until it fills. A background
//! supervisor then starts a game session for the lobby: one player picks
//! a word, the others take turns guessing letters, and the party keeps
//! playing for as long as everyone votes to continue.
//!
//! The same crate carries the player's side: [`GallowsClient`] answers
//! the server from a terminal, and backs the `gallows-client` binary.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gallows::prelude::*;
//!
//! # async fn start() -> Result<(), GallowsError> {
//! let server = GallowsServer::builder()
//!     .bind("0.0.0.0:5050")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod admission;
mod client;
mod config;
mod console;
mod error;
mod game;
mod server;
mod shutdown;
mod supervisor;

pub use admission::MAX_CORRECTIONS;
pub use client::{GallowsClient, SessionEnd};
pub use config::ServerConfig;
pub use console::{run_console, CLOSE_COMMAND};
pub use error::GallowsError;
pub use server::{GallowsServer, GallowsServerBuilder};
pub use shutdown::ShutdownHandle;

/// Re-exports of the types a server or client program needs.
pub mod prelude {
    pub use crate::{
        run_console, GallowsClient, GallowsError, GallowsServer, GallowsServerBuilder,
        ServerConfig, SessionEnd, ShutdownHandle, CLOSE_COMMAND, MAX_CORRECTIONS,
    };
    pub use gallows_lobby::{Lobby, LobbyError, LobbyManager};
    pub use gallows_protocol::{
        ClientMessage, LobbyId, PlayerDescriptor, PlayerId, ProtocolError, ServerMessage,
    };
    pub use gallows_round::{Outcome, Round, RoundError, RoundPhase};
    pub use gallows_session::{Player, SessionError};
    pub use gallows_transport::{Connection, TcpConnection, TcpTransport, TransportError};
}
