//! Unified error type for the Gallows server.

use std::path::PathBuf;

use gallows_lobby::LobbyError;
use gallows_protocol::{LobbyId, ProtocolError};
use gallows_round::RoundError;
use gallows_session::SessionError;
use gallows_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each wrapped variant generates a `From`
/// impl, so `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum GallowsError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A payload that could not be decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A player left, or would not give a usable answer.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A lobby operation failed (not found, full, in game).
    #[error(transparent)]
    Lobby(#[from] LobbyError),

    /// The round engine refused an operation.
    #[error(transparent)]
    Round(#[from] RoundError),

    /// A player took too long to introduce themselves.
    #[error("handshake timed out")]
    HandshakeTimeout,

    /// A lobby has too few players left to choose a picker or guesser.
    #[error("lobby {0} has no eligible player")]
    NoEligiblePlayer(LobbyId),

    /// A setting is out of range.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The config file could not be read.
    #[error("cannot read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading the player's answers or writing to their terminal failed.
    #[error("terminal I/O failed: {0}")]
    Terminal(#[from] std::io::Error),

    /// The player's input ended while the server was waiting for an answer.
    #[error("input closed before the question was answered")]
    InputClosed,

    /// The config file is not valid JSON for a [`ServerConfig`](crate::ServerConfig).
    #[error("cannot parse config: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

impl GallowsError {
    /// Whether this error came from reading or validating configuration.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::ConfigRead { .. } | Self::ConfigParse(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let gallows_err: GallowsError = err.into();
        assert!(matches!(gallows_err, GallowsError::Transport(_)));
        assert!(gallows_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::UnknownTag("XYZ".into());
        let gallows_err: GallowsError = err.into();
        assert!(matches!(gallows_err, GallowsError::Protocol(_)));
    }

    #[test]
    fn test_from_session_error() {
        let err = SessionError::TooManyCorrections(5);
        let gallows_err: GallowsError = err.into();
        assert!(matches!(gallows_err, GallowsError::Session(_)));
    }

    #[test]
    fn test_from_lobby_error() {
        let err = LobbyError::NotFound(LobbyId(1));
        let gallows_err: GallowsError = err.into();
        assert!(matches!(gallows_err, GallowsError::Lobby(_)));
        assert!(gallows_err.to_string().contains("L-1"));
    }

    #[test]
    fn test_from_round_error() {
        let err = RoundError::InvalidGuess('1');
        let gallows_err: GallowsError = err.into();
        assert!(matches!(gallows_err, GallowsError::Round(_)));
    }

    #[test]
    fn test_is_config() {
        assert!(GallowsError::Config("backlog".into()).is_config());
        assert!(!GallowsError::HandshakeTimeout.is_config());
    }
}
