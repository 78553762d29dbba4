//! Error types for the session layer.

/// Errors that end a conversation with a connected player.
///
/// Malformed input is not one of them: the prompt loop answers it with
/// `ERR=input` and asks again. Only a dead connection or a player who
/// keeps answering wrong ends the exchange.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The connection is gone: the peer hung up, or a read or write
    /// failed. Either way nothing more can be said to this player.
    #[error("connection closed: {0}")]
    Disconnected(String),

    /// A bounded prompt ran out of attempts.
    #[error("gave up after {0} malformed answers")]
    TooManyCorrections(u32),
}

impl SessionError {
    pub(crate) fn disconnected(reason: impl ToString) -> Self {
        Self::Disconnected(reason.to_string())
    }
}
