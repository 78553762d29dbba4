//! Error types for the round engine.

use crate::RoundPhase;

/// Errors returned when a round is driven out of order or fed bad input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoundError {
    /// The allowed number of tries is outside the accepted range.
    #[error("max tries {0} out of range")]
    InvalidMaxTries(u32),

    /// The secret is empty, too long, or not all ASCII letters.
    #[error("secret word {0:?} is not 1-25 ASCII letters")]
    InvalidSecret(String),

    /// A guess must be a single ASCII letter.
    #[error("guess {0:?} is not an ASCII letter")]
    InvalidGuess(char),

    /// The operation does not apply in the round's current phase.
    #[error("cannot {action} while {phase:?}")]
    WrongPhase {
        action: &'static str,
        phase: RoundPhase,
    },
}
