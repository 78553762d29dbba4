//! Error types for the protocol layer.
//!
//! Decoding never panics: every way a payload can be wrong maps to one
//! of these variants, and callers decide whether to re-prompt.

/// Errors that can occur while decoding a command payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// The payload bytes are not UTF-8 text.
    #[error("payload is not valid UTF-8")]
    NotUtf8,

    /// The first field's tag is not part of the vocabulary (for this
    /// direction).
    #[error("unknown command tag {0:?}")]
    UnknownTag(String),

    /// The tag is known but its value or field count has the wrong shape.
    ///
    /// For example `MT=ten`, `G=ab`, or `CP` without a player field.
    #[error("malformed {tag} command: {reason}")]
    Malformed {
        tag: &'static str,
        reason: String,
    },
}

impl ProtocolError {
    pub(crate) fn malformed(tag: &'static str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            tag,
            reason: reason.into(),
        }
    }
}
