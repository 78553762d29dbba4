//! The text grammar shared by every command.
//!
//! ```text
//! payload := field (";" field)*
//! field   := TAG | TAG "=" value
//! value   := item ("," item)*
//! ```
//!
//! This module only splits and joins; the per-tag rules live with the
//! message enums in `message.rs`.

use std::fmt::Display;

use crate::{PlayerDescriptor, ProtocolError};

/// Separates fields within one payload.
pub const DELIM: char = ';';

/// Separates a tag from its value.
pub const ASSIGNMENT: char = '=';

/// Separates list items within a value.
pub const LIST_DELIMITER: char = ',';

/// Tag of the player descriptor field.
pub(crate) const PLAYER: &str = "P";

/// One `TAG` or `TAG=value` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Field<'a> {
    pub(crate) tag: &'a str,
    pub(crate) value: Option<&'a str>,
}

/// Splits a payload into its fields. Never fails; shape checks are the
/// caller's job.
pub(crate) fn fields(payload: &str) -> Vec<Field<'_>> {
    payload
        .split(DELIM)
        .map(|raw| match raw.split_once(ASSIGNMENT) {
            Some((tag, value)) => Field {
                tag,
                value: Some(value),
            },
            None => Field {
                tag: raw,
                value: None,
            },
        })
        .collect()
}

/// Splits a list value. The empty string is the empty list.
pub(crate) fn items(value: &str) -> Vec<&str> {
    if value.is_empty() {
        Vec::new()
    } else {
        value.split(LIST_DELIMITER).collect()
    }
}

/// Joins `TAG=a,b,c`.
pub(crate) fn encode_list<T: Display>(tag: &str, items: &[T]) -> String {
    let joined: Vec<String> = items.iter().map(ToString::to_string).collect();
    format!("{tag}{ASSIGNMENT}{}", joined.join(&LIST_DELIMITER.to_string()))
}

/// Parses an unsigned decimal made only of ASCII digits (no sign, no
/// whitespace).
pub(crate) fn parse_uint(text: &str) -> Option<u32> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// Encodes `P=name,size`.
pub(crate) fn encode_player(player: &PlayerDescriptor) -> String {
    format!(
        "{PLAYER}{ASSIGNMENT}{}{LIST_DELIMITER}{}",
        player.name, player.party_size
    )
}

/// Decodes a `P=name,size` field.
pub(crate) fn decode_player(
    field: Field<'_>,
) -> Result<PlayerDescriptor, ProtocolError> {
    if field.tag != PLAYER {
        return Err(ProtocolError::malformed(
            "P",
            format!("expected P field, got {:?}", field.tag),
        ));
    }
    let value = field
        .value
        .ok_or_else(|| ProtocolError::malformed("P", "missing value"))?;

    let parts = items(value);
    let [name, size] = parts.as_slice() else {
        return Err(ProtocolError::malformed(
            "P",
            format!("expected name,size, got {value:?}"),
        ));
    };

    let size = parse_uint(size)
        .and_then(|s| u8::try_from(s).ok())
        .ok_or_else(|| {
            ProtocolError::malformed("P", format!("party size {size:?} is not a number"))
        })?;

    PlayerDescriptor::new(*name, size)
}
