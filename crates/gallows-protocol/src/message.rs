//! The command vocabulary, one enum per direction.
//!
//! Both enums are decoded once and then dispatched with a single
//! exhaustive `match`, so adding a command is a compile error everywhere
//! it is not handled.

use crate::codec::{self, Field, ASSIGNMENT, DELIM};
use crate::{PlayerDescriptor, ProtocolError, UNKNOWN};

// Tags sent by the server.
const WELCOME: &str = "HI";
const REQUEST_PLAYER: &str = "RP";
const QUEUED: &str = "ATQ";
const GAME_START: &str = "START";
const CHOOSING_PLAYER: &str = "CP";
const REQUEST_MAX_TRIES: &str = "RMT";
const REQUEST_SECRET: &str = "YT";
const MASK: &str = "M";
const TURN: &str = "T";
const CORRECT: &str = "C";
const SCORE: &str = "S";
const WIN: &str = "W";
const LOSS: &str = "L";
const ERROR: &str = "ERR";
const ERROR_INPUT: &str = "input";
const REVOKE: &str = "REVOKE";
const HEARTBEAT: &str = "HB";

// Tags sent by the client.
const MAX_TRIES: &str = "MT";
const SECRET: &str = "SEC";
const GUESS: &str = "G";

// Both directions.
const CONTINUE: &str = "AR";

// ---------------------------------------------------------------------------
// ServerMessage
// ---------------------------------------------------------------------------

/// Everything the server can say to a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// `HI`: first frame on every connection.
    Welcome,
    /// `RP`: send your player descriptor.
    RequestPlayer,
    /// `ATQ`: you have been placed in a lobby.
    Queued,
    /// `START`: a round is starting.
    GameStart,
    /// `CP;P=name,size`: this player is picking the word.
    ChoosingPlayer(PlayerDescriptor),
    /// `RMT`: picker: send the number of tries allowed.
    RequestMaxTries,
    /// `YT`: picker: send the secret word.
    RequestSecret,
    /// `M=a,*,*`: the current mask; `None` is an unrevealed slot.
    Mask(Vec<Option<char>>),
    /// `T;P=name,size;n`: whose turn it is and how many tries remain.
    Turn {
        player: PlayerDescriptor,
        tries_left: u32,
    },
    /// `C=1` / `C=0`: whether your guess occurs in the word.
    Correct(bool),
    /// `S=1,0`: score snapshot in roster order.
    Scores(Vec<u32>),
    /// `W;S=…`: you won the round.
    Win(Vec<u32>),
    /// `L;S=…`: you lost the round.
    Loss(Vec<u32>),
    /// `AR`: vote on playing another round.
    ContinuePrompt,
    /// `ERR=input`: your last frame was not understood; answer again.
    InvalidInput,
    /// `REVOKE`: the server is closing this connection.
    Revoke,
    /// `HB`: liveness probe; needs no answer.
    Heartbeat,
}

impl ServerMessage {
    /// Renders the payload text.
    pub fn encode(&self) -> String {
        match self {
            Self::Welcome => WELCOME.into(),
            Self::RequestPlayer => REQUEST_PLAYER.into(),
            Self::Queued => QUEUED.into(),
            Self::GameStart => GAME_START.into(),
            Self::ChoosingPlayer(player) => {
                format!("{CHOOSING_PLAYER}{DELIM}{}", codec::encode_player(player))
            }
            Self::RequestMaxTries => REQUEST_MAX_TRIES.into(),
            Self::RequestSecret => REQUEST_SECRET.into(),
            Self::Mask(slots) => {
                let letters: Vec<char> =
                    slots.iter().map(|s| s.unwrap_or(UNKNOWN)).collect();
                codec::encode_list(MASK, &letters)
            }
            Self::Turn { player, tries_left } => format!(
                "{TURN}{DELIM}{}{DELIM}{tries_left}",
                codec::encode_player(player)
            ),
            Self::Correct(correct) => {
                format!("{CORRECT}{ASSIGNMENT}{}", u8::from(*correct))
            }
            Self::Scores(scores) => codec::encode_list(SCORE, scores),
            Self::Win(scores) => {
                format!("{WIN}{DELIM}{}", codec::encode_list(SCORE, scores))
            }
            Self::Loss(scores) => {
                format!("{LOSS}{DELIM}{}", codec::encode_list(SCORE, scores))
            }
            Self::ContinuePrompt => CONTINUE.into(),
            Self::InvalidInput => format!("{ERROR}{ASSIGNMENT}{ERROR_INPUT}"),
            Self::Revoke => REVOKE.into(),
            Self::Heartbeat => HEARTBEAT.into(),
        }
    }

    /// Decodes raw frame bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let text = std::str::from_utf8(bytes).map_err(|_| ProtocolError::NotUtf8)?;
        Self::decode(text)
    }

    /// Decodes a payload, strictly.
    pub fn decode(payload: &str) -> Result<Self, ProtocolError> {
        let fields = codec::fields(payload);
        let head = fields[0];

        match head.tag {
            WELCOME => bare(&fields, WELCOME).map(|_| Self::Welcome),
            REQUEST_PLAYER => bare(&fields, REQUEST_PLAYER).map(|_| Self::RequestPlayer),
            QUEUED => bare(&fields, QUEUED).map(|_| Self::Queued),
            GAME_START => bare(&fields, GAME_START).map(|_| Self::GameStart),
            REQUEST_MAX_TRIES => {
                bare(&fields, REQUEST_MAX_TRIES).map(|_| Self::RequestMaxTries)
            }
            REQUEST_SECRET => bare(&fields, REQUEST_SECRET).map(|_| Self::RequestSecret),
            CONTINUE => bare(&fields, CONTINUE).map(|_| Self::ContinuePrompt),
            REVOKE => bare(&fields, REVOKE).map(|_| Self::Revoke),
            HEARTBEAT => bare(&fields, HEARTBEAT).map(|_| Self::Heartbeat),

            CHOOSING_PLAYER => match fields.as_slice() {
                [Field { value: None, .. }, player] => {
                    Ok(Self::ChoosingPlayer(codec::decode_player(*player)?))
                }
                _ => Err(ProtocolError::malformed(CHOOSING_PLAYER, "expected CP;P=name,size")),
            },

            MASK => {
                let value = single(&fields, MASK)?;
                let slots = codec::items(value)
                    .into_iter()
                    .map(decode_slot)
                    .collect::<Option<Vec<_>>>()
                    .ok_or_else(|| {
                        ProtocolError::malformed(MASK, format!("bad slot in {value:?}"))
                    })?;
                Ok(Self::Mask(slots))
            }

            TURN => match fields.as_slice() {
                [Field { value: None, .. }, player, Field { tag: tries, value: None }] => {
                    let player = codec::decode_player(*player)?;
                    let tries_left = codec::parse_uint(tries).ok_or_else(|| {
                        ProtocolError::malformed(TURN, format!("tries {tries:?} is not a number"))
                    })?;
                    Ok(Self::Turn { player, tries_left })
                }
                _ => Err(ProtocolError::malformed(TURN, "expected T;P=name,size;n")),
            },

            CORRECT => decode_flag(single(&fields, CORRECT)?, CORRECT).map(Self::Correct),

            SCORE => decode_scores(single(&fields, SCORE)?).map(Self::Scores),

            WIN | LOSS => {
                let tag = if head.tag == WIN { WIN } else { LOSS };
                let scores = match fields.as_slice() {
                    [Field { value: None, .. }, Field { tag: SCORE, value: Some(v) }] => {
                        decode_scores(v)?
                    }
                    _ => return Err(ProtocolError::malformed(tag, "expected W/L;S=…")),
                };
                Ok(if tag == WIN { Self::Win(scores) } else { Self::Loss(scores) })
            }

            ERROR => match single(&fields, ERROR)? {
                ERROR_INPUT => Ok(Self::InvalidInput),
                other => Err(ProtocolError::malformed(ERROR, format!("unknown error {other:?}"))),
            },

            other => Err(ProtocolError::UnknownTag(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// ClientMessage
// ---------------------------------------------------------------------------

/// Everything a client can say to the server. Each is a single field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    /// `P=name,size`: answer to `RP`.
    Player(PlayerDescriptor),
    /// `MT=n`: answer to `RMT`. Range is checked by the server.
    MaxTries(u32),
    /// `SEC=word`: answer to `YT`. Letters are checked by the server.
    Secret(String),
    /// `G=x`: a guess of exactly one character.
    Guess(char),
    /// `AR=1` / `AR=0`: answer to `AR`.
    Continue(bool),
}

impl ClientMessage {
    /// Renders the payload text.
    pub fn encode(&self) -> String {
        match self {
            Self::Player(player) => codec::encode_player(player),
            Self::MaxTries(tries) => format!("{MAX_TRIES}{ASSIGNMENT}{tries}"),
            Self::Secret(word) => format!("{SECRET}{ASSIGNMENT}{word}"),
            Self::Guess(letter) => format!("{GUESS}{ASSIGNMENT}{letter}"),
            Self::Continue(yes) => format!("{CONTINUE}{ASSIGNMENT}{}", u8::from(*yes)),
        }
    }

    /// Decodes raw frame bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let text = std::str::from_utf8(bytes).map_err(|_| ProtocolError::NotUtf8)?;
        Self::decode(text)
    }

    /// Decodes a payload, strictly.
    pub fn decode(payload: &str) -> Result<Self, ProtocolError> {
        let fields = codec::fields(payload);
        let head = fields[0];

        match head.tag {
            codec::PLAYER => {
                if fields.len() != 1 {
                    return Err(ProtocolError::malformed("P", "expected a single field"));
                }
                codec::decode_player(head).map(Self::Player)
            }
            MAX_TRIES => {
                let value = single(&fields, MAX_TRIES)?;
                codec::parse_uint(value).map(Self::MaxTries).ok_or_else(|| {
                    ProtocolError::malformed(MAX_TRIES, format!("{value:?} is not a number"))
                })
            }
            SECRET => match single(&fields, SECRET)? {
                "" => Err(ProtocolError::malformed(SECRET, "empty word")),
                word => Ok(Self::Secret(word.to_string())),
            },
            GUESS => {
                let value = single(&fields, GUESS)?;
                let mut chars = value.chars();
                match (chars.next(), chars.next()) {
                    (Some(letter), None) => Ok(Self::Guess(letter)),
                    _ => Err(ProtocolError::malformed(
                        GUESS,
                        format!("expected one character, got {value:?}"),
                    )),
                }
            }
            CONTINUE => decode_flag(single(&fields, CONTINUE)?, CONTINUE).map(Self::Continue),
            other => Err(ProtocolError::UnknownTag(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Shape helpers
// ---------------------------------------------------------------------------

/// Accepts exactly one field with no value.
fn bare(fields: &[Field<'_>], tag: &'static str) -> Result<(), ProtocolError> {
    match fields {
        [Field { value: None, .. }] => Ok(()),
        _ => Err(ProtocolError::malformed(tag, "takes no value")),
    }
}

/// Accepts exactly one field with a value, and returns the value.
fn single<'a>(fields: &[Field<'a>], tag: &'static str) -> Result<&'a str, ProtocolError> {
    match fields {
        [Field { value: Some(value), .. }] => Ok(*value),
        _ => Err(ProtocolError::malformed(tag, "expected a single TAG=value field")),
    }
}

fn decode_flag(value: &str, tag: &'static str) -> Result<bool, ProtocolError> {
    match value {
        "1" => Ok(true),
        "0" => Ok(false),
        other => Err(ProtocolError::malformed(tag, format!("expected 0 or 1, got {other:?}"))),
    }
}

fn decode_scores(value: &str) -> Result<Vec<u32>, ProtocolError> {
    codec::items(value)
        .into_iter()
        .map(|item| {
            codec::parse_uint(item).ok_or_else(|| {
                ProtocolError::malformed(SCORE, format!("score {item:?} is not a number"))
            })
        })
        .collect()
}

fn decode_slot(item: &str) -> Option<Option<char>> {
    let mut chars = item.chars();
    match (chars.next(), chars.next()) {
        (Some(UNKNOWN), None) => Some(None),
        (Some(letter), None) => Some(Some(letter)),
        _ => None,
    }
}
