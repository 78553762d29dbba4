//! Frame header encoding.
//!
//! Every message on the wire is two writes:
//!
//! ```text
//! ┌──────────────────────────────────────────────┐┌─────────────┐
//! │ "12" + 62 spaces          (HEADER_WIDTH = 64) ││ "P=alice,2"…│
//! └──────────────────────────────────────────────┘└─────────────┘
//!              header: payload length                payload
//! ```
//!
//! The header is the payload's byte length in ASCII decimal, left-aligned
//! and padded with spaces to exactly [`HEADER_WIDTH`] bytes.

use crate::TransportError;

/// Width of the length header, in bytes.
pub const HEADER_WIDTH: usize = 64;

/// Largest payload a connection will send or accept.
///
/// Commands are a few dozen bytes; anything near this limit is a
/// desynchronized or hostile peer.
pub const MAX_PAYLOAD_LEN: usize = 64 * 1024;

/// Padding byte used to fill the header.
const PADDING: u8 = b' ';

/// Builds the fixed-width header announcing a payload of `len` bytes.
///
/// A `usize` has at most 20 decimal digits, so every length fits.
pub fn encode_header(len: usize) -> [u8; HEADER_WIDTH] {
    let mut header = [PADDING; HEADER_WIDTH];
    let digits = len.to_string();
    header[..digits.len()].copy_from_slice(digits.as_bytes());
    header
}

/// Parses a header back into the payload length it announces.
///
/// Surrounding padding is ignored. Anything that is not a plain decimal
/// number (empty, signs, letters, interior spaces, non-ASCII) is a
/// [`TransportError::MalformedHeader`].
pub fn decode_header(header: &[u8]) -> Result<usize, TransportError> {
    let malformed =
        || TransportError::MalformedHeader(String::from_utf8_lossy(header).into());

    let text = std::str::from_utf8(header).map_err(|_| malformed())?;
    let digits = text.trim_matches(PADDING as char);

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }

    digits.parse::<usize>().map_err(|_| malformed())
}
