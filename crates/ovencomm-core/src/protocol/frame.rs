//! Frame encoding/decoding
//!
//! Implements the ASCII frame format used by the oven controller.
//!
//! Request frame (host → device, 10 bytes):
//! - 1 byte: `*`
//! - 2 bytes: command code, decimal, zero-padded
//! - 4 bytes: payload, lowercase hex, zero-padded
//! - 2 bytes: checksum of the 6 preceding characters, lowercase hex
//! - 1 byte: `\r`
//!
//! Response frame (device → host, 8 bytes):
//! - 1 byte: `*`
//! - 4 bytes: value, hex
//! - 2 bytes: checksum of the 4 value characters, hex
//! - 1 byte: `^`

use regex::bytes::Regex;
use std::sync::LazyLock;

use super::{Command, ProtocolError, REQUEST_FRAME_LEN, RESPONSE_FRAME_LEN};

/// Exact shape of a complete response frame
static RESPONSE_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\*[0-9a-fA-F]{6}\^$").expect("response frame pattern is valid")
});

/// Sum of byte values modulo 256
pub fn sum8(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}

/// Encode a request frame for `command` carrying `payload`
pub fn encode_request(command: Command, payload: u16) -> Vec<u8> {
    let body = format!("{:02}{:04x}", command.code(), payload);
    let checksum = sum8(body.as_bytes());

    let mut frame = Vec::with_capacity(REQUEST_FRAME_LEN);
    frame.push(b'*');
    frame.extend_from_slice(body.as_bytes());
    frame.extend_from_slice(format!("{:02x}", checksum).as_bytes());
    frame.push(b'\r');
    frame
}

/// Result of trying to decode the accumulated receive buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// Not enough bytes for a complete frame yet
    Incomplete,
    /// Enough bytes, but they do not form a response frame
    Invalid,
    /// A well-shaped response frame (checksum not yet verified)
    Frame(ResponseFrame),
}

/// A well-shaped response frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseFrame {
    /// The 4 value hex digits
    pub data: [u8; 4],
    /// The 2 checksum hex digits
    pub checksum: [u8; 2],
}

impl ResponseFrame {
    /// Verify the checksum and return the decoded value
    pub fn verify(&self) -> Result<u16, ProtocolError> {
        let expected = sum8(&self.data);
        let actual = parse_hex(&self.checksum) as u8;

        if expected != actual {
            return Err(ProtocolError::ChecksumMismatch { expected, actual });
        }

        Ok(parse_hex(&self.data) as u16)
    }

    /// Encode the frame back to raw bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(RESPONSE_FRAME_LEN);
        bytes.push(b'*');
        bytes.extend_from_slice(&self.data);
        bytes.extend_from_slice(&self.checksum);
        bytes.push(b'^');
        bytes
    }
}

/// Decode the whole accumulated buffer as a response frame
///
/// The buffer must match the frame shape exactly; leading or trailing
/// bytes are never skipped.
pub fn try_decode(buffer: &[u8]) -> Decoded {
    if RESPONSE_SHAPE.is_match(buffer) {
        let mut data = [0u8; 4];
        let mut checksum = [0u8; 2];
        data.copy_from_slice(&buffer[1..5]);
        checksum.copy_from_slice(&buffer[5..7]);
        return Decoded::Frame(ResponseFrame { data, checksum });
    }

    if buffer.len() < RESPONSE_FRAME_LEN {
        Decoded::Incomplete
    } else {
        Decoded::Invalid
    }
}

/// Build a response frame for `value` with a correct checksum
///
/// Used by the simulated device and tests.
pub fn encode_response(value: u16) -> Vec<u8> {
    let data = format!("{:04x}", value);
    format!("*{}{:02x}^", data, sum8(data.as_bytes())).into_bytes()
}

/// Parse ASCII hex digits already validated by the frame shape
fn parse_hex(digits: &[u8]) -> u32 {
    digits.iter().fold(0u32, |acc, d| {
        let nibble = (*d as char).to_digit(16).unwrap_or(0);
        (acc << 4) | nibble
    })
}
