//! Base64 transport codec: binary artifacts <-> printable ASCII.
//!
//! `decode` keeps the lenient behavior of stopping at the first character
//! outside the alphabet. `decode_strict` rejects anything that `encode`
//! could not have produced.

use serde::{Deserialize, Serialize};
use thiserror::Error;

const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
const PAD: u8 = b'=';
const INVALID: u8 = 0xFF;

/// Reverse lookup: ASCII byte -> 6-bit value, `INVALID` when outside the alphabet.
const DECODE_TABLE: [u8; 256] = {
    let mut table = [INVALID; 256];
    let mut i = 0;
    while i < 64 {
        table[ALPHABET[i] as usize] = i as u8;
        i += 1;
    }
    table
};

/// Why strict decoding refused a string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Length is not a multiple of four.
    #[error("transport text length {0} is not a multiple of 4")]
    Length(usize),
    /// A byte outside the alphabet (or padding in the wrong place).
    #[error("invalid transport character {byte:#04x} at offset {offset}")]
    InvalidCharacter { byte: u8, offset: usize },
    /// More than two padding characters, or bits left over after the last byte.
    #[error("non-canonical padding")]
    Padding,
}

/// Which decoder the boundary runs incoming artifacts through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecodePolicy {
    /// Stop at the first non-alphabet character and keep what was decoded.
    Lenient,
    /// Reject any text `encode` could not have produced.
    #[default]
    Strict,
}

/// Encode arbitrary bytes, padding the output to a multiple of 4 with `=`.
pub fn encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len().div_ceil(3) * 4);
    for chunk in bytes.chunks(3) {
        let b0 = chunk[0] as u32;
        let b1 = chunk.get(1).copied().unwrap_or(0) as u32;
        let b2 = chunk.get(2).copied().unwrap_or(0) as u32;
        let group = (b0 << 16) | (b1 << 8) | b2;

        out.push(ALPHABET[(group >> 18) as usize & 0x3F] as char);
        out.push(ALPHABET[(group >> 12) as usize & 0x3F] as char);
        if chunk.len() > 1 {
            out.push(ALPHABET[(group >> 6) as usize & 0x3F] as char);
        }
        if chunk.len() > 2 {
            out.push(ALPHABET[group as usize & 0x3F] as char);
        }
    }
    while out.len() % 4 != 0 {
        out.push(PAD as char);
    }
    out
}

/// Decode until the first character outside the alphabet. Never fails.
pub fn decode(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() / 4 * 3);
    let mut acc: u32 = 0;
    let mut bits: u32 = 0;
    for &c in text.as_bytes() {
        let v = DECODE_TABLE[c as usize];
        if v == INVALID {
            break;
        }
        acc = (acc << 6) | v as u32;
        bits += 6;
        if bits >= 8 {
            bits -= 8;
            out.push((acc >> bits) as u8);
            acc &= (1 << bits) - 1;
        }
    }
    out
}

/// Decode canonical base64 only.
pub fn decode_strict(text: &str) -> Result<Vec<u8>, TransportError> {
    let raw = text.as_bytes();
    if raw.len() % 4 != 0 {
        return Err(TransportError::Length(raw.len()));
    }
    let pad = raw.iter().rev().take_while(|&&c| c == PAD).count();
    if pad > 2 {
        return Err(TransportError::Padding);
    }
    let body = &raw[..raw.len() - pad];
    if let Some(offset) = body.iter().position(|&c| DECODE_TABLE[c as usize] == INVALID) {
        return Err(TransportError::InvalidCharacter { byte: body[offset], offset });
    }

    // Bits that do not complete a byte must be zero, otherwise two inputs
    // would decode to the same bytes.
    let leftover_bits = (body.len() * 6) % 8;
    if let Some(&last) = body.last() {
        let mask = (1u8 << leftover_bits) - 1;
        if DECODE_TABLE[last as usize] & mask != 0 {
            return Err(TransportError::Padding);
        }
    }
    Ok(decode(text))
}

/// Run `text` through the decoder selected by `policy`.
pub fn decode_with(policy: DecodePolicy, text: &str) -> Result<Vec<u8>, TransportError> {
    match policy {
        DecodePolicy::Lenient => Ok(decode(text)),
        DecodePolicy::Strict => decode_strict(text),
    }
}
