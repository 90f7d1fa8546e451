//! Chunk header decoding.
//!
//! Every datagram starts with a 4-byte big-endian header:
//!
//! ```text
//!  0               1               2               3
//! +---------------+---------------+-+-------------+---------------+
//! |         frame number          |E|  index hi   |   index lo    |
//! +---------------+---------------+-+-------------+---------------+
//! ```
//!
//! `E` marks the last chunk of a frame. The payload follows immediately.

use fc_core::CHUNK_HEADER_LEN;

/// Bit in header byte 2 that flags the final chunk of a frame.
pub const END_OF_FRAME: u8 = 0x80;

/// Mask applied to `byte2 << 8` when extracting the chunk index.
///
/// This is the mask the upstream decoder uses. Applied to a value whose low
/// byte is always zero it discards byte 2 entirely, so indices wrap at 256.
/// Kept as observed until the extender protocol is confirmed.
pub const CHUNK_INDEX_HIGH_MASK: u16 = 0x00ef;

/// Errors produced while decoding a datagram.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The datagram is shorter than the fixed header.
    #[error("datagram of {len} bytes is shorter than the {CHUNK_HEADER_LEN}-byte chunk header")]
    TooShort {
        /// Length of the rejected datagram.
        len: usize,
    },
}

/// One decoded datagram, borrowing its payload from the receive buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk<'a> {
    /// Protocol frame number this chunk belongs to.
    pub frame_number: u16,
    /// Position of this chunk within its frame.
    pub index: u16,
    /// Whether this is the final chunk of the frame.
    pub end_of_frame: bool,
    /// Chunk payload (a slice of JPEG data).
    pub payload: &'a [u8],
}

impl<'a> Chunk<'a> {
    /// Decode a raw datagram.
    pub fn decode(datagram: &'a [u8]) -> Result<Self, DecodeError> {
        let Some((header, payload)) = datagram.split_first_chunk::<CHUNK_HEADER_LEN>() else {
            return Err(DecodeError::TooShort {
                len: datagram.len(),
            });
        };
        let [b0, b1, b2, b3] = *header;

        Ok(Self {
            frame_number: u16::from_be_bytes([b0, b1]),
            index: ((u16::from(b2) << 8) & CHUNK_INDEX_HIGH_MASK) + u16::from(b3),
            end_of_frame: b2 & END_OF_FRAME != 0,
            payload,
        })
    }

    /// Encode a chunk header followed by `payload`.
    ///
    /// The index is written as a big-endian pair with the end-of-frame flag
    /// in the top bit, which is what the extenders transmit.
    pub fn encode(frame_number: u16, index: u16, end_of_frame: bool, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(CHUNK_HEADER_LEN + payload.len());
        out.extend_from_slice(&frame_number.to_be_bytes());
        let [hi, lo] = index.to_be_bytes();
        out.push((hi & !END_OF_FRAME) | if end_of_frame { END_OF_FRAME } else { 0 });
        out.push(lo);
        out.extend_from_slice(payload);
        out
    }
}
