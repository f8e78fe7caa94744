//! Wire framing for the serial dongles.
//!
//! A codec turns a growing receive buffer into frames one at a time and
//! renders outbound frames into complete on-wire records. Decoding never
//! consumes bytes itself; the caller drains `consumed()` bytes from the front
//! of its buffer after each call and calls again until [`Decoded::NeedMore`].

pub mod enocean;
pub mod zwave;

use thiserror::Error;

pub use enocean::{EnOceanCodec, Packet};
pub use zwave::{DataFrame, FrameType, ZWaveCodec};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("payload of {len} bytes exceeds maximum of {max}")]
    PayloadTooLarge { len: usize, max: usize },
}

/// Single-byte link control symbols (Z-Wave serial API only).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Ack,
    Nack,
    Can,
}

/// Result of one decode step over the front of a receive buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded<F> {
    /// The buffer holds a prefix of a record; read more bytes.
    NeedMore,
    /// Leading bytes that are not the start of any record.
    Discard(usize),
    /// A record failed its checksum or header check. The codec's negative
    /// acknowledgement path applies.
    Corrupt(usize),
    /// A checksum-valid record of a kind this codec does not know. It still
    /// gets the acknowledgement of a valid frame.
    Unsupported(usize),
    /// A one-byte control symbol.
    Control(Control),
    /// A complete, checksum-valid frame and the number of bytes it occupied.
    Frame(F, usize),
}

impl<F> Decoded<F> {
    pub fn consumed(&self) -> usize {
        match self {
            Decoded::NeedMore => 0,
            Decoded::Discard(n) | Decoded::Corrupt(n) | Decoded::Unsupported(n) => *n,
            Decoded::Control(_) => 1,
            Decoded::Frame(_, n) => *n,
        }
    }
}

/// Contract shared by both framing flavours.
pub trait FrameCodec {
    type Frame;

    fn decode(&self, buf: &[u8]) -> Decoded<Self::Frame>;

    fn encode(&self, frame: &Self::Frame) -> Result<Vec<u8>, CodecError>;
}
