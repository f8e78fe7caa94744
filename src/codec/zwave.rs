//! Z-Wave serial API framing.
//!
//! ```text
//! SOF | LEN | TYPE | FUNC | payload... | CHK
//! ```
//! `LEN` counts TYPE, FUNC, payload and CHK. `CHK` is the XOR of LEN through
//! the last payload byte, seeded with 0xff. ACK, NACK and CAN travel as
//! single bytes outside of any frame.

use super::{CodecError, Control, Decoded, FrameCodec};

pub const SOF: u8 = 0x01;
pub const ACK: u8 = 0x06;
pub const NACK: u8 = 0x15;
pub const CAN: u8 = 0x18;

/// Largest payload that still fits the one-byte length field.
pub const MAX_PAYLOAD: usize = u8::MAX as usize - 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    Request = 0x00,
    Response = 0x01,
}

impl FrameType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(FrameType::Request),
            0x01 => Some(FrameType::Response),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFrame {
    pub frame_type: FrameType,
    pub function: u8,
    pub payload: Vec<u8>,
}

impl DataFrame {
    pub fn request(function: u8, payload: Vec<u8>) -> Self {
        Self { frame_type: FrameType::Request, function, payload }
    }

    pub fn response(function: u8, payload: Vec<u8>) -> Self {
        Self { frame_type: FrameType::Response, function, payload }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ZWaveCodec;

pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0xff, |acc, b| acc ^ b)
}

impl FrameCodec for ZWaveCodec {
    type Frame = DataFrame;

    fn decode(&self, buf: &[u8]) -> Decoded<DataFrame> {
        match buf.first() {
            None => Decoded::NeedMore,
            Some(&ACK) => Decoded::Control(Control::Ack),
            Some(&NACK) => Decoded::Control(Control::Nack),
            Some(&CAN) => Decoded::Control(Control::Can),
            Some(&SOF) => {
                if buf.len() < 2 {
                    return Decoded::NeedMore;
                }
                let length = buf[1] as usize;
                if length < 3 {
                    // cannot even hold type, function and checksum
                    return Decoded::Corrupt(buf.len());
                }
                let total = length + 2;
                if buf.len() < total {
                    return Decoded::NeedMore;
                }
                if checksum(&buf[1..total - 1]) != buf[total - 1] {
                    return Decoded::Corrupt(buf.len());
                }
                match FrameType::from_u8(buf[2]) {
                    Some(frame_type) => Decoded::Frame(
                        DataFrame {
                            frame_type,
                            function: buf[3],
                            payload: buf[4..total - 1].to_vec(),
                        },
                        total,
                    ),
                    None => Decoded::Unsupported(total),
                }
            }
            Some(_) => Decoded::Discard(1),
        }
    }

    fn encode(&self, frame: &DataFrame) -> Result<Vec<u8>, CodecError> {
        if frame.payload.len() > MAX_PAYLOAD {
            return Err(CodecError::PayloadTooLarge { len: frame.payload.len(), max: MAX_PAYLOAD });
        }
        let mut out = Vec::with_capacity(frame.payload.len() + 5);
        out.push(SOF);
        out.push((frame.payload.len() + 3) as u8);
        out.push(frame.frame_type as u8);
        out.push(frame.function);
        out.extend_from_slice(&frame.payload);
        out.push(checksum(&out[1..]));
        Ok(out)
    }
}
