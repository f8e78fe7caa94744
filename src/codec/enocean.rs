//! EnOcean Serial Protocol 3 framing.
//!
//! ```text
//! SYNC | DATA_LEN(2, BE) | OPT_LEN | TYPE | CRC8H | data... | optional... | CRC8D
//! ```
//! There are no control symbols; a corrupt record resets the whole receive
//! buffer and the sender relies on its response timeout.

use super::{CodecError, Decoded, FrameCodec};

pub const SYNC: u8 = 0x55;
pub const HEADER_LEN: usize = 6;
pub const MAX_DATA: usize = u16::MAX as usize;
pub const MAX_OPTIONAL: usize = u8::MAX as usize;

/// CRC8 with polynomial x^8 + x^2 + x + 1, shared by header and data.
pub const CRC8_TABLE: [u8; 256] = crc8_table();

const fn crc8_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u8;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x80 != 0 { (crc << 1) ^ 0x07 } else { crc << 1 };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

pub fn crc8(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |crc, b| CRC8_TABLE[(crc ^ b) as usize])
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub packet_type: u8,
    pub data: Vec<u8>,
    pub optional: Vec<u8>,
}

impl Packet {
    pub fn new(packet_type: u8, data: Vec<u8>, optional: Vec<u8>) -> Self {
        Self { packet_type, data, optional }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EnOceanCodec;

impl FrameCodec for EnOceanCodec {
    type Frame = Packet;

    fn decode(&self, buf: &[u8]) -> Decoded<Packet> {
        if buf.is_empty() {
            return Decoded::NeedMore;
        }
        if buf[0] != SYNC {
            return Decoded::Corrupt(buf.len());
        }
        if buf.len() < HEADER_LEN {
            return Decoded::NeedMore;
        }
        if crc8(&buf[1..5]) != buf[5] {
            return Decoded::Corrupt(buf.len());
        }
        let data_len = u16::from_be_bytes([buf[1], buf[2]]) as usize;
        let optional_len = buf[3] as usize;
        let body_end = HEADER_LEN + data_len + optional_len;
        if buf.len() < body_end + 1 {
            return Decoded::NeedMore;
        }
        if crc8(&buf[HEADER_LEN..body_end]) != buf[body_end] {
            return Decoded::Corrupt(buf.len());
        }
        let data_end = HEADER_LEN + data_len;
        Decoded::Frame(
            Packet {
                packet_type: buf[4],
                data: buf[HEADER_LEN..data_end].to_vec(),
                optional: buf[data_end..body_end].to_vec(),
            },
            body_end + 1,
        )
    }

    fn encode(&self, packet: &Packet) -> Result<Vec<u8>, CodecError> {
        if packet.data.len() > MAX_DATA {
            return Err(CodecError::PayloadTooLarge { len: packet.data.len(), max: MAX_DATA });
        }
        if packet.optional.len() > MAX_OPTIONAL {
            return Err(CodecError::PayloadTooLarge { len: packet.optional.len(), max: MAX_OPTIONAL });
        }
        let data_len = (packet.data.len() as u16).to_be_bytes();
        let mut out = Vec::with_capacity(HEADER_LEN + packet.data.len() + packet.optional.len() + 1);
        out.extend_from_slice(&[SYNC, data_len[0], data_len[1], packet.optional.len() as u8, packet.packet_type]);
        out.push(crc8(&out[1..5]));
        out.extend_from_slice(&packet.data);
        out.extend_from_slice(&packet.optional);
        out.push(crc8(&out[HEADER_LEN..]));
        Ok(out)
    }
}
