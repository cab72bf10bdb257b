#![allow(dead_code)]

use bytes::{Bytes, BytesMut};
use tokio_util::codec::Decoder;

use solar_bridge::protocol::packet::Frame;
use solar_bridge::protocol::packet_decoder::PacketDecoder;

pub fn common_setup() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub struct Factory;
impl Factory {
    /// A complete frame carrying `registers` from index 0. Envelope bytes
    /// between the header and the first register are left zeroed.
    pub fn raw_frame(function: u8, registers: &[u16]) -> Vec<u8> {
        let total = 35 + registers.len() * 2;
        let mut bytes = vec![0u8; total];

        bytes[0] = 0xa1;
        bytes[1] = 0x1a;
        bytes[2..4].copy_from_slice(&1u16.to_le_bytes());
        bytes[4..6].copy_from_slice(&((total - 6) as u16).to_le_bytes());
        bytes[6] = 1;
        bytes[7] = function;

        for (index, value) in registers.iter().enumerate() {
            let offset = 35 + index * 2;
            bytes[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
        }

        bytes
    }

    pub fn frame(function: u8, registers: &[u16]) -> Frame {
        Frame::new(Bytes::from(Self::raw_frame(function, registers)))
    }
}

/// Push one chunk and collect every frame it completes.
pub fn feed(decoder: &mut PacketDecoder, buf: &mut BytesMut, chunk: &[u8]) -> Vec<Frame> {
    buf.extend_from_slice(chunk);

    let mut frames = Vec::new();
    while let Some(frame) = decoder.decode(buf).expect("decode does not fail") {
        frames.push(frame);
    }
    frames
}
