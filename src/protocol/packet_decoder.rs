use crate::prelude::*;

use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;

use crate::protocol::packet::{Frame, MAGIC};

/// Streaming reassembler. Accumulated TCP chunks are split into complete
/// frames; anything before the next magic prefix is skipped. One instance
/// per connection owns the backlog.
pub struct PacketDecoder;

impl PacketDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PacketDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for PacketDecoder {
    type Item = Frame;
    type Error = anyhow::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        loop {
            if src.len() < 2 {
                return Ok(None);
            }

            if src[0..2] != MAGIC {
                // out of sync; skip to the next candidate prefix byte
                match src[1..].iter().position(|&b| b == MAGIC[0]) {
                    Some(pos) => {
                        src.advance(pos + 1);
                        debug!("skipped {} bytes resynchronising", pos + 1);
                        continue;
                    }
                    None => {
                        debug!("skipped {} bytes resynchronising", src.len());
                        src.clear();
                        return Ok(None);
                    }
                }
            }

            if src.len() < 6 {
                return Ok(None);
            }

            let frame_length = Utils::u16ify(src, 4) as usize + 6;
            if src.len() < frame_length {
                src.reserve(frame_length - src.len());
                return Ok(None);
            }

            return Ok(Some(Frame::new(src.split_to(frame_length).freeze())));
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None => {
                if !src.is_empty() {
                    debug!("dropping {} trailing bytes at end of stream", src.len());
                    src.clear();
                }
                Ok(None)
            }
        }
    }
}
