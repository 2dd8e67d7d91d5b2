use super::message::AmiMessage;
use bytes::{Buf, BufMut, BytesMut};
use std::io;
use tokio_util::codec::{Decoder, Encoder};

/// Upper bound for a single buffered message. Real AMI blocks are a few
/// hundred bytes; anything this large means the peer is not speaking AMI.
const MAX_FRAME_LEN: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AmiFrame {
    /// Greeting line sent once on connect, e.g. `Asterisk Call Manager/5.0.1`.
    Banner(String),
    Message(AmiMessage),
}

#[derive(Debug, Default)]
pub struct AmiCodec {
    banner_seen: bool,
}

impl AmiCodec {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for AmiCodec {
    type Item = AmiFrame;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<AmiFrame>, io::Error> {
        if !self.banner_seen {
            let Some(pos) = src.iter().position(|b| *b == b'\n') else {
                return check_len(src).map(|_| None);
            };
            let line = src.split_to(pos + 1);
            self.banner_seen = true;
            return Ok(Some(AmiFrame::Banner(
                String::from_utf8_lossy(&line).trim().to_string(),
            )));
        }

        // Stray blank lines between blocks carry nothing.
        let leading = src
            .iter()
            .take_while(|b| **b == b'\r' || **b == b'\n')
            .count();
        src.advance(leading);

        let mut start = 0;
        while let Some(offset) = src[start..].iter().position(|b| *b == b'\n') {
            let end = start + offset;
            let line = &src[start..end];
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            if line.is_empty() {
                let block = src.split_to(end + 1);
                return Ok(Some(AmiFrame::Message(parse_block(&block[..start]))));
            }
            start = end + 1;
        }

        check_len(src).map(|_| None)
    }
}

impl Encoder<AmiMessage> for AmiCodec {
    type Error = io::Error;

    fn encode(&mut self, item: AmiMessage, dst: &mut BytesMut) -> Result<(), io::Error> {
        for (key, value) in item.headers() {
            dst.reserve(key.len() + value.len() + 4);
            dst.put_slice(key.as_bytes());
            dst.put_slice(b": ");
            dst.put_slice(value.as_bytes());
            dst.put_slice(b"\r\n");
        }
        dst.put_slice(b"\r\n");
        Ok(())
    }
}

fn check_len(src: &BytesMut) -> Result<(), io::Error> {
    if src.len() > MAX_FRAME_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("AMI frame exceeds {} bytes", MAX_FRAME_LEN),
        ));
    }
    Ok(())
}

fn parse_block(block: &[u8]) -> AmiMessage {
    let text = String::from_utf8_lossy(block);
    let mut message = AmiMessage::new();
    for line in text.lines() {
        if let Some((key, value)) = line.split_once(':') {
            let key = key.trim();
            if !key.is_empty() {
                message.push(key, value.trim());
            }
        }
    }
    message
}
