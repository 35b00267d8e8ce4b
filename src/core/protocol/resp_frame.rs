// src/core/protocol/resp_frame.rs

//! RESP2 frames as exchanged with Sentinel monitors and store instances, plus
//! the `tokio_util` codec the executor frames its TCP stream with.

use bytes::{Buf, Bytes, BytesMut};
use thiserror::Error;
use tokio_util::codec::{Decoder, Encoder};

const CRLF: &[u8] = b"\r\n";

// Replies we consume are small; anything beyond these bounds is a broken peer.
const MAX_ARRAY_LEN: usize = 64 * 1024;
const MAX_BULK_LEN: usize = 64 * 1024 * 1024;
const MAX_NESTING: usize = 32;

#[derive(Error, Debug)]
pub enum FrameError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed RESP frame: {0}")]
    Malformed(String),
}

/// A single RESP2 value.
#[derive(Debug, Clone, PartialEq)]
pub enum RespFrame {
    SimpleString(String),
    Error(String),
    Integer(i64),
    BulkString(Bytes),
    Null,
    NullArray,
    Array(Vec<RespFrame>),
}

impl RespFrame {
    /// Builds the array-of-bulk-strings form every command is sent as.
    pub fn command<S: AsRef<str>>(args: &[S]) -> Self {
        RespFrame::Array(
            args.iter()
                .map(|a| RespFrame::BulkString(Bytes::copy_from_slice(a.as_ref().as_bytes())))
                .collect(),
        )
    }

    /// The textual payload of a scalar frame.
    pub fn as_text(&self) -> Option<String> {
        match self {
            RespFrame::SimpleString(s) => Some(s.clone()),
            RespFrame::BulkString(b) => Some(String::from_utf8_lossy(b).into_owned()),
            RespFrame::Integer(i) => Some(i.to_string()),
            _ => None,
        }
    }

    /// True for the `+OK` status reply.
    pub fn is_ok(&self) -> bool {
        matches!(self, RespFrame::SimpleString(s) if s.eq_ignore_ascii_case("OK"))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, RespFrame::Null | RespFrame::NullArray)
    }
}

/// Stateless RESP2 codec.
#[derive(Debug, Default, Clone, Copy)]
pub struct RespFrameCodec;

impl Encoder<RespFrame> for RespFrameCodec {
    type Error = FrameError;

    fn encode(&mut self, item: RespFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        write_frame(&item, dst);
        Ok(())
    }
}

fn write_frame(frame: &RespFrame, dst: &mut BytesMut) {
    match frame {
        RespFrame::SimpleString(s) => write_line(dst, b'+', s.as_bytes()),
        RespFrame::Error(s) => write_line(dst, b'-', s.as_bytes()),
        RespFrame::Integer(i) => write_line(dst, b':', i.to_string().as_bytes()),
        RespFrame::BulkString(b) => {
            write_line(dst, b'$', b.len().to_string().as_bytes());
            dst.extend_from_slice(b);
            dst.extend_from_slice(CRLF);
        }
        RespFrame::Null => dst.extend_from_slice(b"$-1\r\n"),
        RespFrame::NullArray => dst.extend_from_slice(b"*-1\r\n"),
        RespFrame::Array(items) => {
            write_line(dst, b'*', items.len().to_string().as_bytes());
            for item in items {
                write_frame(item, dst);
            }
        }
    }
}

fn write_line(dst: &mut BytesMut, prefix: u8, body: &[u8]) {
    dst.extend_from_slice(&[prefix]);
    dst.extend_from_slice(body);
    dst.extend_from_slice(CRLF);
}

impl Decoder for RespFrameCodec {
    type Item = RespFrame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }
        let mut cursor = Cursor { buf: &src[..], pos: 0 };
        match cursor.frame(0)? {
            Some(frame) => {
                let consumed = cursor.pos;
                src.advance(consumed);
                Ok(Some(frame))
            }
            None => Ok(None),
        }
    }
}

/// Read position over a not-yet-consumed buffer. `Ok(None)` from any method
/// means more bytes are needed; nothing is consumed until a whole frame parses.
struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn frame(&mut self, depth: usize) -> Result<Option<RespFrame>, FrameError> {
        if depth > MAX_NESTING {
            return Err(FrameError::Malformed("nesting too deep".into()));
        }
        let Some(&tag) = self.buf.get(self.pos) else {
            return Ok(None);
        };
        self.pos += 1;
        let Some(line) = self.line() else {
            return Ok(None);
        };
        match tag {
            b'+' => Ok(Some(RespFrame::SimpleString(lossy(line)))),
            b'-' => Ok(Some(RespFrame::Error(lossy(line)))),
            b':' => Ok(Some(RespFrame::Integer(parse_int(line)?))),
            b'$' => self.bulk(parse_int(line)?),
            b'*' => self.array(parse_int(line)?, depth),
            other => Err(FrameError::Malformed(format!(
                "unknown type byte {:?}",
                other as char
            ))),
        }
    }

    fn line(&mut self) -> Option<&'a [u8]> {
        let buf = self.buf;
        let rest = &buf[self.pos..];
        let end = rest.windows(CRLF.len()).position(|w| w == CRLF)?;
        self.pos += end + CRLF.len();
        Some(&rest[..end])
    }

    fn bulk(&mut self, len: i64) -> Result<Option<RespFrame>, FrameError> {
        if len < 0 {
            return Ok(Some(RespFrame::Null));
        }
        let len = len as usize;
        if len > MAX_BULK_LEN {
            return Err(FrameError::Malformed(format!("bulk string of {len} bytes")));
        }
        let buf = self.buf;
        let rest = &buf[self.pos..];
        if rest.len() < len + CRLF.len() {
            return Ok(None);
        }
        if &rest[len..len + CRLF.len()] != CRLF {
            return Err(FrameError::Malformed("bulk string not CRLF terminated".into()));
        }
        let data = Bytes::copy_from_slice(&rest[..len]);
        self.pos += len + CRLF.len();
        Ok(Some(RespFrame::BulkString(data)))
    }

    fn array(&mut self, len: i64, depth: usize) -> Result<Option<RespFrame>, FrameError> {
        if len < 0 {
            return Ok(Some(RespFrame::NullArray));
        }
        let len = len as usize;
        if len > MAX_ARRAY_LEN {
            return Err(FrameError::Malformed(format!("array of {len} elements")));
        }
        let mut items = Vec::with_capacity(len);
        for _ in 0..len {
            match self.frame(depth + 1)? {
                Some(item) => items.push(item),
                None => return Ok(None),
            }
        }
        Ok(Some(RespFrame::Array(items)))
    }
}

fn lossy(line: &[u8]) -> String {
    String::from_utf8_lossy(line).into_owned()
}

fn parse_int(line: &[u8]) -> Result<i64, FrameError> {
    std::str::from_utf8(line)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| FrameError::Malformed(format!("bad integer {:?}", lossy(line))))
}
