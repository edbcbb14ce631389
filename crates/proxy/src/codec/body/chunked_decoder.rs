//! Decoder for `Transfer-Encoding: chunked` response bodies.
//!
//! Format per [RFC 9112 Section 7.1](https://www.rfc-editor.org/rfc/rfc9112#section-7.1):
//! a hex size line with optional extensions, the chunk data, CRLF, repeated until a
//! zero-sized chunk, then optional trailer fields and a final CRLF. Extensions and
//! trailers are validated for line structure and otherwise discarded.

use crate::protocol::{ParseError, PayloadItem};
use bytes::{Buf, BytesMut};
use std::cmp;
use tokio_util::codec::Decoder;
use tracing::trace;
use ChunkedState::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkedDecoder {
    state: ChunkedState,
    remaining_size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkedState {
    /// first hex digit of the chunk size
    SizeStart,
    /// further hex digits of the chunk size
    Size,
    /// whitespace after the size
    SizeLws,
    /// chunk extension, ignored up to CR
    Extension,
    SizeLf,
    /// chunk data
    Body,
    BodyCr,
    BodyLf,
    /// a trailer field line, ignored up to CR
    Trailer,
    TrailerLf,
    EndCr,
    EndLf,
    End,
}

impl ChunkedDecoder {
    pub fn new() -> Self {
        Self { state: SizeStart, remaining_size: 0 }
    }

    fn push_size_digit(&mut self, digit: u8) -> Result<(), ParseError> {
        self.remaining_size = self
            .remaining_size
            .checked_mul(16)
            .and_then(|size| size.checked_add(u64::from(digit)))
            .ok_or_else(|| ParseError::invalid_body("invalid overflow chunked length"))?;
        Ok(())
    }

    /// Feeds one framing byte and returns the state that follows it.
    fn next_state(&mut self, byte: u8) -> Result<ChunkedState, ParseError> {
        let next = match (self.state, byte) {
            (SizeStart | Size, b) if b.is_ascii_hexdigit() => {
                let digit = match b {
                    b'0'..=b'9' => b - b'0',
                    b'a'..=b'f' => b + 10 - b'a',
                    _ => b + 10 - b'A',
                };
                self.push_size_digit(digit)?;
                Size
            }
            // a size line needs at least one digit
            (SizeStart, b) => {
                return Err(ParseError::invalid_body(format!("chunk size line starts with 0x{b:02x}")));
            }
            (Size | SizeLws, b'\t' | b' ') => SizeLws,
            (Size | SizeLws, b';') => Extension,
            (Size | SizeLws | Extension, b'\r') => SizeLf,
            // a bare LF inside an extension is how request smuggling starts
            (Extension, b'\n') => return Err(ParseError::invalid_body("invalid chunk extension contains newline")),
            (Extension, _) => Extension,
            (SizeLf, b'\n') if self.remaining_size == 0 => EndCr,
            (SizeLf, b'\n') => Body,
            (BodyCr, b'\r') => BodyLf,
            (BodyLf, b'\n') => SizeStart,
            (EndCr, b'\r') => EndLf,
            (Trailer, b'\r') => TrailerLf,
            (EndCr | Trailer, _) => Trailer,
            (TrailerLf, b'\n') => EndCr,
            (EndLf, b'\n') => End,
            (state, b) => {
                return Err(ParseError::invalid_body(format!("unexpected byte 0x{b:02x} in chunked state {state:?}")));
            }
        };
        Ok(next)
    }
}

impl Default for ChunkedDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for ChunkedDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    /// Returns at most one data slice per call. Framing bytes are consumed from
    /// `src` as they are recognised, so a partial size line is never re-read.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            match self.state {
                End => {
                    trace!("finished reading chunked data");
                    return Ok(Some(PayloadItem::Eof));
                }
                Body => {
                    if src.is_empty() {
                        return Ok(None);
                    }
                    let len = usize::try_from(cmp::min(self.remaining_size, src.len() as u64)).unwrap_or(src.len());
                    let bytes = src.split_to(len).freeze();
                    self.remaining_size -= len as u64;
                    if self.remaining_size == 0 {
                        self.state = BodyCr;
                    }
                    trace!(len, "read chunked bytes");
                    return Ok(Some(PayloadItem::Chunk(bytes)));
                }
                _ => {
                    if src.is_empty() {
                        return Ok(None);
                    }
                    let byte = src.get_u8();
                    self.state = self.next_state(byte)?;
                }
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(item) => Ok(Some(item)),
            None => Err(ParseError::unexpected_eof("connection closed inside chunked body")),
        }
    }
}
