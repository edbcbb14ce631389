//! Incremental backend response parser.
//!
//! [`ResponseDecoder`] turns the bytes of one backend response into a flat stream
//! of [`ResponseEvent`]s: header field/value pairs in wire order, one
//! `HeadersComplete`, zero or more `Body` slices and a final `MessageComplete`.
//! Each call to [`Decoder::decode`] yields at most one event, which lets the caller
//! react to every event (and stop) before the next one is produced.
//!
//! # State Machine
//!
//! ```text
//!   Head ──(1xx, not 101)──▶ Head
//!    │
//!    ├──(HEAD request, 1xx, 204, 304)──▶ Finishing ──▶ Done
//!    │
//!    └──(anything else)──▶ Body ──(body ends)──▶ Done
//! ```
//!
//! Bytes are consumed from the source buffer only when they have been turned into
//! events: a partial head stays in the buffer until it is complete, and bytes
//! following a finished response are left untouched.

use std::collections::VecDeque;

use bytes::BytesMut;
use http::Version;
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::codec::body::PayloadDecoder;
use crate::codec::header::{HeaderDecoder, ResponseHeadParts};
use crate::config::DownstreamConfig;
use crate::protocol::{ParseError, PayloadItem, PayloadSize, ResponseEvent, ResponseHeadInfo};

#[derive(Debug)]
pub struct ResponseDecoder {
    header_decoder: HeaderDecoder,
    phase: Phase,
    /// events of a parsed head not yet handed out
    pending: VecDeque<ResponseEvent>,
    head_request: bool,
}

#[derive(Debug)]
enum Phase {
    Head,
    Body(PayloadDecoder),
    /// the response carries no body, message completion is next
    Finishing,
    Done,
}

impl ResponseDecoder {
    pub fn new(config: &DownstreamConfig) -> Self {
        Self { header_decoder: HeaderDecoder::new(config), phase: Phase::Head, pending: VecDeque::new(), head_request: false }
    }

    /// Responses to HEAD never carry a body, whatever their headers claim.
    pub fn set_head_request(&mut self, head_request: bool) {
        self.head_request = head_request;
    }

    /// Drops the body of the response whose head was just delivered.
    ///
    /// Has no effect once body decoding produced data or the message finished.
    pub fn skip_body(&mut self) {
        if matches!(self.phase, Phase::Body(_)) {
            trace!("skip response body on request");
            self.phase = Phase::Finishing;
        }
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        matches!(self.phase, Phase::Done) && self.pending.is_empty()
    }

    fn begin_message(&mut self, parts: ResponseHeadParts) {
        let ResponseHeadParts { status, version, fields, payload_size, connection_close, connection_keep_alive } = parts;

        for (name, value) in fields {
            self.pending.push_back(ResponseEvent::HeaderField(name));
            self.pending.push_back(ResponseEvent::HeaderValue(value));
        }

        let bodiless = self.head_request || is_bodiless_status(status);
        let payload_size = if bodiless { PayloadSize::Empty } else { payload_size };

        let info = ResponseHeadInfo {
            status,
            version,
            keep_alive: should_keep_alive(version, connection_close, connection_keep_alive, payload_size),
        };
        trace!(status, ?version, ?payload_size, keep_alive = info.keep_alive, "response head complete");

        self.phase = if info.is_interim() {
            Phase::Head
        } else if payload_size.is_empty() {
            Phase::Finishing
        } else {
            Phase::Body(payload_size.into())
        };
        self.pending.push_back(ResponseEvent::HeadersComplete(info));
    }

    fn body_event(&mut self, item: Option<PayloadItem>) -> Option<ResponseEvent> {
        match item? {
            PayloadItem::Chunk(bytes) => Some(ResponseEvent::Body(bytes)),
            PayloadItem::Eof => {
                self.phase = Phase::Done;
                Some(ResponseEvent::MessageComplete)
            }
        }
    }
}

impl Decoder for ResponseDecoder {
    type Item = ResponseEvent;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(event) = self.pending.pop_front() {
            return Ok(Some(event));
        }

        match &mut self.phase {
            Phase::Head => match self.header_decoder.decode(src)? {
                Some(parts) => {
                    self.begin_message(parts);
                    Ok(self.pending.pop_front())
                }
                None => Ok(None),
            },
            Phase::Body(payload_decoder) => {
                let item = payload_decoder.decode(src)?;
                Ok(self.body_event(item))
            }
            Phase::Finishing => {
                self.phase = Phase::Done;
                Ok(Some(ResponseEvent::MessageComplete))
            }
            Phase::Done => Ok(None),
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(event) = self.decode(src)? {
            return Ok(Some(event));
        }

        match &mut self.phase {
            Phase::Head if src.is_empty() => Err(ParseError::unexpected_eof("connection closed before response head")),
            Phase::Head => Err(ParseError::unexpected_eof("connection closed inside response head")),
            Phase::Body(payload_decoder) => {
                let item = payload_decoder.decode_eof(src)?;
                Ok(self.body_event(item))
            }
            Phase::Finishing | Phase::Done => Ok(None),
        }
    }
}

/// HEAD responses and 304 commonly repeat the Content-Length of the resource;
/// 1xx and 204 are bodiless by definition.
#[inline]
pub fn is_bodiless_status(status: u16) -> bool {
    (100..200).contains(&status) || status == 204 || status == 304
}

/// HTTP/1.1 connections persist unless `Connection: close`; HTTP/1.0 ones only
/// with `Connection: keep-alive`. A close-delimited body always ends the connection.
fn should_keep_alive(version: Version, close: bool, keep_alive: bool, payload_size: PayloadSize) -> bool {
    let persistent = if version == Version::HTTP_11 { !close } else { keep_alive && !close };
    persistent && !payload_size.is_until_close()
}
