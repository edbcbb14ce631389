//! Response head decoder built on `httparse`.
//!
//! Parses the status line and header block of a backend response. Nothing is
//! consumed from the source buffer until the whole head is available, so a head
//! split across any number of reads is parsed exactly once.
//!
//! Header names and values are handed out as [`Bytes`] slices of the original
//! buffer: the decoder records the byte range of every name and value while
//! `httparse` still borrows the buffer, then splits the head off and slices it.

use bytes::{Bytes, BytesMut};
use http::Version;
use httparse::{Error, Status};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::config::DownstreamConfig;
use crate::ensure;
use crate::protocol::{ParseError, PayloadSize, contains_ignore_ascii_case};

/// Shortest response head httparse can accept: `HTTP/1.1 200\n\n`.
const MIN_HEAD_LEN: usize = 14;

/// A fully parsed response head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHeadParts {
    pub status: u16,
    pub version: Version,
    /// `(name, value)` in wire order
    pub fields: Vec<(Bytes, Bytes)>,
    /// Body framing announced by the headers alone; bodiless statuses and
    /// HEAD responses are handled by the caller
    pub payload_size: PayloadSize,
    /// `Connection` carries the `close` token
    pub connection_close: bool,
    /// `Connection` carries the `keep-alive` token
    pub connection_keep_alive: bool,
}

impl ResponseHeadParts {
    fn field_values<'a>(fields: &'a [(Bytes, Bytes)], name: &'a str) -> impl Iterator<Item = &'a Bytes> + 'a {
        fields.iter().filter(move |(n, _)| n.eq_ignore_ascii_case(name.as_bytes())).map(|(_, v)| v)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct HeaderDecoder {
    max_header_num: usize,
    max_header_bytes: usize,
}

impl HeaderDecoder {
    pub fn new(config: &DownstreamConfig) -> Self {
        Self { max_header_num: config.max_header_num(), max_header_bytes: config.max_header_bytes() }
    }
}

impl Decoder for HeaderDecoder {
    type Item = ResponseHeadParts;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < MIN_HEAD_LEN {
            return Ok(None);
        }

        let mut headers = vec![httparse::EMPTY_HEADER; self.max_header_num];
        let mut res = httparse::Response::new(&mut headers);

        let parsed = res.parse(src).map_err(|e| match e {
            Error::TooManyHeaders => ParseError::too_many_headers(self.max_header_num),
            e => ParseError::invalid_header(e.to_string()),
        })?;

        let body_offset = match parsed {
            Status::Complete(body_offset) => body_offset,
            Status::Partial => {
                ensure!(src.len() <= self.max_header_bytes, ParseError::too_large_header(src.len(), self.max_header_bytes));
                return Ok(None);
            }
        };

        trace!(head_size = body_offset, header_count = res.headers.len(), "parsed response head");
        ensure!(body_offset <= self.max_header_bytes, ParseError::too_large_header(body_offset, self.max_header_bytes));

        let version = match res.version {
            Some(0) => Version::HTTP_10,
            Some(1) => Version::HTTP_11,
            v => return Err(ParseError::InvalidVersion(v)),
        };
        let status = res.code.ok_or_else(|| ParseError::invalid_header("missing status code"))?;

        let indices = HeaderIndex::record(src, res.headers);

        let head_bytes = src.split_to(body_offset).freeze();
        let fields: Vec<(Bytes, Bytes)> = indices
            .iter()
            .map(|index| (head_bytes.slice(index.name.0..index.name.1), head_bytes.slice(index.value.0..index.value.1)))
            .collect();

        let payload_size = parse_payload(&fields)?;

        let (mut connection_close, mut connection_keep_alive) = (false, false);
        for value in ResponseHeadParts::field_values(&fields, "connection") {
            connection_close |= contains_ignore_ascii_case(value, b"close");
            connection_keep_alive |= contains_ignore_ascii_case(value, b"keep-alive");
        }

        Ok(Some(ResponseHeadParts { status, version, fields, payload_size, connection_close, connection_keep_alive }))
    }
}

/// Byte ranges of a header's name and value within the source buffer.
#[derive(Debug, Clone, Copy)]
struct HeaderIndex {
    name: (usize, usize),
    value: (usize, usize),
}

impl HeaderIndex {
    fn record(bytes: &[u8], headers: &[httparse::Header<'_>]) -> Vec<HeaderIndex> {
        let bytes_ptr = bytes.as_ptr() as usize;
        headers
            .iter()
            .map(|header| {
                let name_start = header.name.as_ptr() as usize - bytes_ptr;
                let value_start = header.value.as_ptr() as usize - bytes_ptr;
                HeaderIndex {
                    name: (name_start, name_start + header.name.len()),
                    value: (value_start, value_start + header.value.len()),
                }
            })
            .collect()
    }
}

/// Body framing per [RFC 9112 Section 6.3](https://www.rfc-editor.org/rfc/rfc9112#section-6.3).
///
/// A `Transfer-Encoding` whose final coding is chunked overrides any
/// `Content-Length`; any other transfer coding, or no framing header at all,
/// leaves the body delimited by connection close.
fn parse_payload(fields: &[(Bytes, Bytes)]) -> Result<PayloadSize, ParseError> {
    if let Some(te_value) = ResponseHeadParts::field_values(fields, "transfer-encoding").last() {
        return Ok(if is_chunked(te_value) { PayloadSize::Chunked } else { PayloadSize::UntilClose });
    }

    let mut length = None;
    for cl_value in ResponseHeadParts::field_values(fields, "content-length") {
        let cl_str = std::str::from_utf8(cl_value).map_err(|_| ParseError::invalid_content_length("value is not utf-8"))?;
        let parsed =
            cl_str.trim().parse::<u64>().map_err(|_| ParseError::invalid_content_length(format!("value {cl_str} is not u64")))?;
        match length {
            Some(previous) if previous != parsed => {
                return Err(ParseError::invalid_content_length(format!("conflicting values {previous} and {parsed}")));
            }
            _ => length = Some(parsed),
        }
    }

    Ok(match length {
        Some(0) => PayloadSize::Empty,
        Some(n) => PayloadSize::Length(n),
        None => PayloadSize::UntilClose,
    })
}

/// Checks if chunked is the final coding of a Transfer-Encoding value.
fn is_chunked(value: &[u8]) -> bool {
    value.rsplit(|b| *b == b',').next().is_some_and(|coding| coding.trim_ascii().eq_ignore_ascii_case(b"chunked"))
}
