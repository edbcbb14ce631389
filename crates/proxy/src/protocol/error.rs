use std::io;
use thiserror::Error;

/// Top-level error surfaced by [`Downstream`](crate::downstream::Downstream) operations.
///
/// Every variant is reported to the caller (the multiplexer or the connection
/// manager), which owns retry, reconnection and stream-reset decisions.
#[derive(Debug, Error)]
pub enum DownstreamError {
    #[error("http parse error: {source}")]
    HttpParse {
        #[from]
        source: ParseError,
    },

    #[error("precondition violation: {source}")]
    Precondition {
        #[from]
        source: PreconditionError,
    },

    #[error("transport error: {source}")]
    Transport {
        #[from]
        source: SendError,
    },

    #[error("aborted by upstream: {source}")]
    Aborted {
        #[from]
        source: AbortError,
    },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl DownstreamError {
    /// Returns true if the backend response was malformed
    #[inline]
    pub fn is_parse_error(&self) -> bool {
        matches!(self, DownstreamError::HttpParse { .. })
    }

    /// Returns true if the caller broke the call contract
    #[inline]
    pub fn is_precondition(&self) -> bool {
        matches!(self, DownstreamError::Precondition { .. })
    }
}

impl From<HeaderError> for DownstreamError {
    fn from(e: HeaderError) -> Self {
        PreconditionError::from(e).into()
    }
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("header size too large, current: {current_size} exceed the limit {max_size}")]
    TooLargeHeader { current_size: usize, max_size: usize },

    #[error("header number exceed the limit {max_num}")]
    TooManyHeaders { max_num: usize },

    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    #[error("invalid http version: {0:?}")]
    InvalidVersion(Option<u8>),

    #[error("invalid content-length header: {reason}")]
    InvalidContentLength { reason: String },

    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("unexpected eof: {reason}")]
    UnexpectedEof { reason: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    pub fn too_large_header(current_size: usize, max_size: usize) -> Self {
        Self::TooLargeHeader { current_size, max_size }
    }

    pub fn too_many_headers(max_num: usize) -> Self {
        Self::TooManyHeaders { max_num }
    }

    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }

    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }

    pub fn invalid_content_length<S: ToString>(str: S) -> Self {
        Self::InvalidContentLength { reason: str.to_string() }
    }

    pub fn unexpected_eof<S: ToString>(str: S) -> Self {
        Self::UnexpectedEof { reason: str.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

#[derive(Error, Debug)]
pub enum SendError {
    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SendError {
    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

/// Misuse of the alternating key/value append mode of [`Headers`](crate::protocol::Headers).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderError {
    #[error("no header field has been started")]
    NoField,

    #[error("key mode is not active, the last field name is already finished")]
    KeyModeInactive,

    #[error("key mode is active, the last field has no value yet")]
    KeyModeActive,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PreconditionError {
    #[error("{operation} requires an attached transport")]
    NoTransport { operation: &'static str },

    #[error("request headers must be pushed before upload data")]
    HeadersNotPushed,

    #[error("header misuse: {source}")]
    Header {
        #[from]
        source: HeaderError,
    },
}

impl PreconditionError {
    pub fn no_transport(operation: &'static str) -> Self {
        Self::NoTransport { operation }
    }
}

/// Returned by an [`Upstream`](crate::downstream::Upstream) callback to stop response parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct AbortError {
    reason: String,
}

impl AbortError {
    pub fn new<S: ToString>(reason: S) -> Self {
        Self { reason: reason.to_string() }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}
