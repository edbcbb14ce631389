use bytes::{Buf, Bytes};
use http::Version;

/// Represents a HTTP message that can either be a header or payload.
///
/// The generic parameter `T` represents the header type, while `Data` represents
/// the type of the payload data (defaults to `Bytes`).
#[derive(Debug)]
pub enum Message<T, Data: Buf = Bytes> {
    /// Contains the header information of type `T`
    Header(T),
    /// Contains a chunk of payload data or EOF marker
    Payload(PayloadItem<Data>),
}

/// Represents an item in the HTTP message payload stream.
///
/// This enum is used by the payload decoders to produce either data chunks
/// or signal the end of the payload stream (EOF).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadItem<Data: Buf = Bytes> {
    /// A chunk of payload data
    Chunk(Data),
    /// Marks the end of the payload stream
    Eof,
}

/// How the payload of a message is framed on the wire.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PayloadSize {
    /// Payload with known length in bytes
    Length(u64),
    /// Payload using chunked transfer encoding
    Chunked,
    /// Empty payload (no body)
    Empty,
    /// Payload runs until the sender closes the connection
    UntilClose,
}

impl PayloadSize {
    /// Returns true if the payload uses chunked transfer encoding
    #[inline]
    pub fn is_chunked(&self) -> bool {
        matches!(self, PayloadSize::Chunked)
    }

    /// Returns true if the payload is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, PayloadSize::Empty)
    }

    /// Returns true if only a connection close can terminate the payload
    #[inline]
    pub fn is_until_close(&self) -> bool {
        matches!(self, PayloadSize::UntilClose)
    }
}

impl<T> Message<T> {
    /// Returns true if this message contains payload data
    #[inline]
    pub fn is_payload(&self) -> bool {
        matches!(self, Message::Payload(_))
    }

    /// Returns true if this message contains header information
    #[inline]
    pub fn is_header(&self) -> bool {
        matches!(self, Message::Header(_))
    }
}

/// Converts bytes into a payload Message
impl<T> From<Bytes> for Message<T> {
    fn from(bytes: Bytes) -> Self {
        Self::Payload(PayloadItem::Chunk(bytes))
    }
}

impl<D: Buf> PayloadItem<D> {
    /// Returns true if this item represents the end of the payload stream
    #[inline]
    pub fn is_eof(&self) -> bool {
        matches!(self, PayloadItem::Eof)
    }

    /// Returns true if this item contains chunk data
    #[inline]
    pub fn is_chunk(&self) -> bool {
        matches!(self, PayloadItem::Chunk(_))
    }
}

impl PayloadItem {
    /// Returns a reference to the contained bytes if this is a Chunk
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            PayloadItem::Chunk(bytes) => Some(bytes),
            PayloadItem::Eof => None,
        }
    }

    /// Consumes the PayloadItem and returns the contained bytes if this is a Chunk
    pub fn into_bytes(self) -> Option<Bytes> {
        match self {
            PayloadItem::Chunk(bytes) => Some(bytes),
            PayloadItem::Eof => None,
        }
    }
}

/// Status line facts delivered with [`ResponseEvent::HeadersComplete`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseHeadInfo {
    /// Numeric status code as sent by the backend
    pub status: u16,
    pub version: Version,
    /// Whether the backend connection may be reused after this response
    pub keep_alive: bool,
}

impl ResponseHeadInfo {
    /// A 1xx status that announces a further header cycle.
    ///
    /// `101 Switching Protocols` is final: the connection changes protocol
    /// after it and no other status line follows.
    #[inline]
    pub fn is_interim(&self) -> bool {
        (100..200).contains(&self.status) && self.status != 101
    }
}

/// Events produced by the incremental response parser, in wire order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseEvent {
    /// Name bytes of a header field
    HeaderField(Bytes),
    /// Value bytes of the header field most recently named
    HeaderValue(Bytes),
    /// The status line and all header fields have been delivered
    HeadersComplete(ResponseHeadInfo),
    /// A slice of the decoded response body
    Body(Bytes),
    /// The response message is finished
    MessageComplete,
}

impl ResponseEvent {
    #[inline]
    pub fn is_body(&self) -> bool {
        matches!(self, ResponseEvent::Body(_))
    }
}
