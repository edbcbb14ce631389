//! HTTP head processing for the backend side of a stream.
//!
//! - [`HeaderDecoder`]: parses a backend response status line and header block
//!   into [`ResponseHeadParts`], enforcing header count and size limits
//! - [`HeaderEncoder`]: serializes a [`RequestHead`](crate::protocol::RequestHead)
//!   into a request line plus header block

mod header_decoder;
mod header_encoder;

pub use header_decoder::HeaderDecoder;
pub use header_decoder::ResponseHeadParts;
pub use header_encoder::HeaderEncoder;
