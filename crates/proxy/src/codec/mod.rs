//! HTTP/1.x codecs for the backend side of a proxied stream.
//!
//! Everything here is a plain [`tokio_util::codec`] encoder or decoder working on
//! [`BytesMut`](bytes::BytesMut) buffers, with no I/O of its own.
//!
//! # Architecture
//!
//! - Response handling:
//!   - [`ResponseDecoder`]: turns backend response bytes into [`ResponseEvent`](crate::protocol::ResponseEvent)s
//!   - Head parsing via [`HeaderDecoder`]
//!   - Body de-framing via [`PayloadDecoder`]
//!
//! - Request handling:
//!   - [`RequestEncoder`]: writes the request head and frames upload data
//!   - Head serialization via [`HeaderEncoder`]
//!   - Body framing via [`PayloadEncoder`]
//!
//! # Example
//!
//! ```
//! use micro_proxy::codec::ResponseDecoder;
//! use micro_proxy::config::DownstreamConfig;
//! use micro_proxy::protocol::ResponseEvent;
//! use tokio_util::codec::Decoder;
//! use bytes::BytesMut;
//!
//! let mut decoder = ResponseDecoder::new(&DownstreamConfig::default());
//! let mut buf = BytesMut::from("HTTP/1.1 204 No Content\r\n\r\n");
//!
//! let mut events = Vec::new();
//! while let Some(event) = decoder.decode(&mut buf).unwrap() {
//!     events.push(event);
//! }
//! assert_eq!(events.last(), Some(&ResponseEvent::MessageComplete));
//! ```

mod body;
mod header;
mod request_encoder;
mod response_decoder;

pub use body::{PayloadDecoder, PayloadEncoder};
pub use header::{HeaderDecoder, HeaderEncoder, ResponseHeadParts};
pub use request_encoder::RequestEncoder;
pub use response_decoder::{ResponseDecoder, is_bodiless_status};
