//! Core protocol types shared by the codec and downstream layers.
//!
//! # Architecture
//!
//! - **Header storage** ([`header`]): [`Headers`] and [`HeaderField`], an ordered
//!   store with incremental key/value append semantics
//!
//! - **Message Handling** ([`message`]): payload framing and parser events
//!   - [`Message`]: Represents either headers or payload chunks
//!   - [`PayloadItem`]: Handles individual payload chunks and EOF
//!   - [`PayloadSize`]: How a payload is delimited on the wire
//!   - [`ResponseEvent`]: Events produced while parsing a backend response
//!
//! - **Request view** ([`request`]): [`RequestHead`], the request line and
//!   headers handed to the backend transport
//!
//! - **Stream states** ([`state`]): [`RequestState`] and [`ResponseState`]
//!
//! - **Error Handling** ([`error`]):
//!   - [`DownstreamError`]: Top-level error type
//!   - [`ParseError`]: Backend response parsing errors
//!   - [`SendError`]: Transport sending errors
//!   - [`PreconditionError`] and [`HeaderError`]: API misuse
//!   - [`AbortError`]: Multiplexer callbacks stopping the parser

mod header;
pub use header::HeaderField;
pub use header::Headers;
pub(crate) use header::contains_ignore_ascii_case;

mod message;
pub use message::Message;
pub use message::PayloadItem;
pub use message::PayloadSize;
pub use message::ResponseEvent;
pub use message::ResponseHeadInfo;

mod request;
pub use request::RequestHead;

mod state;
pub use state::RequestState;
pub use state::ResponseState;

mod error;
pub use error::AbortError;
pub use error::DownstreamError;
pub use error::HeaderError;
pub use error::ParseError;
pub use error::PreconditionError;
pub use error::SendError;
