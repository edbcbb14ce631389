//! The per-stream core of a multiplexing HTTP reverse proxy.
//!
//! A client-facing multiplexer (HTTP/2, SPDY, ...) admits many concurrent streams
//! on one connection, while each backend connection speaks HTTP/1.x and carries
//! one exchange at a time. This crate provides the object that bridges the two
//! for a single stream: the [`Downstream`](downstream::Downstream).
//!
//! A downstream collects the request as the multiplexer receives it, pushes it to
//! an attached backend [`Transport`](downstream::Transport), parses the backend
//! response incrementally and reports every parsed step back to the multiplexer
//! through [`Upstream`](downstream::Upstream) callbacks. Along the way it tracks
//! the stream's flow-control credit and holds backend reads off while the client
//! side cannot keep up.
//!
//! # Example
//!
//! ```no_run
//! use bytes::Bytes;
//! use micro_proxy::connection::{BackendConnection, read_response};
//! use micro_proxy::downstream::{Downstream, HeaderVerdict, Upstream};
//! use micro_proxy::protocol::AbortError;
//! use tokio::net::TcpStream;
//! use tracing::info;
//!
//! struct Printer;
//!
//! impl Upstream<BackendConnection<TcpStream>> for Printer {
//!     fn on_downstream_header_complete(
//!         &mut self,
//!         downstream: &mut Downstream<BackendConnection<TcpStream>>,
//!     ) -> Result<HeaderVerdict, AbortError> {
//!         info!(status = downstream.response_http_status(), "response head");
//!         Ok(HeaderVerdict::Continue)
//!     }
//!
//!     fn on_downstream_body(
//!         &mut self,
//!         _downstream: &mut Downstream<BackendConnection<TcpStream>>,
//!         data: Bytes,
//!     ) -> Result<(), AbortError> {
//!         info!(len = data.len(), "response body");
//!         Ok(())
//!     }
//!
//!     fn on_downstream_body_complete(
//!         &mut self,
//!         _downstream: &mut Downstream<BackendConnection<TcpStream>>,
//!     ) -> Result<(), AbortError> {
//!         info!("response complete");
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let stream = TcpStream::connect("127.0.0.1:8080").await?;
//!
//!     let mut downstream = Downstream::new(1, 0);
//!     downstream.set_request_path("/");
//!     downstream.add_request_header("Host", "127.0.0.1:8080");
//!     downstream.attach_transport(Some(BackendConnection::new(stream)));
//!     downstream.push_request_headers()?;
//!
//!     let outcome = read_response(&mut downstream, &mut Printer).await?;
//!     info!(?outcome, "exchange finished");
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - [`downstream`]: the per-stream object and its parts (I/O control, body
//!   buffer, flow-control window) plus the [`Upstream`](downstream::Upstream)
//!   and [`Transport`](downstream::Transport) seams
//! - [`codec`]: response decoder and request encoder, built on `httparse` and
//!   `tokio_util::codec`
//! - [`connection`]: a tokio backed transport and a driver loop for it
//! - [`protocol`]: header storage, stream states, parser events and errors
//! - [`config`]: per-stream limits and thresholds
//!
//! # Error Handling
//!
//! - [`protocol::DownstreamError`]: Top-level error type
//! - [`protocol::ParseError`]: malformed backend responses, fatal to the stream
//! - [`protocol::PreconditionError`]: calls made out of order or without a transport
//! - [`protocol::SendError`]: request encoding failures
//!
//! Nothing here retries: every failure goes back to the caller, which decides
//! whether to reset the stream or reconnect.

pub mod codec;
pub mod config;
pub mod connection;
pub mod downstream;
pub mod protocol;

mod utils;
pub(crate) use utils::ensure;
