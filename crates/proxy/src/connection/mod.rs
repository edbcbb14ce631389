//! Backend connection handling.
//!
//! - [`BackendConnection`]: a [`Transport`](crate::downstream::Transport) over any
//!   tokio `AsyncRead + AsyncWrite` stream, with its own inbound and outbound buffers
//! - [`read_response`]: drives flush, read and parse of one response until it
//!   completes, reads get paused, the transport is detached or the backend closes

mod backend_connection;

pub use backend_connection::BackendConnection;
pub use backend_connection::ReadOutcome;
pub use backend_connection::read_response;
