use bytes::Bytes;

use crate::downstream::Downstream;
use crate::protocol::AbortError;

/// What the client side wants done with the body of a response whose head it
/// has just been shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeaderVerdict {
    #[default]
    Continue,
    /// Drop the body and complete the message right away.
    SkipBody,
}

/// Client-facing multiplexer callbacks invoked while a backend response is parsed.
///
/// Every callback runs synchronously inside [`Downstream::parse_http_response`]
/// and receives the downstream mutably: it may rewrite response fields, pause
/// reads or even detach the transport. Returning an error aborts parsing and
/// surfaces as [`DownstreamError::Aborted`](crate::protocol::DownstreamError::Aborted).
pub trait Upstream<T> {
    fn on_downstream_header_complete(&mut self, downstream: &mut Downstream<T>) -> Result<HeaderVerdict, AbortError>;

    fn on_downstream_body(&mut self, downstream: &mut Downstream<T>, data: Bytes) -> Result<(), AbortError>;

    fn on_downstream_body_complete(&mut self, downstream: &mut Downstream<T>) -> Result<(), AbortError>;
}
