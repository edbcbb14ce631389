use bytes::BytesMut;

use crate::downstream::ReadInterest;
use crate::protocol::{RequestHead, SendError};

/// The backend connection as seen by a [`Downstream`].
///
/// Implementations own the byte streams; the downstream only queues outbound
/// data through them and parses whatever arrived inbound.
pub trait Transport {
    /// Handle the downstream's I/O control flips to pause and resume reads.
    fn read_interest(&self) -> ReadInterest;

    /// Bytes received from the backend and not yet parsed.
    fn input_mut(&mut self) -> &mut BytesMut;

    /// Number of bytes queued towards the backend.
    fn output_len(&self) -> usize;

    fn push_request_headers(&mut self, head: RequestHead<'_>) -> Result<(), SendError>;

    /// Queues request body bytes, returning how many were accepted.
    fn push_upload_data_chunk(&mut self, data: &[u8]) -> Result<usize, SendError>;

    fn end_upload_data(&mut self) -> Result<(), SendError>;
}
