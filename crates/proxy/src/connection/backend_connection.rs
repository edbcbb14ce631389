use std::io;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::Encoder;
use tracing::{debug, trace};

use crate::codec::RequestEncoder;
use crate::downstream::{Downstream, ReadInterest, Transport, Upstream};
use crate::protocol::{DownstreamError, Message, PayloadItem, RequestHead, SendError};

const READ_BUF_CAPACITY: usize = 8 * 1024;

/// A backend HTTP/1.x connection over any tokio byte stream.
///
/// Outbound data is only queued by the [`Transport`] methods; it reaches the
/// backend on [`flush`](BackendConnection::flush). Inbound data is appended by
/// [`fill_read_buf`](BackendConnection::fill_read_buf) and parsed by the
/// attached [`Downstream`].
#[derive(Debug)]
pub struct BackendConnection<S> {
    io: S,
    read_buf: BytesMut,
    write_buf: BytesMut,
    encoder: RequestEncoder,
    read_interest: ReadInterest,
    eof: bool,
}

impl<S> BackendConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(io: S) -> Self {
        Self::with_capacity(io, READ_BUF_CAPACITY)
    }

    pub fn with_capacity(io: S, capacity: usize) -> Self {
        Self {
            io,
            read_buf: BytesMut::with_capacity(capacity),
            write_buf: BytesMut::new(),
            encoder: RequestEncoder::new(),
            read_interest: ReadInterest::new(),
            eof: false,
        }
    }

    /// Reads once from the backend, returning the number of bytes received.
    /// Zero means the backend closed its side.
    pub async fn fill_read_buf(&mut self) -> io::Result<usize> {
        if self.read_buf.capacity() - self.read_buf.len() < READ_BUF_CAPACITY / 2 {
            self.read_buf.reserve(READ_BUF_CAPACITY);
        }

        let n = self.io.read_buf(&mut self.read_buf).await?;
        if n == 0 {
            debug!("backend closed connection");
            self.eof = true;
        }
        trace!(n, buffered = self.read_buf.len(), "read from backend");
        Ok(n)
    }

    /// Writes every queued outbound byte to the backend.
    pub async fn flush(&mut self) -> io::Result<()> {
        if self.write_buf.is_empty() {
            return Ok(());
        }

        trace!(len = self.write_buf.len(), "flush to backend");
        self.io.write_all_buf(&mut self.write_buf).await?;
        self.io.flush().await
    }

    pub fn is_eof(&self) -> bool {
        self.eof
    }

    pub fn get_ref(&self) -> &S {
        &self.io
    }

    pub fn into_inner(self) -> S {
        self.io
    }
}

impl<S> Transport for BackendConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    fn read_interest(&self) -> ReadInterest {
        self.read_interest.clone()
    }

    fn input_mut(&mut self) -> &mut BytesMut {
        &mut self.read_buf
    }

    fn output_len(&self) -> usize {
        self.write_buf.len()
    }

    fn push_request_headers(&mut self, head: RequestHead<'_>) -> Result<(), SendError> {
        self.encoder.encode(Message::<_, Bytes>::Header(head), &mut self.write_buf)
    }

    fn push_upload_data_chunk(&mut self, data: &[u8]) -> Result<usize, SendError> {
        self.encoder.encode(Message::<RequestHead<'_>, _>::Payload(PayloadItem::Chunk(data)), &mut self.write_buf)?;
        Ok(data.len())
    }

    fn end_upload_data(&mut self) -> Result<(), SendError> {
        self.encoder.encode(Message::<RequestHead<'_>, Bytes>::Payload(PayloadItem::Eof), &mut self.write_buf)
    }
}

/// Why [`read_response`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// the response reached message completion
    Complete,
    /// reads are paused by the downstream's I/O control
    Paused,
    /// a callback detached the transport
    Detached,
    /// the backend closed before the response completed
    Closed,
}

/// Drives one downstream's backend exchange: flushes queued request bytes,
/// reads and parses the response until it completes or cannot progress.
///
/// Returns early, with [`ReadOutcome::Paused`], while reads are held off; call
/// again once they are resumed.
pub async fn read_response<S, U>(
    downstream: &mut Downstream<BackendConnection<S>>,
    upstream: &mut U,
) -> Result<ReadOutcome, DownstreamError>
where
    S: AsyncRead + AsyncWrite + Unpin,
    U: Upstream<BackendConnection<S>> + ?Sized,
{
    loop {
        let Some(connection) = downstream.transport_mut() else {
            return Ok(ReadOutcome::Detached);
        };
        connection.flush().await?;

        downstream.parse_http_response(upstream)?;
        if downstream.response_state().is_complete() {
            return Ok(ReadOutcome::Complete);
        }

        let Some(connection) = downstream.transport_mut() else {
            return Ok(ReadOutcome::Detached);
        };
        if !connection.read_interest.is_enabled() {
            return Ok(ReadOutcome::Paused);
        }

        if connection.fill_read_buf().await? == 0 {
            downstream.parse_http_response_eof(upstream)?;
            return Ok(if downstream.response_state().is_complete() { ReadOutcome::Complete } else { ReadOutcome::Closed });
        }
    }
}
