//! Per-stream state of a proxied exchange.
//!
//! A [`Downstream`] pairs one client-facing stream with one request/response
//! exchange on a backend HTTP/1.x connection. The client-facing multiplexer fills
//! in the request (line and headers, piece by piece), pushes it through the
//! attached [`Transport`], and calls [`Downstream::parse_http_response`] whenever
//! backend bytes arrive. Parsed response events come back through the
//! multiplexer's [`Upstream`] callbacks.
//!
//! # Components
//!
//! - [`IoControl`]: pause/resume of backend reads for several independent reasons
//! - [`BodyBuffer`]: response body awaiting the client, resumes reads once drained
//! - [`FlowControlWindow`]: signed receive credit of the stream
//! - [`ResponseDecoder`](crate::codec::ResponseDecoder): turns backend bytes into events
//!
//! # Re-entrancy
//!
//! Callbacks run while the response is being parsed and may swap or detach the
//! transport. Every attach and detach bumps a generation counter; the feed loop
//! stops as soon as it sees the counter change, so no event is ever parsed from
//! a transport the stream no longer owns.

mod body_buffer;
mod flow_control;
mod io_control;
mod transport;
mod upstream;

#[cfg(test)]
mod tests;

pub use body_buffer::{BodyBuffer, DrainListener};
pub use flow_control::FlowControlWindow;
pub use io_control::{IoControl, IoCtrlReason, ReadInterest};
pub use transport::Transport;
pub use upstream::{HeaderVerdict, Upstream};

use bytes::Bytes;
use http::{Method, Version};
use tokio_util::codec::Decoder;
use tracing::{debug, info, trace, warn};

use crate::codec::{ResponseDecoder, is_bodiless_status};
use crate::config::DownstreamConfig;
use crate::ensure;
use crate::protocol::{
    DownstreamError, HeaderError, Headers, PreconditionError, RequestHead, RequestState, ResponseEvent, ResponseState,
};

#[derive(Debug)]
pub struct Downstream<T> {
    stream_id: i32,
    priority: i32,
    /// id of the stream on a multiplexed backend, -1 when there is none
    downstream_stream_id: i32,
    config: DownstreamConfig,

    request_state: RequestState,
    request_method: Method,
    request_path: String,
    request_version: Version,
    request_headers: Headers,
    chunked_request: bool,
    request_connection_close: bool,
    expect_100_continue: bool,
    request_headers_pushed: bool,

    response_state: ResponseState,
    response_http_status: u16,
    response_version: Version,
    response_headers: Headers,
    chunked_response: bool,
    response_connection_close: bool,

    parser: ResponseDecoder,
    response_body_buf: Option<BodyBuffer>,
    recv_window: FlowControlWindow,
    io_control: IoControl,

    transport: Option<T>,
    transport_generation: u64,
}

impl<T: Transport> Downstream<T> {
    pub fn new(stream_id: i32, priority: i32) -> Self {
        Self::with_config(stream_id, priority, DownstreamConfig::default())
    }

    pub fn with_config(stream_id: i32, priority: i32, config: DownstreamConfig) -> Self {
        debug!(stream_id, priority, "create downstream");
        Self {
            stream_id,
            priority,
            downstream_stream_id: -1,
            config,
            request_state: RequestState::Initial,
            request_method: Method::GET,
            request_path: String::new(),
            request_version: Version::HTTP_11,
            request_headers: Headers::new(),
            chunked_request: false,
            request_connection_close: false,
            expect_100_continue: false,
            request_headers_pushed: false,
            response_state: ResponseState::Initial,
            response_http_status: 0,
            response_version: Version::HTTP_11,
            response_headers: Headers::new(),
            chunked_response: false,
            response_connection_close: false,
            parser: ResponseDecoder::new(&config),
            response_body_buf: None,
            recv_window: FlowControlWindow::default(),
            io_control: IoControl::new(),
            transport: None,
            transport_generation: 0,
        }
    }

    pub fn stream_id(&self) -> i32 {
        self.stream_id
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn set_priority(&mut self, priority: i32) {
        self.priority = priority;
    }

    pub fn downstream_stream_id(&self) -> i32 {
        self.downstream_stream_id
    }

    pub fn set_downstream_stream_id(&mut self, stream_id: i32) {
        self.downstream_stream_id = stream_id;
    }

    pub fn config(&self) -> &DownstreamConfig {
        &self.config
    }

    // transport

    /// Binds `transport`, or unbinds with `None`, and returns the one bound before.
    ///
    /// I/O control follows the transport's read handle. Request headers have to
    /// be pushed again on a newly attached transport.
    pub fn attach_transport(&mut self, transport: Option<T>) -> Option<T> {
        let previous = self.transport.take();
        self.io_control.set_handle(transport.as_ref().map(T::read_interest));
        self.transport = transport;
        self.request_headers_pushed = false;
        self.transport_generation = self.transport_generation.wrapping_add(1);
        debug!(stream_id = self.stream_id, attached = self.transport.is_some(), "transport changed");
        previous
    }

    pub fn detach_transport(&mut self) -> Option<T> {
        self.attach_transport(None)
    }

    pub fn transport(&self) -> Option<&T> {
        self.transport.as_ref()
    }

    pub fn transport_mut(&mut self) -> Option<&mut T> {
        self.transport.as_mut()
    }

    // read control

    pub fn io_control(&self) -> &IoControl {
        &self.io_control
    }

    pub fn pause_read(&mut self, reason: IoCtrlReason) {
        self.io_control.pause_read(reason);
    }

    pub fn resume_read(&mut self, reason: IoCtrlReason) -> bool {
        self.io_control.resume_read(reason)
    }

    pub fn force_resume_read(&mut self) {
        self.io_control.force_resume_read();
    }

    // request

    pub fn request_state(&self) -> RequestState {
        self.request_state
    }

    pub fn set_request_state(&mut self, state: RequestState) {
        self.request_state = state;
    }

    pub fn request_method(&self) -> &Method {
        &self.request_method
    }

    pub fn set_request_method(&mut self, method: Method) {
        self.request_method = method;
    }

    pub fn request_path(&self) -> &str {
        &self.request_path
    }

    pub fn set_request_path(&mut self, path: impl Into<String>) {
        self.request_path = path.into();
    }

    pub fn append_request_path(&mut self, data: &str) {
        self.request_path.push_str(data);
    }

    pub fn request_version(&self) -> Version {
        self.request_version
    }

    pub fn set_request_version(&mut self, version: Version) {
        self.request_version = version;
    }

    pub fn request_headers(&self) -> &Headers {
        &self.request_headers
    }

    /// Appends a complete request header field.
    pub fn add_request_header(&mut self, name: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        let field = self.request_headers.push(name, value);
        self.chunked_request |= field.matches("transfer-encoding", "chunked");
        self.expect_100_continue |= field.matches("expect", "100-continue");
    }

    pub fn begin_request_field(&mut self, name: impl Into<Vec<u8>>) {
        self.request_headers.begin_field(name);
    }

    pub fn append_request_key(&mut self, data: impl AsRef<[u8]>) -> Result<(), HeaderError> {
        self.request_headers.append_key(data)
    }

    pub fn append_request_value(&mut self, data: impl AsRef<[u8]>) -> Result<(), HeaderError> {
        self.request_headers.append_value(data)?;
        Ok(())
    }

    /// Sets the value of the field being built and re-evaluates the request
    /// flags against that field.
    pub fn finish_request_value(&mut self, value: impl Into<Vec<u8>>) -> Result<(), HeaderError> {
        let field = self.request_headers.finish_value(value)?;
        self.chunked_request |= field.matches("transfer-encoding", "chunked");
        self.expect_100_continue |= field.matches("expect", "100-continue");
        Ok(())
    }

    pub fn chunked_request(&self) -> bool {
        self.chunked_request
    }

    pub fn expect_100_continue(&self) -> bool {
        self.expect_100_continue
    }

    pub fn request_connection_close(&self) -> bool {
        self.request_connection_close
    }

    pub fn set_request_connection_close(&mut self, close: bool) {
        self.request_connection_close = close;
    }

    /// Hands the request line and headers to the transport.
    ///
    /// Requires an attached transport.
    pub fn push_request_headers(&mut self) -> Result<(), DownstreamError> {
        let Some(transport) = self.transport.as_mut() else {
            return Err(PreconditionError::no_transport("push_request_headers").into());
        };

        let head = RequestHead::new(
            &self.request_method,
            &self.request_path,
            self.request_version,
            &self.request_headers,
            self.chunked_request,
        );
        transport.push_request_headers(head)?;
        self.request_headers_pushed = true;
        trace!(stream_id = self.stream_id, method = %self.request_method, path = %self.request_path, "request headers pushed");
        Ok(())
    }

    /// Forwards request body bytes, returning how many the transport accepted.
    ///
    /// Without a transport the data is dropped and `Ok(0)` returned: an upload
    /// may race with a backend reconnect.
    pub fn push_upload_data_chunk(&mut self, data: &[u8]) -> Result<usize, DownstreamError> {
        let Some(transport) = self.transport.as_mut() else {
            warn!(stream_id = self.stream_id, len = data.len(), "no transport attached, upload data dropped");
            return Ok(0);
        };
        ensure!(self.request_headers_pushed, PreconditionError::HeadersNotPushed.into());

        Ok(transport.push_upload_data_chunk(data)?)
    }

    pub fn end_upload_data(&mut self) -> Result<(), DownstreamError> {
        let Some(transport) = self.transport.as_mut() else {
            return Err(PreconditionError::no_transport("end_upload_data").into());
        };
        ensure!(self.request_headers_pushed, PreconditionError::HeadersNotPushed.into());

        transport.end_upload_data()?;
        Ok(())
    }

    /// True when the transport has queued at least the configured high-water
    /// mark of outbound bytes.
    pub fn output_buffer_full(&self) -> bool {
        self.transport.as_ref().is_some_and(|transport| transport.output_len() >= self.config.output_upper_threshold())
    }

    // response

    pub fn response_state(&self) -> ResponseState {
        self.response_state
    }

    fn advance_response_state(&mut self, state: ResponseState) {
        if state > self.response_state {
            self.response_state = state;
        }
    }

    pub fn response_http_status(&self) -> u16 {
        self.response_http_status
    }

    pub fn set_response_http_status(&mut self, status: u16) {
        self.response_http_status = status;
    }

    pub fn response_version(&self) -> Version {
        self.response_version
    }

    pub fn response_headers(&self) -> &Headers {
        &self.response_headers
    }

    pub fn add_response_header(&mut self, name: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.response_headers.push(name, value);
        self.check_chunked_response();
    }

    pub fn begin_response_field(&mut self, name: impl Into<Vec<u8>>) {
        self.response_headers.begin_field(name);
        self.check_chunked_response();
    }

    pub fn append_response_key(&mut self, data: impl AsRef<[u8]>) -> Result<(), HeaderError> {
        self.response_headers.append_key(data)
    }

    pub fn append_response_value(&mut self, data: impl AsRef<[u8]>) -> Result<(), HeaderError> {
        self.response_headers.append_value(data)?;
        Ok(())
    }

    pub fn finish_response_value(&mut self, value: impl Into<Vec<u8>>) -> Result<(), HeaderError> {
        self.response_headers.finish_value(value)?;
        self.check_chunked_response();
        Ok(())
    }

    fn check_chunked_response(&mut self) {
        self.chunked_response |=
            self.response_headers.last().is_some_and(|field| field.matches("transfer-encoding", "chunked"));
    }

    pub fn chunked_response(&self) -> bool {
        self.chunked_response
    }

    pub fn set_chunked_response(&mut self, chunked: bool) {
        self.chunked_response = chunked;
    }

    pub fn response_connection_close(&self) -> bool {
        self.response_connection_close
    }

    pub fn set_response_connection_close(&mut self, close: bool) {
        self.response_connection_close = close;
    }

    /// A CONNECT request answered with a 2xx status.
    pub fn tunnel_established(&self) -> bool {
        self.request_method == Method::CONNECT && (200..300).contains(&self.response_http_status)
    }

    /// Parses every backend byte currently buffered by the transport.
    ///
    /// Returns the number of bytes consumed. A response that is valid so far but
    /// incomplete is not an error; its remaining bytes are parsed on the next call.
    pub fn parse_http_response<U>(&mut self, upstream: &mut U) -> Result<usize, DownstreamError>
    where
        U: Upstream<T> + ?Sized,
    {
        self.feed(upstream, false)
    }

    /// Like [`parse_http_response`](Self::parse_http_response), after the backend
    /// closed its side of the connection.
    ///
    /// Completes a body delimited by connection close; any other unfinished
    /// response is a parse error.
    pub fn parse_http_response_eof<U>(&mut self, upstream: &mut U) -> Result<usize, DownstreamError>
    where
        U: Upstream<T> + ?Sized,
    {
        self.feed(upstream, true)
    }

    fn feed<U>(&mut self, upstream: &mut U, eof: bool) -> Result<usize, DownstreamError>
    where
        U: Upstream<T> + ?Sized,
    {
        ensure!(self.transport.is_some(), PreconditionError::no_transport("parse_http_response").into());
        self.parser.set_head_request(self.request_method == Method::HEAD);

        let generation = self.transport_generation;
        let mut consumed = 0;
        loop {
            let Some(transport) = self.transport.as_mut() else {
                break;
            };
            let input = transport.input_mut();
            let before = input.len();
            let decoded = if eof { self.parser.decode_eof(input) } else { self.parser.decode(input) };
            consumed += before - input.len();

            let event = match decoded {
                Ok(Some(event)) => event,
                Ok(None) => break,
                Err(e) => {
                    info!(stream_id = self.stream_id, cause = %e, "failed to parse backend response");
                    return Err(e.into());
                }
            };

            if let Err(e) = self.dispatch(event, upstream) {
                info!(stream_id = self.stream_id, cause = %e, "stop parsing backend response");
                return Err(e);
            }

            if self.transport_generation != generation {
                debug!(stream_id = self.stream_id, "transport changed during callback, stop parsing");
                break;
            }
        }
        Ok(consumed)
    }

    fn dispatch<U>(&mut self, event: ResponseEvent, upstream: &mut U) -> Result<(), DownstreamError>
    where
        U: Upstream<T> + ?Sized,
    {
        match event {
            ResponseEvent::HeaderField(name) => {
                if self.response_headers.is_key_mode() {
                    self.append_response_key(&name)?;
                } else {
                    self.begin_response_field(&name[..]);
                }
            }

            ResponseEvent::HeaderValue(value) => {
                if self.response_headers.is_key_mode() {
                    self.finish_response_value(&value[..])?;
                } else {
                    self.append_response_value(&value)?;
                }
            }

            ResponseEvent::HeadersComplete(info) => {
                self.response_http_status = info.status;
                self.response_version = info.version;
                self.response_connection_close = !info.keep_alive;
                self.advance_response_state(ResponseState::HeaderComplete);
                trace!(stream_id = self.stream_id, status = info.status, "response headers complete");

                let verdict = upstream.on_downstream_header_complete(self)?;
                if info.is_interim() {
                    // the final response brings its own header block
                    self.response_headers.clear();
                    self.chunked_response = false;
                } else if verdict == HeaderVerdict::SkipBody || is_bodiless_status(self.response_http_status) {
                    // the callback may have rewritten the status
                    self.parser.skip_body();
                }
            }

            ResponseEvent::Body(data) => {
                if !self.response_state.is_complete() {
                    trace!(stream_id = self.stream_id, len = data.len(), "response body");
                    upstream.on_downstream_body(self, data)?;
                }
            }

            ResponseEvent::MessageComplete => {
                self.advance_response_state(ResponseState::MsgComplete);
                upstream.on_downstream_body_complete(self)?;
            }
        }
        Ok(())
    }

    // response body buffer

    /// Creates the response body buffer on first use.
    pub fn init_response_body_buf(&mut self) -> &mut BodyBuffer {
        self.response_body_buf.get_or_insert_with(BodyBuffer::new)
    }

    pub fn response_body_buf(&self) -> Option<&BodyBuffer> {
        self.response_body_buf.as_ref()
    }

    pub fn buffer_response_body(&mut self, data: &[u8]) {
        self.init_response_body_buf().push(data);
    }

    /// Takes up to `max` buffered body bytes. Emptying the buffer resumes reads
    /// held off for [`IoCtrlReason::NoBuffer`].
    pub fn consume_response_body(&mut self, max: usize) -> Bytes {
        match self.response_body_buf.as_mut() {
            Some(buf) => buf.consume(max, &mut self.io_control),
            None => Bytes::new(),
        }
    }

    pub fn response_body_buf_full(&self) -> bool {
        self.response_body_buf.as_ref().is_some_and(|buf| buf.len() >= self.config.output_upper_threshold())
    }

    // flow control

    pub fn recv_window_size(&self) -> i32 {
        self.recv_window.get()
    }

    pub fn set_recv_window_size(&mut self, size: i32) {
        self.recv_window.set(size);
    }

    pub fn inc_recv_window_size(&mut self, delta: i32) {
        self.recv_window.add(delta);
    }
}

impl<T> Drop for Downstream<T> {
    fn drop(&mut self) {
        debug!(stream_id = self.stream_id, attached = self.transport.is_some(), "delete downstream");
        self.io_control.set_handle(None);
        self.transport.take();
    }
}
