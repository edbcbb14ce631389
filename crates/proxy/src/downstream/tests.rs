use std::cell::Cell;
use std::rc::Rc;

use bytes::BytesMut;

use super::*;
use crate::protocol::{AbortError, SendError};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[derive(Debug, Default)]
struct MockTransport {
    interest: ReadInterest,
    input: BytesMut,
    output_len: usize,
    heads: Vec<String>,
    uploaded: Vec<u8>,
    upload_ended: bool,
    dropped: Option<DropFlag>,
}

/// Raised when the owning transport is dropped.
#[derive(Debug)]
struct DropFlag(Rc<Cell<bool>>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.set(true);
    }
}

impl MockTransport {
    fn with_input(input: &[u8]) -> Self {
        Self { input: BytesMut::from(input), ..Default::default() }
    }
}

impl Transport for MockTransport {
    fn read_interest(&self) -> ReadInterest {
        self.interest.clone()
    }

    fn input_mut(&mut self) -> &mut BytesMut {
        &mut self.input
    }

    fn output_len(&self) -> usize {
        self.output_len
    }

    fn push_request_headers(&mut self, head: RequestHead<'_>) -> Result<(), SendError> {
        self.heads.push(format!("{} {} {}", head.method(), head.path(), head.headers().len()));
        Ok(())
    }

    fn push_upload_data_chunk(&mut self, data: &[u8]) -> Result<usize, SendError> {
        self.uploaded.extend_from_slice(data);
        Ok(data.len())
    }

    fn end_upload_data(&mut self) -> Result<(), SendError> {
        self.upload_ended = true;
        Ok(())
    }
}

/// Records callbacks; adjacent body deliveries are logged as one `body` entry.
#[derive(Debug, Default)]
struct Recorder {
    events: Vec<String>,
    body: Vec<u8>,
    headers_seen: Vec<Vec<(String, String)>>,
    verdict: HeaderVerdict,
    rewrite_status: Option<u16>,
    abort_on_header: bool,
    detach_on_header: bool,
    detached: Option<MockTransport>,
}

impl Upstream<MockTransport> for Recorder {
    fn on_downstream_header_complete(
        &mut self,
        downstream: &mut Downstream<MockTransport>,
    ) -> Result<HeaderVerdict, AbortError> {
        self.events.push(format!("header {}", downstream.response_http_status()));
        self.headers_seen.push(
            downstream
                .response_headers()
                .iter()
                .map(|f| (String::from_utf8_lossy(f.name()).into_owned(), String::from_utf8_lossy(f.value()).into_owned()))
                .collect(),
        );
        if let Some(status) = self.rewrite_status {
            downstream.set_response_http_status(status);
        }
        if self.abort_on_header {
            return Err(AbortError::new("client went away"));
        }
        if self.detach_on_header {
            self.detached = downstream.detach_transport();
        }
        Ok(self.verdict)
    }

    fn on_downstream_body(&mut self, _downstream: &mut Downstream<MockTransport>, data: Bytes) -> Result<(), AbortError> {
        if self.events.last().map(String::as_str) != Some("body") {
            self.events.push("body".to_string());
        }
        self.body.extend_from_slice(&data);
        Ok(())
    }

    fn on_downstream_body_complete(&mut self, _downstream: &mut Downstream<MockTransport>) -> Result<(), AbortError> {
        self.events.push("complete".to_string());
        Ok(())
    }
}

fn attached(input: &[u8]) -> Downstream<MockTransport> {
    let mut downstream = Downstream::new(1, 0);
    downstream.attach_transport(Some(MockTransport::with_input(input)));
    downstream
}

#[test]
fn request_headers_keep_order_and_derive_flags() {
    let mut downstream = Downstream::<MockTransport>::new(1, 0);

    downstream.begin_request_field("Transfer-");
    downstream.append_request_key("Encoding").unwrap();
    downstream.finish_request_value("gzip").unwrap();
    // flags only look at finished values
    downstream.append_request_value(", chunked").unwrap();
    assert!(!downstream.chunked_request());

    downstream.begin_request_field("transfer-encoding");
    downstream.finish_request_value("Chunked").unwrap();
    assert!(downstream.chunked_request());

    downstream.add_request_header("Expect", "100-Continue");
    assert!(downstream.expect_100_continue());

    assert_eq!(downstream.append_request_key("x"), Err(HeaderError::KeyModeInactive));
    downstream.begin_request_field("Host");
    assert_eq!(downstream.append_request_value("x"), Err(HeaderError::KeyModeActive));

    let names: Vec<_> = downstream.request_headers().iter().map(|f| f.name()).collect();
    assert_eq!(names, vec![&b"Transfer-Encoding"[..], b"transfer-encoding", b"Expect", b"Host"]);
    assert_eq!(downstream.request_headers().get("transfer-encoding").map(|f| f.value()), Some(&b"gzip, chunked"[..]));
}

#[test]
fn push_without_transport() {
    init_tracing();
    let mut downstream = Downstream::<MockTransport>::new(3, 0);

    let err = downstream.push_request_headers().unwrap_err();
    assert!(err.is_precondition());
    assert!(downstream.end_upload_data().unwrap_err().is_precondition());

    // an upload racing a reconnect is dropped, not failed
    assert_eq!(downstream.push_upload_data_chunk(b"data").unwrap(), 0);
}

#[test]
fn upload_requires_pushed_headers() {
    let mut downstream = attached(b"");
    downstream.set_request_method(Method::POST);
    downstream.set_request_path("/up");
    downstream.append_request_path("load");
    downstream.add_request_header("Content-Length", "4");

    assert!(matches!(
        downstream.push_upload_data_chunk(b"data"),
        Err(DownstreamError::Precondition { source: PreconditionError::HeadersNotPushed })
    ));

    downstream.push_request_headers().unwrap();
    assert_eq!(downstream.push_upload_data_chunk(b"data").unwrap(), 4);
    downstream.end_upload_data().unwrap();

    let transport = downstream.detach_transport().unwrap();
    assert_eq!(transport.heads, vec!["POST /upload 1".to_string()]);
    assert_eq!(transport.uploaded, b"data");
    assert!(transport.upload_ended);

    // a fresh transport needs the headers again
    downstream.attach_transport(Some(MockTransport::default()));
    assert!(downstream.end_upload_data().unwrap_err().is_precondition());
}

#[test]
fn full_response_with_body() {
    init_tracing();
    let input = "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhello\r\n0\r\n\r\n";
    let mut downstream = attached(input.as_bytes());
    let mut recorder = Recorder::default();

    let consumed = downstream.parse_http_response(&mut recorder).unwrap();
    assert_eq!(consumed, input.len());
    assert_eq!(recorder.events, vec!["header 200", "body", "complete"]);
    assert_eq!(recorder.body, b"hello");
    assert_eq!(downstream.response_state(), ResponseState::MsgComplete);
    assert!(downstream.chunked_response());
    assert!(!downstream.response_connection_close());
    assert_eq!(downstream.response_version(), Version::HTTP_11);
    assert_eq!(
        recorder.headers_seen[0],
        vec![
            ("Content-Type".to_string(), "text/plain".to_string()),
            ("Transfer-Encoding".to_string(), "chunked".to_string())
        ]
    );
}

#[test]
fn bodiless_responses_never_deliver_body() {
    for (method, status_line) in
        [(Method::GET, "204 No Content"), (Method::GET, "304 Not Modified"), (Method::HEAD, "200 OK")]
    {
        let input = format!("HTTP/1.1 {status_line}\r\nContent-Length: 5\r\n\r\nhello");
        let mut downstream = attached(input.as_bytes());
        downstream.set_request_method(method);
        let mut recorder = Recorder::default();

        downstream.parse_http_response(&mut recorder).unwrap();

        assert_eq!(recorder.events.len(), 2, "{status_line}");
        assert_eq!(recorder.events[1], "complete");
        assert!(recorder.body.is_empty());
        assert_eq!(downstream.response_state(), ResponseState::MsgComplete);
    }
}

#[test]
fn informational_response_starts_new_header_cycle() {
    let input = "HTTP/1.1 100 Continue\r\nX-Interim: 1\r\n\r\nHTTP/1.1 201 Created\r\nContent-Length: 2\r\n\r\nok";
    let mut downstream = attached(input.as_bytes());
    let mut recorder = Recorder::default();

    downstream.parse_http_response(&mut recorder).unwrap();

    assert_eq!(recorder.events, vec!["header 100", "header 201", "body", "complete"]);
    assert_eq!(recorder.headers_seen[0], vec![("X-Interim".to_string(), "1".to_string())]);
    let names: Vec<_> = downstream.response_headers().iter().map(|f| f.name()).collect();
    assert_eq!(names, vec![&b"Content-Length"[..]]);
    assert_eq!(downstream.response_http_status(), 201);
}

#[test]
fn header_bytes_are_stored_unchanged() {
    let mut downstream = attached(b"HTTP/1.1 200 OK\r\nX-Name: caf\xE9\r\nContent-Length: 0\r\n\r\n");
    let mut recorder = Recorder::default();

    downstream.parse_http_response(&mut recorder).unwrap();

    assert_eq!(recorder.events, vec!["header 200", "complete"]);
    let field = downstream.response_headers().get("x-name").unwrap();
    assert_eq!(field.value(), b"caf\xE9");
    assert_eq!(field.value_str(), None);
}

#[test]
fn chunk_size_line_without_digits_is_a_parse_error() {
    for input in [
        &b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n\r\n\r\nSMUGGLED"[..],
        b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n;ext\r\n\r\n",
    ] {
        let mut downstream = attached(input);
        let mut recorder = Recorder::default();

        let err = downstream.parse_http_response(&mut recorder).unwrap_err();
        assert!(err.is_parse_error());
        assert_eq!(recorder.events, vec!["header 200"]);
        assert_ne!(downstream.response_state(), ResponseState::MsgComplete);
    }
}

#[test]
fn rewritten_bodiless_status_skips_body() {
    let mut downstream = attached(b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhello");
    let mut recorder = Recorder { rewrite_status: Some(304), ..Default::default() };

    downstream.parse_http_response(&mut recorder).unwrap();

    assert_eq!(recorder.events, vec!["header 200", "complete"]);
    assert!(recorder.body.is_empty());
    assert_eq!(downstream.response_http_status(), 304);
    assert_eq!(downstream.response_state(), ResponseState::MsgComplete);
}

#[test]
fn byte_at_a_time_matches_single_feed() {
    let input = b"HTTP/1.1 200 OK\r\nContent-Length: 11\r\nServer: test\r\n\r\nhello world";

    let mut whole = attached(input);
    let mut expected = Recorder::default();
    whole.parse_http_response(&mut expected).unwrap();

    let mut downstream = attached(b"");
    let mut recorder = Recorder::default();
    for byte in input {
        downstream.transport_mut().unwrap().input.extend_from_slice(&[*byte]);
        downstream.parse_http_response(&mut recorder).unwrap();
    }

    assert_eq!(recorder.events, expected.events);
    assert_eq!(recorder.body, expected.body);
    assert_eq!(recorder.headers_seen, expected.headers_seen);
    assert_eq!(downstream.response_headers(), whole.response_headers());
}

#[test]
fn partial_input_is_not_an_error() {
    let mut downstream = attached(b"HTTP/1.1 200 OK\r\nContent-Le");
    let mut recorder = Recorder::default();

    assert_eq!(downstream.parse_http_response(&mut recorder).unwrap(), 0);
    assert!(recorder.events.is_empty());
    assert_eq!(downstream.response_state(), ResponseState::Initial);
}

#[test]
fn malformed_response_is_a_parse_error() {
    let mut downstream = attached(b"HTTP/1.1 OK 200\r\n\r\n");
    let err = downstream.parse_http_response(&mut Recorder::default()).unwrap_err();
    assert!(err.is_parse_error());

    let mut downstream = Downstream::<MockTransport>::new(1, 0);
    let err = downstream.parse_http_response(&mut Recorder::default()).unwrap_err();
    assert!(err.is_precondition());
}

#[test]
fn callback_abort_stops_parsing() {
    let mut downstream = attached(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok");
    let mut recorder = Recorder { abort_on_header: true, ..Default::default() };

    let err = downstream.parse_http_response(&mut recorder).unwrap_err();
    assert!(matches!(err, DownstreamError::Aborted { .. }));
    assert!(!err.is_parse_error());
    assert_eq!(recorder.events, vec!["header 200"]);
}

#[test]
fn detach_during_callback_stops_feed() {
    init_tracing();
    let mut downstream = attached(b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhello");
    let mut recorder = Recorder { detach_on_header: true, ..Default::default() };

    downstream.parse_http_response(&mut recorder).unwrap();

    assert_eq!(recorder.events, vec!["header 200"]);
    assert!(downstream.transport().is_none());
    assert!(downstream.io_control().handle().is_none());
    // the unparsed body stays with the transport that was handed back
    assert_eq!(&recorder.detached.unwrap().input[..], b"hello");
}

#[test]
fn skip_body_verdict() {
    let mut downstream = attached(b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhello");
    let mut recorder = Recorder { verdict: HeaderVerdict::SkipBody, ..Default::default() };

    downstream.parse_http_response(&mut recorder).unwrap();
    assert_eq!(recorder.events, vec!["header 200", "complete"]);
}

#[test]
fn close_delimited_response_completes_at_eof() {
    let mut downstream = attached(b"HTTP/1.0 200 OK\r\n\r\nabc");
    let mut recorder = Recorder::default();

    downstream.parse_http_response(&mut recorder).unwrap();
    assert_eq!(recorder.events, vec!["header 200", "body"]);
    assert!(downstream.response_connection_close());

    downstream.parse_http_response_eof(&mut recorder).unwrap();
    assert_eq!(recorder.events, vec!["header 200", "body", "complete"]);
    assert_eq!(downstream.response_state(), ResponseState::MsgComplete);
}

#[test]
fn truncated_response_fails_at_eof() {
    let mut downstream = attached(b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhel");
    let mut recorder = Recorder::default();

    downstream.parse_http_response(&mut recorder).unwrap();
    assert!(downstream.parse_http_response_eof(&mut recorder).unwrap_err().is_parse_error());
}

#[test]
fn tunnel_established_only_for_connect_2xx() {
    let mut downstream = Downstream::<MockTransport>::new(1, 0);
    downstream.set_request_method(Method::CONNECT);

    for (status, expected) in [(199, false), (200, true), (299, true), (300, false)] {
        downstream.set_response_http_status(status);
        assert_eq!(downstream.tunnel_established(), expected, "status {status}");
    }

    downstream.set_request_method(Method::GET);
    downstream.set_response_http_status(200);
    assert!(!downstream.tunnel_established());
}

#[test]
fn output_buffer_full_at_threshold() {
    let config = DownstreamConfig::default().with_output_upper_threshold(100);
    let mut downstream = Downstream::with_config(1, 0, config);
    assert!(!downstream.output_buffer_full());

    downstream.attach_transport(Some(MockTransport { output_len: 99, ..Default::default() }));
    assert!(!downstream.output_buffer_full());

    downstream.transport_mut().unwrap().output_len = 100;
    assert!(downstream.output_buffer_full());
}

#[test]
fn draining_body_buffer_resumes_read() {
    let config = DownstreamConfig::default().with_output_upper_threshold(4);
    let mut downstream = Downstream::with_config(1, 0, config);
    downstream.attach_transport(Some(MockTransport::default()));
    let interest = downstream.transport().unwrap().read_interest();

    downstream.buffer_response_body(b"hello");
    assert!(downstream.response_body_buf_full());
    downstream.pause_read(IoCtrlReason::NoBuffer);
    assert!(!interest.is_enabled());

    assert_eq!(&downstream.consume_response_body(3)[..], b"hel");
    assert!(!interest.is_enabled());
    assert_eq!(&downstream.consume_response_body(3)[..], b"lo");
    assert!(interest.is_enabled());
    assert!(!downstream.response_body_buf_full());

    // a drain does not override another reason
    downstream.buffer_response_body(b"x");
    downstream.pause_read(IoCtrlReason::NoBuffer);
    downstream.pause_read(IoCtrlReason::FlowControl);
    downstream.consume_response_body(1);
    assert!(!interest.is_enabled());
    assert!(downstream.resume_read(IoCtrlReason::FlowControl));
    assert!(interest.is_enabled());
}

#[test]
fn recv_window_is_not_clamped() {
    let mut downstream = Downstream::<MockTransport>::new(1, 0);
    assert_eq!(downstream.recv_window_size(), 0);

    downstream.set_recv_window_size(1000);
    downstream.inc_recv_window_size(-1500);
    assert_eq!(downstream.recv_window_size(), -500);
}

#[test]
fn drop_releases_transport() {
    let dropped = Rc::new(Cell::new(false));
    let mut downstream = Downstream::new(7, 0);
    downstream.attach_transport(Some(MockTransport {
        dropped: Some(DropFlag(Rc::clone(&dropped))),
        ..Default::default()
    }));
    assert_eq!(downstream.downstream_stream_id(), -1);

    drop(downstream);
    assert!(dropped.get());
}

#[test]
fn attach_returns_previous_transport() {
    let mut downstream = attached(b"first");
    let previous = downstream.attach_transport(Some(MockTransport::with_input(b"second"))).unwrap();
    assert_eq!(&previous.input[..], b"first");
    assert_eq!(&downstream.transport().unwrap().input[..], b"second");
}
