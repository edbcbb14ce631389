use crate::codec::body::PayloadEncoder;
use crate::codec::header::HeaderEncoder;
use crate::protocol::{Message, RequestHead, SendError};
use bytes::{Buf, BytesMut};
use std::io;
use std::io::ErrorKind;
use tokio_util::codec::Encoder;
use tracing::error;

/// Serializes one request towards the backend: a head, then upload data framed
/// the way the head announced it.
#[derive(Debug, Default)]
pub struct RequestEncoder {
    header_encoder: HeaderEncoder,
    payload_encoder: Option<PayloadEncoder>,
}

impl RequestEncoder {
    pub fn new() -> Self {
        Default::default()
    }

    /// True while a head was written and its body has not been finished yet.
    pub fn is_sending_body(&self) -> bool {
        self.payload_encoder.is_some()
    }
}

impl<D: Buf> Encoder<Message<RequestHead<'_>, D>> for RequestEncoder {
    type Error = SendError;

    fn encode(&mut self, item: Message<RequestHead<'_>, D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            Message::Header(head) => {
                if self.payload_encoder.is_some() {
                    error!("expect upload data but receive request head");
                    return Err(io::Error::from(ErrorKind::InvalidInput).into());
                }

                self.payload_encoder = Some(head.payload_size()?.into());
                self.header_encoder.encode(head, dst)
            }

            Message::Payload(payload_item) => {
                let Some(payload_encoder) = &mut self.payload_encoder else {
                    error!("expect request head but receive upload data");
                    return Err(io::Error::from(ErrorKind::InvalidInput).into());
                };

                let result = payload_encoder.encode(payload_item, dst);

                if payload_encoder.is_finish() {
                    self.payload_encoder.take();
                }

                result
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Headers, PayloadItem};
    use bytes::Bytes;
    use http::{Method, Version};

    type Item<'a> = Message<RequestHead<'a>, Bytes>;

    #[test]
    fn chunked_upload() {
        let mut headers = Headers::new();
        headers.push("Host", "backend");
        headers.push("Transfer-Encoding", "chunked");
        let head = RequestHead::new(&Method::POST, "/upload", Version::HTTP_11, &headers, true);

        let mut encoder = RequestEncoder::new();
        let mut dst = BytesMut::new();
        encoder.encode(Item::Header(head), &mut dst).unwrap();
        encoder.encode(Item::Payload(PayloadItem::Chunk(Bytes::from_static(b"hello"))), &mut dst).unwrap();
        assert!(encoder.is_sending_body());
        encoder.encode(Item::Payload(PayloadItem::Eof), &mut dst).unwrap();
        assert!(!encoder.is_sending_body());

        assert_eq!(
            &dst[..],
            &b"POST /upload HTTP/1.1\r\nHost: backend\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhello\r\n0\r\n\r\n"[..]
        );
    }

    #[test]
    fn content_length_upload_rejects_overflow() {
        let mut headers = Headers::new();
        headers.push("Content-Length", "3");
        let head = RequestHead::new(&Method::PUT, "/", Version::HTTP_11, &headers, false);

        let mut encoder = RequestEncoder::new();
        let mut dst = BytesMut::new();
        encoder.encode(Item::Header(head), &mut dst).unwrap();
        assert!(encoder.encode(Item::Payload(PayloadItem::Chunk(Bytes::from_static(b"toolong"))), &mut dst).is_err());
    }

    #[test]
    fn payload_before_head() {
        let mut encoder = RequestEncoder::new();
        let result = encoder.encode(Item::Payload(PayloadItem::Chunk(Bytes::from_static(b"x"))), &mut BytesMut::new());
        assert!(matches!(result, Err(SendError::Io { .. })));
    }

    #[test]
    fn second_head_while_sending_body() {
        let headers = Headers::new();
        let mut encoder = RequestEncoder::new();
        let mut dst = BytesMut::new();
        let head = RequestHead::new(&Method::CONNECT, "backend:443", Version::HTTP_11, &headers, false);

        encoder.encode(Item::Header(head), &mut dst).unwrap();
        encoder.encode(Item::Payload(PayloadItem::Chunk(Bytes::from_static(b"\x16\x03\x01"))), &mut dst).unwrap();
        assert!(encoder.encode(Item::Header(head), &mut dst).is_err());
        assert!(dst.ends_with(b"\r\n\r\n\x16\x03\x01"));
    }
}
