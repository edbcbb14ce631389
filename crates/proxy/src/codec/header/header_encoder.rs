//! Request head encoder.
//!
//! Writes the request line followed by every stored header field in its original
//! order, duplicates included. No field is added, merged or rewritten here.

use crate::protocol::{RequestHead, SendError};

use bytes::{BufMut, BytesMut};

use http::Version;
use std::io;
use std::io::ErrorKind;
use tokio_util::codec::Encoder;
use tracing::error;

/// Initial buffer size allocated for header serialization
const INIT_HEADER_SIZE: usize = 4 * 1024;

#[derive(Debug, Default, Clone, Copy)]
pub struct HeaderEncoder;

impl Encoder<RequestHead<'_>> for HeaderEncoder {
    type Error = SendError;

    fn encode(&mut self, head: RequestHead<'_>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let version: &[u8] = match head.version() {
            Version::HTTP_11 => b"HTTP/1.1",
            Version::HTTP_10 => b"HTTP/1.0",
            v => {
                error!(http_version = ?v, "unsupported http version for backend request");
                return Err(io::Error::from(ErrorKind::Unsupported).into());
            }
        };

        dst.reserve(INIT_HEADER_SIZE);
        dst.put_slice(head.method().as_str().as_bytes());
        dst.put_u8(b' ');
        dst.put_slice(head.path().as_bytes());
        dst.put_u8(b' ');
        dst.put_slice(version);
        dst.put_slice(b"\r\n");

        for field in head.headers() {
            dst.put_slice(field.name());
            dst.put_slice(b": ");
            dst.put_slice(field.value());
            dst.put_slice(b"\r\n");
        }
        dst.put_slice(b"\r\n");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Headers;
    use http::Method;

    #[test]
    fn writes_fields_in_order() {
        let mut headers = Headers::new();
        headers.push("Host", "backend");
        headers.push("Accept", "text/html");
        headers.push("Accept", "*/*");

        let head = RequestHead::new(&Method::GET, "/a?b=c", Version::HTTP_11, &headers, false);
        let mut dst = BytesMut::new();
        HeaderEncoder.encode(head, &mut dst).unwrap();

        assert_eq!(&dst[..], &b"GET /a?b=c HTTP/1.1\r\nHost: backend\r\nAccept: text/html\r\nAccept: */*\r\n\r\n"[..]);
    }

    #[test]
    fn rejects_h2() {
        let headers = Headers::new();
        let head = RequestHead::new(&Method::GET, "/", Version::HTTP_2, &headers, false);
        assert!(HeaderEncoder.encode(head, &mut BytesMut::new()).is_err());
    }
}
