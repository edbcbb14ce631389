//! Borrowed view of a request line plus headers.
//!
//! A [`RequestHead`] is what a [`Downstream`](crate::downstream::Downstream) hands
//! to its transport when the request headers are pushed to the backend. It borrows
//! the downstream's own storage, so no header is copied until it is encoded.

use http::{Method, Version};

use crate::protocol::{Headers, PayloadSize, SendError};

#[derive(Debug, Clone, Copy)]
pub struct RequestHead<'a> {
    method: &'a Method,
    path: &'a str,
    version: Version,
    headers: &'a Headers,
    chunked: bool,
}

impl<'a> RequestHead<'a> {
    pub fn new(method: &'a Method, path: &'a str, version: Version, headers: &'a Headers, chunked: bool) -> Self {
        Self { method, path, version, headers, chunked }
    }

    pub fn method(&self) -> &'a Method {
        self.method
    }

    pub fn path(&self) -> &'a str {
        self.path
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn headers(&self) -> &'a Headers {
        self.headers
    }

    /// Whether the request body is sent with chunked transfer encoding.
    pub fn is_chunked(&self) -> bool {
        self.chunked
    }

    /// Decides how upload data following this head is framed.
    ///
    /// Chunked wins over `Content-Length`; without either the upload is passed
    /// through untouched until the stream ends (tunnels, bodyless requests).
    pub fn payload_size(&self) -> Result<PayloadSize, SendError> {
        if self.chunked {
            return Ok(PayloadSize::Chunked);
        }

        match self.headers.get("content-length") {
            Some(field) => {
                let length = field
                    .value_str()
                    .and_then(|value| value.trim().parse::<u64>().ok())
                    .ok_or_else(|| {
                        SendError::invalid_body(format!(
                            "content-length {} is not u64",
                            String::from_utf8_lossy(field.value())
                        ))
                    })?;
                if length == 0 { Ok(PayloadSize::Empty) } else { Ok(PayloadSize::Length(length)) }
            }
            None => Ok(PayloadSize::UntilClose),
        }
    }
}
