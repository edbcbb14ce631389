//! Per-stream tunables.
//!
//! Loading these from a file is the job of the embedding proxy; this crate only
//! defines the values and their defaults.

/// High-water mark of a transport's outbound queue, and of the response body
/// buffer, above which the multiplexer should stop feeding more data.
pub const DOWNSTREAM_OUTPUT_UPPER_THRES: usize = 64 * 1024;

/// Maximum number of header fields accepted in one backend response head.
pub const MAX_HEADER_NUM: usize = 100;

/// Maximum size in bytes of one backend response head.
pub const MAX_HEADER_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownstreamConfig {
    output_upper_threshold: usize,
    max_header_num: usize,
    max_header_bytes: usize,
}

impl Default for DownstreamConfig {
    fn default() -> Self {
        Self {
            output_upper_threshold: DOWNSTREAM_OUTPUT_UPPER_THRES,
            max_header_num: MAX_HEADER_NUM,
            max_header_bytes: MAX_HEADER_BYTES,
        }
    }
}

impl DownstreamConfig {
    pub fn output_upper_threshold(&self) -> usize {
        self.output_upper_threshold
    }

    pub fn max_header_num(&self) -> usize {
        self.max_header_num
    }

    pub fn max_header_bytes(&self) -> usize {
        self.max_header_bytes
    }

    #[must_use]
    pub fn with_output_upper_threshold(mut self, threshold: usize) -> Self {
        self.output_upper_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_max_header_num(mut self, max_header_num: usize) -> Self {
        self.max_header_num = max_header_num;
        self
    }

    #[must_use]
    pub fn with_max_header_bytes(mut self, max_header_bytes: usize) -> Self {
        self.max_header_bytes = max_header_bytes;
        self
    }
}
