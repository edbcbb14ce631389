//! Canned backend responses shared by the benchmarks.

/// A backend response and the read size it is fed to the decoder with.
#[derive(Debug, Copy, Clone)]
pub struct ResponseFixture {
    name: &'static str,
    content: &'static str,
    read_size: Option<usize>,
}

impl ResponseFixture {
    pub const fn new(name: &'static str, content: &'static str) -> Self {
        Self { name, content, read_size: None }
    }

    /// Same response, delivered `read_size` bytes at a time.
    #[must_use]
    pub const fn split(self, name: &'static str, read_size: usize) -> Self {
        Self { name, content: self.content, read_size: Some(read_size) }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn content(&self) -> &'static str {
        self.content
    }

    /// The pieces the response arrives in.
    pub fn reads(&self) -> std::slice::Chunks<'static, u8> {
        let bytes = self.content.as_bytes();
        bytes.chunks(self.read_size.unwrap_or(bytes.len()).max(1))
    }
}
