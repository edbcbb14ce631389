/// Receive credit of one stream, in bytes.
///
/// The value may go negative when more data was accounted than granted; the
/// multiplexer reads it and decides whether to keep pulling. Arithmetic saturates
/// at the `i32` bounds and is never clamped at zero.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FlowControlWindow {
    size: i32,
}

impl FlowControlWindow {
    pub fn new(size: i32) -> Self {
        Self { size }
    }

    #[inline]
    pub fn get(&self) -> i32 {
        self.size
    }

    #[inline]
    pub fn set(&mut self, size: i32) {
        self.size = size;
    }

    #[inline]
    pub fn add(&mut self, delta: i32) {
        self.size = self.size.saturating_add(delta);
    }
}
