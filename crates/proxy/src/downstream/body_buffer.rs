use bytes::{Bytes, BytesMut};
use tracing::trace;

/// Notified when a [`BodyBuffer`] runs empty.
pub trait DrainListener {
    fn on_drained(&mut self);
}

/// Parsed response body waiting for the client side to take it.
///
/// The buffer itself is unbounded; callers compare [`len`](BodyBuffer::len)
/// against their high-water mark and pause backend reads when it is exceeded.
/// Draining the buffer completely notifies the listener once, which is how
/// paused reads get resumed.
#[derive(Debug, Default)]
pub struct BodyBuffer {
    buf: BytesMut,
}

impl BodyBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Removes up to `max` bytes from the front.
    ///
    /// `listener` is notified exactly once when this call empties a nonempty buffer.
    pub fn consume<L: DrainListener + ?Sized>(&mut self, max: usize, listener: &mut L) -> Bytes {
        let n = max.min(self.buf.len());
        if n == 0 {
            return Bytes::new();
        }

        let data = self.buf.split_to(n).freeze();
        if self.buf.is_empty() {
            trace!(consumed = n, "body buffer drained");
            listener.on_drained();
        }
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counter(usize);

    impl DrainListener for Counter {
        fn on_drained(&mut self) {
            self.0 += 1;
        }
    }

    #[test]
    fn notifies_once_per_drain() {
        let mut buffer = BodyBuffer::new();
        let mut counter = Counter::default();

        buffer.push(b"hello world");
        assert_eq!(&buffer.consume(5, &mut counter)[..], b"hello");
        assert_eq!(counter.0, 0);

        assert_eq!(&buffer.consume(100, &mut counter)[..], b" world");
        assert_eq!(counter.0, 1);

        // already empty, no new transition
        assert!(buffer.consume(100, &mut counter).is_empty());
        assert_eq!(counter.0, 1);

        buffer.push(b"again");
        buffer.consume(5, &mut counter);
        assert_eq!(counter.0, 2);
    }

    #[test]
    fn consuming_nothing_does_not_notify() {
        let mut buffer = BodyBuffer::new();
        let mut counter = Counter::default();

        buffer.push(b"x");
        assert!(buffer.consume(0, &mut counter).is_empty());
        assert_eq!(counter.0, 0);
        assert_eq!(buffer.len(), 1);
    }
}
