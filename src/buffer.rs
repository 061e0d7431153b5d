use bytes::{Buf, BufMut, BytesMut};

/// A non-owning view over a byte range. Mirrors the source's `(pointer, length)`
/// `Buffer` struct; here it's just a borrowed slice, since the borrow checker
/// already enforces the "ephemeral descriptor, owning containers do the
/// mutating" contract the C++ original relied on convention for.
pub type Slice<'a> = &'a [u8];

/// Grow-and-consume byte accumulator for partial reads.
///
/// Backed by `BytesMut` rather than a hand-rolled `Vec<u8>` plus manual
/// `memmove`, since `BytesMut` already gives `reserve`/`advance`/`split_to`
/// with the same semantics the source's `Resize`/`Consume` implement by hand.
#[derive(Debug, Default)]
pub struct SlidingBuffer {
    inner: BytesMut,
    /// Valid length as of the last `prepare_write` call, still pending a
    /// matching `commit_write`. `None` when no write is in flight.
    pending_write: Option<usize>,
}

impl SlidingBuffer {
    pub fn new() -> Self {
        Self {
            inner: BytesMut::new(),
            pending_write: None,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: BytesMut::with_capacity(capacity),
            pending_write: None,
        }
    }

    /// Bytes currently buffered and valid: `[0, used)`.
    pub fn data(&self) -> &[u8] {
        &self.inner
    }

    /// Amount of valid, unconsumed data.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Total backing capacity.
    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    /// Append `bytes` to the buffer, growing the backing store exactly enough
    /// to hold it if needed (not geometrically — matches the source's
    /// `Feed`, which resizes to exactly `buffer_used_ + buf.size`).
    pub fn feed(&mut self, bytes: &[u8]) {
        self.inner.reserve(bytes.len());
        self.inner.put_slice(bytes);
    }

    /// Remove the leading `n` bytes, shifting the remainder to the front.
    /// Equivalent to the source's single-argument `Consume(len)`.
    pub fn consume(&mut self, n: usize) {
        assert!(n <= self.inner.len(), "consume: n exceeds buffered length");
        self.inner.advance(n);
    }

    /// Remove the window `[start, start + n)`, shifting everything after it
    /// down to close the gap. Equivalent to the source's `Consume(start, len)`.
    pub fn consume_window(&mut self, start: usize, n: usize) {
        assert!(
            start + n <= self.inner.len(),
            "consume_window: window exceeds buffered length"
        );
        let tail = self.inner.split_off(start + n);
        self.inner.truncate(start);
        self.inner.unsplit(tail);
    }

    /// Shrink or grow the backing store, never below `len()`.
    pub fn resize(&mut self, capacity: usize) {
        let capacity = capacity.max(self.inner.len());
        if capacity > self.inner.capacity() {
            self.inner.reserve(capacity - self.inner.capacity());
        }
    }

    /// Return the free tail `[used, capacity)` as a writable slice, for a
    /// caller (e.g. a transport read) to fill directly. Does **not** grow
    /// the backing store — a full buffer simply yields an empty slice,
    /// matching the source's `PrepareWrite`, which returns
    /// `buffer_size_ - buffer_used_` with no resize of its own. Growing the
    /// buffer is `resize`'s job. Must be followed by exactly one
    /// [`SlidingBuffer::commit_write`] before the next `prepare_write`.
    pub fn prepare_write(&mut self) -> &mut [u8] {
        assert!(self.pending_write.is_none(), "prepare_write called while a write is already pending");
        let valid = self.inner.len();
        let capacity = self.inner.capacity();
        // Zero-fill up to (not past) the existing capacity so the returned
        // slice never exposes uninitialized memory through a safe
        // `&mut [u8]`, without reserving any new capacity the way `resize`
        // would.
        self.inner.resize(capacity, 0);
        self.pending_write = Some(valid);
        &mut self.inner[valid..]
    }

    /// Declare that only the first `n` of the bytes handed out by
    /// `prepare_write` are actually valid data; the rest are released.
    pub fn commit_write(&mut self, n: usize) {
        let valid = self
            .pending_write
            .take()
            .expect("commit_write called without a matching prepare_write");
        assert!(
            valid + n <= self.inner.len(),
            "commit_write: n exceeds the region handed out by prepare_write"
        );
        self.inner.truncate(valid + n);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_then_consume_head() {
        let mut buf = SlidingBuffer::new();
        buf.feed(b"hello world");
        buf.consume(6);
        assert_eq!(buf.data(), b"world");
    }

    #[test]
    fn feed_then_consume_window() {
        let mut buf = SlidingBuffer::new();
        buf.feed(b"0123456789");
        buf.consume_window(3, 4);
        assert_eq!(buf.data(), b"012789");
    }

    #[test]
    fn consume_window_matches_slice_concat() {
        let original = b"the quick brown fox".to_vec();
        let (s, n) = (4usize, 6usize);
        let mut buf = SlidingBuffer::new();
        buf.feed(&original);
        buf.consume_window(s, n);

        let mut expected = original[..s].to_vec();
        expected.extend_from_slice(&original[s + n..]);
        assert_eq!(buf.data(), expected.as_slice());
    }

    #[test]
    fn incremental_feed_matches_one_shot() {
        let whole = b"abcdefghijklmnopqrstuvwxyz";

        let mut one_shot = SlidingBuffer::new();
        one_shot.feed(whole);

        let mut incremental = SlidingBuffer::new();
        for chunk in whole.chunks(3) {
            incremental.feed(chunk);
        }

        assert_eq!(one_shot.data(), incremental.data());
    }

    #[test]
    fn prepare_write_then_commit_appends_only_the_committed_prefix() {
        let mut buf = SlidingBuffer::with_capacity(20);
        buf.feed(b"abc");

        {
            let tail = buf.prepare_write();
            tail[..5].copy_from_slice(b"12345");
        }
        buf.commit_write(5);

        assert_eq!(buf.data(), b"abc12345");
    }

    #[test]
    fn prepare_write_on_a_full_buffer_yields_nothing() {
        let mut buf = SlidingBuffer::with_capacity(8);
        let filler = vec![0u8; buf.capacity()];
        buf.feed(&filler);

        assert!(buf.prepare_write().is_empty());
        buf.commit_write(0);
    }

    #[test]
    #[should_panic(expected = "without a matching prepare_write")]
    fn commit_write_without_prepare_panics() {
        let mut buf = SlidingBuffer::new();
        buf.commit_write(0);
    }

    #[test]
    fn empty_buffer_has_no_data() {
        let buf = SlidingBuffer::new();
        assert!(buf.is_empty());
        assert_eq!(buf.len(), 0);
    }
}
