use crate::buffer::SlidingBuffer;
use crate::error::Error;
use crate::frame::{Frame, FrameHeader};

/// Synchronous, buffer-only frame extraction. No I/O: callers feed bytes in
/// via [`FrameParser::feed`] (or the `prepare_write`/`commit_write` pair when
/// reading straight into the backing buffer) and pull complete frames back
/// out one at a time with [`FrameParser::parse_one`].
pub struct FrameParser {
    buffer: SlidingBuffer,
}

impl FrameParser {
    pub fn new() -> Self {
        Self {
            buffer: SlidingBuffer::new(),
        }
    }

    pub fn with_receive_buffer_size(len: usize) -> Self {
        Self {
            buffer: SlidingBuffer::with_capacity(len),
        }
    }

    pub fn set_receive_buffer_size(&mut self, len: usize) {
        self.buffer.resize(len);
    }

    pub fn feed(&mut self, bytes: &[u8]) {
        self.buffer.feed(bytes);
    }

    /// Return the buffer's free tail `[used, capacity)` for a caller to fill
    /// directly (e.g. a transport read) instead of copying through `feed`.
    /// Does not grow the backing store — use `set_receive_buffer_size`/
    /// `with_receive_buffer_size` for that. Must be followed by exactly one
    /// [`FrameParser::commit_write`].
    pub fn prepare_write(&mut self) -> &mut [u8] {
        self.buffer.prepare_write()
    }

    /// Declare how much of the region from `prepare_write` was actually
    /// filled with valid data.
    pub fn commit_write(&mut self, n: usize) {
        self.buffer.commit_write(n);
    }

    /// Extract one complete frame from the front of the buffer, if one is
    /// fully present. Returns `Ok(None)` when more bytes are needed — this is
    /// not an error, just "try again once more data arrives". Returns
    /// `Err` only for a malformed header (unknown opcode).
    ///
    /// Mirrors `FrameParser::ParseOne` in the source: peek the header without
    /// consuming, bail out on either "need more data" condition, otherwise
    /// copy the payload out and consume header + payload together.
    pub fn parse_one(&mut self) -> Result<Option<Frame>, Error> {
        let raw = self.buffer.data();

        if raw.len() < 2 {
            return Ok(None);
        }

        let (header, header_len) = match FrameHeader::decode(raw) {
            Ok(parsed) => parsed,
            Err(Error::IncompleteHeader) => return Ok(None),
            Err(other) => return Err(other),
        };

        let payload_len = usize::try_from(header.length).map_err(|_| Error::LengthOverflow)?;
        let total_len = header_len
            .checked_add(payload_len)
            .ok_or(Error::LengthOverflow)?;

        if total_len > raw.len() {
            return Ok(None);
        }

        let payload = raw[header_len..total_len].to_vec();
        self.buffer.consume(total_len);

        Ok(Some(Frame { header, payload }))
    }

    /// Drain every complete frame currently buffered.
    pub fn parse_all(&mut self) -> Result<Vec<Frame>, Error> {
        let mut frames = Vec::new();
        while let Some(frame) = self.parse_one()? {
            frames.push(frame);
        }
        Ok(frames)
    }
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new()
    }
}
