use bytes::{Bytes, BytesMut};

/// Holds every fed byte that no completed phase transition has consumed yet.
#[derive(Debug, Default)]
pub(crate) struct FeedBuffer {
    pub(crate) buf: BytesMut,
    pub(crate) total_fed: u64,
}

impl FeedBuffer {
    pub fn new() -> Self {
        FeedBuffer::default()
    }

    pub fn extend(&mut self, chunk: &[u8]) {
        self.total_fed += chunk.len() as u64;
        self.buf.extend_from_slice(chunk);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn starts_with(&self, pattern: &[u8]) -> bool {
        self.buf.starts_with(pattern)
    }

    /// Whether the buffered bytes are a proper prefix of `pattern`.
    pub fn is_prefix_of(&self, pattern: &[u8]) -> bool {
        self.buf.len() < pattern.len() && pattern.starts_with(&self.buf)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn advance(&mut self, size: usize) {
        drop(self.buf.split_to(size));
    }

    /// Splits off the first `size` bytes; `size` must not exceed `len()`.
    pub fn split_to(&mut self, size: usize) -> Bytes {
        self.buf.split_to(size).freeze()
    }

    pub fn find(&self, pattern: &[u8]) -> Option<usize> {
        memchr::memmem::find(&self.buf, pattern)
    }
}
