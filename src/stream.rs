//! Cursor bookkeeping shared by [`File`](crate::File) and
//! [`Storage`](crate::Storage).

use crate::SeekOrigin;

/// Read/write position over a stream of known size.
///
/// Invariant: `0 <= offset <= size` after every operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct StreamCursor {
    offset: u64,
    size: u64,
}

impl StreamCursor {
    pub(crate) fn new(size: u64) -> Self {
        Self { offset: 0, size }
    }

    /// Cursor positioned at the end of the stream.
    pub(crate) fn at_end_of(size: u64) -> Self {
        Self { offset: size, size }
    }

    #[inline]
    pub(crate) fn offset(&self) -> u64 {
        self.offset
    }

    #[inline]
    pub(crate) fn size(&self) -> u64 {
        self.size
    }

    #[inline]
    pub(crate) fn remaining(&self) -> u64 {
        self.size - self.offset
    }

    #[inline]
    pub(crate) fn is_at_end(&self) -> bool {
        self.offset >= self.size
    }

    /// `requested` limited to the bytes left before the end.
    pub(crate) fn clamp(&self, requested: usize) -> usize {
        usize::try_from(self.remaining()).map_or(requested, |left| requested.min(left))
    }

    /// Move the cursor and clamp it into `[0, size]`.
    pub(crate) fn seek(&mut self, offset: i64, origin: SeekOrigin) -> u64 {
        let base = match origin {
            SeekOrigin::Start => 0,
            SeekOrigin::Current => i128::from(self.offset),
            SeekOrigin::End => i128::from(self.size),
        };
        let target = (base + i128::from(offset)).clamp(0, i128::from(self.size));
        // Clamped into [0, size], so the conversion cannot fail.
        self.offset = u64::try_from(target).unwrap_or(self.size);
        self.offset
    }

    pub(crate) fn advance(&mut self, count: usize) {
        self.offset = self
            .offset
            .saturating_add(count as u64)
            .min(self.size);
    }

    /// Record that the stream now holds `size` bytes. Never shrinks.
    pub(crate) fn grow_to(&mut self, size: u64) {
        self.size = self.size.max(size);
    }
}
