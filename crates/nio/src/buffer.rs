//! Growable receive buffer with a logical-length cursor.
//!
//! [`ElasticBuffer`] always presents its unconsumed bytes starting at index 0,
//! which is the invariant framers rely on: after a message is extracted the
//! remaining bytes are shifted to the front with [`ElasticBuffer::discard_prefix`].
//!
//! Growth doubles the logical capacity, or resets it to the configured initial
//! capacity when the current one has fallen below it (which happens after a
//! discard shrank the region).

use std::ops::Deref;

use bytes::{Buf, Bytes, BytesMut};

/// A growable byte container owned by exactly one connection.
#[derive(Debug)]
pub struct ElasticBuffer {
    data: BytesMut,
    /// Logical capacity, `data.len() <= capacity` always holds
    capacity: usize,
    initial_capacity: usize,
}

impl ElasticBuffer {
    /// Creates a buffer with the given initial capacity.
    ///
    /// # Panics
    ///
    /// Panics if `initial_capacity` is zero, such a buffer could never grow.
    pub fn new(initial_capacity: usize) -> Self {
        assert!(initial_capacity > 0, "elastic buffer initial capacity must be greater than zero");
        Self { data: BytesMut::with_capacity(initial_capacity), capacity: initial_capacity, initial_capacity }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn initial_capacity(&self) -> usize {
        self.initial_capacity
    }

    /// Appends `bytes` after the valid data, growing as many times as needed.
    pub fn append(&mut self, bytes: &[u8]) {
        let required = self.data.len() + bytes.len();
        while required > self.capacity {
            self.grow();
        }

        self.data.extend_from_slice(bytes);
    }

    /// Keeps only bytes `[offset, offset + new_length)` of the valid data and
    /// moves them to index 0. The logical capacity shrinks to `new_length`.
    ///
    /// # Panics
    ///
    /// Panics if `offset + new_length` exceeds the valid data; that is a bug in
    /// the framer, not a recoverable condition.
    pub fn discard_prefix(&mut self, offset: usize, new_length: usize) {
        let end = offset.checked_add(new_length);
        assert!(
            end.is_some_and(|end| end <= self.data.len()),
            "discard_prefix out of bounds: offset {offset} + length {new_length} > {}",
            self.data.len()
        );

        self.data.advance(offset);
        self.data.truncate(new_length);
        self.capacity = new_length;
    }

    /// Drops all data and starts over at the initial capacity.
    pub fn reset(&mut self) {
        self.data = BytesMut::with_capacity(self.initial_capacity);
        self.capacity = self.initial_capacity;
    }

    /// Copies the first `len` bytes into their own storage and removes them
    /// from the buffer.
    ///
    /// When the message consumes the buffer exactly the buffer is [reset](Self::reset),
    /// otherwise the remainder is shifted to the front.
    pub fn take_message(&mut self, len: usize) -> Bytes {
        let message = Bytes::copy_from_slice(&self.data[..len]);
        let remaining = self.data.len() - len;
        if remaining == 0 {
            self.reset();
        } else {
            self.discard_prefix(len, remaining);
        }
        message
    }

    fn grow(&mut self) {
        self.capacity = if self.capacity < self.initial_capacity { self.initial_capacity } else { self.capacity * 2 };
        self.data.reserve(self.capacity - self.data.len());
    }
}

impl Deref for ElasticBuffer {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

impl AsRef<[u8]> for ElasticBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

/// Transient buffer ferrying bytes between a socket and connection state.
///
/// One pair of staging buffers is owned by the reactor and reused for every
/// connection. They are logically empty between operations: whoever fills one
/// clears it before returning, so no connection ever observes another
/// connection's bytes.
#[derive(Debug)]
pub struct StagingBuffer {
    /// Zeroed once at construction, only `..filled` is meaningful
    storage: Box<[u8]>,
    filled: usize,
}

impl StagingBuffer {
    pub fn new(limit: usize) -> Self {
        assert!(limit > 0, "staging buffer limit must be greater than zero");
        Self { storage: vec![0; limit].into_boxed_slice(), filled: 0 }
    }

    #[inline]
    pub fn limit(&self) -> usize {
        self.storage.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.filled
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.filled == self.storage.len()
    }

    /// The staged bytes
    #[inline]
    pub(crate) fn filled(&self) -> &[u8] {
        &self.storage[..self.filled]
    }

    /// The unused tail, to be marked filled with [`advance`](Self::advance).
    #[inline]
    pub(crate) fn spare_mut(&mut self) -> &mut [u8] {
        &mut self.storage[self.filled..]
    }

    /// Marks `n` more bytes of the spare tail as filled.
    ///
    /// # Panics
    ///
    /// Panics when `n` exceeds the spare tail.
    #[inline]
    pub(crate) fn advance(&mut self, n: usize) {
        assert!(n <= self.storage.len() - self.filled, "advance {n} past staging limit {}", self.storage.len());
        self.filled += n;
    }

    /// Copies as much of `src` as fits, returning the number of bytes staged.
    pub(crate) fn stage(&mut self, src: &[u8]) -> usize {
        let spare = self.spare_mut();
        let n = src.len().min(spare.len());
        spare[..n].copy_from_slice(&src[..n]);
        self.filled += n;
        n
    }

    #[inline]
    pub(crate) fn clear(&mut self) {
        self.filled = 0;
    }
}
