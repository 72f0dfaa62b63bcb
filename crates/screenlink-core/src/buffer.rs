//! Growable byte buffer with independent read and write cursors.
//!
//! The transport's I/O loop appends raw socket bytes here and the message
//! parser drains complete frames out of it. All cursor arithmetic is private
//! to this type: callers only see bounds-checked `peek`/`read` operations, so
//! the invariant `0 <= read_pos <= write_pos <= capacity` can never be broken
//! from outside.
//!
//! A single internal mutex makes every operation mutually exclusive. The
//! buffer is appended to from the I/O task and drained synchronously within
//! the same call chain, so there are never concurrent readers and writers by
//! design, but the lock keeps the type safe to share regardless.

use std::sync::Mutex;

use thiserror::Error;

/// Initial capacity of a freshly created buffer.
const INITIAL_CAPACITY: usize = 4096;

/// Errors produced by [`DynamicBuffer`] accessors.
///
/// A read request that exceeds the bytes currently buffered is a programming
/// error on the caller's side and is rejected, never silently truncated.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BufferError {
    /// The requested range extends past the write cursor.
    #[error("read of {requested} bytes at offset {offset} exceeds {available} buffered bytes")]
    ReadPastWrite {
        requested: usize,
        offset: usize,
        available: usize,
    },
}

#[derive(Debug)]
struct BufferInner {
    data: Vec<u8>,
    read_pos: usize,
    write_pos: usize,
}

/// A growable byte accumulator with separate read and write cursors.
///
/// `append` grows capacity by doubling until the new bytes fit, `read`
/// advances the read cursor, `peek` does not, and `reset` rewinds both
/// cursors to zero.
#[derive(Debug)]
pub struct DynamicBuffer {
    inner: Mutex<BufferInner>,
}

impl DynamicBuffer {
    /// Creates an empty buffer with the default initial capacity.
    pub fn new() -> Self {
        Self::with_capacity(INITIAL_CAPACITY)
    }

    /// Creates an empty buffer with at least `capacity` bytes reserved.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(BufferInner {
                data: vec![0; capacity.max(1)],
                read_pos: 0,
                write_pos: 0,
            }),
        }
    }

    /// Appends `bytes` after the write cursor, doubling capacity as needed.
    pub fn append(&self, bytes: &[u8]) {
        let mut inner = self.lock();
        let needed = inner.write_pos + bytes.len();
        if needed > inner.data.len() {
            let mut capacity = inner.data.len().max(1);
            while capacity < needed {
                capacity *= 2;
            }
            inner.data.resize(capacity, 0);
        }
        let start = inner.write_pos;
        inner.data[start..start + bytes.len()].copy_from_slice(bytes);
        inner.write_pos = needed;
    }

    /// Number of unread bytes currently buffered.
    pub fn available(&self) -> usize {
        let inner = self.lock();
        inner.write_pos - inner.read_pos
    }

    /// Returns `len` bytes starting `offset` past the read cursor without
    /// advancing it.
    ///
    /// # Errors
    ///
    /// Returns [`BufferError::ReadPastWrite`] when fewer than `offset + len`
    /// unread bytes are buffered.
    pub fn peek(&self, len: usize, offset: usize) -> Result<Vec<u8>, BufferError> {
        let inner = self.lock();
        Self::copy_range(&inner, len, offset)
    }

    /// Returns `len` bytes from the read cursor and advances it past them.
    ///
    /// # Errors
    ///
    /// Returns [`BufferError::ReadPastWrite`] when fewer than `len` unread
    /// bytes are buffered.
    pub fn read(&self, len: usize) -> Result<Vec<u8>, BufferError> {
        let mut inner = self.lock();
        let out = Self::copy_range(&inner, len, 0)?;
        inner.read_pos += len;
        // Both cursors at the end means everything was consumed; rewind so
        // the backing storage gets reused instead of growing forever.
        if inner.read_pos == inner.write_pos {
            inner.read_pos = 0;
            inner.write_pos = 0;
        }
        Ok(out)
    }

    /// Rewinds both cursors to zero, discarding all buffered bytes.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.read_pos = 0;
        inner.write_pos = 0;
    }

    fn copy_range(
        inner: &BufferInner,
        len: usize,
        offset: usize,
    ) -> Result<Vec<u8>, BufferError> {
        let available = inner.write_pos - inner.read_pos;
        if offset + len > available {
            return Err(BufferError::ReadPastWrite {
                requested: len,
                offset,
                available,
            });
        }
        let start = inner.read_pos + offset;
        Ok(inner.data[start..start + len].to_vec())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BufferInner> {
        // A poisoned lock means another thread panicked mid-operation; the
        // buffer contents are still plain bytes, so recover the guard.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for DynamicBuffer {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_returns_appended_bytes_in_order() {
        // Arrange
        let buf = DynamicBuffer::new();
        buf.append(b"hello ");
        buf.append(b"world");

        // Act
        let first = buf.read(6).unwrap();
        let second = buf.read(5).unwrap();

        // Assert
        assert_eq!(first, b"hello ");
        assert_eq!(second, b"world");
        assert_eq!(buf.available(), 0);
    }

    #[test]
    fn test_append_grows_capacity_by_doubling() {
        let buf = DynamicBuffer::with_capacity(4);
        let payload: Vec<u8> = (0..=255).collect();
        buf.append(&payload);
        assert_eq!(buf.read(256).unwrap(), payload);
    }

    #[test]
    fn test_peek_does_not_advance_read_cursor() {
        let buf = DynamicBuffer::new();
        buf.append(b"abcd");

        assert_eq!(buf.peek(2, 0).unwrap(), b"ab");
        assert_eq!(buf.peek(2, 2).unwrap(), b"cd");
        assert_eq!(buf.available(), 4, "peek must not consume bytes");
        assert_eq!(buf.read(4).unwrap(), b"abcd");
    }

    #[test]
    fn test_read_past_write_is_rejected_not_truncated() {
        let buf = DynamicBuffer::new();
        buf.append(b"abc");

        let err = buf.read(4).unwrap_err();
        assert_eq!(
            err,
            BufferError::ReadPastWrite {
                requested: 4,
                offset: 0,
                available: 3,
            }
        );
        // The failed read must not have consumed anything.
        assert_eq!(buf.read(3).unwrap(), b"abc");
    }

    #[test]
    fn test_peek_past_write_with_offset_is_rejected() {
        let buf = DynamicBuffer::new();
        buf.append(b"abc");
        assert!(buf.peek(2, 2).is_err());
    }

    #[test]
    fn test_reset_discards_buffered_bytes() {
        let buf = DynamicBuffer::new();
        buf.append(b"stale");
        buf.reset();

        assert_eq!(buf.available(), 0);
        buf.append(b"fresh");
        assert_eq!(buf.read(5).unwrap(), b"fresh");
    }

    #[test]
    fn test_interleaved_appends_and_reads_preserve_order() {
        // §8: bytes read equal bytes appended, in order, for any interleaving.
        let buf = DynamicBuffer::new();
        let mut expected = Vec::new();
        let mut actual = Vec::new();

        for round in 0u8..20 {
            let chunk: Vec<u8> = (0..=round).collect();
            buf.append(&chunk);
            expected.extend_from_slice(&chunk);
            let take = (round as usize + 1) / 2;
            actual.extend(buf.read(take).unwrap());
        }
        let rest = buf.available();
        actual.extend(buf.read(rest).unwrap());

        assert_eq!(actual, expected);
    }

    #[test]
    fn test_buffer_is_shareable_across_threads() {
        use std::sync::Arc;

        let buf = Arc::new(DynamicBuffer::new());
        let writer = Arc::clone(&buf);
        let handle = std::thread::spawn(move || {
            for _ in 0..100 {
                writer.append(&[7; 32]);
            }
        });
        handle.join().expect("writer thread panicked");

        assert_eq!(buf.available(), 3200);
        assert!(buf.read(3200).unwrap().iter().all(|&b| b == 7));
    }
}
