// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Append-only byte accumulator used to splice bitstreams together.

use thiserror::Error as ThisError;

#[derive(Debug, ThisError, PartialEq, Eq)]
#[error("failed to grow buffer to {0} bytes")]
pub struct AllocationFailed(pub usize);

/// Capacity to allocate so that `min_size` bytes fit, leaving headroom for further appends.
fn grown_capacity(min_size: usize) -> usize {
    (min_size.saturating_mul(17) / 16)
        .saturating_add(32)
        .max(min_size)
}

/// A byte buffer that grows by a sixteenth plus 32 bytes past each request and never shrinks.
#[derive(Debug, Default)]
pub struct GrowableBuffer {
    data: Vec<u8>,
}

impl GrowableBuffer {
    /// Creates a buffer with room for at least `initial_size` bytes.
    pub fn new(initial_size: usize) -> Result<Self, AllocationFailed> {
        let mut buffer = GrowableBuffer::default();
        if initial_size > 0 {
            buffer.reserve_total(initial_size)?;
        }
        Ok(buffer)
    }

    fn reserve_total(&mut self, min_size: usize) -> Result<(), AllocationFailed> {
        if min_size <= self.data.capacity() {
            return Ok(());
        }
        let capacity = grown_capacity(min_size);
        self.data
            .try_reserve_exact(capacity - self.data.len())
            .map_err(|_| AllocationFailed(capacity))
    }

    pub fn append(&mut self, bytes: &[u8]) -> Result<(), AllocationFailed> {
        let min_size = self
            .data
            .len()
            .checked_add(bytes.len())
            .ok_or(AllocationFailed(usize::MAX))?;
        self.reserve_total(min_size)?;
        self.data.extend_from_slice(bytes);
        Ok(())
    }

    /// Takes the accumulated bytes, leaving the buffer empty and unallocated.
    pub fn steal(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.data)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn growth_policy() {
        assert_eq!(grown_capacity(0), 32);
        assert_eq!(grown_capacity(100), 138);
        assert_eq!(grown_capacity(usize::MAX), usize::MAX);

        let mut buffer = GrowableBuffer::new(0).unwrap();
        assert_eq!(buffer.capacity(), 0);
        buffer.append(&[0xaa; 100]).unwrap();
        let capacity = buffer.capacity();
        assert!(capacity >= 138);
        // Fits in the headroom, no reallocation.
        buffer.append(&[0xbb; 30]).unwrap();
        assert_eq!(buffer.capacity(), capacity);
    }

    #[test]
    fn size_tracks_appends() {
        let mut buffer = GrowableBuffer::new(4).unwrap();
        let mut total = 0;
        let mut last_capacity = buffer.capacity();
        for n in [0usize, 1, 3, 17, 64, 2, 500, 1, 4096] {
            let chunk: Vec<u8> = (0..n).map(|i| i as u8).collect();
            buffer.append(&chunk).unwrap();
            total += n;
            assert_eq!(buffer.len(), total);
            assert!(buffer.capacity() >= buffer.len());
            assert!(buffer.capacity() >= last_capacity);
            last_capacity = buffer.capacity();
        }
        assert_eq!(&buffer.as_slice()[..4], &[0, 0, 1, 2]);
    }

    #[test]
    fn steal_resets() {
        let mut buffer = GrowableBuffer::new(16).unwrap();
        buffer.append(b"\x00\x00\x01\x0a").unwrap();
        let bytes = buffer.steal();
        assert_eq!(bytes, [0, 0, 1, 0x0a]);
        assert!(buffer.is_empty());
        assert_eq!(buffer.capacity(), 0);
        buffer.append(b"again").unwrap();
        assert_eq!(buffer.as_slice(), b"again");
    }
}
