//! Cache-aligned host transfer buffers

use crate::error::{BenchError, Result};

/// Alignment of every host transfer buffer (one cache line)
pub const HOST_BUFFER_ALIGNMENT: usize = 64;

/// Byte buffer whose first byte sits on a cache-line boundary
///
/// Over-allocates by up to one cache line and exposes the aligned window.
/// Moving the buffer moves only the `Vec` header, so the aligned offset
/// stays valid for the buffer's whole life.
#[derive(Debug)]
pub struct AlignedBuffer {
    data: Vec<u8>,
    offset: usize,
    len: usize,
}

impl AlignedBuffer {
    /// Allocate `len` bytes, all set to `fill`
    ///
    /// # Errors
    ///
    /// `AllocationFailed` if the memory cannot be reserved.
    pub fn new(len: usize, fill: u8) -> Result<Self> {
        let total = len + HOST_BUFFER_ALIGNMENT - 1;
        let mut data = Vec::new();
        data.try_reserve_exact(total)
            .map_err(|_| BenchError::AllocationFailed { bytes: total })?;
        data.resize(total, fill);

        let misalignment = data.as_ptr() as usize % HOST_BUFFER_ALIGNMENT;
        let offset = if misalignment == 0 {
            0
        } else {
            HOST_BUFFER_ALIGNMENT - misalignment
        };

        Ok(Self { data, offset, len })
    }

    /// Check if the buffer is aligned to the given boundary
    #[must_use]
    pub fn is_aligned(&self, alignment: usize) -> bool {
        self.as_slice().as_ptr() as usize % alignment == 0
    }

    /// Logical length
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the buffer is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Aligned contents
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.data[self.offset..self.offset + self.len]
    }

    /// Aligned contents, mutably
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        let offset = self.offset;
        let len = self.len;
        &mut self.data[offset..offset + len]
    }

    /// Overwrite every byte with `byte`
    pub fn fill(&mut self, byte: u8) {
        self.as_mut_slice().fill(byte);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aligned_buffer_new() {
        let buf = AlignedBuffer::new(100, 0xA5).unwrap();
        assert_eq!(buf.len(), 100);
        assert!(!buf.is_empty());
        assert!(buf.is_aligned(HOST_BUFFER_ALIGNMENT));
        assert!(buf.as_slice().iter().all(|&b| b == 0xA5));
    }

    #[test]
    fn test_aligned_buffer_survives_move() {
        let buffers: Vec<AlignedBuffer> = (1..20)
            .map(|n| AlignedBuffer::new(n * 8, 0).unwrap())
            .collect();
        for buf in &buffers {
            assert!(buf.is_aligned(HOST_BUFFER_ALIGNMENT));
        }
    }

    #[test]
    fn test_aligned_buffer_fill_and_mutate() {
        let mut buf = AlignedBuffer::new(16, 0).unwrap();
        buf.fill(0x5A);
        assert_eq!(buf.as_slice(), &[0x5A; 16]);
        buf.as_mut_slice()[3] = 1;
        assert_eq!(buf.as_slice()[3], 1);
    }

    #[test]
    fn test_aligned_buffer_empty() {
        let buf = AlignedBuffer::new(0, 0).unwrap();
        assert!(buf.is_empty());
        assert!(buf.as_slice().is_empty());
    }

    #[test]
    fn test_impossible_allocation_reports_error() {
        let err = AlignedBuffer::new(usize::MAX / 2, 0).unwrap_err();
        assert!(matches!(err, BenchError::AllocationFailed { .. }));
    }
}
