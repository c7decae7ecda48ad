//! Window-scoped host buffer pool
//!
//! The pool allocates its buffers once per routine invocation. Each window
//! of a batched transfer checks out a prefix of the pool through a
//! [`WindowLease`]; dropping the lease returns the buffers. The borrow held
//! by the lease makes overlapping checkouts impossible, so host memory never
//! exceeds `capacity × buffer_len` regardless of fleet size.

use crate::error::{BenchError, Result};
use crate::host::buffer::AlignedBuffer;

/// Upper bound on buffers in one pool
pub const MAX_POOL_BUFFERS: usize = 64;

/// Fixed-capacity arena of equally sized aligned buffers
#[derive(Debug)]
pub struct TransferBufferPool {
    buffers: Vec<AlignedBuffer>,
    buffer_len: usize,
    checkouts: usize,
}

impl TransferBufferPool {
    /// Allocate `capacity` buffers of `buffer_len` bytes filled with `fill`
    ///
    /// # Errors
    ///
    /// `InvalidConfiguration` if `capacity` exceeds [`MAX_POOL_BUFFERS`],
    /// `AllocationFailed` if a buffer cannot be allocated.
    pub fn new(capacity: usize, buffer_len: usize, fill: u8) -> Result<Self> {
        if capacity > MAX_POOL_BUFFERS {
            return Err(BenchError::InvalidConfiguration(format!(
                "pool of {capacity} buffers exceeds the limit of {MAX_POOL_BUFFERS}"
            )));
        }
        let buffers = (0..capacity)
            .map(|_| AlignedBuffer::new(buffer_len, fill))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            buffers,
            buffer_len,
            checkouts: 0,
        })
    }

    /// Number of buffers
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.buffers.len()
    }

    /// Length of each buffer
    #[must_use]
    pub fn buffer_len(&self) -> usize {
        self.buffer_len
    }

    /// Host bytes held by the pool's logical buffers
    #[must_use]
    pub fn footprint_bytes(&self) -> usize {
        self.capacity() * self.buffer_len
    }

    /// Number of leases handed out so far
    #[must_use]
    pub fn checkouts(&self) -> usize {
        self.checkouts
    }

    /// Check out buffers `0..count` for one window
    ///
    /// # Errors
    ///
    /// `InvalidConfiguration` if `count` exceeds the pool capacity.
    pub fn checkout(&mut self, count: usize) -> Result<WindowLease<'_>> {
        if count > self.buffers.len() {
            return Err(BenchError::InvalidConfiguration(format!(
                "window of {count} devices exceeds pool capacity {}",
                self.buffers.len()
            )));
        }
        self.checkouts += 1;
        Ok(WindowLease {
            buffers: &mut self.buffers[..count],
        })
    }
}

/// Buffers checked out for one window, indexed by position in the window
#[derive(Debug)]
pub struct WindowLease<'a> {
    buffers: &'a mut [AlignedBuffer],
}

impl<'a> WindowLease<'a> {
    /// Number of leased buffers
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    /// Whether the lease is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Buffer at window position `index`
    #[must_use]
    pub fn buffer(&self, index: usize) -> Option<&AlignedBuffer> {
        self.buffers.get(index)
    }

    /// Leased buffers, mutably
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, AlignedBuffer> {
        self.buffers.iter_mut()
    }
}
