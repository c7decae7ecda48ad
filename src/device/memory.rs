//! Device memories: the shared working-memory region and per-unit scratch
//!
//! The region is stored as 64-bit atomic words, so concurrent units may hit
//! overlapping ranges (contiguous mode makes unit `n`'s second block unit
//! `n+1`'s first) without a lock. Accesses are word-granular: offsets and
//! lengths must be 8-byte aligned.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::descriptor::{REGION_ALIGNMENT, SCRATCH_CAPACITY};
use crate::error::{BenchError, Result};

/// Off-chip working memory shared by all units of one device
#[derive(Debug)]
pub struct WorkingMemoryRegion {
    words: Box<[AtomicU64]>,
}

impl WorkingMemoryRegion {
    /// Allocate a zeroed region of `capacity` bytes (multiple of 8)
    ///
    /// # Errors
    ///
    /// `InvalidConfiguration` for an unaligned capacity, `AllocationFailed`
    /// if the backing words cannot be reserved.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity % REGION_ALIGNMENT != 0 {
            return Err(BenchError::InvalidConfiguration(format!(
                "region capacity {capacity} is not a multiple of {REGION_ALIGNMENT}"
            )));
        }
        let count = capacity / REGION_ALIGNMENT;
        let mut words = Vec::new();
        words
            .try_reserve_exact(count)
            .map_err(|_| BenchError::AllocationFailed { bytes: capacity })?;
        words.extend((0..count).map(|_| AtomicU64::new(0)));
        Ok(Self {
            words: words.into_boxed_slice(),
        })
    }

    /// Capacity in bytes
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.words.len() * REGION_ALIGNMENT
    }

    /// Validate an access of `len` bytes at `offset`
    ///
    /// # Errors
    ///
    /// `Misaligned` or `OutOfRange`.
    pub fn check(&self, offset: usize, len: usize) -> Result<()> {
        if offset % REGION_ALIGNMENT != 0 || len % REGION_ALIGNMENT != 0 {
            return Err(BenchError::Misaligned { offset, len });
        }
        match offset.checked_add(len) {
            Some(end) if end <= self.capacity() => Ok(()),
            _ => Err(BenchError::OutOfRange {
                offset,
                len,
                capacity: self.capacity(),
            }),
        }
    }

    /// Copy `dst.len()` bytes starting at `offset` into `dst`
    ///
    /// # Errors
    ///
    /// See [`Self::check`].
    pub fn read(&self, offset: usize, dst: &mut [u8]) -> Result<()> {
        self.check(offset, dst.len())?;
        let first = offset / REGION_ALIGNMENT;
        for (chunk, word) in dst
            .chunks_exact_mut(REGION_ALIGNMENT)
            .zip(&self.words[first..])
        {
            chunk.copy_from_slice(&word.load(Ordering::Relaxed).to_le_bytes());
        }
        Ok(())
    }

    /// Copy `src` into the region starting at `offset`
    ///
    /// # Errors
    ///
    /// See [`Self::check`].
    pub fn write(&self, offset: usize, src: &[u8]) -> Result<()> {
        self.check(offset, src.len())?;
        let first = offset / REGION_ALIGNMENT;
        for (chunk, word) in src.chunks_exact(REGION_ALIGNMENT).zip(&self.words[first..]) {
            let mut bytes = [0u8; REGION_ALIGNMENT];
            bytes.copy_from_slice(chunk);
            word.store(u64::from_le_bytes(bytes), Ordering::Relaxed);
        }
        Ok(())
    }

    /// Copy out `len` bytes at `offset`
    ///
    /// # Errors
    ///
    /// See [`Self::check`].
    pub fn snapshot(&self, offset: usize, len: usize) -> Result<Vec<u8>> {
        let mut out = vec![0u8; len];
        self.read(offset, &mut out)?;
        Ok(out)
    }
}

/// The two private scratch buffers of one execution unit
#[derive(Debug, Clone)]
pub struct LocalScratch {
    primary: [u8; SCRATCH_CAPACITY],
    secondary: [u8; SCRATCH_CAPACITY],
}

impl Default for LocalScratch {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalScratch {
    /// Zeroed scratch
    #[must_use]
    pub fn new() -> Self {
        Self {
            primary: [0; SCRATCH_CAPACITY],
            secondary: [0; SCRATCH_CAPACITY],
        }
    }

    /// Fill the first `len` primary bytes with `(i + unit_id) mod 256`
    pub fn fill_unit_pattern(&mut self, len: usize, unit_id: usize) {
        let len = len.min(SCRATCH_CAPACITY);
        for (i, byte) in self.primary[..len].iter_mut().enumerate() {
            *byte = (i + unit_id) as u8;
        }
    }

    /// First `len` bytes of the primary buffer
    #[must_use]
    pub fn primary(&self, len: usize) -> &[u8] {
        &self.primary[..len.min(SCRATCH_CAPACITY)]
    }

    /// First `len` bytes of the primary buffer, mutably
    pub fn primary_mut(&mut self, len: usize) -> &mut [u8] {
        &mut self.primary[..len.min(SCRATCH_CAPACITY)]
    }

    /// First `len` bytes of the secondary buffer
    #[must_use]
    pub fn secondary(&self, len: usize) -> &[u8] {
        &self.secondary[..len.min(SCRATCH_CAPACITY)]
    }

    /// Byte-by-byte copy of `len` bytes from primary to secondary
    pub fn copy_primary_to_secondary(&mut self, len: usize) {
        let len = len.min(SCRATCH_CAPACITY);
        for i in 0..len {
            self.secondary[i] = std::hint::black_box(self.primary[i]);
        }
    }
}
