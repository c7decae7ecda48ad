//! Descriptor normalisation into a tagged benchmark variant
//!
//! All size/stride clamping happens here, once, so the evaluation functions
//! in the engine never see an unaligned or oversized request.

use crate::descriptor::{align8_down, BenchmarkDescriptor, TestKind, SCRATCH_CAPACITY};

/// Effective per-operation size on the device: `8 * floor(min(b, 2048) / 8)`
#[must_use]
pub fn effective_size(requested: u32) -> usize {
    align8_down((requested as usize).min(SCRATCH_CAPACITY))
}

/// Addressing parameters for the region read/write variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionAccess {
    /// Bytes per repetition (multiple of 8, at most scratch capacity)
    pub size: usize,
    /// Bytes between repetitions (multiple of 8, 0 = contiguous)
    pub stride: usize,
    /// Requested repetitions
    pub repetitions: u32,
}

impl RegionAccess {
    /// Normalise a descriptor's size, stride and repetitions
    #[must_use]
    pub fn from_descriptor(descriptor: &BenchmarkDescriptor) -> Self {
        Self {
            size: effective_size(descriptor.transfer_bytes),
            stride: align8_down(descriptor.stride_bytes as usize),
            repetitions: descriptor.repetitions,
        }
    }

    /// Distance between consecutive blocks of one unit
    #[must_use]
    pub fn step(&self) -> usize {
        if self.stride > 0 {
            self.stride
        } else {
            self.size
        }
    }

    /// First offset used by `unit_id`
    #[must_use]
    pub fn base_offset(&self, unit_id: usize) -> usize {
        align8_down(unit_id.saturating_mul(self.step()))
    }

    /// Offset of repetition `rep` for `unit_id`
    #[must_use]
    pub fn offset(&self, unit_id: usize, rep: u32) -> usize {
        self.base_offset(unit_id)
            .saturating_add((rep as usize).saturating_mul(self.step()))
    }

    /// Offsets actually visited by `unit_id` in a region of `capacity` bytes
    ///
    /// Offsets grow with the repetition index, so the first block that
    /// would run past `capacity` ends the sequence.
    pub fn offsets(&self, unit_id: usize, capacity: usize) -> impl Iterator<Item = usize> + '_ {
        (0..self.repetitions)
            .map(move |rep| self.offset(unit_id, rep))
            .take_while(move |&offset| {
                offset
                    .checked_add(self.size)
                    .is_some_and(|end| end <= capacity)
            })
    }
}

/// One of the five on-device benchmarks, with its normalised payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BenchmarkVariant {
    /// Region → scratch
    RegionRead(RegionAccess),
    /// Scratch → region
    RegionWrite(RegionAccess),
    /// Scratch → scratch, byte-wise
    ScratchCopy {
        /// Bytes per copy
        size: usize,
        /// Copies to perform
        repetitions: u32,
    },
    /// Consecutive barrier waits
    Barrier {
        /// Waits to perform
        repetitions: u32,
    },
    /// Accumulate, barrier, reduce on unit 0
    Reduce {
        /// Increments per unit
        repetitions: u32,
    },
}

impl BenchmarkVariant {
    /// Build the variant selected by `descriptor`; `None` for unknown ids
    #[must_use]
    pub fn from_descriptor(descriptor: &BenchmarkDescriptor) -> Option<Self> {
        let repetitions = descriptor.repetitions;
        let variant = match descriptor.kind()? {
            TestKind::RegionRead => Self::RegionRead(RegionAccess::from_descriptor(descriptor)),
            TestKind::RegionWrite => Self::RegionWrite(RegionAccess::from_descriptor(descriptor)),
            TestKind::ScratchCopy => Self::ScratchCopy {
                size: effective_size(descriptor.transfer_bytes),
                repetitions,
            },
            TestKind::Barrier => Self::Barrier { repetitions },
            TestKind::Reduce => Self::Reduce { repetitions },
        };
        Some(variant)
    }

    /// Kind this variant measures
    #[must_use]
    pub fn kind(&self) -> TestKind {
        match self {
            Self::RegionRead(_) => TestKind::RegionRead,
            Self::RegionWrite(_) => TestKind::RegionWrite,
            Self::ScratchCopy { .. } => TestKind::ScratchCopy,
            Self::Barrier { .. } => TestKind::Barrier,
            Self::Reduce { .. } => TestKind::Reduce,
        }
    }

    /// Requested repetitions
    #[must_use]
    pub fn repetitions(&self) -> u32 {
        match self {
            Self::RegionRead(access) | Self::RegionWrite(access) => access.repetitions,
            Self::ScratchCopy { repetitions, .. }
            | Self::Barrier { repetitions }
            | Self::Reduce { repetitions } => *repetitions,
        }
    }

    /// Zero repetitions, or zero size for a byte-moving variant
    ///
    /// Degenerate variants yield a zero result without touching memory.
    /// Barrier and reduce never consume the transfer size.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        let size = match self {
            Self::RegionRead(access) | Self::RegionWrite(access) => Some(access.size),
            Self::ScratchCopy { size, .. } => Some(*size),
            Self::Barrier { .. } | Self::Reduce { .. } => None,
        };
        self.repetitions() == 0 || size == Some(0)
    }
}
