//! Per-unit cycle counters
//!
//! Two sources are available:
//!
//! - [`ClockSource::Wall`]: cycles derived from the host monotonic clock at
//!   a nominal device frequency. Numbers include real contention between
//!   unit threads.
//! - [`ClockSource::Modeled`]: a deterministic counter advanced by a
//!   [`CostModel`]. Each charged operation adds its modelled cost, and every
//!   barrier lines all units up on the latest arrival.

use std::cell::Cell;
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Nominal device clock used for wall-derived cycles
pub const DEFAULT_CLOCK_MHZ: f64 = 350.0;

/// Operation charged against a unit's counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// Region ↔ scratch transfer of `bytes`
    Dma {
        /// Transfer length
        bytes: usize,
    },
    /// Byte-wise scratch copy of `bytes`
    ScratchCopy {
        /// Copy length
        bytes: usize,
    },
    /// One barrier round-trip
    Barrier,
    /// One accumulator increment
    Increment,
    /// One slot read during the unit-0 reduction
    ReduceStep,
}

/// Cycle costs used by the modelled counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostModel {
    /// Fixed setup cost per DMA
    pub dma_fixed: u64,
    /// Cost per 8 transferred bytes
    pub dma_per_8_bytes: u64,
    /// Cost per byte of scratch copy
    pub scratch_per_byte: u64,
    /// Cost of one barrier round-trip
    pub barrier: u64,
    /// Cost of one increment
    pub increment: u64,
    /// Cost of reading one accumulator slot
    pub reduce_step: u64,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            dma_fixed: 77,
            dma_per_8_bytes: 4,
            scratch_per_byte: 3,
            barrier: 48,
            increment: 1,
            reduce_step: 2,
        }
    }
}

impl CostModel {
    /// Cycles charged for `op`
    #[must_use]
    pub fn cycles(&self, op: Op) -> u64 {
        match op {
            Op::Dma { bytes } => {
                self.dma_fixed + self.dma_per_8_bytes * (bytes as u64).div_ceil(8)
            },
            Op::ScratchCopy { bytes } => self.scratch_per_byte * bytes as u64,
            Op::Barrier => self.barrier,
            Op::Increment => self.increment,
            Op::ReduceStep => self.reduce_step,
        }
    }
}

/// Which counter the units of a launch use
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ClockSource {
    /// Host monotonic clock scaled to a device frequency
    Wall {
        /// Device frequency in MHz
        mhz: f64,
    },
    /// Deterministic cost model
    Modeled(CostModel),
}

impl Default for ClockSource {
    fn default() -> Self {
        Self::Wall {
            mhz: DEFAULT_CLOCK_MHZ,
        }
    }
}

/// Cycle counter owned by one execution unit for one launch
#[derive(Debug)]
pub enum UnitClock {
    /// Wall-derived counter
    Wall {
        /// Shared launch origin
        origin: Instant,
        /// Device frequency in MHz
        mhz: f64,
    },
    /// Modelled counter
    Modeled {
        /// Current cycle count
        cycles: Cell<u64>,
        /// Operation costs
        cost: CostModel,
    },
}

impl UnitClock {
    /// Create a counter for one unit; `origin` is shared by the launch
    #[must_use]
    pub fn new(source: ClockSource, origin: Instant) -> Self {
        match source {
            ClockSource::Wall { mhz } => Self::Wall { origin, mhz },
            ClockSource::Modeled(cost) => Self::Modeled {
                cycles: Cell::new(0),
                cost,
            },
        }
    }

    /// Current counter value
    #[must_use]
    pub fn now(&self) -> u64 {
        match self {
            Self::Wall { origin, mhz } => {
                (origin.elapsed().as_nanos() as f64 * mhz / 1000.0) as u64
            },
            Self::Modeled { cycles, .. } => cycles.get(),
        }
    }

    /// Account for an operation (no-op on the wall counter)
    pub fn charge(&self, op: Op) {
        if let Self::Modeled { cycles, cost } = self {
            cycles.set(cycles.get().saturating_add(cost.cycles(op)));
        }
    }

    /// Move forward to `cycles` if behind (no-op on the wall counter)
    pub fn align_to(&self, target: u64) {
        if let Self::Modeled { cycles, .. } = self {
            if cycles.get() < target {
                cycles.set(target);
            }
        }
    }
}
