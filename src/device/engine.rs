//! Device benchmark engine
//!
//! [`run_unit`] is the program every execution unit runs for one launch:
//!
//! ```text
//! barrier ─► decode variant ─► evaluate (timed window) ─► barrier
//! ```
//!
//! The entry and exit barriers keep the host from observing results of a
//! launch that is still in flight. Timing windows never include them.
//!
//! # Reduce timing window
//!
//! The reduce variant stops every unit's counter after the post-accumulate
//! barrier, and unit 0 additionally after its reduction. Reported cycles
//! therefore mix local compute with the wait for the slowest unit. This is
//! how the measurement has always been taken and results stay comparable
//! with earlier runs; treat reduce numbers as "compute + sync" cost.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::descriptor::{BenchmarkDescriptor, PerUnitResult};
use crate::device::barrier::Barrier;
use crate::device::clock::{Op, UnitClock};
use crate::device::memory::{LocalScratch, WorkingMemoryRegion};
use crate::device::variant::{BenchmarkVariant, RegionAccess};

/// Device state shared by all units of one launch
#[derive(Debug)]
pub struct DeviceShared<'a> {
    /// Working-memory region
    pub region: &'a WorkingMemoryRegion,
    /// All-unit barrier
    pub barrier: &'a Barrier,
    /// One accumulator slot per unit (reduce variant)
    pub accumulators: &'a [AtomicU32],
}

impl DeviceShared<'_> {
    /// Number of units taking part in the launch
    #[must_use]
    pub fn units(&self) -> usize {
        self.barrier.participants()
    }
}

/// Private state of one execution unit
#[derive(Debug)]
pub struct UnitContext<'a> {
    /// Unit index within the device
    pub unit_id: usize,
    /// Cycle counter
    pub clock: UnitClock,
    /// Private scratch buffers
    pub scratch: LocalScratch,
    /// Device-wide state
    pub shared: &'a DeviceShared<'a>,
}

impl<'a> UnitContext<'a> {
    /// Fresh context for `unit_id`
    #[must_use]
    pub fn new(unit_id: usize, clock: UnitClock, shared: &'a DeviceShared<'a>) -> Self {
        Self {
            unit_id,
            clock,
            scratch: LocalScratch::new(),
            shared,
        }
    }

    /// Wait for all units, lining modelled counters up on the latest arrival
    pub fn sync(&self) {
        let latest = self.shared.barrier.arrive_with_stamp(self.clock.now());
        self.clock.align_to(latest);
        self.clock.charge(Op::Barrier);
    }
}

/// Run one launch on one unit
///
/// Every unit of the device must call this with the same descriptor.
#[must_use]
pub fn run_unit(descriptor: &BenchmarkDescriptor, ctx: &mut UnitContext<'_>) -> PerUnitResult {
    ctx.sync();
    let result = match BenchmarkVariant::from_descriptor(descriptor) {
        Some(variant) if !variant.is_degenerate() => evaluate(&variant, ctx),
        _ => PerUnitResult::ZERO,
    };
    ctx.sync();
    result
}

/// Evaluate one non-degenerate variant
pub fn evaluate(variant: &BenchmarkVariant, ctx: &mut UnitContext<'_>) -> PerUnitResult {
    match *variant {
        BenchmarkVariant::RegionRead(access) => region_read(&access, ctx),
        BenchmarkVariant::RegionWrite(access) => region_write(&access, ctx),
        BenchmarkVariant::ScratchCopy { size, repetitions } => scratch_copy(size, repetitions, ctx),
        BenchmarkVariant::Barrier { repetitions } => barrier_round_trip(repetitions, ctx),
        BenchmarkVariant::Reduce { repetitions } => accumulate_reduce(repetitions, ctx),
    }
}

fn region_read(access: &RegionAccess, ctx: &mut UnitContext<'_>) -> PerUnitResult {
    let region = ctx.shared.region;
    let capacity = region.capacity();
    let size = access.size;

    let start = ctx.clock.now();
    let mut done = 0u32;
    for offset in access.offsets(ctx.unit_id, capacity) {
        if region.read(offset, ctx.scratch.primary_mut(size)).is_err() {
            break;
        }
        ctx.clock.charge(Op::Dma { bytes: size });
        done += 1;
    }
    let end = ctx.clock.now();

    PerUnitResult {
        cycles_total: end.saturating_sub(start),
        ops_completed: done,
    }
}

fn region_write(access: &RegionAccess, ctx: &mut UnitContext<'_>) -> PerUnitResult {
    let region = ctx.shared.region;
    let capacity = region.capacity();
    let size = access.size;
    ctx.scratch.fill_unit_pattern(size, ctx.unit_id);

    let start = ctx.clock.now();
    let mut done = 0u32;
    for offset in access.offsets(ctx.unit_id, capacity) {
        if region.write(offset, ctx.scratch.primary(size)).is_err() {
            break;
        }
        ctx.clock.charge(Op::Dma { bytes: size });
        done += 1;
    }
    let end = ctx.clock.now();

    PerUnitResult {
        cycles_total: end.saturating_sub(start),
        ops_completed: done,
    }
}

fn scratch_copy(size: usize, repetitions: u32, ctx: &mut UnitContext<'_>) -> PerUnitResult {
    ctx.scratch.fill_unit_pattern(size, ctx.unit_id);

    let start = ctx.clock.now();
    for _ in 0..repetitions {
        ctx.scratch.copy_primary_to_secondary(size);
        ctx.clock.charge(Op::ScratchCopy { bytes: size });
    }
    let end = ctx.clock.now();

    PerUnitResult {
        cycles_total: end.saturating_sub(start),
        ops_completed: repetitions,
    }
}

fn barrier_round_trip(repetitions: u32, ctx: &mut UnitContext<'_>) -> PerUnitResult {
    let start = ctx.clock.now();
    for _ in 0..repetitions {
        ctx.sync();
    }
    let end = ctx.clock.now();

    PerUnitResult {
        cycles_total: end.saturating_sub(start),
        ops_completed: repetitions,
    }
}

fn accumulate_reduce(repetitions: u32, ctx: &mut UnitContext<'_>) -> PerUnitResult {
    let slots = ctx.shared.accumulators;

    let start = ctx.clock.now();
    let mut acc = 0u32;
    for _ in 0..repetitions {
        acc = std::hint::black_box(acc.wrapping_add(1));
        ctx.clock.charge(Op::Increment);
    }
    if let Some(slot) = slots.get(ctx.unit_id) {
        slot.store(acc, Ordering::Relaxed);
    }

    // The barrier orders every slot store before unit 0's loads.
    ctx.sync();
    if ctx.unit_id == 0 {
        let total = slots.iter().fold(0u32, |total, slot| {
            ctx.clock.charge(Op::ReduceStep);
            total.wrapping_add(slot.load(Ordering::Relaxed))
        });
        std::hint::black_box(total);
    }
    let end = ctx.clock.now();

    PerUnitResult {
        cycles_total: end.saturating_sub(start),
        ops_completed: repetitions,
    }
}
