//! In-process device
//!
//! A [`SimulatedDevice`] owns the three device-resident symbols (descriptor
//! slot, results slot, working-memory region) and runs one OS thread per
//! execution unit for each launch. Units must be real threads rather than
//! pool tasks: the barrier blocks until every unit arrives, which a pool
//! smaller than the unit count would never satisfy.

use std::sync::atomic::AtomicU32;
use std::time::Instant;

use crate::descriptor::{
    BenchmarkDescriptor, PerUnitResult, DESCRIPTOR_BYTES, REGION_CAPACITY, RESULT_BYTES,
};
use crate::device::barrier::Barrier;
use crate::device::clock::{ClockSource, UnitClock};
use crate::device::engine::{run_unit, DeviceShared, UnitContext};
use crate::device::memory::WorkingMemoryRegion;
use crate::error::{BenchError, Result};

/// One simulated device
#[derive(Debug)]
pub struct SimulatedDevice {
    id: usize,
    units: usize,
    clock: ClockSource,
    descriptor_slot: [u8; DESCRIPTOR_BYTES],
    results_slot: Vec<u8>,
    region: WorkingMemoryRegion,
}

impl SimulatedDevice {
    /// Create a device with the standard 8 MiB region
    ///
    /// # Errors
    ///
    /// `InvalidConfiguration` for zero units, `AllocationFailed` if the
    /// region cannot be allocated.
    pub fn new(id: usize, units: usize, clock: ClockSource) -> Result<Self> {
        Self::with_region_capacity(id, units, clock, REGION_CAPACITY)
    }

    /// Create a device with a custom region capacity
    ///
    /// # Errors
    ///
    /// See [`Self::new`].
    pub fn with_region_capacity(
        id: usize,
        units: usize,
        clock: ClockSource,
        capacity: usize,
    ) -> Result<Self> {
        if units == 0 {
            return Err(BenchError::InvalidConfiguration(
                "a device needs at least one execution unit".to_string(),
            ));
        }
        Ok(Self {
            id,
            units,
            clock,
            descriptor_slot: [0; DESCRIPTOR_BYTES],
            results_slot: vec![0; units * RESULT_BYTES],
            region: WorkingMemoryRegion::new(capacity)?,
        })
    }

    /// Device index in its fleet
    #[must_use]
    pub fn id(&self) -> usize {
        self.id
    }

    /// Execution units per launch
    #[must_use]
    pub fn units(&self) -> usize {
        self.units
    }

    /// Working-memory region
    #[must_use]
    pub fn region(&self) -> &WorkingMemoryRegion {
        &self.region
    }

    /// Copy a descriptor into the descriptor slot
    pub fn write_descriptor(&mut self, descriptor: &BenchmarkDescriptor) {
        self.descriptor_slot = descriptor.to_bytes();
    }

    /// Run the engine on every unit and fill the results slot
    ///
    /// Returns only after every unit has passed the exit barrier.
    ///
    /// # Errors
    ///
    /// `LaunchFailed` if a unit thread panicked.
    pub fn launch(&mut self) -> Result<()> {
        let descriptor = BenchmarkDescriptor::from_bytes(&self.descriptor_slot);
        let barrier = Barrier::new(self.units);
        let accumulators: Vec<AtomicU32> = (0..self.units).map(|_| AtomicU32::new(0)).collect();
        let shared = DeviceShared {
            region: &self.region,
            barrier: &barrier,
            accumulators: &accumulators,
        };
        let source = self.clock;
        let origin = Instant::now();

        let outcomes: Vec<std::thread::Result<PerUnitResult>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..self.units)
                .map(|unit| {
                    let shared = &shared;
                    s.spawn(move || {
                        let mut ctx = UnitContext::new(unit, UnitClock::new(source, origin), shared);
                        run_unit(&descriptor, &mut ctx)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join()).collect()
        });

        for (unit, outcome) in outcomes.into_iter().enumerate() {
            let result = outcome.map_err(|_| BenchError::LaunchFailed {
                reason: format!("device {} unit {unit} panicked", self.id),
            })?;
            let start = unit * RESULT_BYTES;
            self.results_slot[start..start + RESULT_BYTES].copy_from_slice(&result.to_bytes());
        }
        Ok(())
    }

    /// Decode the results slot
    #[must_use]
    pub fn read_results(&self) -> Vec<PerUnitResult> {
        PerUnitResult::decode_slot(&self.results_slot)
    }
}
