//! Device side: what each execution unit runs, and the memories it runs on
//!
//! ## Contents
//! - `barrier` - all-unit synchronisation primitive
//! - `clock` - per-unit cycle counters (wall-derived or cost-modelled)
//! - `memory` - working-memory region and local scratch
//! - `variant` - descriptor → tagged benchmark variant
//! - `engine` - the per-unit benchmark program
//! - `simulated` - an in-process device running units as threads

mod barrier;
mod clock;
mod engine;
mod memory;
mod simulated;
mod variant;

pub use barrier::Barrier;
pub use clock::{ClockSource, CostModel, Op, UnitClock, DEFAULT_CLOCK_MHZ};
pub use engine::{evaluate, run_unit, DeviceShared, UnitContext};
pub use memory::{LocalScratch, WorkingMemoryRegion};
pub use simulated::SimulatedDevice;
pub use variant::{effective_size, BenchmarkVariant, RegionAccess};
