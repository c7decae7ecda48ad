//! Execution backend abstraction
//!
//! Everything the host does to a fleet goes through [`ExecutionBackend`]:
//! bulk transfers into and out of working-memory regions, and launches.
//!
//! # Architecture
//!
//! ```text
//! SweepController / HostTransferBenchmark
//!    │
//!    └─► &mut dyn ExecutionBackend
//!              │
//!              ├─► SimulatedFleet (in-process devices)
//!              └─► MockBackend (testing)
//! ```
//!
//! The prepare/push protocol is expressed as a plan: callers associate one
//! host buffer with each participating device (`prepare`), then hand the
//! plan to a single fleet-scoped `push` or `pull`. Devices absent from the
//! plan are not touched.

mod fleet;
mod mock;

pub use fleet::{SimulatedFleet, SIMULATED_FLEET_CAPACITY};
pub use mock::{device_marker, BackendCall, MockBackend};

use crate::descriptor::{BenchmarkDescriptor, PerUnitResult};
use crate::error::Result;

/// Host buffers associated with devices for one host → device push
#[derive(Debug, Default)]
pub struct PushPlan<'a> {
    entries: Vec<(usize, &'a [u8])>,
}

impl<'a> PushPlan<'a> {
    /// Empty plan
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty plan with room for `devices` entries
    #[must_use]
    pub fn with_capacity(devices: usize) -> Self {
        Self {
            entries: Vec::with_capacity(devices),
        }
    }

    /// Associate `buffer` with `device`
    pub fn prepare(&mut self, device: usize, buffer: &'a [u8]) {
        self.entries.push((device, buffer));
    }

    /// Number of prepared devices
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been prepared
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Prepared devices in preparation order
    pub fn devices(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries.iter().map(|&(device, _)| device)
    }

    /// Prepared (device, buffer) pairs
    #[must_use]
    pub fn entries(&self) -> &[(usize, &'a [u8])] {
        &self.entries
    }
}

/// Host buffers associated with devices for one device → host pull
#[derive(Debug, Default)]
pub struct PullPlan<'a> {
    entries: Vec<(usize, &'a mut [u8])>,
}

impl<'a> PullPlan<'a> {
    /// Empty plan
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty plan with room for `devices` entries
    #[must_use]
    pub fn with_capacity(devices: usize) -> Self {
        Self {
            entries: Vec::with_capacity(devices),
        }
    }

    /// Associate `buffer` with `device`
    pub fn prepare(&mut self, device: usize, buffer: &'a mut [u8]) {
        self.entries.push((device, buffer));
    }

    /// Number of prepared devices
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been prepared
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Prepared devices in preparation order
    pub fn devices(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries.iter().map(|(device, _)| *device)
    }

    /// Prepared (device, buffer) pairs, mutably
    pub fn entries_mut(&mut self) -> &mut [(usize, &'a mut [u8])] {
        &mut self.entries
    }
}

/// A fleet of devices the host can transfer to and launch on
///
/// All calls are synchronous. Any error is fatal to the benchmark run.
pub trait ExecutionBackend: Send {
    /// Backend name for logs
    fn name(&self) -> &str;

    /// Number of devices in the fleet
    fn device_count(&self) -> usize;

    /// Execution units per device
    fn units_per_device(&self) -> usize;

    /// Write `data` into every device's region at `offset`
    ///
    /// # Errors
    ///
    /// Returns `BenchError` on alignment/bounds violations or backend failure.
    fn broadcast(&mut self, offset: usize, data: &[u8]) -> Result<()>;

    /// Read `dst.len()` bytes at `offset` from one device's region
    ///
    /// # Errors
    ///
    /// Returns `BenchError` for an unknown device, alignment/bounds
    /// violations or backend failure.
    fn copy_from(&mut self, device: usize, offset: usize, dst: &mut [u8]) -> Result<()>;

    /// Push the first `len` bytes of each prepared buffer to its device
    ///
    /// # Errors
    ///
    /// Returns `BenchError` if a buffer is shorter than `len`, a device is
    /// unknown, the access is invalid, or the backend fails.
    fn push(&mut self, plan: &PushPlan<'_>, offset: usize, len: usize) -> Result<()>;

    /// Pull `len` bytes from each prepared device into its buffer
    ///
    /// # Errors
    ///
    /// See [`ExecutionBackend::push`].
    fn pull(&mut self, plan: &mut PullPlan<'_>, offset: usize, len: usize) -> Result<()>;

    /// Launch one benchmark on every device and wait for completion
    ///
    /// Returns one result per unit, grouped by device in fleet order.
    ///
    /// # Errors
    ///
    /// Returns `BenchError::LaunchFailed` if any device fails.
    fn submit(&mut self, descriptor: &BenchmarkDescriptor) -> Result<Vec<Vec<PerUnitResult>>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_plan_prepare_order() {
        let a = [1u8; 8];
        let b = [2u8; 8];
        let mut plan = PushPlan::with_capacity(2);
        assert!(plan.is_empty());
        plan.prepare(5, &a);
        plan.prepare(2, &b);
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.devices().collect::<Vec<_>>(), vec![5, 2]);
        assert_eq!(plan.entries()[1].1, &[2u8; 8]);
    }

    #[test]
    fn test_pull_plan_buffers_writable() {
        let mut a = [0u8; 8];
        let mut b = [0u8; 8];
        {
            let mut plan = PullPlan::new();
            plan.prepare(0, &mut a);
            plan.prepare(1, &mut b);
            for (device, buf) in plan.entries_mut() {
                buf.fill(*device as u8 + 10);
            }
            assert_eq!(plan.devices().collect::<Vec<_>>(), vec![0, 1]);
        }
        assert_eq!(a, [10; 8]);
        assert_eq!(b, [11; 8]);
    }
}
