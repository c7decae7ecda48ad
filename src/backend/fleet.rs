//! Fleet of simulated devices
//!
//! Devices are independent: transfers and launches fan out across them on
//! the rayon pool, each device launch then spawning its own unit threads.

use rayon::prelude::*;

use crate::backend::{ExecutionBackend, PullPlan, PushPlan};
use crate::descriptor::{BenchmarkDescriptor, PerUnitResult};
use crate::device::{ClockSource, SimulatedDevice};
use crate::error::{BenchError, Result};

/// Devices handed out when the caller asks for "all available"
pub const SIMULATED_FLEET_CAPACITY: usize = 8;

/// In-process fleet backend
#[derive(Debug)]
pub struct SimulatedFleet {
    devices: Vec<SimulatedDevice>,
    units: usize,
}

impl SimulatedFleet {
    /// Allocate `devices` devices (0 = [`SIMULATED_FLEET_CAPACITY`]) with
    /// `units` execution units each
    ///
    /// # Errors
    ///
    /// `InvalidConfiguration` if more devices than available are requested
    /// or `units` is zero; `AllocationFailed` if a region cannot be allocated.
    pub fn new(devices: usize, units: usize, clock: ClockSource) -> Result<Self> {
        let count = if devices == 0 {
            SIMULATED_FLEET_CAPACITY
        } else {
            devices
        };
        if count > SIMULATED_FLEET_CAPACITY {
            return Err(BenchError::InvalidConfiguration(format!(
                "requested {count} devices, only {SIMULATED_FLEET_CAPACITY} available"
            )));
        }
        let devices = (0..count)
            .map(|id| SimulatedDevice::new(id, units, clock))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { devices, units })
    }

    /// Build a fleet from pre-constructed devices
    ///
    /// # Errors
    ///
    /// `InvalidConfiguration` if devices disagree on their unit count.
    pub fn from_devices(devices: Vec<SimulatedDevice>) -> Result<Self> {
        let units = devices.first().map_or(0, SimulatedDevice::units);
        if devices.iter().any(|d| d.units() != units) {
            return Err(BenchError::InvalidConfiguration(
                "all devices of a fleet must run the same number of units".to_string(),
            ));
        }
        Ok(Self { devices, units })
    }

    /// Borrow one device
    ///
    /// # Errors
    ///
    /// `UnknownDevice` for an index outside the fleet.
    pub fn device(&self, device: usize) -> Result<&SimulatedDevice> {
        self.devices.get(device).ok_or(BenchError::UnknownDevice {
            device,
            fleet_size: self.devices.len(),
        })
    }

    /// Copy out `len` bytes of one device's region
    ///
    /// # Errors
    ///
    /// `UnknownDevice`, `Misaligned` or `OutOfRange`.
    pub fn region_snapshot(&self, device: usize, offset: usize, len: usize) -> Result<Vec<u8>> {
        self.device(device)?.region().snapshot(offset, len)
    }

    fn check_plan_device(&self, device: usize) -> Result<()> {
        if device < self.devices.len() {
            Ok(())
        } else {
            Err(BenchError::UnknownDevice {
                device,
                fleet_size: self.devices.len(),
            })
        }
    }
}

fn short_buffer(operation: &'static str, device: usize, have: usize, len: usize) -> BenchError {
    BenchError::TransferFailed {
        operation,
        reason: format!("buffer for device {device} holds {have} bytes, transfer needs {len}"),
    }
}

impl ExecutionBackend for SimulatedFleet {
    fn name(&self) -> &str {
        "simulated"
    }

    fn device_count(&self) -> usize {
        self.devices.len()
    }

    fn units_per_device(&self) -> usize {
        self.units
    }

    fn broadcast(&mut self, offset: usize, data: &[u8]) -> Result<()> {
        self.devices
            .par_iter()
            .try_for_each(|device| device.region().write(offset, data))
    }

    fn copy_from(&mut self, device: usize, offset: usize, dst: &mut [u8]) -> Result<()> {
        self.device(device)?.region().read(offset, dst)
    }

    fn push(&mut self, plan: &PushPlan<'_>, offset: usize, len: usize) -> Result<()> {
        for device in plan.devices() {
            self.check_plan_device(device)?;
        }
        let devices = &self.devices;
        plan.entries().par_iter().try_for_each(|&(device, buffer)| {
            let data = buffer
                .get(..len)
                .ok_or_else(|| short_buffer("push", device, buffer.len(), len))?;
            devices[device].region().write(offset, data)
        })
    }

    fn pull(&mut self, plan: &mut PullPlan<'_>, offset: usize, len: usize) -> Result<()> {
        for device in plan.devices() {
            self.check_plan_device(device)?;
        }
        let devices = &self.devices;
        plan.entries_mut()
            .par_iter_mut()
            .try_for_each(|(device, buffer)| {
                let have = buffer.len();
                let dst = buffer
                    .get_mut(..len)
                    .ok_or_else(|| short_buffer("pull", *device, have, len))?;
                devices[*device].region().read(offset, dst)
            })
    }

    fn submit(&mut self, descriptor: &BenchmarkDescriptor) -> Result<Vec<Vec<PerUnitResult>>> {
        for device in &mut self.devices {
            device.write_descriptor(descriptor);
        }
        self.devices
            .par_iter_mut()
            .try_for_each(SimulatedDevice::launch)?;
        Ok(self
            .devices
            .iter()
            .map(SimulatedDevice::read_results)
            .collect())
    }
}
