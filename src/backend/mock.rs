//! Mock backend for testing host-side logic without devices
//!
//! Records every call for verification and returns configurable results.
//! Pulled buffers are filled with a per-device marker byte so callers can
//! check which device each buffer was associated with.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::backend::{ExecutionBackend, PullPlan, PushPlan};
use crate::descriptor::{BenchmarkDescriptor, PerUnitResult};
use crate::error::{BenchError, Result};

/// Call record for [`MockBackend`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    /// Fleet-wide write
    Broadcast {
        /// Region offset
        offset: usize,
        /// Bytes written per device
        len: usize,
    },
    /// Single-device read
    CopyFrom {
        /// Device index
        device: usize,
        /// Region offset
        offset: usize,
        /// Bytes read
        len: usize,
    },
    /// Prepared host → device transfer
    Push {
        /// Prepared devices in order
        devices: Vec<usize>,
        /// Region offset
        offset: usize,
        /// Bytes per device
        len: usize,
    },
    /// Prepared device → host transfer
    Pull {
        /// Prepared devices in order
        devices: Vec<usize>,
        /// Region offset
        offset: usize,
        /// Bytes per device
        len: usize,
    },
    /// Launch
    Submit {
        /// Descriptor handed to the fleet
        descriptor: BenchmarkDescriptor,
    },
}

impl BackendCall {
    /// Operation name, as used for failure injection
    #[must_use]
    pub fn operation(&self) -> &'static str {
        match self {
            Self::Broadcast { .. } => "broadcast",
            Self::CopyFrom { .. } => "copy_from",
            Self::Push { .. } => "push",
            Self::Pull { .. } => "pull",
            Self::Submit { .. } => "submit",
        }
    }
}

/// Marker byte written into buffers pulled from `device`
#[must_use]
pub fn device_marker(device: usize) -> u8 {
    (device % 251) as u8 + 1
}

/// Call-recording backend with a fixed fleet shape
#[derive(Debug)]
pub struct MockBackend {
    devices: usize,
    units: usize,
    unit_result: PerUnitResult,
    fail_on: Option<&'static str>,
    calls: Mutex<Vec<BackendCall>>,
}

impl MockBackend {
    /// Mock fleet of `devices` devices with `units` units each
    #[must_use]
    pub fn new(devices: usize, units: usize) -> Self {
        Self {
            devices,
            units,
            unit_result: PerUnitResult::ZERO,
            fail_on: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Result every unit reports on `submit`
    #[must_use]
    pub fn with_unit_result(mut self, result: PerUnitResult) -> Self {
        self.unit_result = result;
        self
    }

    /// Fail every call to `operation` (`broadcast`, `copy_from`, `push`,
    /// `pull` or `submit`) after recording it
    #[must_use]
    pub fn with_failure(mut self, operation: &'static str) -> Self {
        self.fail_on = Some(operation);
        self
    }

    fn lock_calls(&self) -> MutexGuard<'_, Vec<BackendCall>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, call: BackendCall) -> Result<()> {
        let operation = call.operation();
        self.lock_calls().push(call);
        match self.fail_on {
            Some(failing) if failing == operation => {
                if operation == "submit" {
                    Err(BenchError::LaunchFailed {
                        reason: "MockBackend configured to fail".to_string(),
                    })
                } else {
                    Err(BenchError::TransferFailed {
                        operation,
                        reason: "MockBackend configured to fail".to_string(),
                    })
                }
            },
            _ => Ok(()),
        }
    }

    fn check_device(&self, device: usize) -> Result<()> {
        if device < self.devices {
            Ok(())
        } else {
            Err(BenchError::UnknownDevice {
                device,
                fleet_size: self.devices,
            })
        }
    }

    /// All recorded calls
    #[must_use]
    pub fn calls(&self) -> Vec<BackendCall> {
        self.lock_calls().clone()
    }

    /// Number of recorded calls to `operation`
    #[must_use]
    pub fn count(&self, operation: &str) -> usize {
        self.lock_calls()
            .iter()
            .filter(|call| call.operation() == operation)
            .count()
    }

    /// Clear recorded calls
    pub fn clear_calls(&self) {
        self.lock_calls().clear();
    }
}

impl ExecutionBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    fn device_count(&self) -> usize {
        self.devices
    }

    fn units_per_device(&self) -> usize {
        self.units
    }

    fn broadcast(&mut self, offset: usize, data: &[u8]) -> Result<()> {
        self.record(BackendCall::Broadcast {
            offset,
            len: data.len(),
        })
    }

    fn copy_from(&mut self, device: usize, offset: usize, dst: &mut [u8]) -> Result<()> {
        self.record(BackendCall::CopyFrom {
            device,
            offset,
            len: dst.len(),
        })?;
        self.check_device(device)?;
        dst.fill(device_marker(device));
        Ok(())
    }

    fn push(&mut self, plan: &PushPlan<'_>, offset: usize, len: usize) -> Result<()> {
        self.record(BackendCall::Push {
            devices: plan.devices().collect(),
            offset,
            len,
        })?;
        for device in plan.devices() {
            self.check_device(device)?;
        }
        Ok(())
    }

    fn pull(&mut self, plan: &mut PullPlan<'_>, offset: usize, len: usize) -> Result<()> {
        self.record(BackendCall::Pull {
            devices: plan.devices().collect(),
            offset,
            len,
        })?;
        for (device, buffer) in plan.entries_mut() {
            self.check_device(*device)?;
            let marker = device_marker(*device);
            for byte in buffer.iter_mut().take(len) {
                *byte = marker;
            }
        }
        Ok(())
    }

    fn submit(&mut self, descriptor: &BenchmarkDescriptor) -> Result<Vec<Vec<PerUnitResult>>> {
        self.record(BackendCall::Submit {
            descriptor: *descriptor,
        })?;
        Ok(vec![vec![self.unit_result; self.units]; self.devices])
    }
}
