//! Host ↔ device bulk-transfer benchmark
//!
//! Four routines, two strategies per direction:
//!
//! | Routine                 | Strategy                                  |
//! |-------------------------|-------------------------------------------|
//! | `host_h2d`              | broadcast one buffer to the whole fleet   |
//! | `host_d2h`              | copy from each device into one buffer     |
//! | `host_h2d_prepare_push` | prepare the buffer per device, one push   |
//! | `host_d2h_prepare_push` | windowed prepare + pull through a pool    |
//!
//! Only the repetition loop is timed; seeding and buffer allocation are not.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::backend::{ExecutionBackend, PullPlan, PushPlan};
use crate::descriptor::{align8_down, REGION_CAPACITY, REGION_ALIGNMENT};
use crate::error::Result;
use crate::host::buffer::AlignedBuffer;
use crate::host::pool::TransferBufferPool;
use crate::host::windows::FleetWindows;

/// Default number of devices per batched device → host window
pub const DEFAULT_WINDOW: usize = 64;

/// Fill byte of every host transfer buffer
pub const HOST_FILL: u8 = 0xA5;

/// Region seed used before batched device → host reads
pub const SEED_FILL: u8 = 0x5A;

/// Transfer size actually moved for a requested byte count
///
/// Clamped to region capacity, rounded down to 8 bytes, never below 8.
#[must_use]
pub fn effective_transfer_size(requested: usize) -> usize {
    align8_down(requested.min(REGION_CAPACITY)).max(REGION_ALIGNMENT)
}

/// Host-path benchmark routine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostTransfer {
    /// Broadcast host → device
    DirectH2D,
    /// Per-device copy device → host
    DirectD2H,
    /// Prepared fleet-wide push host → device
    BatchedH2D,
    /// Windowed prepared pull device → host
    BatchedD2H,
}

impl HostTransfer {
    /// Every routine in execution order
    pub const ALL: [Self; 4] = [
        Self::DirectH2D,
        Self::DirectD2H,
        Self::BatchedH2D,
        Self::BatchedD2H,
    ];

    /// Row name in the CSV output
    #[must_use]
    pub const fn row_name(self) -> &'static str {
        match self {
            Self::DirectH2D => "host_h2d",
            Self::DirectD2H => "host_d2h",
            Self::BatchedH2D => "host_h2d_prepare_push",
            Self::BatchedD2H => "host_d2h_prepare_push",
        }
    }

    /// Whether every device's bytes count toward the throughput
    #[must_use]
    pub const fn counts_fleet(self) -> bool {
        !matches!(self, Self::DirectH2D)
    }
}

/// Timing of one host routine
#[derive(Debug, Clone, PartialEq)]
pub struct HostMeasurement {
    /// Routine measured
    pub transfer: HostTransfer,
    /// Effective transfer size per device
    pub bytes: usize,
    /// Repetitions run
    pub repetitions: u32,
    /// Wall time of the repetition loop
    pub elapsed: Duration,
    /// Bytes counted toward throughput
    pub bytes_moved: u64,
}

impl HostMeasurement {
    /// Elapsed wall time in milliseconds
    #[must_use]
    pub fn host_ms(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }

    /// Throughput in megabytes (10^6 bytes) per millisecond, 0 if no time elapsed
    #[must_use]
    pub fn throughput(&self) -> f64 {
        let ms = self.host_ms();
        if ms > 0.0 {
            (self.bytes_moved as f64 / 1e6) / ms
        } else {
            0.0
        }
    }
}

/// Driver for the four host-path routines
#[derive(Debug, Clone)]
pub struct HostTransferBenchmark {
    window: usize,
}

impl Default for HostTransferBenchmark {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl HostTransferBenchmark {
    /// Driver whose batched reads use windows of at most `window` devices
    /// (a zero window is treated as 1)
    #[must_use]
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
        }
    }

    /// Window size in effect
    #[must_use]
    pub fn window(&self) -> usize {
        self.window
    }

    /// Run one routine
    ///
    /// # Errors
    ///
    /// Any backend or allocation failure, unchanged.
    pub fn run(
        &self,
        transfer: HostTransfer,
        backend: &mut dyn ExecutionBackend,
        bytes: usize,
        repetitions: u32,
    ) -> Result<HostMeasurement> {
        let size = effective_transfer_size(bytes);
        debug!(
            routine = transfer.row_name(),
            backend = backend.name(),
            size,
            repetitions,
            "host transfer"
        );
        let elapsed = match transfer {
            HostTransfer::DirectH2D => Self::direct_h2d(backend, size, repetitions)?,
            HostTransfer::DirectD2H => Self::direct_d2h(backend, size, repetitions)?,
            HostTransfer::BatchedH2D => Self::batched_h2d(backend, size, repetitions)?,
            HostTransfer::BatchedD2H => self.batched_d2h(backend, size, repetitions)?,
        };

        let fleet = if transfer.counts_fleet() {
            backend.device_count() as u64
        } else {
            1
        };
        Ok(HostMeasurement {
            transfer,
            bytes: size,
            repetitions,
            elapsed,
            bytes_moved: size as u64 * u64::from(repetitions) * fleet,
        })
    }

    fn direct_h2d(
        backend: &mut dyn ExecutionBackend,
        size: usize,
        repetitions: u32,
    ) -> Result<Duration> {
        let buffer = AlignedBuffer::new(size, HOST_FILL)?;

        let start = Instant::now();
        for _ in 0..repetitions {
            backend.broadcast(0, buffer.as_slice())?;
        }
        Ok(start.elapsed())
    }

    fn direct_d2h(
        backend: &mut dyn ExecutionBackend,
        size: usize,
        repetitions: u32,
    ) -> Result<Duration> {
        let mut buffer = AlignedBuffer::new(size, HOST_FILL)?;
        let seed = AlignedBuffer::new(size, HOST_FILL)?;
        backend.broadcast(0, seed.as_slice())?;
        drop(seed);

        let devices = backend.device_count();
        let start = Instant::now();
        for _ in 0..repetitions {
            for device in 0..devices {
                backend.copy_from(device, 0, buffer.as_mut_slice())?;
            }
        }
        Ok(start.elapsed())
    }

    fn batched_h2d(
        backend: &mut dyn ExecutionBackend,
        size: usize,
        repetitions: u32,
    ) -> Result<Duration> {
        let buffer = AlignedBuffer::new(size, HOST_FILL)?;
        backend.broadcast(0, buffer.as_slice())?;

        let devices = backend.device_count();
        let start = Instant::now();
        for _ in 0..repetitions {
            let mut plan = PushPlan::with_capacity(devices);
            for device in 0..devices {
                plan.prepare(device, buffer.as_slice());
            }
            backend.push(&plan, 0, size)?;
        }
        Ok(start.elapsed())
    }

    fn batched_d2h(
        &self,
        backend: &mut dyn ExecutionBackend,
        size: usize,
        repetitions: u32,
    ) -> Result<Duration> {
        let seed = AlignedBuffer::new(size, SEED_FILL)?;
        backend.broadcast(0, seed.as_slice())?;
        drop(seed);

        let devices = backend.device_count();
        let mut pool = TransferBufferPool::new(self.window.min(devices), size, HOST_FILL)?;
        debug!(
            buffers = pool.capacity(),
            footprint = pool.footprint_bytes(),
            "batched pull pool"
        );

        let start = Instant::now();
        for _ in 0..repetitions {
            for window in FleetWindows::new(devices, self.window) {
                let mut lease = pool.checkout(window.len())?;
                let mut plan = PullPlan::with_capacity(window.len());
                for (device, buffer) in window.devices.clone().zip(lease.iter_mut()) {
                    plan.prepare(device, buffer.as_mut_slice());
                }
                backend.pull(&mut plan, 0, size)?;
            }
        }
        Ok(start.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendCall, MockBackend};
    use crate::error::BenchError;

    #[test]
    fn test_effective_transfer_size() {
        assert_eq!(effective_transfer_size(0), 8);
        assert_eq!(effective_transfer_size(7), 8);
        assert_eq!(effective_transfer_size(13), 8);
        assert_eq!(effective_transfer_size(64), 64);
        assert_eq!(effective_transfer_size(1 << 26), REGION_CAPACITY);
    }

    #[test]
    fn test_row_names() {
        let names: Vec<_> = HostTransfer::ALL.iter().map(|t| t.row_name()).collect();
        assert_eq!(
            names,
            vec![
                "host_h2d",
                "host_d2h",
                "host_h2d_prepare_push",
                "host_d2h_prepare_push"
            ]
        );
    }

    #[test]
    fn test_throughput_zero_elapsed() {
        let m = HostMeasurement {
            transfer: HostTransfer::DirectH2D,
            bytes: 64,
            repetitions: 1,
            elapsed: Duration::ZERO,
            bytes_moved: 64,
        };
        assert_eq!(m.throughput(), 0.0);
    }

    #[test]
    fn test_throughput_units() {
        let m = HostMeasurement {
            transfer: HostTransfer::DirectD2H,
            bytes: 1_000_000,
            repetitions: 2,
            elapsed: Duration::from_millis(4),
            bytes_moved: 2_000_000,
        };
        assert!((m.host_ms() - 4.0).abs() < 1e-9);
        assert!((m.throughput() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_direct_h2d_broadcasts_per_rep() {
        let mut mock = MockBackend::new(4, 1);
        let m = HostTransferBenchmark::default()
            .run(HostTransfer::DirectH2D, &mut mock, 100, 3)
            .unwrap();
        assert_eq!(m.bytes, 96);
        assert_eq!(m.bytes_moved, 96 * 3);
        assert_eq!(mock.count("broadcast"), 3);
    }

    #[test]
    fn test_direct_d2h_copies_every_device() {
        let mut mock = MockBackend::new(3, 1);
        let m = HostTransferBenchmark::default()
            .run(HostTransfer::DirectD2H, &mut mock, 64, 2)
            .unwrap();
        assert_eq!(mock.count("broadcast"), 1);
        assert_eq!(mock.count("copy_from"), 6);
        assert_eq!(m.bytes_moved, 64 * 2 * 3);
    }

    #[test]
    fn test_batched_h2d_one_push_per_rep() {
        let mut mock = MockBackend::new(5, 1);
        HostTransferBenchmark::default()
            .run(HostTransfer::BatchedH2D, &mut mock, 64, 2)
            .unwrap();
        let pushes: Vec<_> = mock
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                BackendCall::Push { devices, len, .. } => Some((devices, len)),
                _ => None,
            })
            .collect();
        assert_eq!(pushes.len(), 2);
        assert!(pushes.iter().all(|(d, len)| d == &vec![0, 1, 2, 3, 4] && *len == 64));
    }

    #[test]
    fn test_batched_d2h_windows() {
        let mut mock = MockBackend::new(10, 1);
        HostTransferBenchmark::new(4)
            .run(HostTransfer::BatchedD2H, &mut mock, 64, 1)
            .unwrap();
        let windows: Vec<_> = mock
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                BackendCall::Pull { devices, .. } => Some(devices),
                _ => None,
            })
            .collect();
        assert_eq!(
            windows,
            vec![vec![0, 1, 2, 3], vec![4, 5, 6, 7], vec![8, 9]]
        );
    }

    #[test]
    fn test_failure_propagates() {
        let mut mock = MockBackend::new(2, 1).with_failure("pull");
        let err = HostTransferBenchmark::default()
            .run(HostTransfer::BatchedD2H, &mut mock, 64, 3)
            .unwrap_err();
        assert!(matches!(
            err,
            BenchError::TransferFailed {
                operation: "pull",
                ..
            }
        ));
        assert_eq!(mock.count("pull"), 1);
    }

    #[test]
    fn test_zero_window_treated_as_one() {
        assert_eq!(HostTransferBenchmark::new(0).window(), 1);
    }
}
