//! Geometric size sweep over the enabled benchmark variants
//!
//! For each size the enabled variants run in a fixed order and each one
//! emits exactly one row:
//!
//! ```text
//! host_h2d → host_d2h → host_h2d_prepare_push → host_d2h_prepare_push
//!   → dpu_test_1 → dpu_test_2 → dpu_test_3 → dpu_test_4 → dpu_test_5
//! ```
//!
//! Barrier and reduce launches ignore the size and scale their repetitions
//! instead ([`BARRIER_REP_MULTIPLIER`], [`REDUCE_REP_MULTIPLIER`]).

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::aggregate::{ResultAggregator, ResultRow};
use crate::backend::ExecutionBackend;
use crate::descriptor::{
    align8_up, BenchmarkDescriptor, TestKind, REGION_ALIGNMENT, REGION_CAPACITY,
};
use crate::error::{BenchError, Result};
use crate::host::{
    AlignedBuffer, HostTransfer, HostTransferBenchmark, DEFAULT_WINDOW, HOST_FILL,
    MAX_POOL_BUFFERS,
};
use crate::sink::ResultSink;

/// Repetition multiplier for the barrier launch
pub const BARRIER_REP_MULTIPLIER: u32 = 8;

/// Repetition multiplier for the reduce launch
pub const REDUCE_REP_MULTIPLIER: u32 = 1024;

/// One selectable benchmark in the sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Variant {
    /// `host_h2d` (bit 0)
    DirectH2D,
    /// `host_d2h` (bit 1)
    DirectD2H,
    /// `dpu_test_1` (bit 2)
    RegionRead,
    /// `dpu_test_2` (bit 3)
    RegionWrite,
    /// `dpu_test_3` (bit 4)
    ScratchCopy,
    /// `dpu_test_4` (bit 5)
    Barrier,
    /// `dpu_test_5` (bit 6)
    Reduce,
    /// `host_h2d_prepare_push` (bit 7)
    BatchedH2D,
    /// `host_d2h_prepare_push` (bit 8)
    BatchedD2H,
}

impl Variant {
    /// Run order within one sweep step
    pub const EXECUTION_ORDER: [Self; 9] = [
        Self::DirectH2D,
        Self::DirectD2H,
        Self::BatchedH2D,
        Self::BatchedD2H,
        Self::RegionRead,
        Self::RegionWrite,
        Self::ScratchCopy,
        Self::Barrier,
        Self::Reduce,
    ];

    /// Mask bit selecting this variant
    #[must_use]
    pub const fn bit(self) -> u32 {
        match self {
            Self::DirectH2D => 1 << 0,
            Self::DirectD2H => 1 << 1,
            Self::RegionRead => 1 << 2,
            Self::RegionWrite => 1 << 3,
            Self::ScratchCopy => 1 << 4,
            Self::Barrier => 1 << 5,
            Self::Reduce => 1 << 6,
            Self::BatchedH2D => 1 << 7,
            Self::BatchedD2H => 1 << 8,
        }
    }

    /// Where the variant executes
    #[must_use]
    pub const fn path(self) -> VariantPath {
        match self {
            Self::DirectH2D => VariantPath::Host(HostTransfer::DirectH2D),
            Self::DirectD2H => VariantPath::Host(HostTransfer::DirectD2H),
            Self::BatchedH2D => VariantPath::Host(HostTransfer::BatchedH2D),
            Self::BatchedD2H => VariantPath::Host(HostTransfer::BatchedD2H),
            Self::RegionRead => VariantPath::Device(TestKind::RegionRead),
            Self::RegionWrite => VariantPath::Device(TestKind::RegionWrite),
            Self::ScratchCopy => VariantPath::Device(TestKind::ScratchCopy),
            Self::Barrier => VariantPath::Device(TestKind::Barrier),
            Self::Reduce => VariantPath::Device(TestKind::Reduce),
        }
    }
}

/// Execution path of a [`Variant`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantPath {
    /// Timed on the host around bulk transfers
    Host(HostTransfer),
    /// Launched on every device
    Device(TestKind),
}

/// Bitmask of enabled variants; bits above 8 are ignored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestMask(pub u32);

impl TestMask {
    /// Every variant
    pub const ALL: Self = Self(0x1FF);

    /// Whether `variant` is enabled
    #[must_use]
    pub const fn contains(self, variant: Variant) -> bool {
        self.0 & variant.bit() != 0
    }

    /// Enabled variants in execution order
    pub fn enabled(self) -> impl Iterator<Item = Variant> {
        Variant::EXECUTION_ORDER
            .into_iter()
            .filter(move |v| self.contains(*v))
    }

    /// Number of enabled variants
    #[must_use]
    pub fn count(self) -> usize {
        (self.0 & Self::ALL.0).count_ones() as usize
    }
}

impl Default for TestMask {
    fn default() -> Self {
        Self::ALL
    }
}

/// Sweep parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepConfig {
    /// First transfer size
    pub min_bytes: usize,
    /// Largest transfer size (inclusive)
    pub max_bytes: usize,
    /// Size multiplier between steps
    pub factor: usize,
    /// Base repetition count
    pub repetitions: u32,
    /// Enabled variants
    pub tests: TestMask,
    /// Devices per batched device → host window
    pub window: usize,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            min_bytes: 64,
            max_bytes: 1 << 26,
            factor: 2,
            repetitions: 64,
            tests: TestMask::ALL,
            window: DEFAULT_WINDOW,
        }
    }
}

impl SweepConfig {
    /// Reject configurations that would never terminate or cannot be served
    ///
    /// `min > max` is accepted and yields an empty sweep.
    ///
    /// # Errors
    ///
    /// `InvalidConfiguration` describing the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.min_bytes == 0 {
            return Err(BenchError::InvalidConfiguration(
                "min must be at least 1 byte".to_string(),
            ));
        }
        if self.factor < 2 {
            return Err(BenchError::InvalidConfiguration(format!(
                "factor must be at least 2, got {}",
                self.factor
            )));
        }
        if self.window == 0 || self.window > MAX_POOL_BUFFERS {
            return Err(BenchError::InvalidConfiguration(format!(
                "window must be between 1 and {MAX_POOL_BUFFERS}, got {}",
                self.window
            )));
        }
        Ok(())
    }

    /// Transfer sizes in sweep order, stopping before overflow
    pub fn sizes(&self) -> impl Iterator<Item = usize> {
        let max = self.max_bytes;
        let factor = self.factor;
        std::iter::successors(Some(self.min_bytes), move |b| b.checked_mul(factor))
            .take_while(move |b| *b <= max)
    }
}

/// Result of a completed sweep
#[derive(Debug, Clone, Default)]
pub struct SweepOutcome {
    /// Sizes visited
    pub steps: usize,
    /// Every emitted row, in emission order
    pub rows: Vec<ResultRow>,
}

/// Drives a sweep against a backend
#[derive(Debug, Clone)]
pub struct SweepController {
    config: SweepConfig,
    host: HostTransferBenchmark,
}

impl SweepController {
    /// Controller for a validated `config`
    ///
    /// # Errors
    ///
    /// `InvalidConfiguration` if `config` fails [`SweepConfig::validate`].
    pub fn new(config: SweepConfig) -> Result<Self> {
        config.validate()?;
        let host = HostTransferBenchmark::new(config.window);
        Ok(Self { config, host })
    }

    /// Sweep configuration
    #[must_use]
    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// Run the whole sweep, emitting each row as soon as it is measured
    ///
    /// # Errors
    ///
    /// The first backend, allocation or sink failure aborts the sweep.
    pub fn run(
        &self,
        backend: &mut dyn ExecutionBackend,
        sink: &mut dyn ResultSink,
    ) -> Result<SweepOutcome> {
        info!(
            backend = backend.name(),
            devices = backend.device_count(),
            units = backend.units_per_device(),
            tests = %format!("{:#x}", self.config.tests.0),
            "starting sweep"
        );

        let mut outcome = SweepOutcome::default();
        for (step, bytes) in self.config.sizes().enumerate() {
            info!(step, bytes, "sweep step");
            for variant in self.config.tests.enabled() {
                let row = self.run_variant(variant, backend, bytes)?;
                debug!(row = %row.to_csv(), "row");
                sink.emit(&row)?;
                outcome.rows.push(row);
            }
            outcome.steps += 1;
        }

        info!(
            steps = outcome.steps,
            rows = outcome.rows.len(),
            "sweep finished"
        );
        Ok(outcome)
    }

    fn run_variant(
        &self,
        variant: Variant,
        backend: &mut dyn ExecutionBackend,
        bytes: usize,
    ) -> Result<ResultRow> {
        let reps = self.config.repetitions;
        let kind = match variant.path() {
            VariantPath::Host(transfer) => {
                let measurement = self.host.run(transfer, backend, bytes, reps)?;
                return Ok(ResultAggregator::host_row(&measurement));
            },
            VariantPath::Device(kind) => kind,
        };

        let descriptor = match kind {
            TestKind::Barrier => BenchmarkDescriptor::new(
                kind,
                0,
                0,
                reps.saturating_mul(BARRIER_REP_MULTIPLIER),
            ),
            TestKind::Reduce => BenchmarkDescriptor::new(
                kind,
                0,
                0,
                reps.saturating_mul(REDUCE_REP_MULTIPLIER),
            ),
            _ => BenchmarkDescriptor::new(kind, u32::try_from(bytes).unwrap_or(u32::MAX), 0, reps),
        };
        launch(backend, &descriptor)
    }
}

/// Bytes of region a launch of `descriptor` may touch on each device
///
/// Clamped to region capacity, rounded up to 8 bytes, never below 8.
#[must_use]
pub fn warm_span(descriptor: &BenchmarkDescriptor, units: usize) -> usize {
    let stride = descriptor.stride_bytes as usize;
    let reps = descriptor.repetitions as usize;
    let need = if stride > 0 {
        units
            .saturating_mul(stride)
            .saturating_add(stride.saturating_mul(reps.saturating_sub(1)))
    } else {
        let size = match descriptor.transfer_bytes as usize {
            0 => REGION_ALIGNMENT,
            b => b,
        };
        units.saturating_mul(size).saturating_mul(reps.max(1))
    };
    align8_up(need.min(REGION_CAPACITY))
        .min(REGION_CAPACITY)
        .max(REGION_ALIGNMENT)
}

/// Warm the region, launch `descriptor` fleet-wide and reduce the results
fn launch(backend: &mut dyn ExecutionBackend, descriptor: &BenchmarkDescriptor) -> Result<ResultRow> {
    let span = warm_span(descriptor, backend.units_per_device());
    let warm = AlignedBuffer::new(span, HOST_FILL)?;
    backend.broadcast(0, warm.as_slice())?;
    drop(warm);

    debug!(
        test_id = descriptor.test_id,
        bytes = descriptor.transfer_bytes,
        reps = descriptor.repetitions,
        warm = span,
        "device launch"
    );
    let start = Instant::now();
    let results = backend.submit(descriptor)?;
    let elapsed = start.elapsed();

    Ok(ResultAggregator::device_row(descriptor, elapsed, &results))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendCall, MockBackend};
    use crate::sink::MemorySink;

    #[test]
    fn test_mask_bits_distinct() {
        let all = Variant::EXECUTION_ORDER
            .iter()
            .fold(0, |acc, v| acc | v.bit());
        assert_eq!(all, TestMask::ALL.0);
        assert_eq!(TestMask(u32::MAX).count(), 9);
        assert_eq!(TestMask(0x4).enabled().collect::<Vec<_>>(), vec![Variant::RegionRead]);
    }

    #[test]
    fn test_mask_enabled_follows_execution_order() {
        let mask = TestMask(Variant::Reduce.bit() | Variant::BatchedD2H.bit() | Variant::DirectH2D.bit());
        assert_eq!(
            mask.enabled().collect::<Vec<_>>(),
            vec![Variant::DirectH2D, Variant::BatchedD2H, Variant::Reduce]
        );
    }

    #[test]
    fn test_variant_paths() {
        let host = Variant::EXECUTION_ORDER
            .iter()
            .filter(|v| matches!(v.path(), VariantPath::Host(_)))
            .count();
        assert_eq!(host, 4);
        assert_eq!(Variant::Barrier.path(), VariantPath::Device(TestKind::Barrier));
        assert_eq!(
            Variant::BatchedD2H.path(),
            VariantPath::Host(HostTransfer::BatchedD2H)
        );
    }

    #[test]
    fn test_sizes_geometric() {
        let config = SweepConfig {
            min_bytes: 64,
            max_bytes: 1024,
            factor: 4,
            ..SweepConfig::default()
        };
        assert_eq!(config.sizes().collect::<Vec<_>>(), vec![64, 256, 1024]);
        assert_eq!(SweepConfig::default().sizes().count(), 21);
    }

    #[test]
    fn test_sizes_stop_on_overflow() {
        let config = SweepConfig {
            min_bytes: usize::MAX / 2 + 1,
            max_bytes: usize::MAX,
            factor: 2,
            ..SweepConfig::default()
        };
        assert_eq!(config.sizes().count(), 1);
    }

    #[test]
    fn test_sizes_empty_when_min_exceeds_max() {
        let config = SweepConfig {
            min_bytes: 128,
            max_bytes: 64,
            ..SweepConfig::default()
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.sizes().count(), 0);
    }

    #[test]
    fn test_validate_rejects_non_terminating() {
        let zero_min = SweepConfig {
            min_bytes: 0,
            ..SweepConfig::default()
        };
        let unit_factor = SweepConfig {
            factor: 1,
            ..SweepConfig::default()
        };
        let huge_window = SweepConfig {
            window: MAX_POOL_BUFFERS + 1,
            ..SweepConfig::default()
        };
        for config in [zero_min, unit_factor, huge_window] {
            assert!(matches!(
                SweepController::new(config),
                Err(BenchError::InvalidConfiguration(_))
            ));
        }
    }

    #[test]
    fn test_warm_span() {
        let read = BenchmarkDescriptor::new(TestKind::RegionRead, 64, 0, 1);
        assert_eq!(warm_span(&read, 16), 1024);
        let barrier = BenchmarkDescriptor::new(TestKind::Barrier, 0, 0, 512);
        assert_eq!(warm_span(&barrier, 16), 16 * 8 * 512);
        let strided = BenchmarkDescriptor::new(TestKind::RegionWrite, 64, 100, 3);
        assert_eq!(warm_span(&strided, 2), 400);
        let huge = BenchmarkDescriptor::new(TestKind::RegionRead, u32::MAX, 0, u32::MAX);
        assert_eq!(warm_span(&huge, 16), REGION_CAPACITY);
    }

    #[test]
    fn test_barrier_and_reduce_scale_repetitions() {
        let config = SweepConfig {
            min_bytes: 64,
            max_bytes: 64,
            repetitions: 2,
            tests: TestMask(Variant::Barrier.bit() | Variant::Reduce.bit()),
            ..SweepConfig::default()
        };
        let mut mock = MockBackend::new(1, 4);
        let mut sink = MemorySink::new();
        SweepController::new(config)
            .unwrap()
            .run(&mut mock, &mut sink)
            .unwrap();

        let submitted: Vec<_> = mock
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                BackendCall::Submit { descriptor } => Some(descriptor),
                _ => None,
            })
            .collect();
        assert_eq!(
            submitted,
            vec![
                BenchmarkDescriptor::new(TestKind::Barrier, 0, 0, 16),
                BenchmarkDescriptor::new(TestKind::Reduce, 0, 0, 2048),
            ]
        );
        assert_eq!(sink.rows().len(), 2);
    }

    #[test]
    fn test_warm_broadcast_precedes_each_launch() {
        let config = SweepConfig {
            min_bytes: 64,
            max_bytes: 64,
            repetitions: 1,
            tests: TestMask(Variant::RegionRead.bit()),
            ..SweepConfig::default()
        };
        let mut mock = MockBackend::new(1, 16);
        let mut sink = MemorySink::new();
        SweepController::new(config)
            .unwrap()
            .run(&mut mock, &mut sink)
            .unwrap();
        let calls = mock.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], BackendCall::Broadcast { offset: 0, len: 1024 });
        assert_eq!(calls[1].operation(), "submit");
    }
}
