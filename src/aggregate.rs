//! Reduction of benchmark outputs into result rows

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::descriptor::{BenchmarkDescriptor, PerUnitResult, TestKind};
use crate::host::HostMeasurement;

/// Fleet-wide sums of one device launch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSummary {
    /// Sum of `cycles_total` over every unit of every device
    pub sum_cycles: u64,
    /// Sum of `ops_completed` over every unit of every device
    pub sum_ops: u64,
    /// Number of units that reported
    pub units: usize,
}

impl DeviceSummary {
    /// Sum per-unit results grouped by device
    #[must_use]
    pub fn from_results(results: &[Vec<PerUnitResult>]) -> Self {
        results
            .iter()
            .flatten()
            .fold(Self::default(), |acc, unit| Self {
                sum_cycles: acc.sum_cycles.saturating_add(unit.cycles_total),
                sum_ops: acc.sum_ops + u64::from(unit.ops_completed),
                units: acc.units + 1,
            })
    }
}

/// One output row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "path", rename_all = "snake_case")]
pub enum ResultRow {
    /// Host ↔ device transfer routine
    Host {
        /// Routine name (`host_h2d`, ...)
        name: String,
        /// Effective transfer size
        bytes: usize,
        /// Repetitions
        reps: u32,
        /// Wall time of the repetition loop
        host_ms: f64,
        /// MB per millisecond
        throughput: f64,
    },
    /// On-device launch
    Device {
        /// `dpu_test_<id>`
        name: String,
        /// Requested transfer size
        bytes: u32,
        /// Requested stride
        stride: u32,
        /// Requested repetitions
        reps: u32,
        /// Wall time of the launch
        host_ms: f64,
        /// Summed cycles
        sum_cycles: u64,
        /// Summed completed operations
        sum_ops: u64,
    },
}

impl ResultRow {
    /// Row name
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Host { name, .. } | Self::Device { name, .. } => name,
        }
    }

    /// Host wall time in milliseconds
    #[must_use]
    pub fn host_ms(&self) -> f64 {
        match self {
            Self::Host { host_ms, .. } | Self::Device { host_ms, .. } => *host_ms,
        }
    }

    /// CSV line without trailing newline
    #[must_use]
    pub fn to_csv(&self) -> String {
        match self {
            Self::Host {
                name,
                bytes,
                reps,
                host_ms,
                throughput,
            } => format!("{name},{bytes},0,{reps},{host_ms:.6},{throughput:.6}"),
            Self::Device {
                name,
                bytes,
                stride,
                reps,
                host_ms,
                sum_cycles,
                sum_ops,
            } => format!("{name},{bytes},{stride},{reps},{host_ms:.6},{sum_cycles},{sum_ops}"),
        }
    }
}

/// Builds result rows from raw measurements
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultAggregator;

impl ResultAggregator {
    /// Row for a host routine
    #[must_use]
    pub fn host_row(measurement: &HostMeasurement) -> ResultRow {
        ResultRow::Host {
            name: measurement.transfer.row_name().to_string(),
            bytes: measurement.bytes,
            reps: measurement.repetitions,
            host_ms: measurement.host_ms(),
            throughput: measurement.throughput(),
        }
    }

    /// Row for a device launch of `descriptor`
    ///
    /// Unknown test ids keep their numeric id in the row name.
    #[must_use]
    pub fn device_row(
        descriptor: &BenchmarkDescriptor,
        elapsed: Duration,
        results: &[Vec<PerUnitResult>],
    ) -> ResultRow {
        let summary = DeviceSummary::from_results(results);
        let name = descriptor.kind().map_or_else(
            || format!("dpu_test_{}", descriptor.test_id),
            TestKind::row_name,
        );
        ResultRow::Device {
            name,
            bytes: descriptor.transfer_bytes,
            stride: descriptor.stride_bytes,
            reps: descriptor.repetitions,
            host_ms: elapsed.as_secs_f64() * 1000.0,
            sum_cycles: summary.sum_cycles,
            sum_ops: summary.sum_ops,
        }
    }
}
