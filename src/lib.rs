//! # pimbench
//!
//! Memory bandwidth and latency benchmark for processing-in-memory fleets.
//!
//! A fleet is a set of devices, each running many execution units that share
//! one large working-memory region and own a small private scratch memory.
//! pimbench measures every data path between them:
//!
//! - host → device and device → host bulk transfers, direct and batched
//! - sequential region reads and writes from every unit
//! - scratch-to-scratch copies
//! - all-unit barrier round-trips
//! - local accumulation followed by a cross-unit reduction
//!
//! ## Example
//!
//! ```rust
//! use pimbench::backend::SimulatedFleet;
//! use pimbench::device::{ClockSource, CostModel};
//! use pimbench::sink::MemorySink;
//! use pimbench::sweep::{SweepConfig, SweepController, TestMask, Variant};
//!
//! let config = SweepConfig {
//!     min_bytes: 64,
//!     max_bytes: 64,
//!     repetitions: 1,
//!     tests: TestMask(Variant::RegionRead.bit()),
//!     ..SweepConfig::default()
//! };
//! let mut fleet = SimulatedFleet::new(1, 16, ClockSource::Modeled(CostModel::default())).unwrap();
//! let mut sink = MemorySink::new();
//! let outcome = SweepController::new(config).unwrap().run(&mut fleet, &mut sink).unwrap();
//! assert_eq!(outcome.rows.len(), 1);
//! assert_eq!(outcome.rows[0].name(), "dpu_test_1");
//! ```
//!
//! ## Architecture
//!
//! ```text
//! SweepController ──► HostTransferBenchmark ──┐
//!        │                                     ├─► ExecutionBackend ─► SimulatedFleet ─► SimulatedDevice
//!        └────────► device launch ─────────────┘                                            │
//!        │                                                                   run_unit × units
//!        └─► ResultAggregator ─► ResultSink (CSV)
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
// Clippy allows (MUST come after deny/warn to override them)
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)] // byte counts -> f64 throughput
#![allow(clippy::cast_possible_truncation)] // u32 <-> usize within region bounds
#![allow(clippy::must_use_candidate)] // Not all methods need #[must_use]
#![allow(clippy::doc_markdown)] // Allow technical terms without backticks
#![allow(clippy::uninlined_format_args)] // Prefer explicit format args
#![allow(clippy::missing_panics_doc)] // Allow missing Panics doc sections
#![allow(clippy::float_cmp)] // Allow float comparisons in tests

/// Reduction of unit results and host timings into rows
pub mod aggregate;
/// Execution backends: the simulated fleet and the recording mock
pub mod backend;
/// Command-line surface and run pipeline
pub mod cli;
/// Descriptor and per-unit result records shared by host and device
pub mod descriptor;
/// Simulated device: memories, barrier, cycle counters, benchmark engine
pub mod device;
pub mod error;
/// Host-side bulk-transfer benchmark
pub mod host;
pub mod report;
pub mod sink;
pub mod sweep;

pub use aggregate::{DeviceSummary, ResultAggregator, ResultRow};
pub use backend::{ExecutionBackend, MockBackend, SimulatedFleet};
pub use descriptor::{BenchmarkDescriptor, PerUnitResult, TestKind};
pub use error::{BenchError, Result};
pub use sink::{CsvSink, MemorySink, ResultSink};
pub use sweep::{SweepConfig, SweepController, SweepOutcome, TestMask, Variant};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
