//! Command-line surface
//!
//! Parsing lives here rather than in `main.rs` so the flag handling and the
//! run pipeline can be exercised from tests.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tracing::info;

use crate::backend::SimulatedFleet;
use crate::descriptor::DEFAULT_UNITS_PER_DEVICE;
use crate::device::{ClockSource, CostModel, DEFAULT_CLOCK_MHZ};
use crate::error::{BenchError, Result};
use crate::host::DEFAULT_WINDOW;
use crate::report::SweepReport;
use crate::sink::CsvSink;
use crate::sweep::{SweepConfig, SweepController, SweepOutcome, TestMask};

/// Default CSV output path
pub const DEFAULT_OUTPUT: &str = "bench_results.csv";

/// Cycle counter kind selectable from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ClockKind {
    /// Host monotonic clock scaled to `--clock-mhz`
    Wall,
    /// Deterministic cost model
    Modeled,
}

/// pimbench - processing-in-memory bandwidth and latency sweep
///
/// Measures host ↔ device bulk transfers and five on-device access patterns
/// across a geometric range of transfer sizes, writing one CSV row per
/// benchmark per size.
#[derive(Debug, Parser)]
#[command(name = "pimbench")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Smallest transfer size in bytes
    #[arg(long, default_value_t = 64)]
    pub min: usize,

    /// Largest transfer size in bytes (inclusive)
    #[arg(long, default_value_t = 1 << 26)]
    pub max: usize,

    /// Size multiplier between steps
    #[arg(long, default_value_t = 2)]
    pub factor: usize,

    /// Base repetition count
    #[arg(short = 'r', long = "reps", default_value_t = 64)]
    pub reps: u32,

    /// Number of devices (0 = all available)
    #[arg(long, default_value_t = 0)]
    pub dpus: usize,

    /// Enabled tests bitmask, decimal or 0x-prefixed hex
    ///
    /// bit0 host_h2d, bit1 host_d2h, bit2 region read, bit3 region write,
    /// bit4 scratch copy, bit5 barrier, bit6 reduce,
    /// bit7 host_h2d_prepare_push, bit8 host_d2h_prepare_push
    #[arg(long, value_parser = parse_mask, default_value = "0x1ff")]
    pub tests: u32,

    /// Execution units per simulated device
    #[arg(long, default_value_t = DEFAULT_UNITS_PER_DEVICE)]
    pub units: usize,

    /// Devices per batched device → host window
    #[arg(long, default_value_t = DEFAULT_WINDOW)]
    pub window: usize,

    /// Cycle counter used by the simulated devices
    #[arg(long, value_enum, default_value_t = ClockKind::Wall)]
    pub clock: ClockKind,

    /// Device frequency for the wall clock, in MHz
    #[arg(long = "clock-mhz", default_value_t = DEFAULT_CLOCK_MHZ)]
    pub clock_mhz: f64,

    /// CSV output path
    #[arg(short, long, default_value = DEFAULT_OUTPUT)]
    pub output: PathBuf,

    /// Also write a JSON report to this path
    #[arg(long)]
    pub json: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Parse a bitmask in decimal or `0x` hex
///
/// # Errors
///
/// Returns a message for clap if the value is not a valid `u32`.
pub fn parse_mask(value: &str) -> std::result::Result<u32, String> {
    let trimmed = value.trim();
    let parsed = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => trimmed.parse::<u32>(),
    };
    parsed.map_err(|e| format!("invalid test mask '{value}': {e}"))
}

/// Validated run configuration
#[derive(Debug, Clone)]
pub struct BenchConfig {
    /// Sweep parameters
    pub sweep: SweepConfig,
    /// Requested devices (0 = all)
    pub devices: usize,
    /// Units per device
    pub units: usize,
    /// Unit cycle counter
    pub clock: ClockSource,
    /// CSV output path
    pub output: PathBuf,
    /// Optional JSON report path
    pub json: Option<PathBuf>,
}

impl Cli {
    /// Validate the parsed flags into a [`BenchConfig`]
    ///
    /// # Errors
    ///
    /// `InvalidConfiguration` for a sweep that would not terminate, zero
    /// units, or a non-positive clock frequency.
    pub fn into_config(self) -> Result<BenchConfig> {
        let sweep = SweepConfig {
            min_bytes: self.min,
            max_bytes: self.max,
            factor: self.factor,
            repetitions: self.reps,
            tests: TestMask(self.tests),
            window: self.window,
        };
        sweep.validate()?;

        if self.units == 0 {
            return Err(BenchError::InvalidConfiguration(
                "units must be at least 1".to_string(),
            ));
        }
        let clock = match self.clock {
            ClockKind::Wall if self.clock_mhz.is_finite() && self.clock_mhz > 0.0 => {
                ClockSource::Wall {
                    mhz: self.clock_mhz,
                }
            },
            ClockKind::Wall => {
                return Err(BenchError::InvalidConfiguration(format!(
                    "clock frequency must be positive, got {}",
                    self.clock_mhz
                )))
            },
            ClockKind::Modeled => ClockSource::Modeled(CostModel::default()),
        };

        Ok(BenchConfig {
            sweep,
            devices: self.dpus,
            units: self.units,
            clock,
            output: self.output,
            json: self.json,
        })
    }
}

/// Main CLI entrypoint
///
/// # Errors
///
/// See [`Cli::into_config`] and [`run`].
pub fn entrypoint(cli: Cli) -> Result<SweepOutcome> {
    run(&cli.into_config()?)
}

/// Allocate the fleet, run the sweep into the CSV file and write the report
///
/// # Errors
///
/// Any configuration, allocation, backend or output failure.
pub fn run(config: &BenchConfig) -> Result<SweepOutcome> {
    let controller = SweepController::new(config.sweep.clone())?;
    let mut fleet = SimulatedFleet::new(config.devices, config.units, config.clock)?;
    let mut sink = CsvSink::create(&config.output)?;

    let outcome = controller.run(&mut fleet, &mut sink)?;
    info!(path = %config.output.display(), rows = sink.rows(), "results written");

    if let Some(path) = &config.json {
        SweepReport::new(config, &outcome).write(path)?;
        info!(path = %path.display(), "report written");
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["pimbench"]).unwrap();
        assert_eq!(cli.min, 64);
        assert_eq!(cli.max, 1 << 26);
        assert_eq!(cli.factor, 2);
        assert_eq!(cli.reps, 64);
        assert_eq!(cli.dpus, 0);
        assert_eq!(cli.tests, 0x1FF);
        assert_eq!(cli.units, 16);
        assert_eq!(cli.window, 64);
        assert_eq!(cli.clock, ClockKind::Wall);
        assert_eq!(cli.output, PathBuf::from("bench_results.csv"));
        assert!(cli.json.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn test_short_and_long_flags() {
        let cli = Cli::try_parse_from([
            "pimbench", "--min", "128", "--max", "4096", "--factor", "4", "-r", "3", "--dpus",
            "2", "--tests", "0x24", "--clock", "modeled", "-o", "out.csv", "-v",
        ])
        .unwrap();
        assert_eq!(cli.min, 128);
        assert_eq!(cli.factor, 4);
        assert_eq!(cli.reps, 3);
        assert_eq!(cli.dpus, 2);
        assert_eq!(cli.tests, 0x24);
        assert_eq!(cli.clock, ClockKind::Modeled);
        assert_eq!(cli.output, PathBuf::from("out.csv"));
        assert!(cli.verbose);
    }

    #[test]
    fn test_parse_mask() {
        assert_eq!(parse_mask("4"), Ok(4));
        assert_eq!(parse_mask("0x1ff"), Ok(0x1FF));
        assert_eq!(parse_mask("0XFF"), Ok(0xFF));
        assert_eq!(parse_mask("0xFFFFFFFF"), Ok(u32::MAX));
        assert!(parse_mask("abc").is_err());
        assert!(Cli::try_parse_from(["pimbench", "--tests", "0xZZ"]).is_err());
    }

    #[test]
    fn test_into_config_rejects_bad_values() {
        for args in [
            vec!["pimbench", "--min", "0"],
            vec!["pimbench", "--factor", "1"],
            vec!["pimbench", "--units", "0"],
            vec!["pimbench", "--window", "0"],
            vec!["pimbench", "--clock-mhz", "0"],
        ] {
            let cli = Cli::try_parse_from(args).unwrap();
            assert!(matches!(
                cli.into_config(),
                Err(BenchError::InvalidConfiguration(_))
            ));
        }
    }

    #[test]
    fn test_into_config_clock() {
        let cli = Cli::try_parse_from(["pimbench", "--clock", "modeled"]).unwrap();
        let config = cli.into_config().unwrap();
        assert_eq!(config.clock, ClockSource::Modeled(CostModel::default()));

        let cli = Cli::try_parse_from(["pimbench", "--clock-mhz", "450"]).unwrap();
        let config = cli.into_config().unwrap();
        assert_eq!(config.clock, ClockSource::Wall { mhz: 450.0 });
    }

    #[test]
    fn test_too_many_devices_fails() {
        let dir = std::env::temp_dir().join("pimbench-cli-too-many.csv");
        let cli = Cli::try_parse_from([
            "pimbench",
            "--dpus",
            "1000",
            "-o",
            dir.to_str().unwrap(),
        ])
        .unwrap();
        assert!(matches!(
            entrypoint(cli),
            Err(BenchError::InvalidConfiguration(_))
        ));
    }
}
