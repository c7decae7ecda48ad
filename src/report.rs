//! JSON summary of a sweep

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::aggregate::ResultRow;
use crate::cli::BenchConfig;
use crate::device::ClockSource;
use crate::sweep::{SweepConfig, SweepOutcome};

/// Serialized form of one sweep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    /// Crate version that produced the report
    pub version: String,
    /// Sweep parameters
    pub sweep: SweepConfig,
    /// Requested devices (0 = all)
    pub devices: usize,
    /// Units per device
    pub units: usize,
    /// Unit cycle counter
    pub clock: ClockSource,
    /// Sizes visited
    pub steps: usize,
    /// Rows in emission order
    pub rows: Vec<ResultRow>,
}

impl SweepReport {
    /// Report for `outcome` produced under `config`
    #[must_use]
    pub fn new(config: &BenchConfig, outcome: &SweepOutcome) -> Self {
        Self {
            version: crate::VERSION.to_string(),
            sweep: config.sweep.clone(),
            devices: config.devices,
            units: config.units,
            clock: config.clock,
            steps: outcome.steps,
            rows: outcome.rows.clone(),
        }
    }

    /// Pretty-printed JSON
    ///
    /// # Errors
    ///
    /// Returns `BenchError::Json` if serialization fails.
    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the report to `path`
    ///
    /// # Errors
    ///
    /// Returns `BenchError::Json` or `BenchError::Io`.
    pub fn write(&self, path: impl AsRef<Path>) -> crate::error::Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn test_report_json_round_trip() {
        let config = BenchConfig {
            sweep: SweepConfig::default(),
            devices: 2,
            units: 4,
            clock: ClockSource::default(),
            output: PathBuf::from("unused.csv"),
            json: None,
        };
        let outcome = SweepOutcome {
            steps: 1,
            rows: vec![ResultRow::Host {
                name: "host_h2d".to_string(),
                bytes: 64,
                reps: 1,
                host_ms: 0.25,
                throughput: 0.000256,
            }],
        };
        let report = SweepReport::new(&config, &outcome);
        assert_eq!(report.version, crate::VERSION);

        let json = report.to_json().unwrap();
        assert!(json.contains("\"host_h2d\""));
        let back: SweepReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
    }
}
