//! Error types for pimbench
//!
//! Every variant is fatal to a benchmark run. Callers propagate with `?` up
//! to the binary, which logs and exits.
//!
//! On-device out-of-range accesses never appear here: the device engine
//! truncates its repetition loop instead.

use thiserror::Error;

/// Result type alias for pimbench operations
pub type Result<T> = std::result::Result<T, BenchError>;

/// Error type for all pimbench operations
#[derive(Debug, Error)]
pub enum BenchError {
    /// Host buffer could not be reserved
    #[error("Allocation of {bytes} host bytes failed")]
    AllocationFailed {
        /// Requested size in bytes
        bytes: usize,
    },

    /// A bulk transfer issued to the execution backend failed
    #[error("Transfer '{operation}' failed: {reason}")]
    TransferFailed {
        /// Backend operation that failed (broadcast, copy_from, push, pull)
        operation: &'static str,
        /// Backend-provided reason
        reason: String,
    },

    /// Program launch on the fleet failed
    #[error("Device launch failed: {reason}")]
    LaunchFailed {
        /// Backend-provided reason
        reason: String,
    },

    /// Host-side region access past the end of the working-memory region
    #[error("Region access [{offset}, {offset}+{len}) exceeds capacity {capacity}")]
    OutOfRange {
        /// Byte offset into the region
        offset: usize,
        /// Access length in bytes
        len: usize,
        /// Region capacity in bytes
        capacity: usize,
    },

    /// Host-side region access not on an 8-byte boundary
    #[error("Region access at offset {offset} with length {len} is not 8-byte aligned")]
    Misaligned {
        /// Byte offset into the region
        offset: usize,
        /// Access length in bytes
        len: usize,
    },

    /// Device index outside the fleet
    #[error("Device {device} does not exist in a fleet of {fleet_size}")]
    UnknownDevice {
        /// Requested device index
        device: usize,
        /// Number of devices in the fleet
        fleet_size: usize,
    },

    /// Rejected sweep or backend configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Result sink I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON report serialization failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
