//! Host-side transfer benchmark
//!
//! - [`AlignedBuffer`]: cache-line aligned host buffer
//! - [`TransferBufferPool`]: bounded buffer arena checked out per window
//! - [`FleetWindows`]: partition of the fleet into bounded windows
//! - [`HostTransferBenchmark`]: the four host ↔ device routines

mod buffer;
mod pool;
mod transfer;
mod windows;

pub use buffer::{AlignedBuffer, HOST_BUFFER_ALIGNMENT};
pub use pool::{TransferBufferPool, WindowLease, MAX_POOL_BUFFERS};
pub use transfer::{
    effective_transfer_size, HostMeasurement, HostTransfer, HostTransferBenchmark,
    DEFAULT_WINDOW, HOST_FILL, SEED_FILL,
};
pub use windows::{FleetWindow, FleetWindows};
