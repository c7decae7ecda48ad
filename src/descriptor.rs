//! Host/device shared records
//!
//! Both sides of the host/device boundary agree on three device-resident
//! symbols: the descriptor slot, the results slot and the working-memory
//! region. The two records below carry a fixed little-endian wire layout so
//! that a backend can move them as raw bytes.
//!
//! | Symbol        | Size                               |
//! |---------------|------------------------------------|
//! | descriptor    | [`DESCRIPTOR_BYTES`] (20)          |
//! | results       | units × [`RESULT_BYTES`] (16 each) |
//! | region        | [`REGION_CAPACITY`] (8 MiB)        |

use serde::{Deserialize, Serialize};

/// Working-memory region capacity per device (8 MiB)
pub const REGION_CAPACITY: usize = 8 * 1024 * 1024;

/// Capacity of each of the two local scratch buffers per execution unit
pub const SCRATCH_CAPACITY: usize = 2048;

/// Default number of execution units per device
pub const DEFAULT_UNITS_PER_DEVICE: usize = 16;

/// Region accesses must start and end on this boundary
pub const REGION_ALIGNMENT: usize = 8;

/// Size of an encoded [`BenchmarkDescriptor`]
pub const DESCRIPTOR_BYTES: usize = 20;

/// Size of an encoded [`PerUnitResult`] (includes 4 pad bytes)
pub const RESULT_BYTES: usize = 16;

/// Round down to a multiple of 8
#[inline]
#[must_use]
pub const fn align8_down(value: usize) -> usize {
    value & !7
}

/// Round up to a multiple of 8
#[inline]
#[must_use]
pub const fn align8_up(value: usize) -> usize {
    (value + 7) & !7
}

/// On-device benchmark kinds, numbered as the device program expects them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TestKind {
    /// Sequential region → scratch reads
    RegionRead,
    /// Sequential scratch → region writes
    RegionWrite,
    /// Byte-wise copy between the two scratch buffers
    ScratchCopy,
    /// Back-to-back all-unit barrier waits
    Barrier,
    /// Local accumulate, barrier, reduction on unit 0
    Reduce,
}

impl TestKind {
    /// All kinds in id order
    pub const ALL: [TestKind; 5] = [
        Self::RegionRead,
        Self::RegionWrite,
        Self::ScratchCopy,
        Self::Barrier,
        Self::Reduce,
    ];

    /// Numeric id carried in the descriptor (1..=5)
    #[must_use]
    pub const fn id(self) -> u32 {
        match self {
            Self::RegionRead => 1,
            Self::RegionWrite => 2,
            Self::ScratchCopy => 3,
            Self::Barrier => 4,
            Self::Reduce => 5,
        }
    }

    /// Decode a descriptor id
    #[must_use]
    pub const fn from_id(id: u32) -> Option<Self> {
        match id {
            1 => Some(Self::RegionRead),
            2 => Some(Self::RegionWrite),
            3 => Some(Self::ScratchCopy),
            4 => Some(Self::Barrier),
            5 => Some(Self::Reduce),
            _ => None,
        }
    }

    /// Whether the kind consumes `transfer_bytes`
    #[must_use]
    pub const fn moves_bytes(self) -> bool {
        matches!(self, Self::RegionRead | Self::RegionWrite | Self::ScratchCopy)
    }

    /// CSV row name, e.g. `dpu_test_1`
    #[must_use]
    pub fn row_name(self) -> String {
        format!("dpu_test_{}", self.id())
    }
}

/// Launch parameters shared by every execution unit
///
/// Written once by the host before a launch and read-only on the device for
/// the duration of that launch. The raw `test_id` is kept so that an unknown
/// id still round-trips; devices answer it with a zero result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BenchmarkDescriptor {
    /// Test kind id (see [`TestKind::id`])
    pub test_id: u32,
    /// Requested bytes per operation
    pub transfer_bytes: u32,
    /// Bytes between consecutive blocks (0 = contiguous)
    pub stride_bytes: u32,
    /// Repetitions per execution unit
    pub repetitions: u32,
    /// Reserved flag bits, carried but not interpreted
    pub flags: u32,
}

impl BenchmarkDescriptor {
    /// Create a descriptor for a known test kind
    #[must_use]
    pub fn new(kind: TestKind, transfer_bytes: u32, stride_bytes: u32, repetitions: u32) -> Self {
        Self {
            test_id: kind.id(),
            transfer_bytes,
            stride_bytes,
            repetitions,
            flags: 0,
        }
    }

    /// Set flag bits
    #[must_use]
    pub fn with_flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }

    /// Decoded test kind, `None` for unknown ids
    #[must_use]
    pub fn kind(&self) -> Option<TestKind> {
        TestKind::from_id(self.test_id)
    }

    /// Encode into the descriptor slot layout
    #[must_use]
    pub fn to_bytes(&self) -> [u8; DESCRIPTOR_BYTES] {
        let mut out = [0u8; DESCRIPTOR_BYTES];
        let fields = [
            self.test_id,
            self.transfer_bytes,
            self.stride_bytes,
            self.repetitions,
            self.flags,
        ];
        for (chunk, field) in out.chunks_exact_mut(4).zip(fields) {
            chunk.copy_from_slice(&field.to_le_bytes());
        }
        out
    }

    /// Decode from the descriptor slot layout
    #[must_use]
    pub fn from_bytes(bytes: &[u8; DESCRIPTOR_BYTES]) -> Self {
        let field = |i: usize| {
            u32::from_le_bytes([bytes[i * 4], bytes[i * 4 + 1], bytes[i * 4 + 2], bytes[i * 4 + 3]])
        };
        Self {
            test_id: field(0),
            transfer_bytes: field(1),
            stride_bytes: field(2),
            repetitions: field(3),
            flags: field(4),
        }
    }
}

/// Output of one execution unit for one launch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PerUnitResult {
    /// Counter delta over the variant's timing window
    pub cycles_total: u64,
    /// Repetitions actually executed
    pub ops_completed: u32,
}

impl PerUnitResult {
    /// Zero result (degenerate configuration or unknown test)
    pub const ZERO: Self = Self {
        cycles_total: 0,
        ops_completed: 0,
    };

    /// Encode into one results-slot entry
    #[must_use]
    pub fn to_bytes(&self) -> [u8; RESULT_BYTES] {
        let mut out = [0u8; RESULT_BYTES];
        out[..8].copy_from_slice(&self.cycles_total.to_le_bytes());
        out[8..12].copy_from_slice(&self.ops_completed.to_le_bytes());
        out
    }

    /// Decode one results-slot entry
    #[must_use]
    pub fn from_bytes(bytes: &[u8; RESULT_BYTES]) -> Self {
        let mut cycles = [0u8; 8];
        cycles.copy_from_slice(&bytes[..8]);
        let mut ops = [0u8; 4];
        ops.copy_from_slice(&bytes[8..12]);
        Self {
            cycles_total: u64::from_le_bytes(cycles),
            ops_completed: u32::from_le_bytes(ops),
        }
    }

    /// Decode a whole results slot; trailing partial entries are ignored
    #[must_use]
    pub fn decode_slot(slot: &[u8]) -> Vec<Self> {
        slot.chunks_exact(RESULT_BYTES)
            .map(|chunk| {
                let mut entry = [0u8; RESULT_BYTES];
                entry.copy_from_slice(chunk);
                Self::from_bytes(&entry)
            })
            .collect()
    }
}
