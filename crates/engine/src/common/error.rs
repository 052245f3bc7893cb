//! Error definitions.
//!
//! This module defines the error taxonomy of the engine. It provides:
//! 1. **Protocol Errors:** Malformed enrollment writes, rejected before any state is committed.
//! 2. **ECC Errors:** Responses the Reed-Solomon decoder cannot vouch for.
//! 3. **Hardware Errors:** Failed register or physical-memory accesses.
//! 4. **Device Errors:** The `PufError` surface returned by `open`/`write`/`read`, with errno-style status codes.

use thiserror::Error;

use super::addr::PhysAddr;

/// Malformed enrollment data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// A field extends past the end of the buffer.
    #[error("enrollment truncated at offset {offset}: need {needed} bytes, {available} available")]
    Truncated {
        /// Cursor position of the field.
        offset: usize,
        /// Width of the field in bytes.
        needed: usize,
        /// Bytes left in the buffer at `offset`.
        available: usize,
    },

    /// The enrollment contains no records.
    #[error("enrollment contains no records")]
    EmptyEnrollment,

    /// A record requests a zero-second decay; zero is reserved for the end-of-list sentinel.
    #[error("record {record} has a zero decay time")]
    ZeroDecay {
        /// Index of the offending record.
        record: usize,
    },

    /// A record does not carry exactly one pointer per response bit.
    #[error("record {record} has {count} cell pointers, expected 32")]
    PointerCount {
        /// Index of the offending record.
        record: usize,
        /// Number of pointers supplied.
        count: usize,
    },

    /// A decay time does not fit the 16-bit wire field.
    #[error("record {record} decay time {value} is outside 1..=65535 seconds")]
    DecayOutOfRange {
        /// Index of the offending record.
        record: usize,
        /// Requested decay time in seconds.
        value: i64,
    },

    /// More parity symbols than the 8-bit length prefix can express.
    #[error("record {record} has {count} parity symbols, at most 255 fit the wire format")]
    ParityCount {
        /// Index of the offending record.
        record: usize,
        /// Number of parity symbols supplied.
        count: usize,
    },

    /// The enrollment buffer could not be allocated.
    #[error("out of memory allocating {requested} bytes of enrollment data")]
    OutOfMemory {
        /// Requested buffer size in bytes, sentinel included.
        requested: usize,
    },
}

/// Reed-Solomon decoding failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EccError {
    /// More symbol errors than the parity can correct.
    #[error("response is uncorrectable")]
    Uncorrectable,

    /// A parity symbol is outside GF(2^8).
    #[error("parity symbol {index} has value {value:#x}, outside GF(2^8)")]
    InvalidSymbol {
        /// Position of the symbol in the parity list.
        index: usize,
        /// The offending value.
        value: u16,
    },

    /// Data plus parity exceed the 255-symbol codeword of GF(2^8).
    #[error("{count} parity symbols exceed the maximum of {max}")]
    TooManyParity {
        /// Number of parity symbols supplied.
        count: usize,
        /// Largest parity count the code supports for a 32-bit response.
        max: usize,
    },
}

/// Failed hardware access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HwError {
    /// A memory-mapped register could not be mapped or accessed.
    #[error("register access failed at {addr}")]
    RegisterAccess {
        /// Register address.
        addr: PhysAddr,
    },

    /// A physical memory location could not be translated or accessed.
    #[error("physical memory access failed at {addr}")]
    MemoryAccess {
        /// Physical address.
        addr: PhysAddr,
    },

    /// No physically contiguous block of the requested size is available.
    #[error("failed to allocate {size} bytes of contiguous memory")]
    AllocationFailed {
        /// Requested size in bytes.
        size: u64,
    },
}

/// Invalid engine configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Region size is zero or not a multiple of the DRAM row size.
    #[error("region size {size} must be a non-zero multiple of the row size ({row_size})")]
    RegionSize {
        /// Configured region size.
        size: u64,
        /// DRAM row size in bytes.
        row_size: u64,
    },

    /// Caller-supplied region base is not row aligned.
    #[error("region base {base} is not aligned to the row size ({row_size})")]
    RegionAlignment {
        /// Configured base address.
        base: PhysAddr,
        /// DRAM row size in bytes.
        row_size: u64,
    },

    /// Region does not lie inside the swept DRAM range.
    #[error("region [{base}, +{size:#x}) lies outside DRAM [{dram_base}, {dram_end}]")]
    RegionPlacement {
        /// Region base address.
        base: PhysAddr,
        /// Region size in bytes.
        size: u64,
        /// First DRAM address.
        dram_base: PhysAddr,
        /// Last DRAM address (inclusive).
        dram_end: PhysAddr,
    },

    /// DRAM geometry is degenerate (zero row size or end before base).
    #[error("invalid DRAM geometry: {0}")]
    Geometry(String),

    /// Configuration file could not be read.
    #[error("cannot read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration text is not valid JSON for `Config`.
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Device-level error returned by the engine endpoints.
#[derive(Debug, Error)]
pub enum PufError {
    /// Another session owns the device, or warm-up has not finished.
    #[error("device is already owned")]
    AlreadyOwned,

    /// The handle does not belong to the active session.
    #[error("handle does not own the device")]
    NotOwner,

    /// Enrollment was written outside the `AwaitingEnrollment` state.
    #[error("device is not accepting enrollment data")]
    NotAcceptingEnrollment,

    /// The enrollment buffer could not be allocated.
    #[error("out of memory allocating {requested} bytes of enrollment data")]
    OutOfMemory {
        /// Requested buffer size in bytes.
        requested: usize,
    },

    /// The engine has been shut down.
    #[error("device has been shut down")]
    ShutDown,

    /// A cell pointer addresses a word outside the decay region.
    #[error("cell pointer {pointer:#x} is outside the decay region")]
    CellOutOfRange {
        /// The offending raw pointer.
        pointer: u32,
    },

    /// Malformed enrollment.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Response failed error correction.
    #[error(transparent)]
    Ecc(#[from] EccError),

    /// Hardware access failed.
    #[error(transparent)]
    Hw(#[from] HwError),

    /// Startup configuration rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl PufError {
    /// Returns the negative errno-style status a character device would report.
    ///
    /// # Returns
    ///
    /// `-EBUSY`, `-EPERM`, `-EINVAL`, `-ENOMEM`, `-ENODEV`, `-EFAULT`, `-EBADMSG` or `-EIO`.
    pub const fn status(&self) -> i32 {
        match self {
            Self::AlreadyOwned => -16,
            Self::NotOwner => -1,
            Self::OutOfMemory { .. }
            | Self::Protocol(ProtocolError::OutOfMemory { .. })
            | Self::Hw(HwError::AllocationFailed { .. }) => -12,
            Self::NotAcceptingEnrollment | Self::Protocol(_) | Self::Config(_) => -22,
            Self::ShutDown => -19,
            Self::CellOutOfRange { .. } => -14,
            Self::Ecc(_) => -74,
            Self::Hw(_) => -5,
        }
    }
}
