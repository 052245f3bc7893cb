//! Global Engine Constants.
//!
//! This module defines constants shared by the codec, the reconstructor and the engine. It includes:
//! 1. **Response Constants:** Width of a PUF response and the number of cells sampled for it.
//! 2. **Cell Pointer Layout:** How a 32-bit pointer splits into a block index and a bit index.
//! 3. **Wire Constants:** Field widths of the enrollment format and the end-of-list sentinel.

/// Number of bits in one PUF response.
pub const RESPONSE_BITS: usize = 32;

/// Size of one PUF response as returned by `read` (big-endian).
pub const RESPONSE_BYTES: usize = 4;

/// Number of cell pointers in every enrollment record (one per response bit).
pub const POINTERS_PER_RECORD: usize = RESPONSE_BITS;

/// Width in bytes of the memory word a cell pointer addresses.
pub const CELL_WORD_BYTES: u64 = 2;

/// Number of low pointer bits holding the bit index within a 16-bit word.
pub const CELL_BLOCK_SHIFT: u32 = 4;

/// Mask extracting the bit index from a cell pointer.
pub const CELL_BIT_MASK: u32 = (1 << CELL_BLOCK_SHIFT) - 1;

/// Width of the `decay_seconds` field on the wire.
pub const DECAY_FIELD_BYTES: usize = 2;

/// Width of the `parity_count` field on the wire.
pub const PARITY_COUNT_BYTES: usize = 1;

/// Width of one parity symbol on the wire.
pub const PARITY_SYMBOL_BYTES: usize = 2;

/// Width of one cell pointer on the wire.
pub const POINTER_BYTES: usize = 4;

/// Zero bytes appended after a submitted enrollment.
///
/// Reading a `decay_seconds` of zero from them marks the end of the list.
pub const SENTINEL_BYTES: usize = DECAY_FIELD_BYTES;

/// Milliseconds per second, for converting `decay_seconds` to scheduler time.
pub const MILLIS_PER_SECOND: u64 = 1000;
