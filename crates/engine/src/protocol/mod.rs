//! Enrollment wire protocol.
//!
//! This module implements everything between the bytes a client writes and
//! the decoded challenges the engine runs:
//! 1. **Cursor:** Checked big-endian field access over byte buffers.
//! 2. **Record:** The `EnrollmentRecord` layout and its encoder/decoder.
//! 3. **Enrollment:** Validated, sentinel-terminated record lists with wrap-around.
//! 4. **JSON:** Interchange with the offline enrollment tooling.

/// Checked big-endian cursors.
pub mod cursor;
/// Sentinel-terminated enrollment buffers.
pub mod enrollment;
/// Enrollment JSON entries.
pub mod json;
/// Enrollment record layout.
pub mod record;

pub use cursor::{Cursor, CursorMut};
pub use enrollment::{Enrollment, NextRecord};
pub use json::{EnrollmentEntry, encode_enrollment};
pub use record::{CellPointer, EnrollmentRecord, encode_records};
