//! Checked big-endian cursors over byte buffers.
//!
//! `Cursor` consumes fixed-width fields from an immutable buffer and
//! `CursorMut` produces them into a mutable one. Both advance by the field
//! width and fail with [`ProtocolError::Truncated`] instead of touching bytes
//! past the end of the buffer.

use crate::common::ProtocolError;

/// Read cursor over a borrowed byte buffer.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    /// Creates a cursor positioned at `pos`.
    pub const fn at(buf: &'a [u8], pos: usize) -> Self {
        Self { buf, pos }
    }

    /// Creates a cursor positioned at the start of `buf`.
    pub const fn new(buf: &'a [u8]) -> Self {
        Self::at(buf, 0)
    }

    /// Current byte offset.
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left between the cursor and the end of the buffer.
    pub const fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    /// Moves the cursor to an absolute offset.
    pub const fn seek(&mut self, pos: usize) {
        self.pos = pos;
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], ProtocolError> {
        let (offset, available) = (self.pos, self.remaining());
        let field = offset
            .checked_add(N)
            .and_then(|end| self.buf.get(offset..end))
            .ok_or_else(|| ProtocolError::Truncated {
                offset,
                needed: N,
                available,
            })?;
        let mut out = [0u8; N];
        out.copy_from_slice(field);
        self.pos += N;
        Ok(out)
    }

    /// Consumes an 8-bit value.
    pub fn read_u8(&mut self) -> Result<u8, ProtocolError> {
        self.take::<1>().map(|[b]| b)
    }

    /// Consumes a 16-bit big-endian value.
    pub fn read_u16_be(&mut self) -> Result<u16, ProtocolError> {
        self.take::<2>().map(u16::from_be_bytes)
    }

    /// Consumes a 32-bit big-endian value.
    pub fn read_u32_be(&mut self) -> Result<u32, ProtocolError> {
        self.take::<4>().map(u32::from_be_bytes)
    }
}

/// Write cursor over a borrowed mutable byte buffer.
#[derive(Debug)]
pub struct CursorMut<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> CursorMut<'a> {
    /// Creates a cursor positioned at the start of `buf`.
    pub const fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Current byte offset.
    pub const fn position(&self) -> usize {
        self.pos
    }

    fn put(&mut self, bytes: &[u8]) -> Result<(), ProtocolError> {
        let (offset, available) = (self.pos, self.buf.len().saturating_sub(self.pos));
        let field = offset
            .checked_add(bytes.len())
            .and_then(|end| self.buf.get_mut(offset..end))
            .ok_or_else(|| ProtocolError::Truncated {
                offset,
                needed: bytes.len(),
                available,
            })?;
        field.copy_from_slice(bytes);
        self.pos += bytes.len();
        Ok(())
    }

    /// Writes an 8-bit value.
    pub fn write_u8(&mut self, val: u8) -> Result<(), ProtocolError> {
        self.put(&[val])
    }

    /// Writes a 16-bit value most significant byte first.
    pub fn write_u16_be(&mut self, val: u16) -> Result<(), ProtocolError> {
        self.put(&val.to_be_bytes())
    }

    /// Writes a 32-bit value most significant byte first.
    pub fn write_u32_be(&mut self, val: u32) -> Result<(), ProtocolError> {
        self.put(&val.to_be_bytes())
    }
}
