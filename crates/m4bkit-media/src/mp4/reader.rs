//! Bounds-checked big-endian reads over an in-memory file.

use super::AtomType;
use crate::{Error, Result};

/// Immutable view of a whole file's bytes.
///
/// Every read is checked against the buffer length and reports
/// [`Error::BufferUnderflow`] instead of panicking.
#[derive(Debug, Clone, Copy)]
pub struct ByteSource<'a> {
    data: &'a [u8],
}

impl<'a> ByteSource<'a> {
    /// Wrap a byte buffer.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Total length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Borrow `len` bytes starting at `offset`.
    pub fn slice(&self, offset: usize, len: usize) -> Result<&'a [u8]> {
        let end = offset.checked_add(len).ok_or(Error::BufferUnderflow {
            need: usize::MAX,
            have: self.data.len(),
        })?;
        self.data.get(offset..end).ok_or(Error::BufferUnderflow {
            need: end,
            have: self.data.len(),
        })
    }

    fn array<const N: usize>(&self, offset: usize) -> Result<[u8; N]> {
        let bytes = self.slice(offset, N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    pub fn read_u8(&self, offset: usize) -> Result<u8> {
        Ok(self.array::<1>(offset)?[0])
    }

    pub fn read_u16(&self, offset: usize) -> Result<u16> {
        self.array(offset).map(u16::from_be_bytes)
    }

    pub fn read_i16(&self, offset: usize) -> Result<i16> {
        self.array(offset).map(i16::from_be_bytes)
    }

    pub fn read_u32(&self, offset: usize) -> Result<u32> {
        self.array(offset).map(u32::from_be_bytes)
    }

    pub fn read_i32(&self, offset: usize) -> Result<i32> {
        self.array(offset).map(i32::from_be_bytes)
    }

    pub fn read_u64(&self, offset: usize) -> Result<u64> {
        self.array(offset).map(u64::from_be_bytes)
    }

    /// Read a four-character code.
    pub fn read_fourcc(&self, offset: usize) -> Result<AtomType> {
        self.array(offset).map(AtomType::from_bytes)
    }

    /// Decode `len` bytes at `offset` as UTF-8 (lossy) with surrounding
    /// whitespace removed.
    pub fn read_text(&self, offset: usize, len: usize) -> Result<String> {
        let bytes = self.slice(offset, len)?;
        Ok(String::from_utf8_lossy(bytes).trim().to_string())
    }
}
