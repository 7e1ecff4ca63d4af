//! Sequential reads over an in-memory header.

use crate::error::{FehError, Result};

/// Forward-only reader over header bytes with bounds-checked takes.
#[derive(Debug)]
pub(crate) struct ByteCursor<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> ByteCursor<'a> {
    pub(crate) fn new(data: &'a [u8], offset: usize) -> Self {
        Self { data, offset }
    }

    pub(crate) fn offset(&self) -> usize {
        self.offset
    }

    pub(crate) fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.offset)
    }

    /// Take the next `len` bytes.
    pub(crate) fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let data: &'a [u8] = self.data;
        let slice = self
            .offset
            .checked_add(len)
            .and_then(|end| data.get(self.offset..end))
            .ok_or(FehError::Truncated {
                offset: self.offset,
                needed: len,
                available: self.remaining(),
            })?;
        self.offset += len;
        Ok(slice)
    }

    pub(crate) fn skip(&mut self, len: usize) -> Result<()> {
        self.take(len).map(|_| ())
    }

    pub(crate) fn read_i32_le(&mut self) -> Result<i32> {
        let bytes = self.take(4)?;
        Ok(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Read `count` consecutive little-endian `i32` values.
    pub(crate) fn read_i32_array(&mut self, count: usize) -> Result<Vec<i32>> {
        let len = count.checked_mul(4).ok_or(FehError::Truncated {
            offset: self.offset,
            needed: usize::MAX,
            available: self.remaining(),
        })?;
        let bytes = self.take(len)?;
        Ok(bytes
            .chunks_exact(4)
            .map(|word| i32::from_le_bytes([word[0], word[1], word[2], word[3]]))
            .collect())
    }
}
