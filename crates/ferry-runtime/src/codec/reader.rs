//! Sequential reader over an encoded buffer

use super::CodecLimits;
use crate::error::{CodecError, CodecResult};

/// Cursor over a borrowed byte slice
///
/// Reads never copy more than the value being decoded, and every read is
/// bounds-checked against the bytes that remain.
#[derive(Debug)]
pub struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
    limits: CodecLimits,
}

impl<'a> ByteReader<'a> {
    /// Create a reader with the default limits
    pub fn new(bytes: &'a [u8]) -> Self {
        Self::with_limits(bytes, CodecLimits::default())
    }

    /// Create a reader with explicit limits
    pub fn with_limits(bytes: &'a [u8], limits: CodecLimits) -> Self {
        Self {
            bytes,
            pos: 0,
            limits,
        }
    }

    /// Bytes consumed so far
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes not yet consumed
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    /// Consume the next `n` bytes
    pub fn take(&mut self, n: usize) -> CodecResult<&'a [u8]> {
        if self.remaining() < n {
            return Err(CodecError::UnexpectedEof {
                needed: n,
                remaining: self.remaining(),
            });
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Consume the next `N` bytes as an array
    pub fn read_array<const N: usize>(&mut self) -> CodecResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// Read an `i32` length or count prefix
    pub fn read_len(&mut self) -> CodecResult<usize> {
        let raw = i32::from_be_bytes(self.read_array()?);
        if raw < 0 {
            return Err(CodecError::NegativeLength(raw));
        }
        let len = raw as usize;
        if len > self.limits.max_len {
            return Err(CodecError::LengthLimit {
                len,
                limit: self.limits.max_len,
            });
        }
        Ok(len)
    }

    /// Finish reading; any unread byte is an error
    pub fn finish(self) -> CodecResult<()> {
        match self.remaining() {
            0 => Ok(()),
            remaining => Err(CodecError::TrailingBytes { remaining }),
        }
    }
}
