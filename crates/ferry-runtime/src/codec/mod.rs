//! Binary codec - the wire format shared by both sides of the boundary
//!
//! Layout rules:
//! - Fixed-width scalars are big-endian on every platform
//! - Strings and byte sequences: `i32` length, then the bytes (UTF-8 for strings)
//! - Optionals: `i8` presence flag (0 absent, 1 present), then the value
//! - Sequences and maps: `i32` count, then the elements (key, value for maps)
//! - Records: fields concatenated in declared order, no names or tags
//! - Tagged unions: `i32` 1-based discriminant, then the variant's fields
//!
//! Both sides are generated from the same interface definition, so the
//! format carries no schema information and has no compatibility story.
//!
//! # Example
//!
//! ```
//! use ferry_runtime::codec::{decode, encode};
//!
//! let bytes = encode(&Some(String::from("hi")));
//! assert_eq!(bytes, [1, 0, 0, 0, 2, b'h', b'i']);
//! assert_eq!(decode::<Option<String>>(&bytes).unwrap(), Some("hi".to_string()));
//! ```

mod compound;
pub mod macros;
mod primitives;
mod reader;

pub use primitives::Bytes;
pub use reader::ByteReader;

use crate::error::{CodecError, CodecResult, OrRaise};
use ferry_config::RuntimeSettings;

/// A type with a fixed encoding on the wire
///
/// `write` appends the encoding to `buf`; `read` consumes exactly one
/// encoded value from `reader`. Implementations must be symmetric.
pub trait FfiCodec: Sized {
    fn write(&self, buf: &mut Vec<u8>);

    fn read(reader: &mut ByteReader<'_>) -> CodecResult<Self>;
}

/// Bounds applied while decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecLimits {
    /// Largest length or count prefix accepted
    pub max_len: usize,
}

impl CodecLimits {
    /// Only the wire format's own bound (`i32::MAX`)
    pub const WIRE_MAX: Self = Self {
        max_len: i32::MAX as usize,
    };
}

impl Default for CodecLimits {
    fn default() -> Self {
        Self::WIRE_MAX
    }
}

impl From<&RuntimeSettings> for CodecLimits {
    fn from(settings: &RuntimeSettings) -> Self {
        Self {
            max_len: settings.max_sequence_len as usize,
        }
    }
}

/// Encode a value into a fresh buffer
pub fn encode<T: FfiCodec>(value: &T) -> Vec<u8> {
    let mut buf = Vec::new();
    value.write(&mut buf);
    buf
}

/// Decode a value that must occupy `bytes` exactly
pub fn decode<T: FfiCodec>(bytes: &[u8]) -> CodecResult<T> {
    decode_with_limits(bytes, CodecLimits::default())
}

/// Decode a value that must occupy `bytes` exactly, under `limits`
pub fn decode_with_limits<T: FfiCodec>(bytes: &[u8], limits: CodecLimits) -> CodecResult<T> {
    let mut reader = ByteReader::with_limits(bytes, limits);
    let value = T::read(&mut reader)?;
    reader.finish()?;
    Ok(value)
}

/// Decode one value from the front of `bytes`, returns (value, bytes_consumed)
pub fn decode_prefix<T: FfiCodec>(bytes: &[u8]) -> CodecResult<(T, usize)> {
    decode_prefix_with_limits(bytes, CodecLimits::default())
}

/// [`decode_prefix`] under `limits`
pub fn decode_prefix_with_limits<T: FfiCodec>(
    bytes: &[u8],
    limits: CodecLimits,
) -> CodecResult<(T, usize)> {
    let mut reader = ByteReader::with_limits(bytes, limits);
    let value = T::read(&mut reader)?;
    Ok((value, reader.position()))
}

/// Write a length or count prefix
///
/// Lengths that do not fit in an `i32` cannot be described by the wire
/// format and are raised as a contract fault.
pub fn write_len(buf: &mut Vec<u8>, len: usize) {
    let len = i32::try_from(len)
        .map_err(|_| CodecError::LengthOverflow(len))
        .or_raise();
    buf.extend_from_slice(&len.to_be_bytes());
}

/// Write a 1-based union discriminant
pub fn write_discriminant(buf: &mut Vec<u8>, index: i32) {
    buf.extend_from_slice(&index.to_be_bytes());
}

/// Read a union discriminant and check it is within `1..=variants`
pub fn read_discriminant(
    reader: &mut ByteReader<'_>,
    type_name: &'static str,
    variants: i32,
) -> CodecResult<i32> {
    let value = i32::read(reader)?;
    if (1..=variants).contains(&value) {
        Ok(value)
    } else {
        Err(CodecError::InvalidDiscriminant {
            type_name,
            value,
            variants,
        })
    }
}
