//! Scalars, strings, byte sequences and time values

use super::{write_len, ByteReader, FfiCodec};
use crate::error::{CodecError, CodecResult, OrRaise};
use std::convert::Infallible;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const NANOS_PER_SEC: u32 = 1_000_000_000;

macro_rules! impl_codec_for_number {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FfiCodec for $ty {
                fn write(&self, buf: &mut Vec<u8>) {
                    buf.extend_from_slice(&self.to_be_bytes());
                }

                fn read(reader: &mut ByteReader<'_>) -> CodecResult<Self> {
                    Ok(<$ty>::from_be_bytes(reader.read_array()?))
                }
            }
        )*
    };
}

impl_codec_for_number!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

impl FfiCodec for bool {
    fn write(&self, buf: &mut Vec<u8>) {
        (*self as i8).write(buf);
    }

    fn read(reader: &mut ByteReader<'_>) -> CodecResult<Self> {
        match i8::read(reader)? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(CodecError::InvalidBool(other)),
        }
    }
}

impl FfiCodec for String {
    fn write(&self, buf: &mut Vec<u8>) {
        write_len(buf, self.len());
        buf.extend_from_slice(self.as_bytes());
    }

    fn read(reader: &mut ByteReader<'_>) -> CodecResult<Self> {
        let len = reader.read_len()?;
        Ok(String::from_utf8(reader.take(len)?.to_vec())?)
    }
}

/// Opaque byte sequence
///
/// Same layout as a string without the UTF-8 requirement. Kept distinct from
/// `Vec<u8>` so the element-wise sequence encoding stays generic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Bytes(pub Vec<u8>);

impl From<Vec<u8>> for Bytes {
    fn from(v: Vec<u8>) -> Self {
        Bytes(v)
    }
}

impl std::ops::Deref for Bytes {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FfiCodec for Bytes {
    fn write(&self, buf: &mut Vec<u8>) {
        write_len(buf, self.0.len());
        buf.extend_from_slice(&self.0);
    }

    fn read(reader: &mut ByteReader<'_>) -> CodecResult<Self> {
        let len = reader.read_len()?;
        Ok(Bytes(reader.take(len)?.to_vec()))
    }
}

/// Unit return type; encodes to nothing
impl FfiCodec for () {
    fn write(&self, _buf: &mut Vec<u8>) {}

    fn read(_reader: &mut ByteReader<'_>) -> CodecResult<Self> {
        Ok(())
    }
}

/// Error type of operations that declare none
impl FfiCodec for Infallible {
    fn write(&self, _buf: &mut Vec<u8>) {
        match *self {}
    }

    fn read(_reader: &mut ByteReader<'_>) -> CodecResult<Self> {
        Err(CodecError::InvalidDiscriminant {
            type_name: "Infallible",
            value: 0,
            variants: 0,
        })
    }
}

/// `i64` seconds (floored) then `u32` nanoseconds in `0..1e9`
impl FfiCodec for SystemTime {
    fn write(&self, buf: &mut Vec<u8>) {
        let (secs, nanos) = split_timestamp(self).or_raise();
        secs.write(buf);
        nanos.write(buf);
    }

    fn read(reader: &mut ByteReader<'_>) -> CodecResult<Self> {
        let secs = i64::read(reader)?;
        let nanos = u32::read(reader)?;
        if nanos >= NANOS_PER_SEC {
            return Err(CodecError::InvalidTimestamp);
        }
        let whole = if secs >= 0 {
            UNIX_EPOCH.checked_add(Duration::from_secs(secs as u64))
        } else {
            UNIX_EPOCH.checked_sub(Duration::from_secs(secs.unsigned_abs()))
        };
        whole
            .and_then(|t| t.checked_add(Duration::from_nanos(u64::from(nanos))))
            .ok_or(CodecError::InvalidTimestamp)
    }
}

fn split_timestamp(time: &SystemTime) -> CodecResult<(i64, u32)> {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => {
            let secs = i64::try_from(after.as_secs()).map_err(|_| CodecError::InvalidTimestamp)?;
            Ok((secs, after.subsec_nanos()))
        }
        Err(e) => {
            let before = e.duration();
            let secs = i64::try_from(before.as_secs()).map_err(|_| CodecError::InvalidTimestamp)?;
            match before.subsec_nanos() {
                0 => Ok((-secs, 0)),
                nanos => secs
                    .checked_add(1)
                    .map(|s| (-s, NANOS_PER_SEC - nanos))
                    .ok_or(CodecError::InvalidTimestamp),
            }
        }
    }
}

/// `u64` seconds then `u32` nanoseconds
impl FfiCodec for Duration {
    fn write(&self, buf: &mut Vec<u8>) {
        self.as_secs().write(buf);
        self.subsec_nanos().write(buf);
    }

    fn read(reader: &mut ByteReader<'_>) -> CodecResult<Self> {
        let secs = u64::read(reader)?;
        let nanos = u32::read(reader)?;
        if nanos >= NANOS_PER_SEC {
            return Err(CodecError::InvalidTimestamp);
        }
        Ok(Duration::new(secs, nanos))
    }
}
