//! Optionals, sequences and maps

use super::{write_len, ByteReader, FfiCodec};
use crate::error::{CodecError, CodecResult};
use std::collections::BTreeMap;

impl<T: FfiCodec> FfiCodec for Option<T> {
    fn write(&self, buf: &mut Vec<u8>) {
        match self {
            None => buf.push(0),
            Some(value) => {
                buf.push(1);
                value.write(buf);
            }
        }
    }

    fn read(reader: &mut ByteReader<'_>) -> CodecResult<Self> {
        match i8::read(reader)? {
            0 => Ok(None),
            1 => Ok(Some(T::read(reader)?)),
            other => Err(CodecError::InvalidOptionFlag(other)),
        }
    }
}

impl<T: FfiCodec> FfiCodec for Vec<T> {
    fn write(&self, buf: &mut Vec<u8>) {
        write_len(buf, self.len());
        for item in self {
            item.write(buf);
        }
    }

    fn read(reader: &mut ByteReader<'_>) -> CodecResult<Self> {
        let len = reader.read_len()?;
        // Preallocate no more than the buffer could hold
        let mut items = Vec::with_capacity(len.min(reader.remaining()));
        for _ in 0..len {
            items.push(T::read(reader)?);
        }
        Ok(items)
    }
}

/// Entries are written in strictly ascending key order; decoding rejects
/// anything else, so every map has exactly one encoding
impl<K: FfiCodec + Ord, V: FfiCodec> FfiCodec for BTreeMap<K, V> {
    fn write(&self, buf: &mut Vec<u8>) {
        write_len(buf, self.len());
        for (key, value) in self {
            key.write(buf);
            value.write(buf);
        }
    }

    fn read(reader: &mut ByteReader<'_>) -> CodecResult<Self> {
        let len = reader.read_len()?;
        let mut map = BTreeMap::new();
        for index in 0..len {
            let key = K::read(reader)?;
            if matches!(map.last_key_value(), Some((last, _)) if *last >= key) {
                return Err(CodecError::UnorderedMapKey { index });
            }
            let value = V::read(reader)?;
            map.insert(key, value);
        }
        Ok(map)
    }
}
