//! Buffer ownership bridge
//!
//! A [`ForeignBuffer`] is a `(data, len, capacity)` triple describing memory
//! allocated by the native side's allocator. Ownership is single:
//! - Buffers returned from a native call belong to the managed side, which
//!   reads them once ([`OwnedBuffer::lift`]) and frees them exactly once
//!   through the native `free` entry point.
//! - Buffers passed into a native call ([`lower_into_buffer`]) are
//!   transferred; the native side disposes of them.

use crate::codec::{self, ByteReader, CodecLimits, FfiCodec};
use crate::envelope::{call_infallible, CallStatus};
use crate::error::{CodecError, CodecResult, OrRaise};
use std::mem::ManuallyDrop;
use std::ptr;

/// Native-allocated buffer descriptor
#[repr(C)]
#[derive(Debug)]
pub struct ForeignBuffer {
    /// Pointer to the data (null for an empty, unallocated buffer)
    pub data: *mut u8,
    /// Length of valid data in bytes
    pub len: u64,
    /// Total capacity of the allocation
    pub capacity: u64,
}

// Safety: a ForeignBuffer is a plain descriptor; whoever owns it is the only
// one who reads or frees the memory behind it.
unsafe impl Send for ForeignBuffer {}

impl ForeignBuffer {
    /// A buffer with no allocation behind it
    pub const fn empty() -> Self {
        Self {
            data: ptr::null_mut(),
            len: 0,
            capacity: 0,
        }
    }

    /// Length of valid data
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// Whether the buffer holds no data
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether an allocation sits behind the descriptor
    pub fn is_allocated(&self) -> bool {
        !self.data.is_null()
    }

    /// View the data
    ///
    /// # Safety
    ///
    /// The buffer must be live (not yet freed) and `len` bytes at `data`
    /// must be initialised.
    pub unsafe fn as_slice(&self) -> &[u8] {
        if self.data.is_null() {
            &[]
        } else {
            std::slice::from_raw_parts(self.data, self.len as usize)
        }
    }

    /// Take ownership of a `Vec` as a buffer (native-side allocator)
    pub fn from_vec(v: Vec<u8>) -> Self {
        let mut v = ManuallyDrop::new(v);
        Self {
            data: v.as_mut_ptr(),
            len: v.len() as u64,
            capacity: v.capacity() as u64,
        }
    }

    /// Reconstruct the `Vec` a buffer was created from
    ///
    /// # Safety
    ///
    /// The buffer must have been produced by [`ForeignBuffer::from_vec`] and
    /// must not be used again afterwards.
    pub unsafe fn destroy_into_vec(self) -> Vec<u8> {
        if self.data.is_null() {
            Vec::new()
        } else {
            Vec::from_raw_parts(self.data, self.len as usize, self.capacity as usize)
        }
    }
}

impl Default for ForeignBuffer {
    fn default() -> Self {
        Self::empty()
    }
}

/// Borrowed view of managed memory handed to the native side for copying
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ForeignBytes {
    pub len: i32,
    pub data: *const u8,
}

impl ForeignBytes {
    /// Describe a slice; the slice must outlive every use of the descriptor
    pub fn from_slice(bytes: &[u8]) -> Self {
        let len = i32::try_from(bytes.len())
            .map_err(|_| CodecError::LengthOverflow(bytes.len()))
            .or_raise();
        Self {
            len,
            data: bytes.as_ptr(),
        }
    }

    /// View the bytes
    ///
    /// # Safety
    ///
    /// `data` must point to `len` readable bytes for the returned lifetime.
    pub unsafe fn as_slice<'a>(&self) -> &'a [u8] {
        if self.data.is_null() || self.len <= 0 {
            &[]
        } else {
            std::slice::from_raw_parts(self.data, self.len as usize)
        }
    }
}

/// Native buffer entry points, resolved by whoever loads the library
///
/// Also carries the decode limits applied to every buffer lifted through
/// these entry points.
#[derive(Debug, Clone, Copy)]
pub struct BufferFns {
    /// Copy managed bytes into a new native buffer
    pub from_bytes: unsafe extern "C" fn(ForeignBytes, *mut CallStatus) -> ForeignBuffer,
    /// Release a native buffer
    pub free: unsafe extern "C" fn(ForeignBuffer, *mut CallStatus),
    /// Bounds for decoding received buffers
    pub limits: CodecLimits,
}

impl BufferFns {
    /// The same entry points, decoding under `limits`
    pub fn with_limits(self, limits: CodecLimits) -> Self {
        Self { limits, ..self }
    }
}

/// A native buffer owned by the managed side
///
/// Released through the native `free` entry point exactly once, on drop.
pub struct OwnedBuffer<'a> {
    inner: ManuallyDrop<ForeignBuffer>,
    fns: &'a BufferFns,
}

impl<'a> OwnedBuffer<'a> {
    /// Take ownership of a buffer received from the native side
    ///
    /// # Safety
    ///
    /// `buf` must have been allocated by the allocator behind `fns`, must be
    /// live, and ownership must not be claimed by anything else.
    pub unsafe fn new(buf: ForeignBuffer, fns: &'a BufferFns) -> Self {
        Self {
            inner: ManuallyDrop::new(buf),
            fns,
        }
    }

    /// The received bytes
    pub fn as_slice(&self) -> &[u8] {
        // Safety: `new` requires a live buffer and we have not freed it yet
        unsafe { self.inner.as_slice() }
    }

    /// Decode the whole buffer as `T` under the entry points' limits, then
    /// release it
    pub fn lift<T: FfiCodec>(self) -> CodecResult<T> {
        let mut reader = ByteReader::with_limits(self.as_slice(), self.fns.limits);
        let value = T::read(&mut reader)?;
        reader.finish()?;
        Ok(value)
    }

    /// Release the buffer now
    pub fn release(self) {}
}

impl Drop for OwnedBuffer<'_> {
    fn drop(&mut self) {
        // Safety: drop runs once, and `inner` is not touched after the take
        let buf = unsafe { ManuallyDrop::take(&mut self.inner) };
        tracing::trace!(len = buf.len, capacity = buf.capacity, "releasing native buffer");
        let free = self.fns.free;
        call_infallible(self.fns, |status| unsafe { free(buf, status) });
    }
}

/// Encode `value` into a fresh native buffer to be transferred into a call
pub fn lower_into_buffer<T: FfiCodec>(value: &T, fns: &BufferFns) -> ForeignBuffer {
    let bytes = codec::encode(value);
    let foreign = ForeignBytes::from_slice(&bytes);
    let from_bytes = fns.from_bytes;
    call_infallible(fns, |status| unsafe { from_bytes(foreign, status) })
}

/// Decode a buffer returned by a native call, raising on a codec mismatch
pub fn lift_buffer<T: FfiCodec>(buf: ForeignBuffer, fns: &BufferFns) -> T {
    // Safety: buffers returned by native calls are owned by the caller
    unsafe { OwnedBuffer::new(buf, fns) }.lift().or_raise()
}
