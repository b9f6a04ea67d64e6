//! Native-side scaffolding for libraries implemented in Rust
//!
//! The managed side never assumes the native library is written in Rust, but
//! when it is, these helpers provide the other half of the contract:
//! - Buffer entry points backed by `Vec<u8>` ([`BUFFER_FNS`])
//! - [`guard_call`] to report results, declared errors and panics through a
//!   `CallStatus` without unwinding across the C ABI
//! - [`ArcObject`] to expose an `Arc<T>` as a reference-counted native object
//!
//! The test suite uses these as its fake native library.

use crate::buffer::{BufferFns, ForeignBuffer, ForeignBytes};
use crate::codec::{CodecLimits, FfiCodec};
use crate::envelope::{run_and_report, CallStatus};
use crate::object::ObjectFns;
use std::convert::Infallible;
use std::ffi::c_void;
use std::marker::PhantomData;
use std::sync::Arc;

/// Run native work and report its outcome through `status`
///
/// Returns `R::default()` unless the call succeeded.
///
/// # Safety
///
/// `status` must point to a valid, writable `CallStatus`.
pub unsafe fn guard_call<R, E, F>(status: *mut CallStatus, call: F) -> R
where
    R: Default,
    E: FfiCodec,
    F: FnOnce() -> Result<R, E>,
{
    guard_call_or(status, R::default(), call)
}

/// Like [`guard_call`], returning `fallback` unless the call succeeded
///
/// # Safety
///
/// `status` must point to a valid, writable `CallStatus`.
pub unsafe fn guard_call_or<R, E, F>(status: *mut CallStatus, fallback: R, call: F) -> R
where
    E: FfiCodec,
    F: FnOnce() -> Result<R, E>,
{
    let status = &mut *status;
    run_and_report(status, ForeignBuffer::from_vec, call).unwrap_or(fallback)
}

/// Copy managed bytes into a new buffer
///
/// # Safety
///
/// `bytes` must describe readable memory; `status` must be valid.
pub unsafe extern "C" fn ferry_buffer_from_bytes(
    bytes: ForeignBytes,
    status: *mut CallStatus,
) -> ForeignBuffer {
    guard_call(status, || {
        Ok::<_, Infallible>(ForeignBuffer::from_vec(bytes.as_slice().to_vec()))
    })
}

/// Allocate a zeroed buffer of `size` bytes
///
/// # Safety
///
/// `status` must be valid.
pub unsafe extern "C" fn ferry_buffer_alloc(size: u64, status: *mut CallStatus) -> ForeignBuffer {
    guard_call(status, || {
        Ok::<_, Infallible>(ForeignBuffer::from_vec(vec![0; size as usize]))
    })
}

/// Grow a buffer's capacity by at least `additional` bytes
///
/// # Safety
///
/// `buf` must come from this allocator and is consumed; `status` must be valid.
pub unsafe extern "C" fn ferry_buffer_reserve(
    buf: ForeignBuffer,
    additional: u64,
    status: *mut CallStatus,
) -> ForeignBuffer {
    guard_call(status, || {
        let mut v = buf.destroy_into_vec();
        v.reserve(additional as usize);
        Ok::<_, Infallible>(ForeignBuffer::from_vec(v))
    })
}

/// Release a buffer
///
/// # Safety
///
/// `buf` must come from this allocator and must not be used afterwards;
/// `status` must be valid.
pub unsafe extern "C" fn ferry_buffer_free(buf: ForeignBuffer, status: *mut CallStatus) {
    guard_call(status, || {
        drop(buf.destroy_into_vec());
        Ok::<_, Infallible>(())
    })
}

/// Buffer entry points of the Rust native allocator
pub const BUFFER_FNS: BufferFns = BufferFns {
    from_bytes: ferry_buffer_from_bytes,
    free: ferry_buffer_free,
    limits: CodecLimits::WIRE_MAX,
};

/// Exposes `Arc<T>` as a native reference-counted object
///
/// Clone increments the strong count, free decrements it. A method entry
/// point receives one strong reference and reclaims it with
/// [`ArcObject::consume`].
pub struct ArcObject<T>(PhantomData<fn() -> T>);

impl<T: Send + Sync + 'static> ArcObject<T> {
    /// Hand one strong reference to the managed side
    pub fn into_raw(value: Arc<T>) -> *const c_void {
        Arc::into_raw(value) as *const c_void
    }

    /// Reclaim a strong reference received from the managed side
    ///
    /// # Safety
    ///
    /// `ptr` must be a reference produced by `into_raw` or `clone_raw` that
    /// has not been reclaimed yet.
    pub unsafe fn consume(ptr: *const c_void) -> Arc<T> {
        Arc::from_raw(ptr as *const T)
    }

    /// # Safety
    ///
    /// `ptr` must be a live reference; `status` must be valid.
    pub unsafe extern "C" fn clone_raw(
        ptr: *const c_void,
        status: *mut CallStatus,
    ) -> *const c_void {
        guard_call_or(status, std::ptr::null(), || {
            Arc::increment_strong_count(ptr as *const T);
            Ok::<_, Infallible>(ptr)
        })
    }

    /// # Safety
    ///
    /// `ptr` must be a live reference that is not used afterwards; `status`
    /// must be valid.
    pub unsafe extern "C" fn free_raw(ptr: *const c_void, status: *mut CallStatus) {
        guard_call(status, || {
            Arc::decrement_strong_count(ptr as *const T);
            Ok::<_, Infallible>(())
        })
    }

    /// Object entry points for this type
    pub fn object_fns(type_name: &'static str) -> ObjectFns {
        ObjectFns {
            type_name,
            clone: Self::clone_raw,
            free: Self::free_raw,
            buffers: BUFFER_FNS,
        }
    }
}
