//! Foreign object lifetime manager
//!
//! A [`ForeignObject`] wraps a pointer to a reference-counted native object.
//! Each handle carries an atomic borrow counter (baseline 0) and a destroyed
//! flag:
//!
//! - `borrow` increments the counter, then asks the native side for a fresh
//!   reference to pass into the call
//! - dropping the [`ObjectBorrow`] decrements it
//! - `destroy` flips the flag once and performs one extra decrement
//!
//! Whichever decrement takes the counter below the baseline frees the native
//! reference. That happens exactly once, and never while a borrow is
//! outstanding.

use crate::buffer::BufferFns;
use crate::envelope::{call_infallible, CallStatus};
use crate::error::{ContractViolation, OrRaise};
use std::ffi::c_void;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

/// Native entry points for one object type
#[derive(Debug, Clone, Copy)]
pub struct ObjectFns {
    pub type_name: &'static str,
    /// Take one more native reference; the result is consumed by the call it
    /// is passed into
    pub clone: unsafe extern "C" fn(*const c_void, *mut CallStatus) -> *const c_void,
    /// Drop one native reference
    pub free: unsafe extern "C" fn(*const c_void, *mut CallStatus),
    /// Allocator used for fault messages of the two calls above
    pub buffers: BufferFns,
}

impl ObjectFns {
    /// Drop a native reference that was produced but never handed to a call
    ///
    /// # Safety
    ///
    /// `pointer` must be an unconsumed reference obtained from these entry
    /// points, and must not be used afterwards.
    pub unsafe fn free_reference(&self, pointer: *const c_void) {
        let free = self.free;
        call_infallible(&self.buffers, |status| free(pointer, status));
    }
}

/// Managed handle to a native object
pub struct ForeignObject {
    pointer: *const c_void,
    fns: ObjectFns,
    active: AtomicI64,
    destroyed: AtomicBool,
}

// Safety: the pointer is only dereferenced by the native side, which
// synchronises its own reference count. Our state is atomic.
unsafe impl Send for ForeignObject {}
unsafe impl Sync for ForeignObject {}

impl ForeignObject {
    /// Take ownership of one native reference
    ///
    /// # Safety
    ///
    /// `pointer` must be a reference the native side handed over, compatible
    /// with the entry points in `fns`, and owned by nothing else.
    pub unsafe fn from_raw(pointer: *const c_void, fns: ObjectFns) -> Result<Self, ContractViolation> {
        if pointer.is_null() {
            return Err(ContractViolation::NullObject {
                type_name: fns.type_name,
            });
        }
        Ok(Self {
            pointer,
            fns,
            active: AtomicI64::new(0),
            destroyed: AtomicBool::new(false),
        })
    }

    pub fn type_name(&self) -> &'static str {
        self.fns.type_name
    }

    pub fn fns(&self) -> &ObjectFns {
        &self.fns
    }

    /// Number of borrows currently outstanding
    pub fn active_borrows(&self) -> i64 {
        self.active.load(Ordering::Acquire).max(0)
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }

    /// Borrow the object for one native call
    ///
    /// Fails if the handle was destroyed or the counter is saturated.
    pub fn borrow(&self) -> Result<ObjectBorrow<'_>, ContractViolation> {
        let type_name = self.fns.type_name;
        let mut current = self.active.load(Ordering::Acquire);
        loop {
            if current < 0 || self.destroyed.load(Ordering::Acquire) {
                return Err(ContractViolation::ObjectReleased { type_name });
            }
            if current == i64::MAX {
                return Err(ContractViolation::BorrowOverflow { type_name });
            }
            match self.active.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }

        let mut borrow = ObjectBorrow {
            object: self,
            pointer: std::ptr::null(),
        };
        let clone = self.fns.clone;
        let pointer = self.pointer;
        let cloned = call_infallible(&self.fns.buffers, |status| unsafe { clone(pointer, status) });
        if cloned.is_null() {
            return Err(ContractViolation::NullObject { type_name });
        }
        tracing::trace!(type_name, active = current + 1, "borrowed native object");
        borrow.pointer = cloned;
        Ok(borrow)
    }

    /// Run a method call against the object
    ///
    /// `call` receives a fresh native reference, which the method consumes.
    /// Using a destroyed handle is raised as a contract fault.
    #[track_caller]
    pub fn call_method<T, F>(&self, call: F) -> T
    where
        F: FnOnce(*const c_void) -> T,
    {
        let borrow = self.borrow().or_raise();
        call(borrow.pointer())
    }

    /// Produce a native reference to pass the object as a plain argument
    ///
    /// The returned pointer is owned by the call it is passed into. The
    /// borrow covers the clone, so a concurrent `destroy` cannot free the
    /// object before the native side holds its own reference.
    #[track_caller]
    pub fn lower_as_argument(&self) -> *const c_void {
        self.borrow().or_raise().pointer()
    }

    /// Give up this handle's reference
    ///
    /// Only the first call has an effect. If borrows are outstanding, the
    /// native free runs when the last of them is returned.
    pub fn destroy(&self) {
        if self
            .destroyed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            tracing::trace!(type_name = self.fns.type_name, "destroying native object");
            self.release_one();
        }
    }

    fn release_one(&self) {
        if self.active.fetch_sub(1, Ordering::AcqRel) == 0 {
            self.free_native();
        }
    }

    fn free_native(&self) {
        tracing::debug!(type_name = self.fns.type_name, "freeing native object");
        // Safety: the counter went below baseline, so this handle's own
        // reference is released exactly once, here
        unsafe { self.fns.free_reference(self.pointer) };
    }
}

impl Drop for ForeignObject {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl fmt::Debug for ForeignObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForeignObject")
            .field("type_name", &self.fns.type_name)
            .field("pointer", &self.pointer)
            .field("active", &self.active.load(Ordering::Relaxed))
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

/// An outstanding borrow; returned when dropped
pub struct ObjectBorrow<'a> {
    object: &'a ForeignObject,
    pointer: *const c_void,
}

impl ObjectBorrow<'_> {
    /// The native reference produced for this borrow
    pub fn pointer(&self) -> *const c_void {
        self.pointer
    }
}

impl Drop for ObjectBorrow<'_> {
    fn drop(&mut self) {
        self.object.release_one();
    }
}
