//! Callback dispatch registry
//!
//! Managed implementations of a callback interface are handed to the native
//! side as opaque `u64` handles. The native side calls back through a table
//! of `extern "C"` dispatch functions, one per method plus one `free`, with
//! the handle as first argument. Generated glue for each interface owns one
//! [`CallbackRegistry`] and routes those calls through
//! [`CallbackRegistry::dispatch`] and [`CallbackRegistry::dispatch_free`].
//!
//! The native side alone decides when a handle is no longer used, so a
//! handle is only removed by its `free` dispatch.

use crate::buffer::{BufferFns, ForeignBuffer};
use crate::codec::FfiCodec;
use crate::envelope::{handle_callback_call, CallStatus, CALL_SUCCESS};
use crate::error::{ContractViolation, OrRaise};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Handles are unique across every registry in the process
static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

/// Handle table for one callback interface
pub struct CallbackRegistry<T: ?Sized> {
    interface: &'static str,
    handles: Mutex<HashMap<u64, Arc<T>>>,
}

impl<T: ?Sized + Send + Sync> CallbackRegistry<T> {
    pub fn new(interface: &'static str) -> Self {
        Self {
            interface,
            handles: Mutex::new(HashMap::new()),
        }
    }

    pub fn interface(&self) -> &'static str {
        self.interface
    }

    /// Store an implementation under a fresh handle
    pub fn register(&self, implementation: Arc<T>) -> u64 {
        let handle = NEXT_HANDLE.fetch_add(1, Ordering::Relaxed);
        self.handles.lock().insert(handle, implementation);
        tracing::debug!(interface = self.interface, handle, "registered callback handle");
        handle
    }

    /// Look up the implementation behind `handle`
    pub fn resolve(&self, handle: u64) -> Result<Arc<T>, ContractViolation> {
        self.handles
            .lock()
            .get(&handle)
            .cloned()
            .ok_or(ContractViolation::UnknownCallbackHandle {
                interface: self.interface,
                handle,
            })
    }

    /// Remove `handle`, returning the implementation it pointed to
    pub fn unregister(&self, handle: u64) -> Result<Arc<T>, ContractViolation> {
        let removed = self.handles.lock().remove(&handle);
        match removed {
            Some(implementation) => {
                tracing::debug!(interface = self.interface, handle, "released callback handle");
                Ok(implementation)
            }
            None => Err(ContractViolation::UnknownCallbackHandle {
                interface: self.interface,
                handle,
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.handles.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.lock().is_empty()
    }

    /// Serve one native-originated method call
    ///
    /// An unknown handle is raised as a contract fault. Otherwise the result
    /// of `call` is reported through `status` and `out_return` as described
    /// in [`handle_callback_call`]. The registry lock is not held while the
    /// implementation runs.
    #[track_caller]
    pub fn dispatch<R, E, F>(
        &self,
        handle: u64,
        status: &mut CallStatus,
        out_return: &mut ForeignBuffer,
        fns: &BufferFns,
        call: F,
    ) where
        R: FfiCodec,
        E: FfiCodec,
        F: FnOnce(&T) -> Result<R, E>,
    {
        let implementation = self.resolve(handle).or_raise();
        handle_callback_call(status, out_return, fns, || call(&implementation));
    }

    /// Serve the native side's `free` signal for `handle`
    #[track_caller]
    pub fn dispatch_free(&self, handle: u64, status: &mut CallStatus) {
        self.unregister(handle).or_raise();
        status.code = CALL_SUCCESS;
    }
}

impl<T: ?Sized> fmt::Debug for CallbackRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("interface", &self.interface)
            .field("handles", &self.handles.lock().len())
            .finish()
    }
}
