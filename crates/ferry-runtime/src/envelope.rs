//! Call envelope - three-way outcome of every native invocation
//!
//! Every native entry point takes a trailing `*mut CallStatus`. After the
//! call returns, the status code selects the outcome:
//!
//! | code | meaning          | error buffer holds        |
//! |------|------------------|---------------------------|
//! | 0    | success          | nothing                   |
//! | 1    | declared error   | the encoded typed error   |
//! | 2    | native fault     | the fault message, if any |
//!
//! Declared errors come back as `Err`. Faults and unknown codes are raised as
//! a [`BridgeFault`] and never turned into a recoverable value.

use crate::buffer::{BufferFns, ForeignBuffer, ForeignBytes, OwnedBuffer};
use crate::codec::{self, FfiCodec};
use crate::error::{panic_message, BridgeFault, ContractViolation, NativeFault, OrRaise};
use std::panic::{self, AssertUnwindSafe};

/// Status code: the call succeeded
pub const CALL_SUCCESS: i8 = 0;
/// Status code: the call returned its declared error type
pub const CALL_ERROR: i8 = 1;
/// Status code: the callee faulted
pub const CALL_FAULT: i8 = 2;

/// Out-parameter filled in by the callee
#[repr(C)]
#[derive(Debug, Default)]
pub struct CallStatus {
    pub code: i8,
    pub error_buf: ForeignBuffer,
}

impl CallStatus {
    /// A fresh status (success, no buffer)
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the callee reported success
    pub fn is_success(&self) -> bool {
        self.code == CALL_SUCCESS
    }
}

/// Decoded outcome of a native call
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome<T, E> {
    Ok(T),
    Err(E),
    Fault(NativeFault),
}

impl<T, E> CallOutcome<T, E> {
    /// Declared failures become `Err`; faults are raised
    #[track_caller]
    pub fn into_result(self) -> Result<T, E> {
        match self {
            CallOutcome::Ok(value) => Ok(value),
            CallOutcome::Err(err) => Err(err),
            CallOutcome::Fault(fault) => BridgeFault::from(fault).raise(),
        }
    }
}

/// Inspect `status` after the native function returned `value`
///
/// Takes ownership of any buffer attached to the status and releases it
/// after decoding.
pub fn outcome_from_status<T, E: FfiCodec>(
    value: T,
    status: CallStatus,
    fns: &BufferFns,
) -> Result<CallOutcome<T, E>, ContractViolation> {
    match status.code {
        CALL_SUCCESS => Ok(CallOutcome::Ok(value)),
        CALL_ERROR => {
            // Safety: the callee hands the error buffer to the caller
            let owned = unsafe { OwnedBuffer::new(status.error_buf, fns) };
            Ok(CallOutcome::Err(owned.lift()?))
        }
        CALL_FAULT => Ok(CallOutcome::Fault(fault_from_buffer(status.error_buf, fns)?)),
        code => Err(ContractViolation::UnknownStatus(code)),
    }
}

fn fault_from_buffer(buf: ForeignBuffer, fns: &BufferFns) -> Result<NativeFault, ContractViolation> {
    if !buf.is_allocated() {
        return Ok(NativeFault::FaultWhileHandlingFault);
    }
    // Safety: the callee hands the fault buffer to the caller
    let owned = unsafe { OwnedBuffer::new(buf, fns) };
    if owned.as_slice().is_empty() {
        return Ok(NativeFault::FaultWhileHandlingFault);
    }
    Ok(NativeFault::Panic(owned.lift::<String>()?))
}

/// Invoke a native function that declares the error type `E`
///
/// `call` receives the status out-parameter and performs the actual native
/// invocation.
#[track_caller]
pub fn call_with_error<T, E, F>(fns: &BufferFns, call: F) -> Result<T, E>
where
    E: FfiCodec,
    F: FnOnce(&mut CallStatus) -> T,
{
    let mut status = CallStatus::new();
    let value = call(&mut status);
    outcome_from_status(value, status, fns)
        .or_raise()
        .into_result()
}

/// Invoke a native function that declares no error type
///
/// A code 1 from such a function cannot happen under a matching contract and
/// is raised like any other contract violation.
#[track_caller]
pub fn call_infallible<T, F>(fns: &BufferFns, call: F) -> T
where
    F: FnOnce(&mut CallStatus) -> T,
{
    let mut status = CallStatus::new();
    let value = call(&mut status);
    match status.code {
        CALL_SUCCESS => value,
        CALL_ERROR => {
            if status.error_buf.is_allocated() {
                // Safety: the callee hands the error buffer to the caller
                unsafe { OwnedBuffer::new(status.error_buf, fns) }.release();
            }
            BridgeFault::from(ContractViolation::UnexpectedError).raise()
        }
        CALL_FAULT => {
            let fault = fault_from_buffer(status.error_buf, fns).or_raise();
            BridgeFault::from(fault).raise()
        }
        code => BridgeFault::from(ContractViolation::UnknownStatus(code)).raise(),
    }
}

/// Run `call`, reporting its outcome through `status`
///
/// Declared errors are encoded with `alloc` as code 1, panics as code 2 with
/// the panic message. If encoding either of those panics as well, the status
/// is code 2 with an empty buffer. Nothing unwinds out of this function.
pub(crate) fn run_and_report<R, E, F, A>(status: &mut CallStatus, alloc: A, call: F) -> Option<R>
where
    E: FfiCodec,
    F: FnOnce() -> Result<R, E>,
    A: Fn(Vec<u8>) -> ForeignBuffer,
{
    let failure = match panic::catch_unwind(AssertUnwindSafe(call)) {
        Ok(Ok(value)) => {
            status.code = CALL_SUCCESS;
            return Some(value);
        }
        Ok(Err(err)) => panic::catch_unwind(AssertUnwindSafe(|| alloc(codec::encode(&err))))
            .map(|buf| (CALL_ERROR, buf)),
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            panic::catch_unwind(AssertUnwindSafe(|| alloc(codec::encode(&message))))
                .map(|buf| (CALL_FAULT, buf))
        }
    };

    match failure {
        Ok((code, buf)) => {
            status.code = code;
            status.error_buf = buf;
        }
        Err(_) => {
            status.code = CALL_FAULT;
            status.error_buf = ForeignBuffer::empty();
        }
    }
    None
}

/// Run a managed callback implementation on behalf of a native dispatch
///
/// On success the encoded return value is written to `out_return`. Buffers
/// are allocated with the native allocator so the native side can free them.
pub fn handle_callback_call<R, E, F>(
    status: &mut CallStatus,
    out_return: &mut ForeignBuffer,
    fns: &BufferFns,
    call: F,
) where
    R: FfiCodec,
    E: FfiCodec,
    F: FnOnce() -> Result<R, E>,
{
    let alloc = |bytes: Vec<u8>| {
        let foreign = ForeignBytes::from_slice(&bytes);
        let from_bytes = fns.from_bytes;
        call_infallible(fns, |s| unsafe { from_bytes(foreign, s) })
    };

    let lowered = run_and_report(status, &alloc, || {
        call().map(|value| alloc(codec::encode(&value)))
    });
    if let Some(buf) = lowered {
        *out_return = buf;
    }
}
