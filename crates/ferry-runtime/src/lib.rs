//! Ferry Runtime - managed side of a C-ABI boundary
//!
//! Support code linked into generated bindings for a native library:
//! - Binary codec shared by both sides ([`codec`])
//! - Ownership of native-allocated buffers ([`buffer`])
//! - Three-way call outcome handling ([`envelope`])
//! - Reference-counted native objects ([`object`])
//! - Callback handle tables for native-to-managed calls ([`callbacks`])
//! - Contract verification at startup ([`contract`])
//!
//! Declared failures travel through ordinary `Result`s. Contract violations
//! and native faults are raised as a [`BridgeFault`] panic payload.

/// Ferry runtime version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod buffer;
pub mod callbacks;
pub mod codec;
pub mod contract;
pub mod envelope;
pub mod error;
pub mod native;
pub mod object;
pub mod startup;

pub use buffer::{lift_buffer, lower_into_buffer, BufferFns, ForeignBuffer, ForeignBytes, OwnedBuffer};
pub use callbacks::CallbackRegistry;
pub use codec::{decode, encode, ByteReader, Bytes, CodecLimits, FfiCodec};
pub use contract::{Contract, NativeContract, ResolvedContract};
pub use envelope::{call_infallible, call_with_error, handle_callback_call, CallOutcome, CallStatus};
pub use error::{BridgeFault, CodecError, CodecResult, ContractViolation, NativeFault, OrRaise};
pub use object::{ForeignObject, ObjectBorrow, ObjectFns};
pub use startup::start;
