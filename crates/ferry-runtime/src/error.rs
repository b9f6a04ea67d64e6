//! Error taxonomy for the boundary
//!
//! - `CodecError`: a buffer could not be decoded as the expected type
//! - `ContractViolation`: the two sides are not running compatible code
//! - `NativeFault`: the native side faulted while handling a call
//! - `BridgeFault`: payload raised through the unrecoverable channel
//!
//! Declared failures are not represented here. They are the operation's own
//! typed error and travel through the ordinary `Result` of the call.

use thiserror::Error;

/// Decoding errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The buffer ended before a value was fully read
    #[error("unexpected end of buffer: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof { needed: usize, remaining: usize },

    /// A length or count prefix was negative
    #[error("negative length prefix: {0}")]
    NegativeLength(i32),

    /// A length or count prefix exceeded the configured limit
    #[error("length {len} exceeds the decode limit of {limit}")]
    LengthLimit { len: usize, limit: usize },

    /// A value is too long to be described by a 32-bit signed length prefix
    #[error("length {0} does not fit in a 32-bit length prefix")]
    LengthOverflow(usize),

    /// A union discriminant outside `1..=variants`
    #[error("invalid discriminant {value} for {type_name} ({variants} variants)")]
    InvalidDiscriminant {
        type_name: &'static str,
        value: i32,
        variants: i32,
    },

    /// A bool byte other than 0 or 1
    #[error("invalid bool byte: {0}")]
    InvalidBool(i8),

    /// An optional presence flag other than 0 or 1
    #[error("invalid optional presence flag: {0}")]
    InvalidOptionFlag(i8),

    /// String bytes were not UTF-8
    #[error("invalid UTF-8 in string: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// Timestamp or duration outside the representable range
    #[error("timestamp or duration out of range")]
    InvalidTimestamp,

    /// Map keys repeated or out of ascending order
    #[error("map key {index} is not greater than the key before it")]
    UnorderedMapKey { index: usize },

    /// Bytes left over after the value was decoded
    #[error("{remaining} bytes left over after decoding")]
    TrailingBytes { remaining: usize },
}

/// Result type for codec operations
pub type CodecResult<T> = Result<T, CodecError>;

/// The managed and native sides disagree about the interface
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContractViolation {
    #[error("failed to decode buffer: {0}")]
    Codec(#[from] CodecError),

    #[error("unknown call status code: {0}")]
    UnknownStatus(i8),

    #[error("non-fallible call reported a declared error")]
    UnexpectedError,

    #[error("contract version mismatch: expected {expected}, native side reports {actual}")]
    ContractVersionMismatch { expected: u32, actual: u32 },

    #[error("checksum mismatch for `{symbol}`: expected {expected}, native side reports {actual}")]
    ChecksumMismatch {
        symbol: String,
        expected: u16,
        actual: u16,
    },

    #[error("native side does not export a checksum for `{0}`")]
    MissingChecksum(String),

    #[error("callback handle {handle} is not registered for {interface}")]
    UnknownCallbackHandle { interface: &'static str, handle: u64 },

    #[error("{type_name} object used after it was destroyed")]
    ObjectReleased { type_name: &'static str },

    #[error("{type_name} borrow counter saturated")]
    BorrowOverflow { type_name: &'static str },

    #[error("native side returned a null {type_name} pointer")]
    NullObject { type_name: &'static str },
}

/// The native side faulted while executing a call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NativeFault {
    /// Fault with the message the native side attached
    #[error("native fault: {0}")]
    Panic(String),

    /// The native side faulted, then faulted again while encoding the message
    #[error("native fault while handling a native fault")]
    FaultWhileHandlingFault,
}

/// Unrecoverable condition raised by the boundary
///
/// Raised with [`std::panic::panic_any`]. A host that needs to report it can
/// `catch_unwind` and downcast the payload to `BridgeFault`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeFault {
    #[error("contract violation: {0}")]
    Contract(#[from] ContractViolation),

    #[error(transparent)]
    Native(#[from] NativeFault),
}

impl From<CodecError> for BridgeFault {
    fn from(e: CodecError) -> Self {
        BridgeFault::Contract(ContractViolation::Codec(e))
    }
}

impl BridgeFault {
    /// Raise through the unrecoverable channel
    #[track_caller]
    pub fn raise(self) -> ! {
        tracing::error!(fault = %self, "ferry boundary fault");
        std::panic::panic_any(self)
    }
}

/// Escalate an error into a [`BridgeFault`]
pub trait OrRaise<T> {
    fn or_raise(self) -> T;
}

impl<T, E: Into<BridgeFault>> OrRaise<T> for Result<T, E> {
    #[track_caller]
    fn or_raise(self) -> T {
        match self {
            Ok(value) => value,
            Err(e) => e.into().raise(),
        }
    }
}

/// Render a panic payload as a message
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(fault) = payload.downcast_ref::<BridgeFault>() {
        fault.to_string()
    } else {
        "panic with a non-string payload".to_string()
    }
}
