//! Shared fixtures for the ferry-runtime integration tests
//!
//! `wallet` is a small native library written against the Rust native
//! scaffolding. The rest of this module is the managed-side glue a binding
//! generator would emit for it.

#![allow(dead_code)]

pub mod wallet;

use ferry_runtime::contract::{checksum, ResolvedContract};
use ferry_runtime::native::{ArcObject, BUFFER_FNS};
use ferry_runtime::{
    call_infallible, call_with_error, ffi_error, ffi_record, lift_buffer, lower_into_buffer,
    BridgeFault, BufferFns, CallStatus, CallbackRegistry, CodecLimits, Contract, ForeignBuffer,
    ForeignObject, ObjectFns, OrRaise, OwnedBuffer,
};
use std::sync::{Arc, Once, OnceLock};

pub use pretty_assertions::{assert_eq, assert_ne};

pub const NAMESPACE: &str = "wallet";
pub const CONTRACT_VERSION: u32 = 3;
pub const SEND_SIGNATURE: &str = "wallet_send(SendRequest)->Payment";
pub const BALANCE_SIGNATURE: &str = "wallet_balance()->u64";
pub const ON_PAYMENT_SIGNATURE: &str = "PaymentListener.on_payment(Payment)->String";

#[derive(Debug, Clone, PartialEq)]
pub struct SendRequest {
    pub amount_sat: u64,
    pub description: Option<String>,
}
ffi_record!(SendRequest {
    amount_sat,
    description
});

#[derive(Debug, Clone, PartialEq)]
pub struct Payment {
    pub id: u64,
    pub amount_sat: u64,
    pub description: Option<String>,
}
ffi_record!(Payment {
    id,
    amount_sat,
    description
});

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WalletError {
    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
}
ffi_error!(WalletError {
    InsufficientFunds = 1,
    InvalidAmount = 2,
});

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ListenerError {
    #[error("busy: {0}")]
    Busy(String),
}
ffi_error!(ListenerError { Busy = 1 });

/// Managed-side callback interface
pub trait PaymentListener: Send + Sync {
    fn on_payment(&self, payment: Payment) -> Result<String, ListenerError>;
}

/// Table of dispatch functions handed to the native side once
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ListenerVTable {
    pub on_payment: unsafe extern "C" fn(u64, ForeignBuffer, *mut ForeignBuffer, *mut CallStatus),
    pub free: unsafe extern "C" fn(u64, *mut CallStatus),
}

static LISTENERS: OnceLock<CallbackRegistry<dyn PaymentListener>> = OnceLock::new();
static INSTALL_LISTENERS: Once = Once::new();

pub fn listeners() -> &'static CallbackRegistry<dyn PaymentListener> {
    LISTENERS.get_or_init(|| CallbackRegistry::new("PaymentListener"))
}

unsafe extern "C" fn dispatch_on_payment(
    handle: u64,
    args: ForeignBuffer,
    out_return: *mut ForeignBuffer,
    status: *mut CallStatus,
) {
    let payment: Payment = lift_buffer(args, &BUFFER_FNS);
    listeners().dispatch(handle, &mut *status, &mut *out_return, &BUFFER_FNS, |listener| {
        listener.on_payment(payment)
    });
}

unsafe extern "C" fn dispatch_free(handle: u64, status: *mut CallStatus) {
    listeners().dispatch_free(handle, &mut *status);
}

pub const LISTENER_VTABLE: ListenerVTable = ListenerVTable {
    on_payment: dispatch_on_payment,
    free: dispatch_free,
};

fn install_listeners() {
    INSTALL_LISTENERS.call_once(|| unsafe { wallet::wallet_init_callbacks(LISTENER_VTABLE) });
}

pub fn wallet_fns() -> ObjectFns {
    ArcObject::<wallet::Wallet>::object_fns("Wallet")
}

/// Managed wrapper around a native wallet object
#[derive(Debug)]
pub struct WalletHandle {
    object: ForeignObject,
    fns: BufferFns,
}

impl WalletHandle {
    pub fn new(balance_sat: u64) -> Self {
        let pointer = call_infallible(&BUFFER_FNS, |status| unsafe {
            wallet::wallet_new(balance_sat, status)
        });
        Self {
            object: unsafe { ForeignObject::from_raw(pointer, wallet_fns()) }.or_raise(),
            fns: BUFFER_FNS,
        }
    }

    /// Wrap a native wallet the test constructed itself
    pub fn adopt(native: Arc<wallet::Wallet>) -> Self {
        let pointer = ArcObject::into_raw(native);
        Self {
            object: unsafe { ForeignObject::from_raw(pointer, wallet_fns()) }.or_raise(),
            fns: BUFFER_FNS,
        }
    }

    /// Decode results under the limits `start` returned
    pub fn with_limits(self, limits: CodecLimits) -> Self {
        Self {
            fns: self.fns.with_limits(limits),
            ..self
        }
    }

    pub fn object(&self) -> &ForeignObject {
        &self.object
    }

    pub fn balance(&self) -> u64 {
        self.object.call_method(|ptr| {
            call_infallible(&self.fns, |status| unsafe { wallet::wallet_balance(ptr, status) })
        })
    }

    pub fn send(&self, request: &SendRequest) -> Result<Payment, WalletError> {
        let arg = lower_into_buffer(request, &self.fns);
        let receiver = match self.object.borrow() {
            Ok(borrow) => borrow,
            Err(violation) => {
                // `arg` never reached the native side
                unsafe { OwnedBuffer::new(arg, &self.fns) }.release();
                BridgeFault::from(violation).raise()
            }
        };
        let buf = call_with_error(&self.fns, |status| unsafe {
            wallet::wallet_send(receiver.pointer(), arg, status)
        })?;
        Ok(lift_buffer(buf, &self.fns))
    }

    pub fn audit(&self) -> u64 {
        self.object.call_method(|ptr| {
            call_infallible(&self.fns, |status| unsafe { wallet::wallet_audit(ptr, status) })
        })
    }

    /// Move `other`'s balance into this wallet
    pub fn merge(&self, other: &WalletHandle) -> u64 {
        let other_ptr = other.object.lower_as_argument();
        let receiver = match self.object.borrow() {
            Ok(borrow) => borrow,
            Err(violation) => {
                unsafe { other.object.fns().free_reference(other_ptr) };
                BridgeFault::from(violation).raise()
            }
        };
        call_infallible(&self.fns, |status| unsafe {
            wallet::wallet_merge(receiver.pointer(), other_ptr, status)
        })
    }

    pub fn add_listener(&self, listener: Arc<dyn PaymentListener>) -> u64 {
        install_listeners();
        let handle = listeners().register(listener);
        self.object.call_method(|ptr| {
            call_infallible(&self.fns, |status| unsafe {
                wallet::wallet_add_listener(ptr, handle, status)
            })
        });
        handle
    }

    pub fn remove_listener(&self, handle: u64) {
        self.object.call_method(|ptr| {
            call_infallible(&self.fns, |status| unsafe {
                wallet::wallet_remove_listener(ptr, handle, status)
            })
        });
    }

    pub fn destroy(&self) {
        self.object.destroy();
    }
}

/// Contract the managed glue above was generated with
pub fn expected_contract() -> Contract {
    Contract::new(NAMESPACE, CONTRACT_VERSION)
        .with_checksum("wallet_checksum_send", checksum(SEND_SIGNATURE))
        .with_checksum("wallet_checksum_balance", checksum(BALANCE_SIGNATURE))
        .with_checksum("wallet_checksum_on_payment", checksum(ON_PAYMENT_SIGNATURE))
}

/// Contract entry points of the wallet library, as a loader would resolve them
pub fn resolved_contract() -> ResolvedContract {
    unsafe {
        ResolvedContract::new(wallet::wallet_contract_version)
            .with_checksum_fn("wallet_checksum_send", wallet::wallet_checksum_send)
            .with_checksum_fn("wallet_checksum_balance", wallet::wallet_checksum_balance)
            .with_checksum_fn("wallet_checksum_on_payment", wallet::wallet_checksum_on_payment)
    }
}

/// Status as a native callee would leave it
pub fn fabricated_status(code: i8, payload: Option<Vec<u8>>) -> CallStatus {
    CallStatus {
        code,
        error_buf: payload.map(ForeignBuffer::from_vec).unwrap_or_default(),
    }
}

/// Run `f`, expecting it to raise a `BridgeFault`
pub fn expect_fault<R>(f: impl FnOnce() -> R) -> ferry_runtime::BridgeFault {
    let payload = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f))
        .err()
        .expect("expected a bridge fault");
    payload
        .downcast_ref::<ferry_runtime::BridgeFault>()
        .cloned()
        .expect("panic payload is not a BridgeFault")
}
