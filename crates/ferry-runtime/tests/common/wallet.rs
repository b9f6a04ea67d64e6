//! Fake native wallet library

use super::{ListenerError, ListenerVTable, Payment, SendRequest, WalletError};
use super::{BALANCE_SIGNATURE, CONTRACT_VERSION, ON_PAYMENT_SIGNATURE, SEND_SIGNATURE};
use ferry_runtime::codec::{decode, encode};
use ferry_runtime::contract::checksum;
use ferry_runtime::envelope::{CALL_ERROR, CALL_SUCCESS};
use ferry_runtime::native::{guard_call, guard_call_or, ArcObject};
use ferry_runtime::{CallStatus, ForeignBuffer};
use parking_lot::Mutex;
use std::convert::Infallible;
use std::ffi::c_void;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

static VTABLE: OnceLock<ListenerVTable> = OnceLock::new();

#[derive(Debug, Default)]
pub struct Wallet {
    balance: Mutex<u64>,
    next_id: AtomicU64,
    listeners: Mutex<Vec<u64>>,
    acks: Mutex<Vec<String>>,
}

impl Wallet {
    pub fn with_balance(balance: u64) -> Self {
        Self {
            balance: Mutex::new(balance),
            ..Self::default()
        }
    }

    pub fn balance(&self) -> u64 {
        *self.balance.lock()
    }

    /// What the listeners answered, in notification order
    pub fn acks(&self) -> Vec<String> {
        self.acks.lock().clone()
    }

    fn send(&self, request: SendRequest) -> Result<Payment, WalletError> {
        if request.amount_sat == 0 {
            return Err(WalletError::InvalidAmount("amount must be positive".to_string()));
        }
        let mut balance = self.balance.lock();
        if request.amount_sat > *balance {
            return Err(WalletError::InsufficientFunds(format!(
                "balance {}, requested {}",
                *balance, request.amount_sat
            )));
        }
        *balance -= request.amount_sat;
        Ok(Payment {
            id: self.next_id.fetch_add(1, Ordering::Relaxed) + 1,
            amount_sat: request.amount_sat,
            description: request.description,
        })
    }

    fn notify(&self, payment: &Payment) {
        let Some(vtable) = VTABLE.get() else {
            return;
        };
        let handles = self.listeners.lock().clone();
        for handle in handles {
            let mut status = CallStatus::new();
            let mut out = ForeignBuffer::empty();
            unsafe {
                (vtable.on_payment)(
                    handle,
                    ForeignBuffer::from_vec(encode(payment)),
                    &mut out,
                    &mut status,
                );
            }
            let ack = match status.code {
                CALL_SUCCESS => {
                    decode::<String>(&unsafe { out.destroy_into_vec() }).expect("listener ack")
                }
                CALL_ERROR => {
                    let bytes = unsafe { status.error_buf.destroy_into_vec() };
                    let err: ListenerError = decode(&bytes).expect("listener error");
                    format!("rejected: {err}")
                }
                _ => {
                    let bytes = unsafe { status.error_buf.destroy_into_vec() };
                    let message = decode::<String>(&bytes).unwrap_or_default();
                    format!("fault: {message}")
                }
            };
            self.acks.lock().push(ack);
        }
    }
}

pub unsafe extern "C" fn wallet_init_callbacks(vtable: ListenerVTable) {
    let _ = VTABLE.set(vtable);
}

pub unsafe extern "C" fn wallet_new(balance: u64, status: *mut CallStatus) -> *const c_void {
    guard_call_or(status, std::ptr::null(), || {
        Ok::<_, Infallible>(ArcObject::into_raw(Arc::new(Wallet::with_balance(balance))))
    })
}

pub unsafe extern "C" fn wallet_balance(ptr: *const c_void, status: *mut CallStatus) -> u64 {
    guard_call(status, || {
        let wallet = ArcObject::<Wallet>::consume(ptr);
        Ok::<_, Infallible>(wallet.balance())
    })
}

pub unsafe extern "C" fn wallet_send(
    ptr: *const c_void,
    request: ForeignBuffer,
    status: *mut CallStatus,
) -> ForeignBuffer {
    guard_call(status, move || {
        let wallet = ArcObject::<Wallet>::consume(ptr);
        let request: SendRequest = decode(&request.destroy_into_vec()).expect("send request");
        let payment = wallet.send(request)?;
        wallet.notify(&payment);
        Ok::<_, WalletError>(ForeignBuffer::from_vec(encode(&payment)))
    })
}

pub unsafe extern "C" fn wallet_audit(ptr: *const c_void, status: *mut CallStatus) -> u64 {
    guard_call(status, || -> Result<u64, Infallible> {
        let _wallet = ArcObject::<Wallet>::consume(ptr);
        panic!("audit log corrupted")
    })
}

pub unsafe extern "C" fn wallet_merge(
    ptr: *const c_void,
    other: *const c_void,
    status: *mut CallStatus,
) -> u64 {
    guard_call(status, || {
        let wallet = ArcObject::<Wallet>::consume(ptr);
        let other = ArcObject::<Wallet>::consume(other);
        let moved = std::mem::take(&mut *other.balance.lock());
        let mut balance = wallet.balance.lock();
        *balance += moved;
        Ok::<_, Infallible>(*balance)
    })
}

pub unsafe extern "C" fn wallet_add_listener(
    ptr: *const c_void,
    handle: u64,
    status: *mut CallStatus,
) {
    guard_call(status, || {
        let wallet = ArcObject::<Wallet>::consume(ptr);
        wallet.listeners.lock().push(handle);
        Ok::<_, Infallible>(())
    })
}

pub unsafe extern "C" fn wallet_remove_listener(
    ptr: *const c_void,
    handle: u64,
    status: *mut CallStatus,
) {
    guard_call(status, || {
        let wallet = ArcObject::<Wallet>::consume(ptr);
        wallet.listeners.lock().retain(|h| *h != handle);
        if let Some(vtable) = VTABLE.get() {
            let mut free_status = CallStatus::new();
            (vtable.free)(handle, &mut free_status);
        }
        Ok::<_, Infallible>(())
    })
}

pub unsafe extern "C" fn wallet_contract_version() -> u32 {
    CONTRACT_VERSION
}

pub unsafe extern "C" fn wallet_checksum_send() -> u16 {
    checksum(SEND_SIGNATURE)
}

pub unsafe extern "C" fn wallet_checksum_balance() -> u16 {
    checksum(BALANCE_SIGNATURE)
}

pub unsafe extern "C" fn wallet_checksum_on_payment() -> u16 {
    checksum(ON_PAYMENT_SIGNATURE)
}
