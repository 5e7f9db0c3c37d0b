use thiserror::Error;
use uuid::Uuid;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Invalid charge item: {0}")]
    InvalidChargeItem(String),

    #[error("Invalid payment: {0}")]
    InvalidPayment(String),

    #[error("Charge order is frozen and accepts no further items or payments")]
    OrderFrozen,

    #[error("Charge order is already finalized")]
    AlreadyFinalized,

    #[error("Charge order has settled payments and cannot be voided")]
    VoidAfterPayment,

    #[error("Payment not found: {0}")]
    PaymentNotFound(Uuid),

    #[error("Charge order not found: {0}")]
    NotFound(Uuid),

    #[error("Charge order was modified concurrently; reload and retry")]
    ConcurrentModification,

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

pub type LedgerResult<T> = Result<T, LedgerError>;
