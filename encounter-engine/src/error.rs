use thiserror::Error;
use uuid::Uuid;

use crate::models::EncounterStatus;
use ledger_engine::{LedgerError, StoreError};

#[derive(Error, Debug)]
pub enum EncounterError {
    #[error("Invalid transition: {from} -> {to}")]
    InvalidTransition { from: EncounterStatus, to: EncounterStatus },

    #[error("Encounter has already arrived")]
    AlreadyArrived,

    #[error("Encounter was modified concurrently; reload and retry")]
    ConcurrentModification,

    #[error("Encounter not found: {0}")]
    NotFound(Uuid),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

pub type EncounterResult<T> = Result<T, EncounterError>;
