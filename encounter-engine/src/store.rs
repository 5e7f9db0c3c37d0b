//! Persistence-adapter interface for the encounter engine

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::Encounter;
use ledger_engine::{ChargeOrder, StoreError};

/// One atomic encounter transition, optionally coupled with the ledger
/// write the transition triggers (finalize on completion, void or freeze
/// on cancellation).
///
/// Adapters must apply both rows in a single transaction, compare-and-swap
/// on each aggregate's loaded `version`, and fail the whole commit with
/// [`StoreError::StaleVersion`] when either row moved underneath us.
#[derive(Debug)]
pub struct TransitionCommit<'a> {
    pub encounter: &'a Encounter,
    pub order: Option<&'a ChargeOrder>,
}

#[async_trait]
pub trait EncounterStore: Send + Sync {
    /// Load an encounter scoped to its institution.
    async fn load(
        &self,
        institution_id: Uuid,
        encounter_id: Uuid,
    ) -> Result<Option<Encounter>, StoreError>;

    /// Insert a newly scheduled or walk-in encounter.
    async fn insert(&self, encounter: &Encounter) -> Result<(), StoreError>;

    /// Load the charge order attached to an encounter, if any.
    async fn load_order(&self, encounter_id: Uuid) -> Result<Option<ChargeOrder>, StoreError>;

    /// Apply one atomic transition; see [`TransitionCommit`].
    async fn commit(&self, commit: TransitionCommit<'_>) -> Result<(), StoreError>;
}
