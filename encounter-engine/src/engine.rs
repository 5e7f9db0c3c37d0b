use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::error::{EncounterError, EncounterResult};
use crate::models::{Encounter, NewEncounter, WalkInRegistration};
use crate::store::{EncounterStore, TransitionCommit};
use ledger_engine::StoreError;

/// Encounter engine
///
/// Validates and applies status transitions, coupling terminal ones to the
/// ledger in a single atomic commit. Concurrent attempts to advance the
/// same encounter serialize through the store's compare-and-swap: the
/// loser observes [`EncounterError::ConcurrentModification`].
pub struct EncounterEngine<S> {
    store: S,
}

impl<S: EncounterStore> EncounterEngine<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Schedule an encounter ahead of the visit (`pending`).
    pub async fn schedule(&self, new: NewEncounter) -> EncounterResult<Encounter> {
        let encounter = Encounter::schedule(new, Utc::now());
        self.store.insert(&encounter).await?;
        info!(encounter_id = %encounter.id, patient_id = %encounter.patient_id, "encounter scheduled");
        Ok(encounter)
    }

    /// Register the arrival of a scheduled encounter (`pending -> arrived`).
    pub async fn register_arrival(
        &self,
        institution_id: Uuid,
        encounter_id: Uuid,
    ) -> EncounterResult<Encounter> {
        let mut encounter = self.fetch(institution_id, encounter_id).await?;
        encounter.register_arrival(Utc::now())?;
        self.commit(&encounter, None).await?;
        encounter.version += 1;
        info!(encounter_id = %encounter.id, "arrival registered");
        Ok(encounter)
    }

    /// Register a walk-in with no prior scheduled encounter; the encounter
    /// is created directly in `arrived`.
    pub async fn register_walk_in(&self, reg: WalkInRegistration) -> EncounterResult<Encounter> {
        let encounter = Encounter::walk_in(reg, Utc::now());
        self.store.insert(&encounter).await?;
        info!(encounter_id = %encounter.id, patient_id = %encounter.patient_id, "walk-in registered");
        Ok(encounter)
    }

    /// `arrived -> in_consultation`.
    pub async fn start_consultation(
        &self,
        institution_id: Uuid,
        encounter_id: Uuid,
    ) -> EncounterResult<Encounter> {
        let mut encounter = self.fetch(institution_id, encounter_id).await?;
        encounter.start_consultation(Utc::now())?;
        self.commit(&encounter, None).await?;
        encounter.version += 1;
        info!(encounter_id = %encounter.id, "consultation started");
        Ok(encounter)
    }

    /// `in_consultation -> completed`, finalizing the charge order (if one
    /// exists) in the same commit. All-or-nothing: a failed finalization
    /// leaves the encounter untouched.
    pub async fn complete(
        &self,
        institution_id: Uuid,
        encounter_id: Uuid,
    ) -> EncounterResult<Encounter> {
        let now = Utc::now();
        let mut encounter = self.fetch(institution_id, encounter_id).await?;
        encounter.complete(now)?;

        let mut order = self.store.load_order(encounter_id).await?;
        if let Some(order) = order.as_mut() {
            order.finalize(now)?;
        }
        self.commit(&encounter, order.as_ref()).await?;
        encounter.version += 1;
        info!(encounter_id = %encounter.id, "encounter completed");
        Ok(encounter)
    }

    /// Any non-terminal status -> `canceled`.
    ///
    /// The charge order is voided only when no money was collected;
    /// otherwise it is frozen untouched for manual reconciliation.
    pub async fn cancel(
        &self,
        institution_id: Uuid,
        encounter_id: Uuid,
    ) -> EncounterResult<Encounter> {
        let now = Utc::now();
        let mut encounter = self.fetch(institution_id, encounter_id).await?;
        encounter.cancel(now)?;

        let mut order = self.store.load_order(encounter_id).await?;
        if order.as_ref().is_some_and(|o| o.frozen) {
            // Already terminal on the billing side; nothing to write.
            order = None;
        } else if let Some(o) = order.as_mut() {
            if o.has_settled_payments() {
                o.freeze(now);
            } else {
                o.void_order(now)?;
            }
        }
        self.commit(&encounter, order.as_ref()).await?;
        encounter.version += 1;
        info!(encounter_id = %encounter.id, "encounter canceled");
        Ok(encounter)
    }

    /// Replace the free-text notes on a non-terminal encounter.
    pub async fn update_notes(
        &self,
        institution_id: Uuid,
        encounter_id: Uuid,
        notes: Option<String>,
    ) -> EncounterResult<Encounter> {
        let mut encounter = self.fetch(institution_id, encounter_id).await?;
        encounter.set_notes(notes, Utc::now())?;
        self.commit(&encounter, None).await?;
        encounter.version += 1;
        Ok(encounter)
    }

    /// Fetch an encounter or fail with `NotFound`.
    pub async fn get(&self, institution_id: Uuid, encounter_id: Uuid) -> EncounterResult<Encounter> {
        self.fetch(institution_id, encounter_id).await
    }

    async fn fetch(&self, institution_id: Uuid, encounter_id: Uuid) -> EncounterResult<Encounter> {
        self.store
            .load(institution_id, encounter_id)
            .await?
            .ok_or(EncounterError::NotFound(encounter_id))
    }

    async fn commit(
        &self,
        encounter: &Encounter,
        order: Option<&ledger_engine::ChargeOrder>,
    ) -> EncounterResult<()> {
        match self.store.commit(TransitionCommit { encounter, order }).await {
            Ok(()) => Ok(()),
            Err(StoreError::StaleVersion) => Err(EncounterError::ConcurrentModification),
            Err(StoreError::NotFound) => Err(EncounterError::NotFound(encounter.id)),
            Err(e) => Err(e.into()),
        }
    }
}
