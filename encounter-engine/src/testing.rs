//! In-memory encounter store used by the engine unit tests

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::Encounter;
use crate::store::{EncounterStore, TransitionCommit};
use ledger_engine::{ChargeOrder, StoreError};

#[derive(Default)]
pub struct MemoryEncounterStore {
    encounters: Mutex<HashMap<Uuid, Encounter>>,
    orders: Mutex<HashMap<Uuid, ChargeOrder>>,
}

impl MemoryEncounterStore {
    /// Seed a charge order keyed by its encounter.
    pub fn seed_order(&self, order: ChargeOrder) {
        self.orders.lock().unwrap().insert(order.encounter_id, order);
    }
}

#[async_trait]
impl EncounterStore for MemoryEncounterStore {
    async fn load(
        &self,
        institution_id: Uuid,
        encounter_id: Uuid,
    ) -> Result<Option<Encounter>, StoreError> {
        Ok(self
            .encounters
            .lock()
            .unwrap()
            .get(&encounter_id)
            .filter(|e| e.institution_id == institution_id)
            .cloned())
    }

    async fn insert(&self, encounter: &Encounter) -> Result<(), StoreError> {
        self.encounters.lock().unwrap().insert(encounter.id, encounter.clone());
        Ok(())
    }

    async fn load_order(&self, encounter_id: Uuid) -> Result<Option<ChargeOrder>, StoreError> {
        Ok(self.orders.lock().unwrap().get(&encounter_id).cloned())
    }

    async fn commit(&self, commit: TransitionCommit<'_>) -> Result<(), StoreError> {
        let mut encounters = self.encounters.lock().unwrap();
        let stored = encounters.get(&commit.encounter.id).ok_or(StoreError::NotFound)?;
        if stored.version != commit.encounter.version {
            return Err(StoreError::StaleVersion);
        }
        if let Some(order) = commit.order {
            let mut orders = self.orders.lock().unwrap();
            let stored_order = orders.get(&order.encounter_id).ok_or(StoreError::NotFound)?;
            if stored_order.version != order.version {
                return Err(StoreError::StaleVersion);
            }
            let mut updated = order.clone();
            updated.version += 1;
            orders.insert(updated.encounter_id, updated);
        }
        let mut updated = commit.encounter.clone();
        updated.version += 1;
        encounters.insert(updated.id, updated);
        Ok(())
    }
}
