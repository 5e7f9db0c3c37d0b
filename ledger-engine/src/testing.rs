//! In-memory ledger store used by the engine unit tests

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::ChargeOrder;
use crate::store::{LedgerCommit, LedgerStore, StoreError};

#[derive(Default)]
pub struct MemoryLedgerStore {
    orders: Mutex<HashMap<Uuid, ChargeOrder>>,
}

impl MemoryLedgerStore {
    /// Seed an order directly, bypassing the uniqueness check.
    pub fn seed(&self, order: ChargeOrder) {
        self.orders.lock().unwrap().insert(order.id, order);
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn load(&self, order_id: Uuid) -> Result<Option<ChargeOrder>, StoreError> {
        Ok(self.orders.lock().unwrap().get(&order_id).cloned())
    }

    async fn find_by_encounter(&self, encounter_id: Uuid) -> Result<Option<ChargeOrder>, StoreError> {
        Ok(self
            .orders
            .lock()
            .unwrap()
            .values()
            .find(|o| o.encounter_id == encounter_id)
            .cloned())
    }

    async fn insert(&self, order: &ChargeOrder) -> Result<(), StoreError> {
        let mut orders = self.orders.lock().unwrap();
        if orders.values().any(|o| o.encounter_id == order.encounter_id) {
            return Err(StoreError::StaleVersion);
        }
        orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn commit(&self, commit: LedgerCommit<'_>) -> Result<(), StoreError> {
        let order = commit.order.ok_or(StoreError::NotFound)?;
        let mut orders = self.orders.lock().unwrap();
        let stored = orders.get(&order.id).ok_or(StoreError::NotFound)?;
        if stored.version != order.version {
            return Err(StoreError::StaleVersion);
        }
        // The aggregate carries its full item/payment state; the explicit
        // line-row fields in the commit only matter to SQL adapters.
        let mut updated = order.clone();
        updated.version += 1;
        orders.insert(updated.id, updated);
        Ok(())
    }
}
