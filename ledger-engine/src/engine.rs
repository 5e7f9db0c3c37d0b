use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{ChargeOrder, NewChargeItem, NewPayment};
use crate::store::{LedgerCommit, LedgerStore, StoreError};

/// Ledger engine
///
/// Orchestrates charge order operations against a persistence adapter.
/// Every mutation is a load / pure-domain-mutation / compare-and-swap
/// commit; a stale commit surfaces as
/// [`LedgerError::ConcurrentModification`] and is retryable by the caller.
pub struct LedgerEngine<S> {
    store: S,
}

impl<S: LedgerStore> LedgerEngine<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Fetch the charge order for an encounter, creating it on first need.
    ///
    /// Two terminals racing the first billing action both converge on the
    /// same order: the insert loser reloads the winner's row.
    pub async fn order_for_encounter(
        &self,
        encounter_id: Uuid,
        patient_id: Uuid,
        currency: &str,
    ) -> LedgerResult<ChargeOrder> {
        if let Some(order) = self.store.find_by_encounter(encounter_id).await? {
            return Ok(order);
        }
        let order = ChargeOrder::open(encounter_id, patient_id, currency, Utc::now());
        match self.store.insert(&order).await {
            Ok(()) => {
                info!(order_id = %order.id, encounter_id = %encounter_id, "charge order opened");
                Ok(order)
            }
            Err(StoreError::StaleVersion) => self
                .store
                .find_by_encounter(encounter_id)
                .await?
                .ok_or(LedgerError::ConcurrentModification),
            Err(e) => Err(e.into()),
        }
    }

    /// Look up the charge order attached to an encounter without creating
    /// one.
    pub async fn find_for_encounter(&self, encounter_id: Uuid) -> LedgerResult<Option<ChargeOrder>> {
        Ok(self.store.find_by_encounter(encounter_id).await?)
    }

    /// Load a full aggregate or fail with `NotFound`.
    pub async fn load(&self, order_id: Uuid) -> LedgerResult<ChargeOrder> {
        self.store
            .load(order_id)
            .await?
            .ok_or(LedgerError::NotFound(order_id))
    }

    /// Append a charge item and persist the recomputed header atomically.
    pub async fn add_item(&self, order_id: Uuid, item: NewChargeItem) -> LedgerResult<ChargeOrder> {
        let mut order = self.load(order_id).await?;
        let appended = order.add_item(item, Utc::now())?.clone();
        self.apply(order.id, LedgerCommit::with_item(&order, &appended)).await?;
        order.version += 1;
        info!(order_id = %order.id, item_code = %appended.code, total = %order.total, "charge item added");
        Ok(order)
    }

    /// Record a payment; balance and status are recomputed atomically with
    /// the insert.
    pub async fn record_payment(
        &self,
        order_id: Uuid,
        payment: NewPayment,
    ) -> LedgerResult<(ChargeOrder, Uuid)> {
        let mut order = self.load(order_id).await?;
        let recorded = order.record_payment(payment, Utc::now())?.clone();
        self.apply(order.id, LedgerCommit::with_payment(&order, &recorded)).await?;
        order.version += 1;
        info!(
            order_id = %order.id,
            payment_id = %recorded.id,
            method = recorded.method.method_name(),
            balance_due = %order.balance_due,
            "payment recorded"
        );
        Ok((order, recorded.id))
    }

    /// Void a settled payment, restoring its amount to the balance.
    pub async fn void_payment(&self, order_id: Uuid, payment_id: Uuid) -> LedgerResult<ChargeOrder> {
        let mut order = self.load(order_id).await?;
        order.void_payment(payment_id, Utc::now())?;
        self.apply(order.id, LedgerCommit::with_voided_payment(&order, payment_id)).await?;
        order.version += 1;
        info!(order_id = %order.id, payment_id = %payment_id, "payment voided");
        Ok(order)
    }

    /// Forgive the outstanding balance. Irreversible.
    pub async fn waive(&self, order_id: Uuid) -> LedgerResult<ChargeOrder> {
        let mut order = self.load(order_id).await?;
        order.waive(Utc::now())?;
        self.apply(order.id, LedgerCommit::header(&order)).await?;
        order.version += 1;
        info!(order_id = %order.id, "charge order waived");
        Ok(order)
    }

    async fn apply(&self, order_id: Uuid, commit: LedgerCommit<'_>) -> LedgerResult<()> {
        match self.store.commit(commit).await {
            Ok(()) => Ok(()),
            Err(StoreError::StaleVersion) => Err(LedgerError::ConcurrentModification),
            Err(StoreError::NotFound) => Err(LedgerError::NotFound(order_id)),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChargeOrderStatus, PaymentMethodDetails};
    use crate::testing::MemoryLedgerStore;
    use rust_decimal_macros::dec;

    fn engine() -> LedgerEngine<MemoryLedgerStore> {
        LedgerEngine::new(MemoryLedgerStore::default())
    }

    fn item() -> NewChargeItem {
        NewChargeItem {
            code: "CONS-01".to_string(),
            description: "General consultation".to_string(),
            quantity: dec!(2),
            unit_price: dec!(50.00),
        }
    }

    #[tokio::test]
    async fn test_lazy_order_creation_is_idempotent() {
        let engine = engine();
        let encounter_id = Uuid::new_v4();
        let patient_id = Uuid::new_v4();

        let first = engine.order_for_encounter(encounter_id, patient_id, "MXN").await.unwrap();
        let second = engine.order_for_encounter(encounter_id, patient_id, "MXN").await.unwrap();
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_add_item_and_pay_through_engine() {
        let engine = engine();
        let order = engine
            .order_for_encounter(Uuid::new_v4(), Uuid::new_v4(), "MXN")
            .await
            .unwrap();

        let order = engine.add_item(order.id, item()).await.unwrap();
        assert_eq!(order.total, dec!(100.00));

        let (order, _) = engine
            .record_payment(
                order.id,
                NewPayment { amount: dec!(40.00), method: PaymentMethodDetails::Cash },
            )
            .await
            .unwrap();
        assert_eq!(order.status, ChargeOrderStatus::PartiallyPaid);
        assert_eq!(order.balance_due, dec!(60.00));

        // persisted state matches the returned aggregate
        let reloaded = engine.load(order.id).await.unwrap();
        assert_eq!(reloaded.balance_due, dec!(60.00));
        assert_eq!(reloaded.payments.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_order_is_not_found() {
        let engine = engine();
        let err = engine.add_item(Uuid::new_v4(), item()).await.unwrap_err();
        assert!(matches!(err, LedgerError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_stale_commit_is_rejected_by_store() {
        let engine = engine();
        let order = engine
            .order_for_encounter(Uuid::new_v4(), Uuid::new_v4(), "MXN")
            .await
            .unwrap();
        let order = engine.add_item(order.id, item()).await.unwrap();

        // Simulate a second terminal writing between our load and commit.
        let store = MemoryLedgerStore::default();
        store.seed(order.clone());
        let racing = LedgerEngine::new(store);
        let loaded = racing.load(order.id).await.unwrap();
        racing
            .record_payment(
                loaded.id,
                NewPayment { amount: dec!(10.00), method: PaymentMethodDetails::Cash },
            )
            .await
            .unwrap();

        // Replay a commit carrying the pre-payment version.
        let mut stale = loaded.clone();
        stale
            .record_payment(
                NewPayment { amount: dec!(10.00), method: PaymentMethodDetails::Cash },
                Utc::now(),
            )
            .unwrap();
        let err = racing
            .store
            .commit(LedgerCommit::header(&stale))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::StaleVersion));
    }

    #[tokio::test]
    async fn test_waive_through_engine() {
        let engine = engine();
        let order = engine
            .order_for_encounter(Uuid::new_v4(), Uuid::new_v4(), "MXN")
            .await
            .unwrap();
        let order = engine.add_item(order.id, item()).await.unwrap();

        let order = engine.waive(order.id).await.unwrap();
        assert_eq!(order.status, ChargeOrderStatus::Waived);
        assert!(order.frozen);

        let err = engine.waive(order.id).await.unwrap_err();
        assert!(matches!(err, LedgerError::AlreadyFinalized));
    }
}
