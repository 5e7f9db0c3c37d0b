//! Persistence-adapter interface for the ledger engine
//!
//! The engine never talks to a database directly; adapters implement this
//! trait (Postgres in the server crate, in-memory in tests) and carry the
//! optimistic-concurrency contract described on [`LedgerStore::commit`].

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{ChargeItem, ChargeOrder, Payment};

#[derive(Error, Debug, Clone)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("stale version: record was modified since it was loaded")]
    StaleVersion,

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// One atomic write against a charge order.
///
/// The header update and any appended line rows must land in a single
/// transaction; the adapter compares `order.version` against the stored
/// row version and fails with [`StoreError::StaleVersion`] on mismatch.
#[derive(Debug, Default)]
pub struct LedgerCommit<'a> {
    /// Header with recomputed totals, status, and freeze flag. CAS is on
    /// `version` as loaded; the adapter bumps the stored version by one.
    pub order: Option<&'a ChargeOrder>,
    pub new_item: Option<&'a ChargeItem>,
    pub new_payment: Option<&'a Payment>,
    /// Payment flipped to voided in this commit.
    pub voided_payment: Option<Uuid>,
}

impl<'a> LedgerCommit<'a> {
    pub fn header(order: &'a ChargeOrder) -> Self {
        Self { order: Some(order), ..Self::default() }
    }

    pub fn with_item(order: &'a ChargeOrder, item: &'a ChargeItem) -> Self {
        Self { order: Some(order), new_item: Some(item), ..Self::default() }
    }

    pub fn with_payment(order: &'a ChargeOrder, payment: &'a Payment) -> Self {
        Self { order: Some(order), new_payment: Some(payment), ..Self::default() }
    }

    pub fn with_voided_payment(order: &'a ChargeOrder, payment_id: Uuid) -> Self {
        Self { order: Some(order), voided_payment: Some(payment_id), ..Self::default() }
    }
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Load a full aggregate (header, items, payments) under one snapshot.
    async fn load(&self, order_id: Uuid) -> Result<Option<ChargeOrder>, StoreError>;

    /// Load the aggregate attached to an encounter, if one exists.
    async fn find_by_encounter(&self, encounter_id: Uuid) -> Result<Option<ChargeOrder>, StoreError>;

    /// Insert a freshly opened order. Fails with
    /// [`StoreError::StaleVersion`] when another terminal already created
    /// the 1:1 order for the same encounter.
    async fn insert(&self, order: &ChargeOrder) -> Result<(), StoreError>;

    /// Apply one atomic commit; see [`LedgerCommit`].
    async fn commit(&self, commit: LedgerCommit<'_>) -> Result<(), StoreError>;
}
