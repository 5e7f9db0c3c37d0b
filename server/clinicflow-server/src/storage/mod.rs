//! Postgres adapters for the domain persistence interfaces
//!
//! Implements the `EncounterStore` / `LedgerStore` traits on top of sqlx.
//! All mutating commits are single transactions with a compare-and-swap on
//! the aggregate's `version` column; reads of a full charge order happen
//! under one REPEATABLE READ snapshot so a balance is never paired with a
//! stale payment list.

pub mod encounter_store;
pub mod ledger_store;
mod rows;

pub use encounter_store::PgEncounterStore;
pub use ledger_store::PgLedgerStore;
pub(crate) use rows::EncounterRow;

use chrono::NaiveDate;
use sqlx::{FromRow, PgPool, Row};
use uuid::Uuid;

use ledger_engine::{ChargeOrderStatus, StoreError};
use queue_scheduler::QueueCandidate;

/// Translate sqlx failures into the domain store error vocabulary.
pub(crate) fn map_sqlx(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::PoolTimedOut => StoreError::Unavailable("connection pool timed out".to_string()),
        sqlx::Error::Io(e) => StoreError::Unavailable(e.to_string()),
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::StaleVersion,
        other => StoreError::Unavailable(other.to_string()),
    }
}

/// Fetch one day's encounters for an institution, each paired with the
/// status of its charge order, as input for the queue projection.
pub async fn fetch_queue_candidates(
    pool: &PgPool,
    institution_id: Uuid,
    date: NaiveDate,
) -> Result<Vec<QueueCandidate>, StoreError> {
    let rows = sqlx::query(
        r#"
        SELECT e.id, e.institution_id, e.patient_id, e.physician_id, e.scheduled_date,
               e.encounter_type, e.priority, e.status, e.arrived_at, e.started_at,
               e.completed_at, e.notes, e.expected_amount, e.version, e.created_at,
               e.updated_at,
               co.status AS order_status
        FROM encounters e
        LEFT JOIN charge_orders co ON co.encounter_id = e.id
        WHERE e.institution_id = $1 AND e.scheduled_date = $2
        ORDER BY e.created_at
        "#,
    )
    .bind(institution_id)
    .bind(date)
    .fetch_all(pool)
    .await
    .map_err(map_sqlx)?;

    rows.into_iter()
        .map(|row| {
            let encounter = EncounterRow::from_row(&row)
                .map_err(|e| StoreError::Unavailable(e.to_string()))?
                .into_domain()?;
            let order_status = row
                .try_get::<Option<String>, _>("order_status")
                .map_err(|e| StoreError::Unavailable(e.to_string()))?
                .map(|s| s.parse::<ChargeOrderStatus>())
                .transpose()
                .map_err(StoreError::Unavailable)?;
            Ok(QueueCandidate { encounter, order_status })
        })
        .collect()
}
