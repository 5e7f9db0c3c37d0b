//! Postgres adapter for the encounter engine's `EncounterStore`

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use encounter_engine::{Encounter, EncounterStore, TransitionCommit};
use ledger_engine::{ChargeOrder, StoreError};

use super::ledger_store::{load_aggregate, update_header_cas};
use super::rows::EncounterRow;
use super::map_sqlx;

const ENCOUNTER_COLUMNS: &str = "id, institution_id, patient_id, physician_id, scheduled_date, \
     encounter_type, priority, status, arrived_at, started_at, completed_at, notes, \
     expected_amount, version, created_at, updated_at";

#[derive(Clone)]
pub struct PgEncounterStore {
    pool: PgPool,
}

impl PgEncounterStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Compare-and-swap the encounter row on its loaded version.
async fn update_encounter_cas(
    conn: &mut PgConnection,
    encounter: &Encounter,
) -> Result<(), StoreError> {
    let result = sqlx::query(
        r#"
        UPDATE encounters
        SET status = $1, priority = $2, arrived_at = $3, started_at = $4,
            completed_at = $5, notes = $6, version = version + 1, updated_at = $7
        WHERE id = $8 AND version = $9
        "#,
    )
    .bind(encounter.status.as_str())
    .bind(encounter.priority.as_str())
    .bind(encounter.arrived_at)
    .bind(encounter.started_at)
    .bind(encounter.completed_at)
    .bind(&encounter.notes)
    .bind(encounter.updated_at)
    .bind(encounter.id)
    .bind(encounter.version)
    .execute(&mut *conn)
    .await
    .map_err(map_sqlx)?;

    if result.rows_affected() == 0 {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM encounters WHERE id = $1)")
                .bind(encounter.id)
                .fetch_one(&mut *conn)
                .await
                .map_err(map_sqlx)?;
        return Err(if exists { StoreError::StaleVersion } else { StoreError::NotFound });
    }
    Ok(())
}

#[async_trait]
impl EncounterStore for PgEncounterStore {
    async fn load(
        &self,
        institution_id: Uuid,
        encounter_id: Uuid,
    ) -> Result<Option<Encounter>, StoreError> {
        let row: Option<EncounterRow> = sqlx::query_as(&format!(
            "SELECT {} FROM encounters WHERE id = $1 AND institution_id = $2",
            ENCOUNTER_COLUMNS
        ))
        .bind(encounter_id)
        .bind(institution_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;

        row.map(EncounterRow::into_domain).transpose()
    }

    async fn insert(&self, encounter: &Encounter) -> Result<(), StoreError> {
        sqlx::query(&format!(
            "INSERT INTO encounters ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
            ENCOUNTER_COLUMNS
        ))
        .bind(encounter.id)
        .bind(encounter.institution_id)
        .bind(encounter.patient_id)
        .bind(encounter.physician_id)
        .bind(encounter.scheduled_date)
        .bind(encounter.encounter_type.as_str())
        .bind(encounter.priority.as_str())
        .bind(encounter.status.as_str())
        .bind(encounter.arrived_at)
        .bind(encounter.started_at)
        .bind(encounter.completed_at)
        .bind(&encounter.notes)
        .bind(encounter.expected_amount)
        .bind(encounter.version)
        .bind(encounter.created_at)
        .bind(encounter.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    async fn load_order(&self, encounter_id: Uuid) -> Result<Option<ChargeOrder>, StoreError> {
        load_aggregate(&self.pool, "encounter_id", encounter_id).await
    }

    async fn commit(&self, commit: TransitionCommit<'_>) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;

        update_encounter_cas(&mut tx, commit.encounter).await?;
        if let Some(order) = commit.order {
            update_header_cas(&mut tx, order).await?;
        }

        tx.commit().await.map_err(map_sqlx)
    }
}
