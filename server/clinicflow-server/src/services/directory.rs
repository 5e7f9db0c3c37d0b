//! Patient and staff directory contracts
//!
//! The core never reasons about demographics; these traits resolve ids to
//! display data for the waiting-room and billing screens. The Postgres
//! implementation reads the directory tables the sync service maintains.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use utoipa::ToSchema;
use uuid::Uuid;

use ledger_engine::StoreError;

use crate::storage::map_sqlx;

/// Display data for one patient
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct PatientDisplay {
    pub id: Uuid,
    pub display_name: String,
    pub national_id: Option<String>,
    /// Allergy flags shown on the waiting-room board; never used in
    /// ledger or state-machine logic.
    pub allergies: Vec<String>,
}

/// Display data for one practitioner
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct StaffDisplay {
    pub id: Uuid,
    pub display_name: String,
}

#[async_trait]
pub trait PatientDirectory: Send + Sync {
    async fn display(&self, patient_id: Uuid) -> Result<Option<PatientDisplay>, StoreError>;

    async fn display_many(
        &self,
        patient_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, PatientDisplay>, StoreError>;
}

#[async_trait]
pub trait StaffDirectory: Send + Sync {
    async fn display(&self, physician_id: Uuid) -> Result<Option<StaffDisplay>, StoreError>;
}

/// Directory backed by the local patients / practitioners tables
#[derive(Clone)]
pub struct PgDirectory {
    pool: PgPool,
}

impl PgDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PatientDirectory for PgDirectory {
    async fn display(&self, patient_id: Uuid) -> Result<Option<PatientDisplay>, StoreError> {
        sqlx::query_as("SELECT id, display_name, national_id, allergies FROM patients WHERE id = $1")
            .bind(patient_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)
    }

    async fn display_many(
        &self,
        patient_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, PatientDisplay>, StoreError> {
        let rows: Vec<PatientDisplay> = sqlx::query_as(
            "SELECT id, display_name, national_id, allergies FROM patients WHERE id = ANY($1)",
        )
        .bind(patient_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(rows.into_iter().map(|p| (p.id, p)).collect())
    }
}

#[async_trait]
impl StaffDirectory for PgDirectory {
    async fn display(&self, physician_id: Uuid) -> Result<Option<StaffDisplay>, StoreError> {
        sqlx::query_as("SELECT id, display_name FROM practitioners WHERE id = $1")
            .bind(physician_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)
    }
}
