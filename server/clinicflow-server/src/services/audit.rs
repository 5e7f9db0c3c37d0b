//! Audit event sink
//!
//! Every state transition and ledger mutation emits an audit event.
//! Delivery is best-effort and fire-and-forget: a failed insert is logged
//! and never fails the request or joins the state-changing transaction.

use sqlx::PgPool;
use uuid::Uuid;

use crate::middleware::InstitutionContext;

pub struct AuditService {
    pool: PgPool,
}

impl AuditService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Record one audit event.
    pub async fn log_action(
        &self,
        ctx: &InstitutionContext,
        entity: &str,
        entity_id: Uuid,
        action: &str,
        metadata: Option<serde_json::Value>,
    ) {
        let result = sqlx::query(
            r#"
            INSERT INTO audit_events (id, institution_id, entity, entity_id, action, actor, metadata, recorded_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(ctx.institution_id)
        .bind(entity)
        .bind(entity_id)
        .bind(action)
        .bind(ctx.actor())
        .bind(metadata.unwrap_or_else(|| serde_json::json!({})))
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            tracing::warn!(
                entity,
                %entity_id,
                action,
                request_id = ctx.request_id(),
                error = %e,
                "failed to record audit event"
            );
        }
    }
}
