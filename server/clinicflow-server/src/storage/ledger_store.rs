//! Postgres adapter for the ledger engine's `LedgerStore`

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use ledger_engine::{ChargeItem, ChargeOrder, LedgerCommit, LedgerStore, Payment, StoreError};

use super::rows::{method_columns, ChargeItemRow, ChargeOrderRow, PaymentRow};
use super::map_sqlx;

const ORDER_COLUMNS: &str =
    "id, encounter_id, patient_id, currency, status, total, balance_due, frozen, version, created_at, updated_at";

#[derive(Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Load a full aggregate under one REPEATABLE READ snapshot so the header
/// can never be paired with a stale item or payment list.
pub(crate) async fn load_aggregate(
    pool: &PgPool,
    key_column: &str,
    key: Uuid,
) -> Result<Option<ChargeOrder>, StoreError> {
    let mut tx = pool.begin().await.map_err(map_sqlx)?;
    sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ")
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx)?;

    let header: Option<ChargeOrderRow> = sqlx::query_as(&format!(
        "SELECT {} FROM charge_orders WHERE {} = $1",
        ORDER_COLUMNS, key_column
    ))
    .bind(key)
    .fetch_optional(&mut *tx)
    .await
    .map_err(map_sqlx)?;

    let Some(header) = header else {
        tx.commit().await.map_err(map_sqlx)?;
        return Ok(None);
    };

    let items: Vec<ChargeItemRow> = sqlx::query_as(
        r#"
        SELECT id, code, description, quantity, unit_price, subtotal, created_at
        FROM charge_items
        WHERE charge_order_id = $1
        ORDER BY created_at, id
        "#,
    )
    .bind(header.id)
    .fetch_all(&mut *tx)
    .await
    .map_err(map_sqlx)?;

    let payments: Vec<PaymentRow> = sqlx::query_as(
        r#"
        SELECT id, amount, method, reference_number, bank, detail, status, recorded_at
        FROM payments
        WHERE charge_order_id = $1
        ORDER BY recorded_at, id
        "#,
    )
    .bind(header.id)
    .fetch_all(&mut *tx)
    .await
    .map_err(map_sqlx)?;

    tx.commit().await.map_err(map_sqlx)?;
    header.into_domain(items, payments).map(Some)
}

/// Compare-and-swap the order header on its loaded version.
pub(crate) async fn update_header_cas(
    conn: &mut PgConnection,
    order: &ChargeOrder,
) -> Result<(), StoreError> {
    let result = sqlx::query(
        r#"
        UPDATE charge_orders
        SET status = $1, total = $2, balance_due = $3, frozen = $4,
            version = version + 1, updated_at = $5
        WHERE id = $6 AND version = $7
        "#,
    )
    .bind(order.status.as_str())
    .bind(order.total)
    .bind(order.balance_due)
    .bind(order.frozen)
    .bind(order.updated_at)
    .bind(order.id)
    .bind(order.version)
    .execute(&mut *conn)
    .await
    .map_err(map_sqlx)?;

    if result.rows_affected() == 0 {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM charge_orders WHERE id = $1)")
                .bind(order.id)
                .fetch_one(&mut *conn)
                .await
                .map_err(map_sqlx)?;
        return Err(if exists { StoreError::StaleVersion } else { StoreError::NotFound });
    }
    Ok(())
}

async fn insert_item(
    conn: &mut PgConnection,
    order_id: Uuid,
    item: &ChargeItem,
) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO charge_items (id, charge_order_id, code, description, quantity, unit_price, subtotal, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(item.id)
    .bind(order_id)
    .bind(&item.code)
    .bind(&item.description)
    .bind(item.quantity)
    .bind(item.unit_price)
    .bind(item.subtotal)
    .bind(item.created_at)
    .execute(&mut *conn)
    .await
    .map_err(map_sqlx)?;
    Ok(())
}

async fn insert_payment(
    conn: &mut PgConnection,
    order_id: Uuid,
    payment: &Payment,
) -> Result<(), StoreError> {
    let (reference_number, bank, detail) = method_columns(&payment.method);
    sqlx::query(
        r#"
        INSERT INTO payments (id, charge_order_id, amount, method, reference_number, bank, detail, status, recorded_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(payment.id)
    .bind(order_id)
    .bind(payment.amount)
    .bind(payment.method.method_name())
    .bind(reference_number)
    .bind(bank)
    .bind(detail)
    .bind(payment.status.as_str())
    .bind(payment.recorded_at)
    .execute(&mut *conn)
    .await
    .map_err(map_sqlx)?;
    Ok(())
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn load(&self, order_id: Uuid) -> Result<Option<ChargeOrder>, StoreError> {
        load_aggregate(&self.pool, "id", order_id).await
    }

    async fn find_by_encounter(&self, encounter_id: Uuid) -> Result<Option<ChargeOrder>, StoreError> {
        load_aggregate(&self.pool, "encounter_id", encounter_id).await
    }

    async fn insert(&self, order: &ChargeOrder) -> Result<(), StoreError> {
        sqlx::query(&format!(
            "INSERT INTO charge_orders ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
            ORDER_COLUMNS
        ))
        .bind(order.id)
        .bind(order.encounter_id)
        .bind(order.patient_id)
        .bind(&order.currency)
        .bind(order.status.as_str())
        .bind(order.total)
        .bind(order.balance_due)
        .bind(order.frozen)
        .bind(order.version)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    async fn commit(&self, commit: LedgerCommit<'_>) -> Result<(), StoreError> {
        let order = commit.order.ok_or(StoreError::NotFound)?;
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;

        update_header_cas(&mut tx, order).await?;

        if let Some(item) = commit.new_item {
            insert_item(&mut tx, order.id, item).await?;
        }
        if let Some(payment) = commit.new_payment {
            insert_payment(&mut tx, order.id, payment).await?;
        }
        if let Some(payment_id) = commit.voided_payment {
            sqlx::query(
                "UPDATE payments SET status = 'voided' WHERE id = $1 AND charge_order_id = $2",
            )
            .bind(payment_id)
            .bind(order.id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?;
        }

        tx.commit().await.map_err(map_sqlx)
    }
}
