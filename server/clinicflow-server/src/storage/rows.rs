//! Row types bridging SQL columns and domain aggregates

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

use encounter_engine::Encounter;
use ledger_engine::{
    ChargeItem, ChargeOrder, Payment, PaymentMethodDetails, StoreError,
};

fn corrupt(message: String) -> StoreError {
    StoreError::Unavailable(message)
}

#[derive(Debug, FromRow)]
pub(crate) struct EncounterRow {
    pub id: Uuid,
    pub institution_id: Uuid,
    pub patient_id: Uuid,
    pub physician_id: Uuid,
    pub scheduled_date: NaiveDate,
    pub encounter_type: String,
    pub priority: String,
    pub status: String,
    pub arrived_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub expected_amount: Decimal,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EncounterRow {
    pub fn into_domain(self) -> Result<Encounter, StoreError> {
        Ok(Encounter {
            id: self.id,
            institution_id: self.institution_id,
            patient_id: self.patient_id,
            physician_id: self.physician_id,
            scheduled_date: self.scheduled_date,
            encounter_type: self.encounter_type.parse().map_err(corrupt)?,
            priority: self.priority.parse().map_err(corrupt)?,
            status: self.status.parse().map_err(corrupt)?,
            arrived_at: self.arrived_at,
            started_at: self.started_at,
            completed_at: self.completed_at,
            notes: self.notes,
            expected_amount: self.expected_amount,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct ChargeOrderRow {
    pub id: Uuid,
    pub encounter_id: Uuid,
    pub patient_id: Uuid,
    pub currency: String,
    pub status: String,
    pub total: Decimal,
    pub balance_due: Decimal,
    pub frozen: bool,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChargeOrderRow {
    pub fn into_domain(
        self,
        items: Vec<ChargeItemRow>,
        payments: Vec<PaymentRow>,
    ) -> Result<ChargeOrder, StoreError> {
        Ok(ChargeOrder {
            id: self.id,
            encounter_id: self.encounter_id,
            patient_id: self.patient_id,
            currency: self.currency,
            status: self.status.parse().map_err(corrupt)?,
            items: items.into_iter().map(ChargeItemRow::into_domain).collect(),
            payments: payments
                .into_iter()
                .map(PaymentRow::into_domain)
                .collect::<Result<Vec<_>, _>>()?,
            total: self.total,
            balance_due: self.balance_due,
            frozen: self.frozen,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct ChargeItemRow {
    pub id: Uuid,
    pub code: String,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
    pub created_at: DateTime<Utc>,
}

impl ChargeItemRow {
    fn into_domain(self) -> ChargeItem {
        ChargeItem {
            id: self.id,
            code: self.code,
            description: self.description,
            quantity: self.quantity,
            unit_price: self.unit_price,
            subtotal: self.subtotal,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct PaymentRow {
    pub id: Uuid,
    pub amount: Decimal,
    pub method: String,
    pub reference_number: Option<String>,
    pub bank: Option<String>,
    pub detail: Option<String>,
    pub status: String,
    pub recorded_at: DateTime<Utc>,
}

impl PaymentRow {
    fn into_domain(self) -> Result<Payment, StoreError> {
        let method = match self.method.as_str() {
            "cash" => PaymentMethodDetails::Cash,
            "card" => PaymentMethodDetails::Card {
                reference: self.reference_number.unwrap_or_default(),
            },
            "transfer" => PaymentMethodDetails::Transfer {
                bank: self.bank.unwrap_or_default(),
                reference: self.reference_number.unwrap_or_default(),
            },
            "other" => PaymentMethodDetails::Other { detail: self.detail.unwrap_or_default() },
            other => return Err(corrupt(format!("unknown payment method: {}", other))),
        };
        Ok(Payment {
            id: self.id,
            amount: self.amount,
            method,
            status: self.status.parse().map_err(corrupt)?,
            recorded_at: self.recorded_at,
        })
    }
}

/// Split method details into the (reference_number, bank, detail) columns.
pub(crate) fn method_columns(
    method: &PaymentMethodDetails,
) -> (Option<&str>, Option<&str>, Option<&str>) {
    match method {
        PaymentMethodDetails::Cash => (None, None, None),
        PaymentMethodDetails::Card { reference } => (Some(reference.as_str()), None, None),
        PaymentMethodDetails::Transfer { bank, reference } => {
            (Some(reference.as_str()), Some(bank.as_str()), None)
        }
        PaymentMethodDetails::Other { detail } => (None, None, Some(detail.as_str())),
    }
}
