use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::currency::round_amount;
use crate::error::{LedgerError, LedgerResult};

/// Charge order status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ChargeOrderStatus {
    Open,
    PartiallyPaid,
    Paid,
    Void,
    Waived,
}

impl ChargeOrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChargeOrderStatus::Open => "open",
            ChargeOrderStatus::PartiallyPaid => "partially_paid",
            ChargeOrderStatus::Paid => "paid",
            ChargeOrderStatus::Void => "void",
            ChargeOrderStatus::Waived => "waived",
        }
    }
}

impl std::str::FromStr for ChargeOrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(ChargeOrderStatus::Open),
            "partially_paid" => Ok(ChargeOrderStatus::PartiallyPaid),
            "paid" => Ok(ChargeOrderStatus::Paid),
            "void" => Ok(ChargeOrderStatus::Void),
            "waived" => Ok(ChargeOrderStatus::Waived),
            other => Err(format!("unknown charge order status: {}", other)),
        }
    }
}

/// Settlement state of a single payment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Settled,
    Voided,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Settled => "settled",
            PaymentStatus::Voided => "voided",
        }
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "settled" => Ok(PaymentStatus::Settled),
            "voided" => Ok(PaymentStatus::Voided),
            other => Err(format!("unknown payment status: {}", other)),
        }
    }
}

/// Method-specific payment details
///
/// Each method carries exactly the fields it requires; there are no
/// optional loosely-typed columns at the domain level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PaymentMethodDetails {
    Cash,
    Card { reference: String },
    Transfer { bank: String, reference: String },
    Other { detail: String },
}

impl PaymentMethodDetails {
    /// Short method name used for storage and grouping
    pub fn method_name(&self) -> &'static str {
        match self {
            PaymentMethodDetails::Cash => "cash",
            PaymentMethodDetails::Card { .. } => "card",
            PaymentMethodDetails::Transfer { .. } => "transfer",
            PaymentMethodDetails::Other { .. } => "other",
        }
    }
}

/// One billed service or product on a charge order
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChargeItem {
    pub id: Uuid,
    pub code: String,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Payment record against a charge order
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Payment {
    pub id: Uuid,
    pub amount: Decimal,
    pub method: PaymentMethodDetails,
    pub status: PaymentStatus,
    pub recorded_at: DateTime<Utc>,
}

/// New charge item input, prior to subtotal computation
#[derive(Debug, Clone)]
pub struct NewChargeItem {
    pub code: String,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

/// New payment input
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub amount: Decimal,
    pub method: PaymentMethodDetails,
}

/// Billing aggregate for exactly one encounter
///
/// `total` and `balance_due` are derived from the item and payment
/// collections; every mutating method recomputes them before returning so
/// a persisted header can never disagree with its line collections.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChargeOrder {
    pub id: Uuid,
    pub encounter_id: Uuid,
    pub patient_id: Uuid,
    pub currency: String,
    pub status: ChargeOrderStatus,
    pub items: Vec<ChargeItem>,
    pub payments: Vec<Payment>,
    pub total: Decimal,
    pub balance_due: Decimal,
    /// Set once the owning encounter reaches a terminal status, or on
    /// waive/void. A frozen order accepts no further items or payments.
    pub frozen: bool,
    /// Optimistic-concurrency token; bumped by the store on every commit.
    #[serde(skip)]
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChargeOrder {
    /// Open a fresh charge order for an encounter.
    pub fn open(encounter_id: Uuid, patient_id: Uuid, currency: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            encounter_id,
            patient_id,
            currency: currency.to_string(),
            status: ChargeOrderStatus::Open,
            items: Vec::new(),
            payments: Vec::new(),
            total: Decimal::ZERO,
            balance_due: Decimal::ZERO,
            frozen: false,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sum of settled (non-voided) payment amounts.
    pub fn net_paid(&self) -> Decimal {
        self.payments
            .iter()
            .filter(|p| p.status == PaymentStatus::Settled)
            .map(|p| p.amount)
            .sum()
    }

    /// Whether any settled payment exists on the order.
    pub fn has_settled_payments(&self) -> bool {
        self.payments.iter().any(|p| p.status == PaymentStatus::Settled)
    }

    /// Append a charge item and recompute totals.
    pub fn add_item(&mut self, item: NewChargeItem, now: DateTime<Utc>) -> LedgerResult<&ChargeItem> {
        if self.frozen {
            return Err(LedgerError::OrderFrozen);
        }
        if item.quantity <= Decimal::ZERO {
            return Err(LedgerError::InvalidChargeItem(
                "quantity must be greater than zero".to_string(),
            ));
        }
        if item.unit_price < Decimal::ZERO {
            return Err(LedgerError::InvalidChargeItem(
                "unit price must not be negative".to_string(),
            ));
        }
        if item.code.trim().is_empty() {
            return Err(LedgerError::InvalidChargeItem("code is required".to_string()));
        }

        let subtotal = round_amount(item.quantity * item.unit_price, &self.currency);
        self.items.push(ChargeItem {
            id: Uuid::new_v4(),
            code: item.code,
            description: item.description,
            quantity: item.quantity,
            unit_price: item.unit_price,
            subtotal,
            created_at: now,
        });
        self.recompute(now);
        // push above guarantees a last element
        Ok(&self.items[self.items.len() - 1])
    }

    /// Record a settled payment and recompute balance and status.
    ///
    /// Overpayment is rejected: a payment may settle the balance exactly
    /// but never exceed it.
    pub fn record_payment(&mut self, payment: NewPayment, now: DateTime<Utc>) -> LedgerResult<&Payment> {
        if self.frozen {
            return Err(LedgerError::OrderFrozen);
        }
        if payment.amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidPayment(
                "amount must be greater than zero".to_string(),
            ));
        }
        if self.balance_due == Decimal::ZERO {
            return Err(LedgerError::InvalidPayment(
                "order has no outstanding balance".to_string(),
            ));
        }
        let amount = round_amount(payment.amount, &self.currency);
        if amount > self.balance_due {
            return Err(LedgerError::InvalidPayment(format!(
                "amount {} exceeds balance due {}",
                amount, self.balance_due
            )));
        }

        self.payments.push(Payment {
            id: Uuid::new_v4(),
            amount,
            method: payment.method,
            status: PaymentStatus::Settled,
            recorded_at: now,
        });
        self.recompute(now);
        Ok(&self.payments[self.payments.len() - 1])
    }

    /// Void a previously settled payment and recompute.
    pub fn void_payment(&mut self, payment_id: Uuid, now: DateTime<Utc>) -> LedgerResult<()> {
        if self.frozen {
            return Err(LedgerError::OrderFrozen);
        }
        let payment = self
            .payments
            .iter_mut()
            .find(|p| p.id == payment_id)
            .ok_or(LedgerError::PaymentNotFound(payment_id))?;
        if payment.status == PaymentStatus::Voided {
            return Err(LedgerError::InvalidPayment("payment is already voided".to_string()));
        }
        payment.status = PaymentStatus::Voided;
        self.recompute(now);
        Ok(())
    }

    /// Forgive the outstanding balance without payment. Irreversible.
    pub fn waive(&mut self, now: DateTime<Utc>) -> LedgerResult<()> {
        match self.status {
            ChargeOrderStatus::Open | ChargeOrderStatus::PartiallyPaid => {
                self.status = ChargeOrderStatus::Waived;
                self.balance_due = Decimal::ZERO;
                self.frozen = true;
                self.updated_at = now;
                Ok(())
            }
            _ => Err(LedgerError::AlreadyFinalized),
        }
    }

    /// Cancel the order before any money was collected.
    pub fn void_order(&mut self, now: DateTime<Utc>) -> LedgerResult<()> {
        if matches!(self.status, ChargeOrderStatus::Void | ChargeOrderStatus::Waived) {
            return Err(LedgerError::AlreadyFinalized);
        }
        if self.has_settled_payments() {
            return Err(LedgerError::VoidAfterPayment);
        }
        self.status = ChargeOrderStatus::Void;
        self.balance_due = Decimal::ZERO;
        self.frozen = true;
        self.updated_at = now;
        Ok(())
    }

    /// Finalize on encounter completion: recompute from the line
    /// collections and freeze the order. Payment is not forced; an
    /// outstanding balance stays visible on the patient's account.
    pub fn finalize(&mut self, now: DateTime<Utc>) -> LedgerResult<()> {
        if matches!(self.status, ChargeOrderStatus::Paid | ChargeOrderStatus::Waived) {
            self.frozen = true;
            self.updated_at = now;
            return Ok(());
        }
        if self.status == ChargeOrderStatus::Void {
            return Err(LedgerError::AlreadyFinalized);
        }
        self.recompute(now);
        self.frozen = true;
        Ok(())
    }

    /// Freeze without touching status or balance. Used when the owning
    /// encounter is canceled after money was already collected.
    pub fn freeze(&mut self, now: DateTime<Utc>) {
        self.frozen = true;
        self.updated_at = now;
    }

    /// Recompute `total`, `balance_due`, and the derived status.
    ///
    /// Status is a pure function of (total, balance_due); waived and void
    /// orders are terminal and never re-derived.
    fn recompute(&mut self, now: DateTime<Utc>) {
        self.total = round_amount(self.items.iter().map(|i| i.subtotal).sum(), &self.currency);
        let net_paid = self.net_paid();
        let raw_balance = self.total - net_paid;
        self.balance_due = if raw_balance < Decimal::ZERO {
            Decimal::ZERO
        } else {
            round_amount(raw_balance, &self.currency)
        };
        if !matches!(self.status, ChargeOrderStatus::Void | ChargeOrderStatus::Waived) {
            self.status = if self.total > Decimal::ZERO && self.balance_due == Decimal::ZERO {
                ChargeOrderStatus::Paid
            } else if self.balance_due < self.total {
                ChargeOrderStatus::PartiallyPaid
            } else {
                ChargeOrderStatus::Open
            };
        }
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn order() -> ChargeOrder {
        ChargeOrder::open(Uuid::new_v4(), Uuid::new_v4(), "MXN", Utc::now())
    }

    fn item(qty: Decimal, unit_price: Decimal) -> NewChargeItem {
        NewChargeItem {
            code: "CONS-01".to_string(),
            description: "General consultation".to_string(),
            quantity: qty,
            unit_price,
        }
    }

    fn cash(amount: Decimal) -> NewPayment {
        NewPayment { amount, method: PaymentMethodDetails::Cash }
    }

    #[test]
    fn test_partial_payment_walk() {
        let now = Utc::now();
        let mut order = order();
        order.add_item(item(dec!(2), dec!(50.00)), now).unwrap();
        assert_eq!(order.total, dec!(100.00));
        assert_eq!(order.balance_due, dec!(100.00));
        assert_eq!(order.status, ChargeOrderStatus::Open);

        order.record_payment(cash(dec!(40.00)), now).unwrap();
        assert_eq!(order.balance_due, dec!(60.00));
        assert_eq!(order.status, ChargeOrderStatus::PartiallyPaid);

        order
            .record_payment(
                NewPayment {
                    amount: dec!(60.00),
                    method: PaymentMethodDetails::Card { reference: "AUTH-4411".to_string() },
                },
                now,
            )
            .unwrap();
        assert_eq!(order.balance_due, dec!(0.00));
        assert_eq!(order.status, ChargeOrderStatus::Paid);

        let err = order.record_payment(cash(dec!(1.00)), now).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidPayment(_)));
    }

    #[test]
    fn test_rejects_invalid_items() {
        let now = Utc::now();
        let mut order = order();
        assert!(matches!(
            order.add_item(item(dec!(0), dec!(10.00)), now),
            Err(LedgerError::InvalidChargeItem(_))
        ));
        assert!(matches!(
            order.add_item(item(dec!(1), dec!(-0.01)), now),
            Err(LedgerError::InvalidChargeItem(_))
        ));
        assert!(order.items.is_empty());
        assert_eq!(order.total, Decimal::ZERO);
    }

    #[test]
    fn test_rejects_overpayment() {
        let now = Utc::now();
        let mut order = order();
        order.add_item(item(dec!(1), dec!(80.00)), now).unwrap();
        let err = order.record_payment(cash(dec!(80.01)), now).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidPayment(_)));
        assert_eq!(order.balance_due, dec!(80.00));
        assert!(order.payments.is_empty());
    }

    #[test]
    fn test_rejects_payment_without_balance() {
        let now = Utc::now();
        let mut order = order();
        let err = order.record_payment(cash(dec!(5.00)), now).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidPayment(_)));
    }

    #[test]
    fn test_void_payment_restores_balance() {
        let now = Utc::now();
        let mut order = order();
        order.add_item(item(dec!(1), dec!(100.00)), now).unwrap();
        let payment_id = order.record_payment(cash(dec!(100.00)), now).unwrap().id;
        assert_eq!(order.status, ChargeOrderStatus::Paid);

        order.void_payment(payment_id, now).unwrap();
        assert_eq!(order.status, ChargeOrderStatus::Open);
        assert_eq!(order.balance_due, dec!(100.00));

        let err = order.void_payment(payment_id, now).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidPayment(_)));
    }

    #[test]
    fn test_waive_zeroes_balance_and_freezes() {
        let now = Utc::now();
        let mut order = order();
        order.add_item(item(dec!(1), dec!(250.00)), now).unwrap();
        order.record_payment(cash(dec!(50.00)), now).unwrap();

        order.waive(now).unwrap();
        assert_eq!(order.status, ChargeOrderStatus::Waived);
        assert_eq!(order.balance_due, Decimal::ZERO);
        assert!(order.frozen);

        assert!(matches!(order.waive(now), Err(LedgerError::AlreadyFinalized)));
        assert!(matches!(
            order.record_payment(cash(dec!(10.00)), now),
            Err(LedgerError::OrderFrozen)
        ));
    }

    #[test]
    fn test_void_rejected_after_settled_payment() {
        let now = Utc::now();
        let mut order = order();
        order.add_item(item(dec!(1), dec!(100.00)), now).unwrap();
        order.record_payment(cash(dec!(40.00)), now).unwrap();
        assert!(matches!(order.void_order(now), Err(LedgerError::VoidAfterPayment)));
    }

    #[test]
    fn test_void_allowed_when_all_payments_voided() {
        let now = Utc::now();
        let mut order = order();
        order.add_item(item(dec!(1), dec!(100.00)), now).unwrap();
        let payment_id = order.record_payment(cash(dec!(40.00)), now).unwrap().id;
        order.void_payment(payment_id, now).unwrap();

        order.void_order(now).unwrap();
        assert_eq!(order.status, ChargeOrderStatus::Void);
        assert_eq!(order.balance_due, Decimal::ZERO);
        assert!(order.frozen);
    }

    #[test]
    fn test_finalize_keeps_outstanding_balance() {
        let now = Utc::now();
        let mut order = order();
        order.add_item(item(dec!(1), dec!(100.00)), now).unwrap();
        order.record_payment(cash(dec!(30.00)), now).unwrap();

        order.finalize(now).unwrap();
        assert!(order.frozen);
        assert_eq!(order.status, ChargeOrderStatus::PartiallyPaid);
        assert_eq!(order.balance_due, dec!(70.00));
        assert!(matches!(
            order.add_item(item(dec!(1), dec!(10.00)), now),
            Err(LedgerError::OrderFrozen)
        ));
    }

    #[test]
    fn test_finalize_noop_when_paid() {
        let now = Utc::now();
        let mut order = order();
        order.add_item(item(dec!(1), dec!(20.00)), now).unwrap();
        order.record_payment(cash(dec!(20.00)), now).unwrap();
        order.finalize(now).unwrap();
        assert_eq!(order.status, ChargeOrderStatus::Paid);
        assert!(order.frozen);
    }

    #[test]
    fn test_item_after_full_payment_reopens_balance() {
        let now = Utc::now();
        let mut order = order();
        order.add_item(item(dec!(1), dec!(50.00)), now).unwrap();
        order.record_payment(cash(dec!(50.00)), now).unwrap();
        assert_eq!(order.status, ChargeOrderStatus::Paid);

        order.add_item(item(dec!(1), dec!(25.00)), now).unwrap();
        assert_eq!(order.status, ChargeOrderStatus::PartiallyPaid);
        assert_eq!(order.balance_due, dec!(25.00));
    }

    #[test]
    fn test_subtotal_rounds_to_minor_unit() {
        let now = Utc::now();
        let mut order = order();
        order
            .add_item(
                NewChargeItem {
                    code: "LAB-33".to_string(),
                    description: "Panel".to_string(),
                    quantity: dec!(3),
                    unit_price: dec!(33.335),
                },
                now,
            )
            .unwrap();
        assert_eq!(order.items[0].subtotal, dec!(100.01));
        assert_eq!(order.total, dec!(100.01));
    }
}

#[cfg(test)]
mod invariant_tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn money() -> impl Strategy<Value = Decimal> {
        // cents in [1, 50_000] => amounts in (0, 500.00]
        (1i64..=50_000).prop_map(|cents| Decimal::new(cents, 2))
    }

    proptest! {
        /// After any accepted sequence of items and payments:
        /// total == sum(items.subtotal) and
        /// balance_due == max(0, total - sum(settled payments)).
        #[test]
        fn balance_invariants_hold(
            prices in proptest::collection::vec(money(), 1..6),
            payments in proptest::collection::vec(money(), 0..8),
        ) {
            let now = Utc::now();
            let mut order = ChargeOrder::open(Uuid::new_v4(), Uuid::new_v4(), "MXN", now);
            for price in &prices {
                order.add_item(
                    NewChargeItem {
                        code: "SVC".to_string(),
                        description: "service".to_string(),
                        quantity: dec!(1),
                        unit_price: *price,
                    },
                    now,
                ).unwrap();
            }
            for amount in &payments {
                // Overpayments are rejected and must leave state untouched.
                let _ = order.record_payment(
                    NewPayment { amount: *amount, method: PaymentMethodDetails::Cash },
                    now,
                );
            }

            let expected_total: Decimal = order.items.iter().map(|i| i.subtotal).sum();
            prop_assert_eq!(order.total, expected_total);
            let expected_balance = (expected_total - order.net_paid()).max(Decimal::ZERO);
            prop_assert_eq!(order.balance_due, expected_balance);
            prop_assert!(order.balance_due >= Decimal::ZERO);
            prop_assert!(order.balance_due <= order.total);

            let expected_status = if order.total > Decimal::ZERO && order.balance_due == Decimal::ZERO {
                ChargeOrderStatus::Paid
            } else if order.balance_due < order.total {
                ChargeOrderStatus::PartiallyPaid
            } else {
                ChargeOrderStatus::Open
            };
            prop_assert_eq!(order.status, expected_status);
        }
    }
}
