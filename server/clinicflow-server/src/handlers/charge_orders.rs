use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use ledger_engine::{
    ChargeOrder, NewChargeItem, NewPayment, Payment, PaymentMethodDetails,
};

use crate::error::{api_success, ApiError, ApiResponse};
use crate::middleware::InstitutionContext;
use crate::server::ClinicFlowServer;
use crate::services::AuditService;
use crate::validation::RequestValidation;
use crate::{validate_field, validate_length, validate_required};

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// Add Charge Item Request
#[derive(Debug, Deserialize, ToSchema)]
pub struct AddChargeItemRequest {
    pub code: String,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

impl RequestValidation for AddChargeItemRequest {
    fn validate(&self) -> Result<(), ApiError> {
        validate_required!(self.code, "Item code is required");
        validate_length!(self.code, 1, 50, "Item code must be between 1 and 50 characters");
        validate_required!(self.description, "Description is required");
        validate_length!(
            self.description,
            1,
            500,
            "Description must be between 1 and 500 characters"
        );
        Ok(())
    }
}

/// Record Payment Request
///
/// `method` selects the variant; the method-specific fields are required
/// exactly for the variant that needs them.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RecordPaymentRequest {
    pub amount: Decimal,
    #[schema(example = "cash")]
    pub method: String,
    pub reference_number: Option<String>,
    pub bank: Option<String>,
    pub detail: Option<String>,
}

impl RecordPaymentRequest {
    /// Validate the method-specific fields exhaustively and build the
    /// typed payment details.
    fn method_details(&self) -> Result<PaymentMethodDetails, ApiError> {
        match self.method.as_str() {
            "cash" => Ok(PaymentMethodDetails::Cash),
            "card" => {
                let reference = self
                    .reference_number
                    .as_deref()
                    .filter(|r| !r.trim().is_empty())
                    .ok_or_else(|| {
                        ApiError::validation("reference_number is required for card payments")
                    })?;
                Ok(PaymentMethodDetails::Card { reference: reference.to_string() })
            }
            "transfer" => {
                let bank = self
                    .bank
                    .as_deref()
                    .filter(|b| !b.trim().is_empty())
                    .ok_or_else(|| ApiError::validation("bank is required for transfer payments"))?;
                let reference = self
                    .reference_number
                    .as_deref()
                    .filter(|r| !r.trim().is_empty())
                    .ok_or_else(|| {
                        ApiError::validation("reference_number is required for transfer payments")
                    })?;
                Ok(PaymentMethodDetails::Transfer {
                    bank: bank.to_string(),
                    reference: reference.to_string(),
                })
            }
            "other" => {
                let detail = self
                    .detail
                    .as_deref()
                    .filter(|d| !d.trim().is_empty())
                    .ok_or_else(|| {
                        ApiError::validation("detail is required for other payment methods")
                    })?;
                Ok(PaymentMethodDetails::Other { detail: detail.to_string() })
            }
            other => Err(ApiError::validation(format!("unknown payment method: {}", other))),
        }
    }
}

// ============================================================================
// API HANDLERS
// ============================================================================

/// Get or lazily create the charge order for an encounter
#[utoipa::path(
    get,
    path = "/api/v1/encounters/{encounter_id}/charge-order",
    responses(
        (status = 200, description = "Charge order retrieved or created", body = ChargeOrder),
        (status = 404, description = "Encounter not found"),
        (status = 409, description = "Encounter is closed and never had a charge order")
    ),
    params(("encounter_id" = Uuid, Path, description = "Encounter ID")),
    tag = "charge-orders"
)]
pub async fn charge_order_for_encounter(
    State(server): State<ClinicFlowServer>,
    Path(encounter_id): Path<Uuid>,
    ctx: InstitutionContext,
) -> Result<Json<ApiResponse<ChargeOrder>>, ApiError> {
    let encounter = server.encounters.get(ctx.institution_id, encounter_id).await?;

    if let Some(order) = server.ledger.find_for_encounter(encounter.id).await? {
        return Ok(Json(api_success(order)));
    }
    if encounter.status.is_terminal() {
        return Err(ApiError::conflict("encounter is closed; no charge order can be opened"));
    }

    let order = server
        .ledger
        .order_for_encounter(encounter.id, encounter.patient_id, &server.config.currency)
        .await?;

    let audit = AuditService::new(server.db_pool.clone());
    audit
        .log_action(
            &ctx,
            "charge_order",
            order.id,
            "opened",
            Some(serde_json::json!({
                "encounter_id": encounter.id,
                "request_id": ctx.request_id()
            })),
        )
        .await;

    Ok(Json(api_success(order)))
}

/// Get a charge order with its items and payments
#[utoipa::path(
    get,
    path = "/api/v1/charge-orders/{order_id}",
    responses(
        (status = 200, description = "Charge order retrieved successfully", body = ChargeOrder),
        (status = 404, description = "Charge order not found")
    ),
    params(("order_id" = Uuid, Path, description = "Charge order ID")),
    tag = "charge-orders"
)]
pub async fn get_charge_order(
    State(server): State<ClinicFlowServer>,
    Path(order_id): Path<Uuid>,
    ctx: InstitutionContext,
) -> Result<Json<ApiResponse<ChargeOrder>>, ApiError> {
    let order = load_scoped_order(&server, &ctx, order_id).await?;
    Ok(Json(api_success(order)))
}

/// Add a charge item to an order
#[utoipa::path(
    post,
    path = "/api/v1/charge-orders/{order_id}/items",
    request_body = AddChargeItemRequest,
    responses(
        (status = 201, description = "Charge item added", body = ChargeOrder),
        (status = 400, description = "Invalid charge item"),
        (status = 404, description = "Charge order not found"),
        (status = 409, description = "Charge order is frozen")
    ),
    params(("order_id" = Uuid, Path, description = "Charge order ID")),
    tag = "charge-orders"
)]
pub async fn add_charge_item(
    State(server): State<ClinicFlowServer>,
    Path(order_id): Path<Uuid>,
    ctx: InstitutionContext,
    Json(req): Json<AddChargeItemRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ChargeOrder>>), ApiError> {
    req.validate()?;
    load_scoped_order(&server, &ctx, order_id).await?;

    let order = server
        .ledger
        .add_item(
            order_id,
            NewChargeItem {
                code: req.code.clone(),
                description: req.description,
                quantity: req.quantity,
                unit_price: req.unit_price,
            },
        )
        .await?;

    let audit = AuditService::new(server.db_pool.clone());
    audit
        .log_action(
            &ctx,
            "charge_order",
            order.id,
            "item_added",
            Some(serde_json::json!({
                "code": req.code,
                "total": order.total,
                "request_id": ctx.request_id()
            })),
        )
        .await;

    Ok((StatusCode::CREATED, Json(api_success(order))))
}

/// Record a payment against a charge order
#[utoipa::path(
    post,
    path = "/api/v1/charge-orders/{order_id}/payments",
    request_body = RecordPaymentRequest,
    responses(
        (status = 201, description = "Payment recorded", body = Payment),
        (status = 400, description = "Invalid payment"),
        (status = 404, description = "Charge order not found"),
        (status = 409, description = "Charge order is frozen")
    ),
    params(("order_id" = Uuid, Path, description = "Charge order ID")),
    tag = "charge-orders"
)]
pub async fn record_payment(
    State(server): State<ClinicFlowServer>,
    Path(order_id): Path<Uuid>,
    ctx: InstitutionContext,
    Json(req): Json<RecordPaymentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Payment>>), ApiError> {
    let method = req.method_details()?;
    load_scoped_order(&server, &ctx, order_id).await?;

    let (order, payment_id) = server
        .ledger
        .record_payment(order_id, NewPayment { amount: req.amount, method })
        .await?;

    let payment = order
        .payments
        .iter()
        .find(|p| p.id == payment_id)
        .cloned()
        .ok_or_else(|| ApiError::internal("recorded payment missing from aggregate"))?;

    let audit = AuditService::new(server.db_pool.clone());
    audit
        .log_action(
            &ctx,
            "charge_order",
            order.id,
            "payment_recorded",
            Some(serde_json::json!({
                "payment_id": payment.id,
                "amount": payment.amount,
                "method": payment.method.method_name(),
                "balance_due": order.balance_due,
                "request_id": ctx.request_id()
            })),
        )
        .await;

    Ok((StatusCode::CREATED, Json(api_success(payment))))
}

/// Void a settled payment
#[utoipa::path(
    post,
    path = "/api/v1/charge-orders/{order_id}/payments/{payment_id}/void",
    responses(
        (status = 200, description = "Payment voided", body = ChargeOrder),
        (status = 404, description = "Charge order or payment not found"),
        (status = 409, description = "Charge order is frozen")
    ),
    params(
        ("order_id" = Uuid, Path, description = "Charge order ID"),
        ("payment_id" = Uuid, Path, description = "Payment ID")
    ),
    tag = "charge-orders"
)]
pub async fn void_payment(
    State(server): State<ClinicFlowServer>,
    Path((order_id, payment_id)): Path<(Uuid, Uuid)>,
    ctx: InstitutionContext,
) -> Result<Json<ApiResponse<ChargeOrder>>, ApiError> {
    load_scoped_order(&server, &ctx, order_id).await?;

    let order = server.ledger.void_payment(order_id, payment_id).await?;

    let audit = AuditService::new(server.db_pool.clone());
    audit
        .log_action(
            &ctx,
            "charge_order",
            order.id,
            "payment_voided",
            Some(serde_json::json!({
                "payment_id": payment_id,
                "balance_due": order.balance_due,
                "request_id": ctx.request_id()
            })),
        )
        .await;

    Ok(Json(api_success(order)))
}

/// Waive the outstanding balance of a charge order
#[utoipa::path(
    post,
    path = "/api/v1/charge-orders/{order_id}/waive",
    responses(
        (status = 200, description = "Charge order waived", body = ChargeOrder),
        (status = 404, description = "Charge order not found"),
        (status = 409, description = "Charge order already settled or closed")
    ),
    params(("order_id" = Uuid, Path, description = "Charge order ID")),
    tag = "charge-orders"
)]
pub async fn waive_charge_order(
    State(server): State<ClinicFlowServer>,
    Path(order_id): Path<Uuid>,
    ctx: InstitutionContext,
) -> Result<Json<ApiResponse<ChargeOrder>>, ApiError> {
    load_scoped_order(&server, &ctx, order_id).await?;

    let order = server.ledger.waive(order_id).await?;

    let audit = AuditService::new(server.db_pool.clone());
    audit
        .log_action(
            &ctx,
            "charge_order",
            order.id,
            "waived",
            Some(serde_json::json!({
                "total": order.total,
                "request_id": ctx.request_id()
            })),
        )
        .await;

    Ok(Json(api_success(order)))
}

/// Load a charge order and verify it belongs to the caller's institution
/// through its encounter.
async fn load_scoped_order(
    server: &ClinicFlowServer,
    ctx: &InstitutionContext,
    order_id: Uuid,
) -> Result<ChargeOrder, ApiError> {
    let order = server.ledger.load(order_id).await?;
    // The order itself carries no institution; scope through the owning
    // encounter so a terminal can never address another clinic's billing.
    server.encounters.get(ctx.institution_id, order.encounter_id).await?;
    Ok(order)
}
