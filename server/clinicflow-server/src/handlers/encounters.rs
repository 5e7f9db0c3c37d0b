use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::QueryBuilder;
use utoipa::IntoParams;
use utoipa::ToSchema;
use uuid::Uuid;

use encounter_engine::{Encounter, EncounterStatus, EncounterType, NewEncounter, Priority};

use crate::error::{api_success, ApiError, ApiResponse};
use crate::middleware::InstitutionContext;
use crate::server::ClinicFlowServer;
use crate::services::AuditService;
use crate::storage::EncounterRow;
use crate::types::pagination::PaginationParams;
use crate::utils::query_builder::PaginatedQuery;
use crate::validation::RequestValidation;
use crate::{validate_field, validate_uuid};

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// Schedule Encounter Request
#[derive(Debug, Deserialize, ToSchema)]
pub struct ScheduleEncounterRequest {
    pub patient_id: Uuid,
    pub physician_id: Uuid,
    pub scheduled_date: NaiveDate,
    pub encounter_type: EncounterType,
    pub priority: Option<Priority>,
    pub expected_amount: Option<Decimal>,
    pub notes: Option<String>,
}

impl RequestValidation for ScheduleEncounterRequest {
    fn validate(&self) -> Result<(), ApiError> {
        validate_uuid!(self.patient_id, "Patient ID is required");
        validate_uuid!(self.physician_id, "Physician ID is required");
        if let Some(amount) = self.expected_amount {
            validate_field!(amount, amount >= Decimal::ZERO, "Expected amount must not be negative");
        }
        if let Some(ref notes) = self.notes {
            validate_field!(notes, notes.len() <= 4000, "Notes must be at most 4000 characters");
        }
        Ok(())
    }
}

/// Encounter Status Transition Request
#[derive(Debug, Deserialize, ToSchema)]
pub struct EncounterStatusRequest {
    pub status: EncounterStatus,
}

/// Update Notes Request
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateNotesRequest {
    pub notes: Option<String>,
}

impl RequestValidation for UpdateNotesRequest {
    fn validate(&self) -> Result<(), ApiError> {
        if let Some(ref notes) = self.notes {
            validate_field!(notes, notes.len() <= 4000, "Notes must be at most 4000 characters");
        }
        Ok(())
    }
}

/// List Encounters Query Parameters
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListEncountersParams {
    pub status: Option<EncounterStatus>,
    pub patient_id: Option<Uuid>,
    pub physician_id: Option<Uuid>,
    pub scheduled_date: Option<NaiveDate>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

// ============================================================================
// API HANDLERS
// ============================================================================

/// Schedule a new encounter
#[utoipa::path(
    post,
    path = "/api/v1/encounters",
    request_body = ScheduleEncounterRequest,
    responses(
        (status = 201, description = "Encounter scheduled successfully", body = Encounter),
        (status = 400, description = "Invalid request"),
        (status = 503, description = "Storage unavailable")
    ),
    tag = "encounters"
)]
pub async fn schedule_encounter(
    State(server): State<ClinicFlowServer>,
    ctx: InstitutionContext,
    Json(req): Json<ScheduleEncounterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Encounter>>), ApiError> {
    req.validate()?;

    let encounter = server
        .encounters
        .schedule(NewEncounter {
            institution_id: ctx.institution_id,
            patient_id: req.patient_id,
            physician_id: req.physician_id,
            scheduled_date: req.scheduled_date,
            encounter_type: req.encounter_type,
            priority: req.priority.unwrap_or(Priority::Normal),
            expected_amount: req.expected_amount.unwrap_or(Decimal::ZERO),
            notes: req.notes,
        })
        .await?;

    let audit = AuditService::new(server.db_pool.clone());
    audit
        .log_action(
            &ctx,
            "encounter",
            encounter.id,
            "scheduled",
            Some(serde_json::json!({
                "patient_id": encounter.patient_id,
                "scheduled_date": encounter.scheduled_date,
                "request_id": ctx.request_id()
            })),
        )
        .await;

    Ok((StatusCode::CREATED, Json(api_success(encounter))))
}

/// List encounters with optional filtering
#[utoipa::path(
    get,
    path = "/api/v1/encounters",
    responses(
        (status = 200, description = "Encounters retrieved successfully", body = Vec<Encounter>),
        (status = 503, description = "Storage unavailable")
    ),
    params(ListEncountersParams),
    tag = "encounters"
)]
pub async fn list_encounters(
    State(server): State<ClinicFlowServer>,
    ctx: InstitutionContext,
    Query(params): Query<ListEncountersParams>,
) -> Result<Json<ApiResponse<Vec<Encounter>>>, ApiError> {
    let mut query = PaginatedQuery::new(
        "SELECT id, institution_id, patient_id, physician_id, scheduled_date, encounter_type, \
         priority, status, arrived_at, started_at, completed_at, notes, expected_amount, \
         version, created_at, updated_at FROM encounters WHERE 1=1",
    );
    query
        .filter_institution(ctx.institution_id)
        .filter_eq("status", params.status.map(|s| s.as_str().to_owned()))
        .filter_eq("patient_id", params.patient_id)
        .filter_eq("physician_id", params.physician_id)
        .filter_eq("scheduled_date", params.scheduled_date)
        .order_by("created_at", "DESC")
        .paginate(params.pagination.page, params.pagination.page_size);

    let rows: Vec<EncounterRow> = query.build_query_as().fetch_all(&server.db_pool).await?;
    let encounters = rows
        .into_iter()
        .map(|row| row.into_domain().map_err(ApiError::from))
        .collect::<Result<Vec<_>, _>>()?;

    let total_count = count_encounters(&server, &ctx, &params).await?;
    let metadata = params.pagination.to_metadata(total_count);

    Ok(Json(crate::error::api_success_with_meta(encounters, metadata)))
}

/// Get a specific encounter by ID
#[utoipa::path(
    get,
    path = "/api/v1/encounters/{encounter_id}",
    responses(
        (status = 200, description = "Encounter retrieved successfully", body = Encounter),
        (status = 404, description = "Encounter not found")
    ),
    params(("encounter_id" = Uuid, Path, description = "Encounter ID")),
    tag = "encounters"
)]
pub async fn get_encounter(
    State(server): State<ClinicFlowServer>,
    Path(encounter_id): Path<Uuid>,
    ctx: InstitutionContext,
) -> Result<Json<ApiResponse<Encounter>>, ApiError> {
    let encounter = server.encounters.get(ctx.institution_id, encounter_id).await?;
    Ok(Json(api_success(encounter)))
}

/// Advance an encounter's status
///
/// Dispatches the requested target status onto the state machine:
/// `arrived`, `in_consultation`, `completed` or `canceled`. Terminal
/// transitions reconcile the encounter's charge order in the same atomic
/// commit.
#[utoipa::path(
    post,
    path = "/api/v1/encounters/{encounter_id}/status",
    request_body = EncounterStatusRequest,
    responses(
        (status = 200, description = "Encounter transitioned successfully", body = Encounter),
        (status = 404, description = "Encounter not found"),
        (status = 409, description = "Invalid transition or concurrent modification")
    ),
    params(("encounter_id" = Uuid, Path, description = "Encounter ID")),
    tag = "encounters"
)]
pub async fn update_encounter_status(
    State(server): State<ClinicFlowServer>,
    Path(encounter_id): Path<Uuid>,
    ctx: InstitutionContext,
    Json(req): Json<EncounterStatusRequest>,
) -> Result<Json<ApiResponse<Encounter>>, ApiError> {
    let encounter = match req.status {
        EncounterStatus::Arrived => {
            server.encounters.register_arrival(ctx.institution_id, encounter_id).await?
        }
        EncounterStatus::InConsultation => {
            server.encounters.start_consultation(ctx.institution_id, encounter_id).await?
        }
        EncounterStatus::Completed => {
            server.encounters.complete(ctx.institution_id, encounter_id).await?
        }
        EncounterStatus::Canceled => {
            server.encounters.cancel(ctx.institution_id, encounter_id).await?
        }
        EncounterStatus::Pending => {
            return Err(ApiError::validation("an encounter cannot return to pending"));
        }
    };

    let audit = AuditService::new(server.db_pool.clone());
    audit
        .log_action(
            &ctx,
            "encounter",
            encounter.id,
            encounter.status.as_str(),
            Some(serde_json::json!({
                "status": encounter.status,
                "request_id": ctx.request_id()
            })),
        )
        .await;

    Ok(Json(api_success(encounter)))
}

/// Update the free-text notes of an appointment
#[utoipa::path(
    patch,
    path = "/api/v1/appointments/{encounter_id}/notes",
    request_body = UpdateNotesRequest,
    responses(
        (status = 200, description = "Notes updated successfully", body = Encounter),
        (status = 404, description = "Encounter not found"),
        (status = 409, description = "Encounter is closed")
    ),
    params(("encounter_id" = Uuid, Path, description = "Encounter ID")),
    tag = "encounters"
)]
pub async fn update_notes(
    State(server): State<ClinicFlowServer>,
    Path(encounter_id): Path<Uuid>,
    ctx: InstitutionContext,
    Json(req): Json<UpdateNotesRequest>,
) -> Result<Json<ApiResponse<Encounter>>, ApiError> {
    req.validate()?;

    let encounter = server
        .encounters
        .update_notes(ctx.institution_id, encounter_id, req.notes)
        .await?;

    let audit = AuditService::new(server.db_pool.clone());
    audit
        .log_action(
            &ctx,
            "encounter",
            encounter.id,
            "notes_updated",
            Some(serde_json::json!({ "request_id": ctx.request_id() })),
        )
        .await;

    Ok(Json(api_success(encounter)))
}

async fn count_encounters(
    server: &ClinicFlowServer,
    ctx: &InstitutionContext,
    params: &ListEncountersParams,
) -> Result<i64, ApiError> {
    let mut query = QueryBuilder::new("SELECT COUNT(*) FROM encounters WHERE institution_id = ");
    query.push_bind(ctx.institution_id);
    if let Some(status) = params.status {
        query.push(" AND status = ");
        query.push_bind(status.as_str());
    }
    if let Some(patient_id) = params.patient_id {
        query.push(" AND patient_id = ");
        query.push_bind(patient_id);
    }
    if let Some(physician_id) = params.physician_id {
        query.push(" AND physician_id = ");
        query.push_bind(physician_id);
    }
    if let Some(date) = params.scheduled_date {
        query.push(" AND scheduled_date = ");
        query.push_bind(date);
    }

    let count: i64 = query.build_query_scalar().fetch_one(&server.db_pool).await?;
    Ok(count)
}
