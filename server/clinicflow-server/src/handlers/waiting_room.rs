use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use encounter_engine::{Encounter, EncounterStatus, EncounterType, Priority, WalkInRegistration};
use queue_scheduler::{group_counts, project_queue, QueueGroups};

use crate::error::{api_success, ApiError, ApiResponse};
use crate::middleware::InstitutionContext;
use crate::server::ClinicFlowServer;
use crate::services::AuditService;
use crate::storage::fetch_queue_candidates;
use crate::validation::RequestValidation;
use crate::{validate_field, validate_uuid};

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// Waiting Room Registration Request
///
/// With `appointment_id` this marks a scheduled encounter as arrived;
/// without it a walk-in encounter is created directly in `arrived`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterArrivalRequest {
    pub patient_id: Uuid,
    pub appointment_id: Option<Uuid>,
    pub physician_id: Option<Uuid>,
    pub encounter_type: Option<EncounterType>,
    pub priority: Option<Priority>,
    pub expected_amount: Option<Decimal>,
}

impl RequestValidation for RegisterArrivalRequest {
    fn validate(&self) -> Result<(), ApiError> {
        validate_uuid!(self.patient_id, "Patient ID is required");
        if self.appointment_id.is_none() {
            validate_field!(
                self.physician_id,
                self.physician_id.is_some(),
                "Physician ID is required for walk-in registration"
            );
        }
        if let Some(amount) = self.expected_amount {
            validate_field!(amount, amount >= Decimal::ZERO, "Expected amount must not be negative");
        }
        Ok(())
    }
}

/// Waiting-room entry decorated with directory display data
#[derive(Debug, Serialize, ToSchema)]
pub struct WaitingRoomEntryView {
    pub position: u32,
    pub encounter_id: Uuid,
    pub patient_id: Uuid,
    pub patient_name: Option<String>,
    pub allergies: Vec<String>,
    pub physician_id: Uuid,
    pub priority: Priority,
    pub status: EncounterStatus,
    pub arrived_at: Option<DateTime<Utc>>,
    pub waited_minutes: i64,
    pub billing_hold: bool,
}

// ============================================================================
// API HANDLERS
// ============================================================================

/// Register an arrival in the waiting room
#[utoipa::path(
    post,
    path = "/api/v1/waitingroom/register",
    request_body = RegisterArrivalRequest,
    responses(
        (status = 200, description = "Scheduled encounter marked as arrived", body = Encounter),
        (status = 201, description = "Walk-in encounter registered", body = Encounter),
        (status = 404, description = "Appointment not found"),
        (status = 409, description = "Appointment already arrived")
    ),
    tag = "waiting-room"
)]
pub async fn register_arrival(
    State(server): State<ClinicFlowServer>,
    ctx: InstitutionContext,
    Json(req): Json<RegisterArrivalRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Encounter>>), ApiError> {
    req.validate()?;

    let (status, encounter, action) = match req.appointment_id {
        Some(appointment_id) => {
            let scheduled = server.encounters.get(ctx.institution_id, appointment_id).await?;
            if scheduled.patient_id != req.patient_id {
                return Err(ApiError::validation(
                    "appointment does not belong to the given patient",
                ));
            }
            let encounter =
                server.encounters.register_arrival(ctx.institution_id, appointment_id).await?;
            (StatusCode::OK, encounter, "arrival_registered")
        }
        None => {
            let physician_id = req
                .physician_id
                .ok_or_else(|| ApiError::validation("Physician ID is required"))?;
            let encounter = server
                .encounters
                .register_walk_in(WalkInRegistration {
                    institution_id: ctx.institution_id,
                    patient_id: req.patient_id,
                    physician_id,
                    encounter_type: req.encounter_type.unwrap_or(EncounterType::General),
                    priority: req.priority.unwrap_or(Priority::Normal),
                    expected_amount: req.expected_amount.unwrap_or(Decimal::ZERO),
                })
                .await?;
            (StatusCode::CREATED, encounter, "walk_in_registered")
        }
    };

    let audit = AuditService::new(server.db_pool.clone());
    audit
        .log_action(
            &ctx,
            "encounter",
            encounter.id,
            action,
            Some(serde_json::json!({
                "patient_id": encounter.patient_id,
                "priority": encounter.priority,
                "request_id": ctx.request_id()
            })),
        )
        .await;

    Ok((status, Json(api_success(encounter))))
}

/// Get the ordered waiting-room queue for today
#[utoipa::path(
    get,
    path = "/api/v1/waitingroom/queue",
    responses(
        (status = 200, description = "Queue retrieved successfully", body = Vec<WaitingRoomEntryView>),
        (status = 503, description = "Storage unavailable")
    ),
    tag = "waiting-room"
)]
pub async fn get_queue(
    State(server): State<ClinicFlowServer>,
    ctx: InstitutionContext,
) -> Result<Json<ApiResponse<Vec<WaitingRoomEntryView>>>, ApiError> {
    let now = Utc::now();
    let candidates =
        fetch_queue_candidates(&server.db_pool, ctx.institution_id, now.date_naive()).await?;
    let entries = project_queue(&candidates, now);

    let patient_ids: Vec<Uuid> = entries.iter().map(|e| e.patient_id).collect();
    let patients = server.patients.display_many(&patient_ids).await?;

    let views = entries
        .into_iter()
        .map(|entry| {
            let display = patients.get(&entry.patient_id);
            WaitingRoomEntryView {
                position: entry.position,
                encounter_id: entry.encounter_id,
                patient_id: entry.patient_id,
                patient_name: display.map(|p| p.display_name.clone()),
                allergies: display.map(|p| p.allergies.clone()).unwrap_or_default(),
                physician_id: entry.physician_id,
                priority: entry.priority,
                status: entry.status,
                arrived_at: entry.arrived_at,
                waited_minutes: entry.waited_minutes,
                billing_hold: entry.billing_hold,
            }
        })
        .collect();

    Ok(Json(api_success(views)))
}

/// Get today's encounter counts grouped by status and priority
#[utoipa::path(
    get,
    path = "/api/v1/waitingroom/groups-today",
    responses(
        (status = 200, description = "Group counts retrieved successfully", body = QueueGroups),
        (status = 503, description = "Storage unavailable")
    ),
    tag = "waiting-room"
)]
pub async fn groups_today(
    State(server): State<ClinicFlowServer>,
    ctx: InstitutionContext,
) -> Result<Json<ApiResponse<QueueGroups>>, ApiError> {
    let candidates =
        fetch_queue_candidates(&server.db_pool, ctx.institution_id, Utc::now().date_naive())
            .await?;
    Ok(Json(api_success(group_counts(&candidates))))
}
