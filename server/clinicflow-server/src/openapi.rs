//! OpenAPI documentation for the ClinicFlow API

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::error::{ErrorBody, PaginationInfo, ResponseMetadata};
use crate::handlers::{charge_orders, encounters, health, waiting_room};
use crate::server::ClinicFlowServer;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        health::version_info,
        encounters::schedule_encounter,
        encounters::list_encounters,
        encounters::get_encounter,
        encounters::update_encounter_status,
        encounters::update_notes,
        waiting_room::register_arrival,
        waiting_room::get_queue,
        waiting_room::groups_today,
        charge_orders::charge_order_for_encounter,
        charge_orders::get_charge_order,
        charge_orders::add_charge_item,
        charge_orders::record_payment,
        charge_orders::void_payment,
        charge_orders::waive_charge_order,
    ),
    components(schemas(
        encounter_engine::Encounter,
        encounter_engine::EncounterStatus,
        encounter_engine::EncounterType,
        encounter_engine::Priority,
        ledger_engine::ChargeOrder,
        ledger_engine::ChargeOrderStatus,
        ledger_engine::ChargeItem,
        ledger_engine::Payment,
        ledger_engine::PaymentStatus,
        ledger_engine::PaymentMethodDetails,
        queue_scheduler::QueueGroups,
        queue_scheduler::StatusCount,
        queue_scheduler::PriorityCount,
        encounters::ScheduleEncounterRequest,
        encounters::EncounterStatusRequest,
        encounters::UpdateNotesRequest,
        waiting_room::RegisterArrivalRequest,
        waiting_room::WaitingRoomEntryView,
        charge_orders::AddChargeItemRequest,
        charge_orders::RecordPaymentRequest,
        health::HealthResponse,
        health::VersionResponse,
        ErrorBody,
        ResponseMetadata,
        PaginationInfo,
    )),
    tags(
        (name = "health", description = "Service health and version"),
        (name = "encounters", description = "Encounter lifecycle management"),
        (name = "waiting-room", description = "Arrival registration and queue projection"),
        (name = "charge-orders", description = "Billing ledger: items, payments, waive")
    ),
    info(
        title = "ClinicFlow Engine API",
        description = "Clinic operations API: encounter state machine, billing ledger, waiting-room queue"
    )
)]
pub struct ApiDoc;

/// Create routes serving the OpenAPI document and Swagger UI
pub fn create_docs_routes() -> Router<ClinicFlowServer> {
    Router::new().merge(SwaggerUi::new("/api-docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
