pub mod paths;

use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::{
    handlers::{charge_orders, encounters, health, waiting_room},
    openapi,
    server::ClinicFlowServer,
};

/// Create health check routes
pub fn health_routes() -> Router<ClinicFlowServer> {
    Router::new()
        .route(paths::health::HEALTH, get(health::health_check))
        .route(paths::health::VERSION, get(health::version_info))
}

/// Create encounter lifecycle routes
pub fn encounter_routes() -> Router<ClinicFlowServer> {
    Router::new()
        .route(paths::encounters::ENCOUNTERS, get(encounters::list_encounters))
        .route(paths::encounters::ENCOUNTERS, post(encounters::schedule_encounter))
        .route(paths::encounters::ENCOUNTER_BY_ID, get(encounters::get_encounter))
        .route(paths::encounters::ENCOUNTER_STATUS, post(encounters::update_encounter_status))
        .route(paths::encounters::APPOINTMENT_NOTES, patch(encounters::update_notes))
}

/// Create waiting-room routes
pub fn waiting_room_routes() -> Router<ClinicFlowServer> {
    Router::new()
        .route(paths::waitingroom::REGISTER, post(waiting_room::register_arrival))
        .route(paths::waitingroom::QUEUE, get(waiting_room::get_queue))
        .route(paths::waitingroom::GROUPS_TODAY, get(waiting_room::groups_today))
}

/// Create billing ledger routes
pub fn charge_order_routes() -> Router<ClinicFlowServer> {
    Router::new()
        .route(
            paths::encounters::ENCOUNTER_CHARGE_ORDER,
            get(charge_orders::charge_order_for_encounter),
        )
        .route(paths::charge_orders::ORDER_BY_ID, get(charge_orders::get_charge_order))
        .route(paths::charge_orders::ITEMS, post(charge_orders::add_charge_item))
        .route(paths::charge_orders::PAYMENTS, post(charge_orders::record_payment))
        .route(paths::charge_orders::PAYMENT_VOID, post(charge_orders::void_payment))
        .route(paths::charge_orders::WAIVE, post(charge_orders::waive_charge_order))
}

/// Create API v1 routes
pub fn api_v1_routes() -> Router<ClinicFlowServer> {
    Router::new()
        .merge(encounter_routes())
        .merge(waiting_room_routes())
        .merge(charge_order_routes())
}

/// Create all application routes
pub fn create_routes() -> Router<ClinicFlowServer> {
    Router::new()
        // Health check routes (no institution header required)
        .merge(health_routes())
        // API documentation routes
        .merge(openapi::create_docs_routes())
        // API v1 routes
        .nest(paths::API_V1, api_v1_routes())
}
