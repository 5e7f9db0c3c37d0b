//! Route path constants
//!
//! Axum route templates (`:param` style); the OpenAPI annotations carry
//! the `{param}` form of the same paths.

pub const API_V1: &str = "/api/v1";

pub mod health {
    pub const HEALTH: &str = "/health";
    pub const VERSION: &str = "/version";
}

pub mod encounters {
    pub const ENCOUNTERS: &str = "/encounters";
    pub const ENCOUNTER_BY_ID: &str = "/encounters/:encounter_id";
    pub const ENCOUNTER_STATUS: &str = "/encounters/:encounter_id/status";
    pub const ENCOUNTER_CHARGE_ORDER: &str = "/encounters/:encounter_id/charge-order";
    pub const APPOINTMENT_NOTES: &str = "/appointments/:encounter_id/notes";
}

pub mod waitingroom {
    pub const REGISTER: &str = "/waitingroom/register";
    pub const QUEUE: &str = "/waitingroom/queue";
    pub const GROUPS_TODAY: &str = "/waitingroom/groups-today";
}

pub mod charge_orders {
    pub const ORDER_BY_ID: &str = "/charge-orders/:order_id";
    pub const ITEMS: &str = "/charge-orders/:order_id/items";
    pub const PAYMENTS: &str = "/charge-orders/:order_id/payments";
    pub const PAYMENT_VOID: &str = "/charge-orders/:order_id/payments/:payment_id/void";
    pub const WAIVE: &str = "/charge-orders/:order_id/waive";
}
