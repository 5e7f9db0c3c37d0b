//! API error and response envelope types
//!
//! Every endpoint returns `ApiResponse<T>`; every failure is an `ApiError`
//! carrying a stable machine-readable code from the domain error taxonomy
//! plus the HTTP status it renders as.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use encounter_engine::EncounterError;
use ledger_engine::{LedgerError, StoreError};

/// Standard response envelope
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ResponseMetadata>,
}

/// Machine-readable error payload
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// Response metadata (pagination, tracing)
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ResponseMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// Pagination block inside response metadata
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaginationInfo {
    pub page: i32,
    pub page_size: i32,
    pub total_pages: i32,
    pub has_next: bool,
    pub has_previous: bool,
}

/// Wrap data in a success envelope
pub fn api_success<T>(data: T) -> ApiResponse<T> {
    ApiResponse { success: true, data: Some(data), error: None, metadata: None }
}

/// Wrap data in a success envelope with metadata
pub fn api_success_with_meta<T>(data: T, metadata: ResponseMetadata) -> ApiResponse<T> {
    ApiResponse { success: true, data: Some(data), error: None, metadata: Some(metadata) }
}

/// API error with a stable code and HTTP mapping
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{message}")]
    Validation { code: &'static str, message: String },

    #[error("{0} not found")]
    NotFound(String),

    #[error("{message}")]
    Conflict { code: &'static str, message: String },

    #[error("{0}")]
    Internal(String),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation { code: "validation_error", message: message.into() }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        ApiError::NotFound(resource.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict { code: "conflict", message: message.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn code(&self) -> &str {
        match self {
            ApiError::Validation { code, .. } | ApiError::Conflict { code, .. } => code,
            ApiError::NotFound(_) => "not_found",
            ApiError::Internal(_) => "internal_error",
            ApiError::Unavailable(_) => "storage_unavailable",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
        }
        let body: ApiResponse<()> = ApiResponse {
            success: false,
            data: None,
            error: Some(ErrorBody { code: self.code().to_string(), message: self.to_string() }),
            metadata: None,
        };
        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::not_found("record"),
            sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => {
                ApiError::Unavailable(err.to_string())
            }
            other => ApiError::internal(format!("database error: {}", other)),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ApiError::not_found("record"),
            StoreError::StaleVersion => ApiError::Conflict {
                code: "concurrent_modification",
                message: "record was modified concurrently; reload and retry".to_string(),
            },
            StoreError::Unavailable(message) => ApiError::Unavailable(message),
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InvalidChargeItem(_) => {
                ApiError::Validation { code: "invalid_charge_item", message: err.to_string() }
            }
            LedgerError::InvalidPayment(_) => {
                ApiError::Validation { code: "invalid_payment", message: err.to_string() }
            }
            LedgerError::OrderFrozen => {
                ApiError::Conflict { code: "order_frozen", message: err.to_string() }
            }
            LedgerError::AlreadyFinalized => {
                ApiError::Conflict { code: "already_finalized", message: err.to_string() }
            }
            LedgerError::VoidAfterPayment => {
                ApiError::Conflict { code: "void_after_payment", message: err.to_string() }
            }
            LedgerError::ConcurrentModification => {
                ApiError::Conflict { code: "concurrent_modification", message: err.to_string() }
            }
            LedgerError::PaymentNotFound(_) => ApiError::not_found("payment"),
            LedgerError::NotFound(_) => ApiError::not_found("charge order"),
            LedgerError::Storage(e) => e.into(),
        }
    }
}

impl From<EncounterError> for ApiError {
    fn from(err: EncounterError) -> Self {
        match err {
            EncounterError::InvalidTransition { .. } => {
                ApiError::Conflict { code: "invalid_transition", message: err.to_string() }
            }
            EncounterError::AlreadyArrived => {
                ApiError::Conflict { code: "already_arrived", message: err.to_string() }
            }
            EncounterError::ConcurrentModification => {
                ApiError::Conflict { code: "concurrent_modification", message: err.to_string() }
            }
            EncounterError::NotFound(_) => ApiError::not_found("encounter"),
            EncounterError::Ledger(e) => e.into(),
            EncounterError::Storage(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encounter_engine::EncounterStatus;
    use uuid::Uuid;

    #[test]
    fn test_invalid_transition_renders_conflict() {
        let err: ApiError = EncounterError::InvalidTransition {
            from: EncounterStatus::Pending,
            to: EncounterStatus::Completed,
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.code(), "invalid_transition");
    }

    #[test]
    fn test_concurrent_modification_renders_conflict() {
        let err: ApiError = EncounterError::ConcurrentModification.into();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.code(), "concurrent_modification");
    }

    #[test]
    fn test_invalid_payment_renders_bad_request() {
        let err: ApiError = LedgerError::InvalidPayment("too much".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "invalid_payment");
    }

    #[test]
    fn test_frozen_order_renders_conflict() {
        let err: ApiError = LedgerError::OrderFrozen.into();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.code(), "order_frozen");
    }

    #[test]
    fn test_not_found_mapping() {
        let err: ApiError = EncounterError::NotFound(Uuid::new_v4()).into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_storage_unavailable_mapping() {
        let err: ApiError = StoreError::Unavailable("pool timeout".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.code(), "storage_unavailable");
    }
}
