//! ClinicFlow Server - clinic operations API
//!
//! This library provides the HTTP surface of the ClinicFlow Engine:
//! encounter lifecycle endpoints, the billing ledger, and the
//! waiting-room queue projection.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod server;
pub mod services;
pub mod storage;
pub mod types;
pub mod utils;
pub mod validation;

// Re-export commonly used types
pub use error::*;
pub use server::ClinicFlowServer;

use std::time::Duration;

use axum::middleware::from_fn;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Create the main application router with all routes and middleware
pub fn create_app(server: ClinicFlowServer) -> Router {
    let request_timeout = Duration::from_secs(server.config.request_timeout);

    routes::create_routes()
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::create_cors_layer())
                .layer(TimeoutLayer::new(request_timeout))
                .layer(from_fn(middleware::request_timing_middleware)),
        )
        .with_state(server)
}
