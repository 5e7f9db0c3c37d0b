//! Middleware modules for request processing

pub mod institution;
pub mod request_context;

// Re-export for convenience
pub use institution::InstitutionContext;
pub use request_context::{request_timing_middleware, RequestContext};

use tower_http::cors::{Any, CorsLayer};

/// CORS layer for the clinic terminals (browser clients)
pub fn create_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}
