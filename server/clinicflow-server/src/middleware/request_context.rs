//! Request context middleware for tracing
//!
//! Provides request ID extraction/generation and request timing logs.

use std::time::Instant;

use axum::extract::{FromRequestParts, Request};
use axum::http::{header, request::Parts, HeaderMap};
use axum::middleware::Next;
use axum::response::Response;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request context containing tracing information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    /// Unique request ID for tracing
    pub request_id: String,
    /// User-Agent header value
    pub user_agent: Option<String>,
}

impl RequestContext {
    /// Create a new request context with generated request ID
    pub fn new() -> Self {
        Self { request_id: Uuid::new_v4().to_string(), user_agent: None }
    }

    /// Create from headers; an `X-Request-ID` supplied by the terminal is
    /// kept so client and server logs correlate.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let request_id = headers
            .get("x-request-id")
            .and_then(|h| h.to_str().ok())
            .map(|s| s.to_string())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let user_agent = headers
            .get(header::USER_AGENT)
            .and_then(|h| h.to_str().ok())
            .map(|s| s.to_string());

        Self { request_id, user_agent }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(RequestContext::from_headers(&parts.headers))
    }
}

/// Log method, path, status and latency for every request.
pub async fn request_timing_middleware(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let request_id = RequestContext::from_headers(req.headers()).request_id;

    let start = Instant::now();
    let response = next.run(req).await;
    let latency_ms = start.elapsed().as_millis();

    tracing::info!(
        %method,
        path = %path,
        status = response.status().as_u16(),
        latency_ms,
        request_id = %request_id,
        "request completed"
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_request_id_is_preserved_from_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-request-id", HeaderValue::from_static("term-42-req-7"));
        let ctx = RequestContext::from_headers(&headers);
        assert_eq!(ctx.request_id, "term-42-req-7");
    }

    #[test]
    fn test_request_id_is_generated_when_absent() {
        let ctx = RequestContext::from_headers(&HeaderMap::new());
        assert!(Uuid::parse_str(&ctx.request_id).is_ok());
    }
}
