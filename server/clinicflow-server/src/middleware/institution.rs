//! Institution context extraction
//!
//! The active institution is never read from ambient state: every request
//! carries it in the `X-Institution-Id` header and every store call
//! threads the id explicitly. The optional `X-Actor-Id` header identifies
//! the staff member at the terminal for the audit trail.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::RequestContext;

/// Institution scope extracted from request headers
#[derive(Debug, Clone)]
pub struct InstitutionContext {
    pub institution_id: Uuid,
    pub actor_id: Option<Uuid>,
    /// Request context (automatically extracted)
    pub request: RequestContext,
}

impl InstitutionContext {
    /// Create a context directly (for testing)
    pub fn new(institution_id: Uuid) -> Self {
        Self { institution_id, actor_id: None, request: RequestContext::new() }
    }

    /// Get request ID (convenience method)
    pub fn request_id(&self) -> &str {
        &self.request.request_id
    }

    /// Actor identity for audit events; falls back to the institution when
    /// the terminal did not identify a staff member.
    pub fn actor(&self) -> String {
        self.actor_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| format!("institution:{}", self.institution_id))
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for InstitutionContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let institution_id = parts
            .headers
            .get("x-institution-id")
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| ApiError::validation("X-Institution-Id header is required"))
            .and_then(|raw| {
                Uuid::parse_str(raw)
                    .map_err(|_| ApiError::validation("X-Institution-Id must be a UUID"))
            })?;

        let actor_id = parts
            .headers
            .get("x-actor-id")
            .and_then(|h| h.to_str().ok())
            .and_then(|raw| Uuid::parse_str(raw).ok());

        Ok(Self {
            institution_id,
            actor_id,
            request: RequestContext::from_headers(&parts.headers),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_falls_back_to_institution() {
        let institution_id = Uuid::new_v4();
        let ctx = InstitutionContext::new(institution_id);
        assert_eq!(ctx.actor(), format!("institution:{}", institution_id));
    }

    #[test]
    fn test_actor_prefers_staff_id() {
        let mut ctx = InstitutionContext::new(Uuid::new_v4());
        let staff = Uuid::new_v4();
        ctx.actor_id = Some(staff);
        assert_eq!(ctx.actor(), staff.to_string());
    }
}
