//! Authentication context extraction
//!
//! Verifies the bearer token of a request and exposes the caller as an
//! [`AuthContext`], ready to be turned into the [`CallContext`] the operation
//! interceptor expects.

use crate::error::ApiError;
use crate::middleware::RequestContext;
use crate::server::LeaveServer;
use async_trait::async_trait;
use audit_engine::{Actor, CallContext, Principal};
use axum::extract::FromRequestParts;
use axum::http::{header::AUTHORIZATION, request::Parts};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

pub const ADMIN_ROLE: &str = "ADMIN";

/// Claims carried by LeaveScheduler access tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    pub exp: i64,
}

/// Authenticated caller of a request
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: String,
    pub username: String,
    pub department: Option<String>,
    pub roles: Vec<String>,
    /// Request context (automatically extracted)
    pub request: RequestContext,
}

impl AuthContext {
    /// Role names match case-insensitively, with or without a `ROLE_` prefix
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|held| {
            let held = held.strip_prefix("ROLE_").unwrap_or(held);
            held.eq_ignore_ascii_case(role)
        })
    }

    /// Require a role - returns an authorization error if it is missing
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Authorization`] when the caller lacks `role`.
    pub fn require_role(&self, role: &str) -> Result<(), ApiError> {
        if self.has_role(role) {
            Ok(())
        } else {
            Err(ApiError::authorization(format!("Role {role} required")))
        }
    }

    pub fn principal(&self) -> Principal {
        let mut actor = Actor::new(self.user_id.clone(), self.username.clone());
        if let Some(department) = &self.department {
            actor = actor.with_department(department.clone());
        }
        Principal::Authenticated(actor)
    }

    /// Call context for operations performed on behalf of this caller
    pub fn call_context(&self) -> CallContext {
        CallContext::new(Some(self.request.0.clone()), self.principal())
    }
}

/// Extract the bearer token from the Authorization header
fn extract_token(parts: &Parts) -> Result<&str, ApiError> {
    let auth_header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| ApiError::authentication("Missing Authorization header"))?;

    auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        ApiError::authentication("Invalid Authorization header format. Expected: Bearer <token>")
    })
}

/// Validate an HS256 token and decode its claims
///
/// # Errors
///
/// Returns [`ApiError::Authentication`] for bad signatures, expired tokens
/// and tokens without a subject.
pub fn validate_jwt_token(token: &str, secret: &str) -> Result<Claims, ApiError> {
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    let claims = decode::<Claims>(token, &decoding_key, &validation)
        .map_err(|e| ApiError::authentication(format!("Invalid or expired token: {e}")))?
        .claims;

    if claims.sub.trim().is_empty() {
        return Err(ApiError::authentication("Token has no subject"));
    }
    Ok(claims)
}

#[async_trait]
impl FromRequestParts<LeaveServer> for AuthContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &LeaveServer,
    ) -> Result<Self, Self::Rejection> {
        let request = RequestContext::from_parts(parts);
        let token = extract_token(parts)?;
        let claims = validate_jwt_token(token, &state.config.jwt_secret)?;

        tracing::debug!(
            user_id = %claims.sub,
            correlation_id = %request.correlation_id(),
            "Request authenticated"
        );

        Ok(AuthContext {
            username: claims.username.unwrap_or_else(|| claims.sub.clone()),
            user_id: claims.sub,
            department: claims.department,
            roles: claims.roles,
            request,
        })
    }
}
