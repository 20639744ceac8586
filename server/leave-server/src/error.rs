use audit_engine::AuditError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use database_layer::DatabaseError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

/// Standard API error response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// Unique error ID for tracking
    pub error_id: String,
    /// Error type/code
    pub error_type: String,
    /// Human-readable error message
    pub message: String,
    /// Timestamp when error occurred
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Suggested actions for resolving the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<String>>,
}

/// Standard API success response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

/// Main API error enum
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Authentication error: {message}")]
    Authentication { message: String },

    #[error("Authorization error: {message}")]
    Authorization { message: String },

    #[error("Resource not found: {resource_type}")]
    NotFound { resource_type: String },

    #[error("Operation log error: {0}")]
    Audit(#[from] AuditError),
}

impl ApiError {
    /// Create a simple validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create an authentication error
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    /// Create an authorization error
    pub fn authorization(message: impl Into<String>) -> Self {
        Self::Authorization {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(resource_type: impl Into<String>) -> Self {
        Self::NotFound {
            resource_type: resource_type.into(),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::Authentication { .. } => StatusCode::UNAUTHORIZED,
            ApiError::Authorization { .. } => StatusCode::FORBIDDEN,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Audit(audit_err) => match audit_err {
                AuditError::InvalidStatus(_) | AuditError::InvalidQuery(_) => {
                    StatusCode::BAD_REQUEST
                }
                AuditError::DatabaseError(DatabaseError::ConnectionFailed(_)) => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Get the error type string
    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::Validation { .. } => "validation_error",
            ApiError::Authentication { .. } => "authentication_error",
            ApiError::Authorization { .. } => "authorization_error",
            ApiError::NotFound { .. } => "not_found",
            ApiError::Audit(AuditError::InvalidStatus(_) | AuditError::InvalidQuery(_)) => {
                "validation_error"
            }
            ApiError::Audit(_) => "storage_error",
        }
    }

    /// Get suggested actions for resolving the error
    pub fn suggestions(&self) -> Option<Vec<String>> {
        match self {
            ApiError::Validation { .. }
            | ApiError::Audit(AuditError::InvalidStatus(_) | AuditError::InvalidQuery(_)) => {
                Some(vec![
                    "Check the query parameters for invalid values".to_string(),
                    "Dates must be RFC 3339 timestamps".to_string(),
                ])
            }
            ApiError::Authentication { .. } => Some(vec![
                "Verify your authentication credentials".to_string(),
                "Check if your token has expired".to_string(),
            ]),
            ApiError::Authorization { .. } => Some(vec![
                "Verify you have the required role".to_string(),
                "Contact your administrator for access".to_string(),
            ]),
            ApiError::NotFound { .. } => Some(vec![
                "Verify the resource ID is correct".to_string(),
                "The record may have been removed by log retention".to_string(),
            ]),
            ApiError::Audit(AuditError::DatabaseError(_)) => Some(vec![
                "Try again in a few moments".to_string(),
                "Contact support if the issue persists".to_string(),
            ]),
        }
    }

    /// Pretty format storage errors without leaking query details
    pub fn format_audit_error(audit_error: &AuditError) -> String {
        match audit_error {
            AuditError::InvalidStatus(_) | AuditError::InvalidQuery(_) => audit_error.to_string(),
            AuditError::DatabaseError(db_error) => match db_error {
                DatabaseError::ConnectionFailed(_) => {
                    "Unable to connect to the log database.".to_string()
                }
                DatabaseError::SqlxError(sqlx::Error::RowNotFound) => {
                    "Requested record not found.".to_string()
                }
                DatabaseError::SqlxError(sqlx::Error::PoolTimedOut) => {
                    "The log database is busy. Please try again.".to_string()
                }
                _ => "Log query failed. Please try again.".to_string(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error_id = Uuid::new_v4().to_string();
        let status_code = self.status_code();

        error!(
            error_id = %error_id,
            error_type = %self.error_type(),
            status_code = %status_code.as_u16(),
            error = %self,
            "API error occurred"
        );

        let message = match &self {
            ApiError::Audit(audit_err) => ApiError::format_audit_error(audit_err),
            _ => self.to_string(),
        };

        let error_response = ApiErrorResponse {
            error_id,
            error_type: self.error_type().to_string(),
            message,
            timestamp: chrono::Utc::now(),
            suggestions: self.suggestions(),
        };

        (status_code, Json(error_response)).into_response()
    }
}

/// Helper function to create successful API responses
pub fn api_success<T>(data: T) -> ApiResponse<T> {
    ApiResponse {
        success: true,
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::authentication("x").status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ApiError::authorization("x").status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::not_found("AppLog").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::from(AuditError::InvalidQuery("sortBy".into())).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(AuditError::from(sqlx::Error::PoolClosed)).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(AuditError::DatabaseError(DatabaseError::ConnectionFailed(
                "refused".into()
            )))
            .status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_storage_details_are_not_exposed() {
        let err = AuditError::DatabaseError(DatabaseError::SqlxError(sqlx::Error::Protocol(
            "relation app_logs does not exist".into(),
        )));
        let message = ApiError::format_audit_error(&err);
        assert!(!message.contains("app_logs"));
    }

    #[test]
    fn test_error_response_body() {
        let response = ApiError::not_found("AppLog 7").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
