use thiserror::Error;

/// Process-level error enum for the LeaveScheduler binaries
#[derive(Error, Debug)]
pub enum LeaveError {
    /// Network communication errors (bind, accept)
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Server runtime errors
    #[error("Server error: {0}")]
    ServerError(String),

    /// Database operation errors
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Wrapped external errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LeaveError {
    /// Short machine-readable category, used as a structured log field
    pub fn kind(&self) -> &'static str {
        match self {
            LeaveError::NetworkError(_) => "network",
            LeaveError::ServerError(_) => "server",
            LeaveError::DatabaseError(_) => "database",
            LeaveError::ConfigError(_) => "config",
            LeaveError::Other(_) => "other",
        }
    }
}

/// Result type alias for LeaveScheduler operations
pub type Result<T> = std::result::Result<T, LeaveError>;

/// Async logging function for errors
pub async fn log_error(context: &str, error: &LeaveError) {
    tracing::error!(
        context = context,
        kind = error.kind(),
        error = %error,
        "LeaveScheduler error occurred"
    );
}
