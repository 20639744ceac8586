use database_layer::DatabaseError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DatabaseError),

    #[error("Invalid log status: {0}")]
    InvalidStatus(String),

    #[error("Invalid query parameter: {0}")]
    InvalidQuery(String),
}

impl From<sqlx::Error> for AuditError {
    fn from(err: sqlx::Error) -> Self {
        AuditError::DatabaseError(DatabaseError::SqlxError(err))
    }
}

pub type AuditResult<T> = std::result::Result<T, AuditError>;
