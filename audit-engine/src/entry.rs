// Operation log entry types
use crate::error::AuditError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Operation code used when a caller supplies none
pub const UNKNOWN_OPERATION: &str = "UNKNOWN_OPERATION";
/// Message used when a caller supplies none
pub const DEFAULT_MESSAGE: &str = "No message provided";
/// Actor identifier used when no identity can be resolved
pub const ANONYMOUS: &str = "anonymous";

/// Outcome classification of a logged operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogStatus {
    Success,
    Failure,
    #[default]
    Info,
    Warning,
}

impl LogStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            LogStatus::Success => "SUCCESS",
            LogStatus::Failure => "FAILURE",
            LogStatus::Info => "INFO",
            LogStatus::Warning => "WARNING",
        }
    }
}

impl fmt::Display for LogStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogStatus {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SUCCESS" => Ok(LogStatus::Success),
            "FAILURE" => Ok(LogStatus::Failure),
            "INFO" => Ok(LogStatus::Info),
            "WARNING" => Ok(LogStatus::Warning),
            _ => Err(AuditError::InvalidStatus(s.to_string())),
        }
    }
}

/// A fully assembled operation log entry that has not been persisted yet.
///
/// `operation`, `status` and `message` are always populated; the builder
/// applies defaults before an entry is ever constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub user_id: String,
    pub username: String,
    pub department: Option<String>,
    pub operation: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    pub status: LogStatus,
    pub message: String,
    pub http_method: Option<String>,
    pub request_uri: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub correlation_id: Option<String>,
    pub session_id: Option<String>,
    pub request_headers: Option<String>,
    pub request_body: Option<String>,
    pub response_body: Option<String>,
    pub response_status: Option<i32>,
    pub execution_time_ms: Option<i64>,
}

/// A persisted entry with its store-assigned identifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    pub id: i64,
    #[serde(flatten)]
    pub entry: LogEntry,
}

impl LogRecord {
    pub fn new(id: i64, entry: LogEntry) -> Self {
        Self { id, entry }
    }
}
