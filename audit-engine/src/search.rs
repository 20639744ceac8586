//! Filters, sorting and paging for operation log queries

use crate::entry::{LogEntry, LogStatus};
use crate::error::AuditError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Operation name fragments that mark authentication events
pub(crate) const AUTHENTICATION_KEYWORDS: [&str; 2] = ["LOGIN", "LOGOUT"];
/// Operation name fragments that mark critical events
pub(crate) const CRITICAL_KEYWORDS: [&str; 3] = ["ADMIN", "DELETE", "UPDATE"];

/// Optional search criteria. Every absent field matches everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogFilter {
    /// Case-insensitive substring
    pub operation: Option<String>,
    pub user_id: Option<String>,
    /// Case-insensitive substring
    pub username: Option<String>,
    pub status: Option<LogStatus>,
    pub http_method: Option<String>,
    pub entity_type: Option<String>,
    pub department: Option<String>,
    pub ip_address: Option<String>,
    /// Inclusive lower bound
    pub start_date: Option<DateTime<Utc>>,
    /// Inclusive upper bound
    pub end_date: Option<DateTime<Utc>>,
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn equals_opt(expected: Option<&String>, actual: Option<&String>) -> bool {
    expected.map_or(true, |want| actual == Some(want))
}

impl LogFilter {
    pub fn matches(&self, entry: &LogEntry) -> bool {
        self.operation
            .as_deref()
            .map_or(true, |op| contains_ignore_case(&entry.operation, op))
            && self
                .username
                .as_deref()
                .map_or(true, |name| contains_ignore_case(&entry.username, name))
            && self.user_id.as_ref().map_or(true, |id| *id == entry.user_id)
            && self.status.map_or(true, |status| status == entry.status)
            && equals_opt(self.http_method.as_ref(), entry.http_method.as_ref())
            && equals_opt(self.entity_type.as_ref(), entry.entity_type.as_ref())
            && equals_opt(self.department.as_ref(), entry.department.as_ref())
            && equals_opt(self.ip_address.as_ref(), entry.ip_address.as_ref())
            && self.start_date.map_or(true, |start| entry.timestamp >= start)
            && self.end_date.map_or(true, |end| entry.timestamp <= end)
    }
}

/// Predicate shared by the store backends for every query shape
#[derive(Debug, Clone, Copy)]
pub(crate) enum LogScope<'a> {
    Filtered(&'a LogFilter),
    Status(LogStatus),
    Authentication,
    Critical,
    SlowerThan(i64),
    User(&'a str),
    Session(&'a str),
    Correlation(&'a str),
}

impl LogScope<'_> {
    pub(crate) fn matches(&self, entry: &LogEntry) -> bool {
        match self {
            LogScope::Filtered(filter) => filter.matches(entry),
            LogScope::Status(status) => entry.status == *status,
            LogScope::Authentication => AUTHENTICATION_KEYWORDS
                .iter()
                .any(|k| entry.operation.contains(k)),
            LogScope::Critical => CRITICAL_KEYWORDS.iter().any(|k| entry.operation.contains(k)),
            LogScope::SlowerThan(threshold) => entry
                .execution_time_ms
                .is_some_and(|ms| ms > *threshold),
            LogScope::User(user_id) => entry.user_id == *user_id,
            LogScope::Session(session_id) => entry.session_id.as_deref() == Some(*session_id),
            LogScope::Correlation(correlation_id) => {
                entry.correlation_id.as_deref() == Some(*correlation_id)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    #[default]
    Timestamp,
    Operation,
    Status,
    Username,
    ExecutionTimeMs,
    HttpMethod,
    EntityType,
}

impl SortField {
    /// Column name in the `app_logs` table
    pub fn column(self) -> &'static str {
        match self {
            SortField::Timestamp => "timestamp",
            SortField::Operation => "operation",
            SortField::Status => "status",
            SortField::Username => "username",
            SortField::ExecutionTimeMs => "execution_time_ms",
            SortField::HttpMethod => "http_method",
            SortField::EntityType => "entity_type",
        }
    }
}

impl FromStr for SortField {
    type Err = AuditError;

    /// Accepts both the JSON (camelCase) and column (snake_case) spellings
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "timestamp" => Ok(SortField::Timestamp),
            "operation" => Ok(SortField::Operation),
            "status" => Ok(SortField::Status),
            "username" => Ok(SortField::Username),
            "executionTimeMs" | "execution_time_ms" => Ok(SortField::ExecutionTimeMs),
            "httpMethod" | "http_method" => Ok(SortField::HttpMethod),
            "entityType" | "entity_type" => Ok(SortField::EntityType),
            other => Err(AuditError::InvalidQuery(format!("unsupported sort field '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

impl FromStr for SortDirection {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(AuditError::InvalidQuery(format!("unsupported sort direction '{other}'"))),
        }
    }
}

/// Ordering of a result page. Defaults to newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Sort {
    pub field: SortField,
    pub direction: SortDirection,
}

impl Sort {
    pub fn new(field: SortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }

    pub fn newest_first() -> Self {
        Self::default()
    }

    pub fn oldest_first() -> Self {
        Self::new(SortField::Timestamp, SortDirection::Asc)
    }

    pub fn slowest_first() -> Self {
        Self::new(SortField::ExecutionTimeMs, SortDirection::Desc)
    }
}

/// Zero-based page index with a size clamped to `1..=MAX_PAGE_SIZE`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    size: u32,
}

impl PageRequest {
    pub fn new(page: u32, size: u32) -> Self {
        Self {
            page,
            size: size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Build from optional query parameters
    pub fn of(page: Option<u32>, size: Option<u32>) -> Self {
        Self::new(page.unwrap_or(0), size.unwrap_or(DEFAULT_PAGE_SIZE))
    }

    pub fn first(size: u32) -> Self {
        Self::new(0, size)
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// Row offset for SQL queries
    pub fn offset(&self) -> u64 {
        u64::from(self.page).saturating_mul(u64::from(self.size))
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(0, DEFAULT_PAGE_SIZE)
    }
}

/// One page of query results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total_elements: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, request: PageRequest, total_elements: u64) -> Self {
        Self {
            content,
            page: request.page(),
            size: request.size(),
            total_elements,
            total_pages: total_elements.div_ceil(u64::from(request.size())),
        }
    }

    pub fn empty(request: PageRequest) -> Self {
        Self::new(Vec::new(), request, 0)
    }

    pub fn has_content(&self) -> bool {
        !self.content.is_empty()
    }
}

/// A grouped count, e.g. records per operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountEntry {
    pub key: Option<String>,
    pub count: u64,
}

impl CountEntry {
    pub fn new(key: Option<String>, count: u64) -> Self {
        Self { key, count }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogStatistics {
    pub total_logs: u64,
    pub successful_operations: u64,
    pub failed_operations: u64,
    /// Descending by count
    pub operation_breakdown: Vec<CountEntry>,
    /// Descending by count, records without a user id excluded
    pub user_activity: Vec<CountEntry>,
    /// Descending by count
    pub http_method_breakdown: Vec<CountEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    #[serde(flatten)]
    pub statistics: LogStatistics,
    pub has_recent_failures: bool,
    pub slow_operations_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::LogEntryBuilder;
    use crate::context::{Actor, CallContext, Principal};
    use chrono::Duration;

    fn entry(operation: &str, username: &str) -> LogEntry {
        let ctx = CallContext::background()
            .with_principal(Principal::Authenticated(Actor::new("1", username)));
        LogEntryBuilder::new()
            .operation(operation)
            .status(LogStatus::Success)
            .build(&ctx)
    }

    #[test]
    fn test_page_request_clamps_size() {
        assert_eq!(PageRequest::new(0, 0).size(), 1);
        assert_eq!(PageRequest::new(0, 500).size(), MAX_PAGE_SIZE);
        assert_eq!(PageRequest::of(None, None), PageRequest::new(0, DEFAULT_PAGE_SIZE));
    }

    #[test]
    fn test_page_request_offset_is_zero_based() {
        assert_eq!(PageRequest::new(0, 20).offset(), 0);
        assert_eq!(PageRequest::new(3, 10).offset(), 30);
    }

    #[test]
    fn test_page_total_pages() {
        let req = PageRequest::new(0, 20);
        assert_eq!(Page::<u8>::new(vec![], req, 0).total_pages, 0);
        assert_eq!(Page::<u8>::new(vec![], req, 20).total_pages, 1);
        assert_eq!(Page::<u8>::new(vec![], req, 21).total_pages, 2);
    }

    #[test]
    fn test_page_serializes_camel_case() {
        let page = Page::new(vec![1, 2], PageRequest::new(1, 2), 5);
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["totalElements"], 5);
        assert_eq!(json["totalPages"], 3);
        assert_eq!(json["content"], serde_json::json!([1, 2]));
    }

    #[test]
    fn test_text_filters_are_case_insensitive_substrings() {
        let e = entry("APPROVE_LEAVE", "Alice.Smith");
        let filter = LogFilter {
            operation: Some("approve".to_string()),
            username: Some("alice".to_string()),
            ..LogFilter::default()
        };
        assert!(filter.matches(&e));
    }

    #[test]
    fn test_equality_filters_are_exact() {
        let mut e = entry("APPLY_LEAVE", "alice");
        e.http_method = Some("POST".to_string());

        let exact = LogFilter {
            http_method: Some("POST".to_string()),
            ..LogFilter::default()
        };
        let wrong_case = LogFilter {
            http_method: Some("post".to_string()),
            ..LogFilter::default()
        };
        assert!(exact.matches(&e));
        assert!(!wrong_case.matches(&e));
    }

    #[test]
    fn test_equality_filter_on_absent_field_does_not_match() {
        let e = entry("APPLY_LEAVE", "alice");
        let filter = LogFilter {
            department: Some("HR".to_string()),
            ..LogFilter::default()
        };
        assert!(!filter.matches(&e));
    }

    #[test]
    fn test_date_range_is_inclusive() {
        let e = entry("APPLY_LEAVE", "alice");
        let at = LogFilter {
            start_date: Some(e.timestamp),
            end_date: Some(e.timestamp),
            ..LogFilter::default()
        };
        let after = LogFilter {
            start_date: Some(e.timestamp + Duration::seconds(1)),
            ..LogFilter::default()
        };
        assert!(at.matches(&e));
        assert!(!after.matches(&e));
    }

    #[test]
    fn test_scopes() {
        assert!(LogScope::Authentication.matches(&entry("USER_LOGIN", "a")));
        assert!(LogScope::Authentication.matches(&entry("USER_LOGOUT", "a")));
        assert!(!LogScope::Authentication.matches(&entry("APPLY_LEAVE", "a")));
        assert!(LogScope::Critical.matches(&entry("DELETE_HOLIDAY", "a")));
        assert!(LogScope::Critical.matches(&entry("ADMIN_RESET", "a")));
        assert!(!LogScope::Critical.matches(&entry("APPLY_LEAVE", "a")));

        let mut slow = entry("REPORT", "a");
        slow.execution_time_ms = Some(5001);
        assert!(LogScope::SlowerThan(5000).matches(&slow));
        slow.execution_time_ms = Some(5000);
        assert!(!LogScope::SlowerThan(5000).matches(&slow));
    }

    #[test]
    fn test_sort_parsing() {
        assert_eq!("executionTimeMs".parse::<SortField>().unwrap(), SortField::ExecutionTimeMs);
        assert_eq!("http_method".parse::<SortField>().unwrap(), SortField::HttpMethod);
        assert!("password".parse::<SortField>().is_err());
        assert_eq!("ASC".parse::<SortDirection>().unwrap(), SortDirection::Asc);
        assert!("sideways".parse::<SortDirection>().is_err());
        assert_eq!(Sort::default(), Sort::new(SortField::Timestamp, SortDirection::Desc));
    }
}
