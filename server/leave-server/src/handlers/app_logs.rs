//! Operation log monitoring endpoints under `/api/app-logs`
//!
//! Everything except `my-activity` is restricted to administrators. The
//! cleanup endpoint is itself an audited operation: it runs through the
//! operation interceptor and its record is written synchronously.

use crate::error::{api_success, ApiError, ApiResponse};
use crate::middleware::{AuthContext, ADMIN_ROLE};
use crate::server::LeaveServer;
use crate::types::PaginationParams;
use audit_engine::{
    Dashboard, Invocation, LogFilter, LogRecord, LogStatistics, LogStatus, OperationPolicy, Page,
    Sort, SortDirection, SortField,
};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const CLEANUP_OPERATION: &str = "CLEANUP_APP_LOGS";
pub const APP_LOG_ENTITY: &str = "AppLog";
pub const DEFAULT_DAYS_TO_KEEP: u32 = 90;
pub const DEFAULT_SLOW_THRESHOLD_MS: i64 = 5_000;
/// Page size of the monitoring shortlists (recent failures, slow operations)
pub const SHORTLIST_PAGE_SIZE: u32 = 10;

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// Query string of `GET /api/app-logs`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub sort_by: Option<String>,
    pub sort_dir: Option<String>,
    pub operation: Option<String>,
    pub user_id: Option<String>,
    pub username: Option<String>,
    pub status: Option<String>,
    pub http_method: Option<String>,
    pub entity_type: Option<String>,
    pub department: Option<String>,
    pub ip_address: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

/// Empty query values (`?operation=`) mean "no filter"
fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl SearchParams {
    /// Split into filter, sort and page, rejecting unknown status or sort values
    ///
    /// # Errors
    ///
    /// Returns a validation error for an unknown status, sort field or
    /// sort direction.
    pub fn into_query(self) -> Result<(LogFilter, Sort, PaginationParams), ApiError> {
        let status = non_blank(self.status)
            .map(|s| LogStatus::from_str(&s))
            .transpose()?;
        let field = non_blank(self.sort_by)
            .map(|s| SortField::from_str(&s))
            .transpose()?
            .unwrap_or_default();
        let direction = non_blank(self.sort_dir)
            .map(|s| SortDirection::from_str(&s))
            .transpose()?
            .unwrap_or_default();

        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(ApiError::validation("startDate must not be after endDate"));
            }
        }

        let filter = LogFilter {
            operation: non_blank(self.operation),
            user_id: non_blank(self.user_id),
            username: non_blank(self.username),
            status,
            http_method: non_blank(self.http_method),
            entity_type: non_blank(self.entity_type),
            department: non_blank(self.department),
            ip_address: non_blank(self.ip_address),
            start_date: self.start_date,
            end_date: self.end_date,
        };
        let page = PaginationParams {
            page: self.page,
            size: self.size,
        };
        Ok((filter, Sort::new(field, direction), page))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlowOperationParams {
    pub threshold_ms: Option<i64>,
    pub page: Option<u32>,
    pub size: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupParams {
    pub days_to_keep: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupResponse {
    pub message: String,
    pub days_to_keep: u32,
    pub deleted: u64,
}

/// GET /api/app-logs
pub async fn search_logs(
    State(server): State<LeaveServer>,
    auth: AuthContext,
    Query(params): Query<SearchParams>,
) -> ApiResult<Page<LogRecord>> {
    auth.require_role(ADMIN_ROLE)?;
    let (filter, sort, page) = params.into_query()?;
    let logs = server.logs.search(&filter, sort, page.into()).await?;
    Ok(Json(api_success(logs)))
}

/// GET /api/app-logs/statistics
pub async fn statistics(
    State(server): State<LeaveServer>,
    auth: AuthContext,
) -> ApiResult<LogStatistics> {
    auth.require_role(ADMIN_ROLE)?;
    Ok(Json(api_success(server.logs.statistics().await?)))
}

/// GET /api/app-logs/dashboard
pub async fn dashboard(State(server): State<LeaveServer>, auth: AuthContext) -> ApiResult<Dashboard> {
    auth.require_role(ADMIN_ROLE)?;
    Ok(Json(api_success(server.logs.dashboard().await?)))
}

/// GET /api/app-logs/recent-failures
pub async fn recent_failures(
    State(server): State<LeaveServer>,
    auth: AuthContext,
    Query(page): Query<PaginationParams>,
) -> ApiResult<Page<LogRecord>> {
    auth.require_role(ADMIN_ROLE)?;
    let failures = server
        .logs
        .recent_failures(page.page_request(SHORTLIST_PAGE_SIZE))
        .await?;
    Ok(Json(api_success(failures)))
}

/// GET /api/app-logs/authentication
pub async fn authentication_logs(
    State(server): State<LeaveServer>,
    auth: AuthContext,
    Query(page): Query<PaginationParams>,
) -> ApiResult<Page<LogRecord>> {
    auth.require_role(ADMIN_ROLE)?;
    Ok(Json(api_success(
        server.logs.authentication_logs(page.into()).await?,
    )))
}

/// GET /api/app-logs/critical
pub async fn critical_operations(
    State(server): State<LeaveServer>,
    auth: AuthContext,
    Query(page): Query<PaginationParams>,
) -> ApiResult<Page<LogRecord>> {
    auth.require_role(ADMIN_ROLE)?;
    Ok(Json(api_success(
        server.logs.critical_operations(page.into()).await?,
    )))
}

/// GET /api/app-logs/slow-operations
pub async fn slow_operations(
    State(server): State<LeaveServer>,
    auth: AuthContext,
    Query(params): Query<SlowOperationParams>,
) -> ApiResult<Page<LogRecord>> {
    auth.require_role(ADMIN_ROLE)?;
    let threshold_ms = params.threshold_ms.unwrap_or(DEFAULT_SLOW_THRESHOLD_MS);
    if threshold_ms < 0 {
        return Err(ApiError::validation("thresholdMs must not be negative"));
    }
    let page = PaginationParams {
        page: params.page,
        size: params.size,
    }
    .page_request(SHORTLIST_PAGE_SIZE);

    Ok(Json(api_success(
        server.logs.slow_operations(threshold_ms, page).await?,
    )))
}

/// GET /api/app-logs/trace/:correlationId
pub async fn trace(
    State(server): State<LeaveServer>,
    auth: AuthContext,
    Path(correlation_id): Path<String>,
) -> ApiResult<Vec<LogRecord>> {
    auth.require_role(ADMIN_ROLE)?;
    Ok(Json(api_success(
        server.logs.by_correlation_id(&correlation_id).await?,
    )))
}

/// GET /api/app-logs/session/:sessionId
pub async fn session_logs(
    State(server): State<LeaveServer>,
    auth: AuthContext,
    Path(session_id): Path<String>,
    Query(page): Query<PaginationParams>,
) -> ApiResult<Page<LogRecord>> {
    auth.require_role(ADMIN_ROLE)?;
    Ok(Json(api_success(
        server.logs.by_session_id(&session_id, page.into()).await?,
    )))
}

/// GET /api/app-logs/my-activity
///
/// Available to every authenticated user; only the caller's own records
/// are returned.
pub async fn my_activity(
    State(server): State<LeaveServer>,
    auth: AuthContext,
    Query(page): Query<PaginationParams>,
) -> ApiResult<Page<LogRecord>> {
    let activity = server
        .logs
        .recent_activity_by_user(&auth.user_id, page.into())
        .await?;
    Ok(Json(api_success(activity)))
}

/// GET /api/app-logs/:id
pub async fn get_log(
    State(server): State<LeaveServer>,
    auth: AuthContext,
    Path(id): Path<i64>,
) -> ApiResult<LogRecord> {
    auth.require_role(ADMIN_ROLE)?;
    match server.logs.by_id(id).await? {
        Some(record) => Ok(Json(api_success(record))),
        None => Err(ApiError::not_found(format!("{APP_LOG_ENTITY} {id}"))),
    }
}

/// DELETE /api/app-logs/cleanup
pub async fn cleanup(
    State(server): State<LeaveServer>,
    auth: AuthContext,
    Query(params): Query<CleanupParams>,
) -> ApiResult<CleanupResponse> {
    auth.require_role(ADMIN_ROLE)?;
    let days_to_keep = params.days_to_keep.unwrap_or(DEFAULT_DAYS_TO_KEEP);

    let policy = OperationPolicy::new(CLEANUP_OPERATION)
        .entity_type(APP_LOG_ENTITY)
        .synchronous();
    let invocation = Invocation::new().param("daysToKeep", days_to_keep);
    let logs = server.logs.clone();

    let response = server
        .logs
        .interceptor()
        .intercept(&policy, invocation, &auth.call_context(), || async move {
            let deleted = logs.cleanup_old_logs(days_to_keep).await;
            Ok::<_, ApiError>(CleanupResponse {
                message: format!(
                    "Old logs cleanup completed for logs older than {days_to_keep} days"
                ),
                days_to_keep,
                deleted,
            })
        })
        .await?;

    Ok(Json(api_success(response)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_filters_are_ignored() {
        let params = SearchParams {
            operation: Some(String::new()),
            status: Some("  ".to_string()),
            username: Some("amy".to_string()),
            ..SearchParams::default()
        };
        let (filter, sort, _) = params.into_query().unwrap();
        assert!(filter.operation.is_none());
        assert!(filter.status.is_none());
        assert_eq!(filter.username.as_deref(), Some("amy"));
        assert_eq!(sort, Sort::newest_first());
    }

    #[test]
    fn test_status_and_sort_are_parsed() {
        let params = SearchParams {
            status: Some("failure".to_string()),
            sort_by: Some("executionTimeMs".to_string()),
            sort_dir: Some("asc".to_string()),
            ..SearchParams::default()
        };
        let (filter, sort, _) = params.into_query().unwrap();
        assert_eq!(filter.status, Some(LogStatus::Failure));
        assert_eq!(sort.field, SortField::ExecutionTimeMs);
        assert_eq!(sort.direction, SortDirection::Asc);
    }

    #[test]
    fn test_unknown_sort_field_is_rejected() {
        let params = SearchParams {
            sort_by: Some("password".to_string()),
            ..SearchParams::default()
        };
        let err = params.into_query().unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_inverted_date_range_is_rejected() {
        let now = Utc::now();
        let params = SearchParams {
            start_date: Some(now),
            end_date: Some(now - chrono::Duration::days(1)),
            ..SearchParams::default()
        };
        assert!(matches!(
            params.into_query(),
            Err(ApiError::Validation { .. })
        ));
    }
}
