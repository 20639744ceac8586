//! PostgreSQL-backed [`LogStore`] over the `app_logs` table

use crate::entry::{LogEntry, LogRecord, LogStatus, ANONYMOUS};
use crate::error::{AuditError, AuditResult};
use crate::search::{
    CountEntry, LogFilter, LogScope, LogStatistics, Page, PageRequest, Sort,
    AUTHENTICATION_KEYWORDS, CRITICAL_KEYWORDS,
};
use crate::storage::LogStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use database_layer::DatabasePool;
use sqlx::{FromRow, Postgres, QueryBuilder};

const SELECT_LOGS: &str = "SELECT id, timestamp, user_id, username, department, operation, \
     entity_type, entity_id, status, message, http_method, request_uri, ip_address, user_agent, \
     correlation_id, session_id, request_headers, request_body, response_body, response_status, \
     execution_time_ms FROM app_logs WHERE 1=1";

const COUNT_LOGS: &str = "SELECT COUNT(*) FROM app_logs WHERE 1=1";

#[derive(Debug, FromRow)]
struct LogRow {
    id: i64,
    timestamp: DateTime<Utc>,
    user_id: Option<String>,
    username: Option<String>,
    department: Option<String>,
    operation: String,
    entity_type: Option<String>,
    entity_id: Option<String>,
    status: String,
    message: String,
    http_method: Option<String>,
    request_uri: Option<String>,
    ip_address: Option<String>,
    user_agent: Option<String>,
    correlation_id: Option<String>,
    session_id: Option<String>,
    request_headers: Option<String>,
    request_body: Option<String>,
    response_body: Option<String>,
    response_status: Option<i32>,
    execution_time_ms: Option<i64>,
}

impl TryFrom<LogRow> for LogRecord {
    type Error = AuditError;

    fn try_from(row: LogRow) -> Result<Self, Self::Error> {
        let entry = LogEntry {
            timestamp: row.timestamp,
            user_id: row.user_id.unwrap_or_else(|| ANONYMOUS.to_string()),
            username: row.username.unwrap_or_else(|| ANONYMOUS.to_string()),
            department: row.department,
            operation: row.operation,
            entity_type: row.entity_type,
            entity_id: row.entity_id,
            status: row.status.parse()?,
            message: row.message,
            http_method: row.http_method,
            request_uri: row.request_uri,
            ip_address: row.ip_address,
            user_agent: row.user_agent,
            correlation_id: row.correlation_id,
            session_id: row.session_id,
            request_headers: row.request_headers,
            request_body: row.request_body,
            response_body: row.response_body,
            response_status: row.response_status,
            execution_time_ms: row.execution_time_ms,
        };
        Ok(LogRecord::new(row.id, entry))
    }
}

/// `%needle%` with LIKE wildcards in the needle escaped
fn contains_pattern(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len().saturating_add(2));
    escaped.push('%');
    for c in needle.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn push_eq(qb: &mut QueryBuilder<'_, Postgres>, column: &str, value: Option<&String>) {
    if let Some(value) = value {
        qb.push(format!(" AND {column} = "));
        qb.push_bind(value.clone());
    }
}

fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &LogFilter) {
    if let Some(operation) = &filter.operation {
        qb.push(" AND LOWER(operation) LIKE ");
        qb.push_bind(contains_pattern(operation));
    }
    if let Some(username) = &filter.username {
        qb.push(" AND LOWER(username) LIKE ");
        qb.push_bind(contains_pattern(username));
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ");
        qb.push_bind(status.as_str());
    }
    push_eq(qb, "user_id", filter.user_id.as_ref());
    push_eq(qb, "http_method", filter.http_method.as_ref());
    push_eq(qb, "entity_type", filter.entity_type.as_ref());
    push_eq(qb, "department", filter.department.as_ref());
    push_eq(qb, "ip_address", filter.ip_address.as_ref());
    if let Some(start) = filter.start_date {
        qb.push(" AND timestamp >= ");
        qb.push_bind(start);
    }
    if let Some(end) = filter.end_date {
        qb.push(" AND timestamp <= ");
        qb.push_bind(end);
    }
}

/// Case-sensitive, matching how operation codes are written
fn push_any_operation(qb: &mut QueryBuilder<'_, Postgres>, keywords: &[&str]) {
    qb.push(" AND (");
    let mut clauses = qb.separated(" OR ");
    for keyword in keywords {
        clauses.push("operation LIKE ");
        clauses.push_bind_unseparated(format!("%{keyword}%"));
    }
    qb.push(")");
}

fn push_scope(qb: &mut QueryBuilder<'_, Postgres>, scope: LogScope<'_>) {
    match scope {
        LogScope::Filtered(filter) => push_filter(qb, filter),
        LogScope::Status(status) => {
            qb.push(" AND status = ");
            qb.push_bind(status.as_str());
        }
        LogScope::Authentication => push_any_operation(qb, &AUTHENTICATION_KEYWORDS),
        LogScope::Critical => push_any_operation(qb, &CRITICAL_KEYWORDS),
        LogScope::SlowerThan(threshold_ms) => {
            qb.push(" AND execution_time_ms > ");
            qb.push_bind(threshold_ms);
        }
        LogScope::User(user_id) => {
            qb.push(" AND user_id = ");
            qb.push_bind(user_id.to_string());
        }
        LogScope::Session(session_id) => {
            qb.push(" AND session_id = ");
            qb.push_bind(session_id.to_string());
        }
        LogScope::Correlation(correlation_id) => {
            qb.push(" AND correlation_id = ");
            qb.push_bind(correlation_id.to_string());
        }
    }
}

fn push_order(qb: &mut QueryBuilder<'_, Postgres>, sort: Sort) {
    let direction = sort.direction.sql();
    qb.push(format!(
        " ORDER BY {} {direction} NULLS LAST, id {direction}",
        sort.field.column()
    ));
}

fn to_count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or_default()
}

fn rows_to_records(rows: Vec<LogRow>) -> AuditResult<Vec<LogRecord>> {
    rows.into_iter().map(LogRecord::try_from).collect()
}

#[derive(Clone)]
pub struct PgLogStore {
    db: DatabasePool,
}

impl PgLogStore {
    pub fn new(db: DatabasePool) -> Self {
        Self { db }
    }

    async fn fetch_all(&self, scope: LogScope<'_>, sort: Sort) -> AuditResult<Vec<LogRecord>> {
        let mut query = QueryBuilder::<Postgres>::new(SELECT_LOGS);
        push_scope(&mut query, scope);
        push_order(&mut query, sort);
        let rows: Vec<LogRow> = query.build_query_as().fetch_all(self.db.pool()).await?;
        rows_to_records(rows)
    }

    async fn fetch_page(
        &self,
        scope: LogScope<'_>,
        sort: Sort,
        page: PageRequest,
    ) -> AuditResult<Page<LogRecord>> {
        let mut count = QueryBuilder::<Postgres>::new(COUNT_LOGS);
        push_scope(&mut count, scope);
        let total: i64 = count.build_query_scalar().fetch_one(self.db.pool()).await?;
        if total == 0 {
            return Ok(Page::empty(page));
        }

        let mut query = QueryBuilder::<Postgres>::new(SELECT_LOGS);
        push_scope(&mut query, scope);
        push_order(&mut query, sort);
        query.push(" LIMIT ");
        query.push_bind(i64::from(page.size()));
        query.push(" OFFSET ");
        query.push_bind(i64::try_from(page.offset()).unwrap_or(i64::MAX));

        let rows: Vec<LogRow> = query.build_query_as().fetch_all(self.db.pool()).await?;
        Ok(Page::new(rows_to_records(rows)?, page, to_count(total)))
    }

    async fn breakdown(&self, sql: &str) -> AuditResult<Vec<CountEntry>> {
        let rows: Vec<(Option<String>, i64)> =
            sqlx::query_as(sql).fetch_all(self.db.pool()).await?;
        Ok(rows
            .into_iter()
            .map(|(key, count)| CountEntry::new(key, to_count(count)))
            .collect())
    }
}

#[async_trait]
impl LogStore for PgLogStore {
    async fn append(&self, entry: LogEntry) -> AuditResult<LogRecord> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO app_logs (
                timestamp, user_id, username, department, operation, entity_type, entity_id,
                status, message, http_method, request_uri, ip_address, user_agent,
                correlation_id, session_id, request_headers, request_body, response_body,
                response_status, execution_time_ms
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
            RETURNING id
            "#,
        )
        .bind(entry.timestamp)
        .bind(&entry.user_id)
        .bind(&entry.username)
        .bind(&entry.department)
        .bind(&entry.operation)
        .bind(&entry.entity_type)
        .bind(&entry.entity_id)
        .bind(entry.status.as_str())
        .bind(&entry.message)
        .bind(&entry.http_method)
        .bind(&entry.request_uri)
        .bind(&entry.ip_address)
        .bind(&entry.user_agent)
        .bind(&entry.correlation_id)
        .bind(&entry.session_id)
        .bind(&entry.request_headers)
        .bind(&entry.request_body)
        .bind(&entry.response_body)
        .bind(entry.response_status)
        .bind(entry.execution_time_ms)
        .fetch_one(self.db.pool())
        .await?;

        Ok(LogRecord::new(id, entry))
    }

    async fn search(
        &self,
        filter: &LogFilter,
        sort: Sort,
        page: PageRequest,
    ) -> AuditResult<Page<LogRecord>> {
        self.fetch_page(LogScope::Filtered(filter), sort, page).await
    }

    async fn statistics(&self) -> AuditResult<LogStatistics> {
        let (total, successful, failed): (i64, i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), \
             COUNT(*) FILTER (WHERE status = 'SUCCESS'), \
             COUNT(*) FILTER (WHERE status = 'FAILURE') \
             FROM app_logs",
        )
        .fetch_one(self.db.pool())
        .await?;

        let operation_breakdown = self
            .breakdown(
                "SELECT operation, COUNT(*) FROM app_logs \
                 GROUP BY operation ORDER BY COUNT(*) DESC, operation ASC",
            )
            .await?;
        let user_activity = self
            .breakdown(
                "SELECT user_id, COUNT(*) FROM app_logs \
                 WHERE user_id IS NOT NULL AND user_id <> '' \
                 GROUP BY user_id ORDER BY COUNT(*) DESC, user_id ASC",
            )
            .await?;
        let http_method_breakdown = self
            .breakdown(
                "SELECT http_method, COUNT(*) FROM app_logs \
                 GROUP BY http_method ORDER BY COUNT(*) DESC, http_method ASC NULLS LAST",
            )
            .await?;

        Ok(LogStatistics {
            total_logs: to_count(total),
            successful_operations: to_count(successful),
            failed_operations: to_count(failed),
            operation_breakdown,
            user_activity,
            http_method_breakdown,
        })
    }

    async fn recent_failures(&self, page: PageRequest) -> AuditResult<Page<LogRecord>> {
        self.fetch_page(LogScope::Status(LogStatus::Failure), Sort::newest_first(), page)
            .await
    }

    async fn authentication_logs(&self, page: PageRequest) -> AuditResult<Page<LogRecord>> {
        self.fetch_page(LogScope::Authentication, Sort::newest_first(), page)
            .await
    }

    async fn critical_operations(&self, page: PageRequest) -> AuditResult<Page<LogRecord>> {
        self.fetch_page(LogScope::Critical, Sort::newest_first(), page)
            .await
    }

    async fn slow_operations(
        &self,
        threshold_ms: i64,
        page: PageRequest,
    ) -> AuditResult<Page<LogRecord>> {
        self.fetch_page(LogScope::SlowerThan(threshold_ms), Sort::slowest_first(), page)
            .await
    }

    async fn by_correlation_id(&self, correlation_id: &str) -> AuditResult<Vec<LogRecord>> {
        self.fetch_all(LogScope::Correlation(correlation_id), Sort::oldest_first())
            .await
    }

    async fn by_id(&self, id: i64) -> AuditResult<Option<LogRecord>> {
        let mut query = QueryBuilder::<Postgres>::new(SELECT_LOGS);
        query.push(" AND id = ");
        query.push_bind(id);
        let row: Option<LogRow> = query.build_query_as().fetch_optional(self.db.pool()).await?;
        row.map(LogRecord::try_from).transpose()
    }

    async fn recent_activity_by_user(
        &self,
        user_id: &str,
        page: PageRequest,
    ) -> AuditResult<Page<LogRecord>> {
        self.fetch_page(LogScope::User(user_id), Sort::newest_first(), page)
            .await
    }

    async fn by_session_id(
        &self,
        session_id: &str,
        page: PageRequest,
    ) -> AuditResult<Page<LogRecord>> {
        self.fetch_page(LogScope::Session(session_id), Sort::newest_first(), page)
            .await
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> AuditResult<u64> {
        let result = sqlx::query("DELETE FROM app_logs WHERE timestamp < $1")
            .bind(cutoff)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected())
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}
