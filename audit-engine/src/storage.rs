// Log persistence and queries
use crate::entry::{LogEntry, LogRecord, LogStatus};
use crate::error::AuditResult;
use crate::search::{
    CountEntry, LogFilter, LogScope, LogStatistics, Page, PageRequest, Sort, SortDirection,
    SortField,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering as AtomicOrdering};

/// Append-only operation log storage.
///
/// Collection queries return empty pages when nothing matches; only
/// [`LogStore::by_id`] signals absence, with `None`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LogStore: Send + Sync {
    /// Persist an entry and return it with its assigned id
    async fn append(&self, entry: LogEntry) -> AuditResult<LogRecord>;

    async fn search(
        &self,
        filter: &LogFilter,
        sort: Sort,
        page: PageRequest,
    ) -> AuditResult<Page<LogRecord>>;

    async fn statistics(&self) -> AuditResult<LogStatistics>;

    /// FAILURE records, newest first
    async fn recent_failures(&self, page: PageRequest) -> AuditResult<Page<LogRecord>>;

    /// Operations containing LOGIN or LOGOUT, newest first
    async fn authentication_logs(&self, page: PageRequest) -> AuditResult<Page<LogRecord>>;

    /// Operations containing ADMIN, DELETE or UPDATE, newest first
    async fn critical_operations(&self, page: PageRequest) -> AuditResult<Page<LogRecord>>;

    /// Records slower than `threshold_ms`, slowest first
    async fn slow_operations(
        &self,
        threshold_ms: i64,
        page: PageRequest,
    ) -> AuditResult<Page<LogRecord>>;

    /// Every record of one request, oldest first
    async fn by_correlation_id(&self, correlation_id: &str) -> AuditResult<Vec<LogRecord>>;

    async fn by_id(&self, id: i64) -> AuditResult<Option<LogRecord>>;

    async fn recent_activity_by_user(
        &self,
        user_id: &str,
        page: PageRequest,
    ) -> AuditResult<Page<LogRecord>>;

    async fn by_session_id(
        &self,
        session_id: &str,
        page: PageRequest,
    ) -> AuditResult<Page<LogRecord>>;

    /// Delete records with a timestamp strictly before `cutoff`; returns the count removed
    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> AuditResult<u64>;

    /// Short backend name for health reporting
    fn backend(&self) -> &'static str;
}

/// In-process store used when no database is configured, and in tests
#[derive(Debug)]
pub struct MemoryLogStore {
    records: RwLock<Vec<LogRecord>>,
    next_id: AtomicI64,
}

impl Default for MemoryLogStore {
    fn default() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

impl MemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    fn select(&self, scope: LogScope<'_>, sort: Sort) -> Vec<LogRecord> {
        let mut matched: Vec<LogRecord> = self
            .records
            .read()
            .iter()
            .filter(|record| scope.matches(&record.entry))
            .cloned()
            .collect();
        matched.sort_by(|a, b| compare_records(a, b, sort));
        matched
    }

    fn select_page(&self, scope: LogScope<'_>, sort: Sort, page: PageRequest) -> Page<LogRecord> {
        let matched = self.select(scope, sort);
        let total = matched.len() as u64;
        let skip = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let content = matched
            .into_iter()
            .skip(skip)
            .take(page.size() as usize)
            .collect();
        Page::new(content, page, total)
    }
}

fn directed(ordering: Ordering, direction: SortDirection) -> Ordering {
    match direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    }
}

/// Absent values sort last in both directions, as `NULLS LAST` does
fn nulls_last<T: Ord>(a: Option<&T>, b: Option<&T>, direction: SortDirection) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => directed(a.cmp(b), direction),
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
    }
}

fn compare_records(a: &LogRecord, b: &LogRecord, sort: Sort) -> Ordering {
    let (x, y, dir) = (&a.entry, &b.entry, sort.direction);
    let primary = match sort.field {
        SortField::Timestamp => directed(x.timestamp.cmp(&y.timestamp), dir),
        SortField::Operation => directed(x.operation.cmp(&y.operation), dir),
        SortField::Status => directed(x.status.as_str().cmp(y.status.as_str()), dir),
        SortField::Username => directed(x.username.cmp(&y.username), dir),
        SortField::ExecutionTimeMs => {
            nulls_last(x.execution_time_ms.as_ref(), y.execution_time_ms.as_ref(), dir)
        }
        SortField::HttpMethod => nulls_last(x.http_method.as_ref(), y.http_method.as_ref(), dir),
        SortField::EntityType => nulls_last(x.entity_type.as_ref(), y.entity_type.as_ref(), dir),
    };
    primary.then_with(|| directed(a.id.cmp(&b.id), dir))
}

/// Group and count, descending by count then ascending by key
fn breakdown<'a>(keys: impl Iterator<Item = Option<&'a String>>) -> Vec<CountEntry> {
    let mut counts: HashMap<Option<&String>, u64> = HashMap::new();
    for key in keys {
        *counts.entry(key).or_default() += 1;
    }
    let mut entries: Vec<CountEntry> = counts
        .into_iter()
        .map(|(key, count)| CountEntry::new(key.cloned(), count))
        .collect();
    entries.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| nulls_last(a.key.as_ref(), b.key.as_ref(), SortDirection::Asc))
    });
    entries
}

#[async_trait]
impl LogStore for MemoryLogStore {
    async fn append(&self, entry: LogEntry) -> AuditResult<LogRecord> {
        let id = self.next_id.fetch_add(1, AtomicOrdering::SeqCst);
        let record = LogRecord::new(id, entry);
        self.records.write().push(record.clone());
        Ok(record)
    }

    async fn search(
        &self,
        filter: &LogFilter,
        sort: Sort,
        page: PageRequest,
    ) -> AuditResult<Page<LogRecord>> {
        Ok(self.select_page(LogScope::Filtered(filter), sort, page))
    }

    async fn statistics(&self) -> AuditResult<LogStatistics> {
        let records = self.records.read();
        let count_status = |status: LogStatus| {
            records.iter().filter(|r| r.entry.status == status).count() as u64
        };

        Ok(LogStatistics {
            total_logs: records.len() as u64,
            successful_operations: count_status(LogStatus::Success),
            failed_operations: count_status(LogStatus::Failure),
            operation_breakdown: breakdown(records.iter().map(|r| Some(&r.entry.operation))),
            user_activity: breakdown(
                records
                    .iter()
                    .filter(|r| !r.entry.user_id.is_empty())
                    .map(|r| Some(&r.entry.user_id)),
            ),
            http_method_breakdown: breakdown(records.iter().map(|r| r.entry.http_method.as_ref())),
        })
    }

    async fn recent_failures(&self, page: PageRequest) -> AuditResult<Page<LogRecord>> {
        Ok(self.select_page(LogScope::Status(LogStatus::Failure), Sort::newest_first(), page))
    }

    async fn authentication_logs(&self, page: PageRequest) -> AuditResult<Page<LogRecord>> {
        Ok(self.select_page(LogScope::Authentication, Sort::newest_first(), page))
    }

    async fn critical_operations(&self, page: PageRequest) -> AuditResult<Page<LogRecord>> {
        Ok(self.select_page(LogScope::Critical, Sort::newest_first(), page))
    }

    async fn slow_operations(
        &self,
        threshold_ms: i64,
        page: PageRequest,
    ) -> AuditResult<Page<LogRecord>> {
        Ok(self.select_page(LogScope::SlowerThan(threshold_ms), Sort::slowest_first(), page))
    }

    async fn by_correlation_id(&self, correlation_id: &str) -> AuditResult<Vec<LogRecord>> {
        Ok(self.select(LogScope::Correlation(correlation_id), Sort::oldest_first()))
    }

    async fn by_id(&self, id: i64) -> AuditResult<Option<LogRecord>> {
        Ok(self.records.read().iter().find(|r| r.id == id).cloned())
    }

    async fn recent_activity_by_user(
        &self,
        user_id: &str,
        page: PageRequest,
    ) -> AuditResult<Page<LogRecord>> {
        Ok(self.select_page(LogScope::User(user_id), Sort::newest_first(), page))
    }

    async fn by_session_id(
        &self,
        session_id: &str,
        page: PageRequest,
    ) -> AuditResult<Page<LogRecord>> {
        Ok(self.select_page(LogScope::Session(session_id), Sort::newest_first(), page))
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> AuditResult<u64> {
        let mut records = self.records.write();
        let before = records.len();
        records.retain(|r| r.entry.timestamp >= cutoff);
        Ok(before.saturating_sub(records.len()) as u64)
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
