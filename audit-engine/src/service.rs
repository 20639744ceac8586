// Operation log service: logging entry points and the monitoring query surface
use crate::builder::LogEntryBuilder;
use crate::config::AuditConfig;
use crate::context::CallContext;
use crate::dispatcher::{DispatchMode, LogDispatcher};
use crate::entry::{LogRecord, LogStatus};
use crate::error::AuditResult;
use crate::interceptor::OperationInterceptor;
use crate::search::{Dashboard, LogFilter, LogStatistics, Page, PageRequest, Sort};
use crate::storage::LogStore;
use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Clone)]
pub struct AppLogService {
    store: Arc<dyn LogStore>,
    dispatcher: Arc<LogDispatcher>,
    config: AuditConfig,
}

impl AppLogService {
    /// Create the service and start its dispatcher workers.
    /// Must be called from within a Tokio runtime.
    pub fn new(store: Arc<dyn LogStore>, config: AuditConfig) -> Self {
        let dispatcher = Arc::new(LogDispatcher::new(Arc::clone(&store), &config));
        Self {
            store,
            dispatcher,
            config,
        }
    }

    pub fn interceptor(&self) -> OperationInterceptor {
        OperationInterceptor::new(
            Arc::clone(&self.dispatcher),
            self.config.slow_operation_threshold_ms,
        )
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    /// Build an entry from `builder` and persist it through `mode`
    pub async fn log(&self, builder: LogEntryBuilder, ctx: &CallContext, mode: DispatchMode) {
        self.dispatcher.persist(builder.build(ctx), mode).await;
    }

    #[allow(clippy::too_many_arguments)]
    async fn log_simple(
        &self,
        operation: &str,
        entity_type: Option<&str>,
        entity_id: Option<&str>,
        status: LogStatus,
        message: &str,
        ctx: &CallContext,
        mode: DispatchMode,
    ) {
        let builder = LogEntryBuilder::new()
            .operation(operation)
            .entity_type(entity_type.map(ToString::to_string))
            .entity_id(entity_id.map(ToString::to_string))
            .status(status)
            .message(message);
        self.log(builder, ctx, mode).await;
    }

    pub async fn log_success(
        &self,
        operation: &str,
        entity_type: Option<&str>,
        entity_id: Option<&str>,
        message: &str,
        ctx: &CallContext,
    ) {
        self.log_simple(
            operation,
            entity_type,
            entity_id,
            LogStatus::Success,
            message,
            ctx,
            DispatchMode::Async,
        )
        .await;
    }

    pub async fn log_failure(
        &self,
        operation: &str,
        entity_type: Option<&str>,
        entity_id: Option<&str>,
        message: &str,
        ctx: &CallContext,
    ) {
        self.log_simple(
            operation,
            entity_type,
            entity_id,
            LogStatus::Failure,
            message,
            ctx,
            DispatchMode::Async,
        )
        .await;
    }

    pub async fn log_info(
        &self,
        operation: &str,
        entity_type: Option<&str>,
        entity_id: Option<&str>,
        message: &str,
        ctx: &CallContext,
    ) {
        self.log_simple(
            operation,
            entity_type,
            entity_id,
            LogStatus::Info,
            message,
            ctx,
            DispatchMode::Async,
        )
        .await;
    }

    pub async fn log_warning(
        &self,
        operation: &str,
        entity_type: Option<&str>,
        entity_id: Option<&str>,
        message: &str,
        ctx: &CallContext,
    ) {
        self.log_simple(
            operation,
            entity_type,
            entity_id,
            LogStatus::Warning,
            message,
            ctx,
            DispatchMode::Async,
        )
        .await;
    }

    /// Log and wait for the record to be stored, for security-sensitive events
    pub async fn log_sync(
        &self,
        operation: &str,
        entity_type: Option<&str>,
        entity_id: Option<&str>,
        status: LogStatus,
        message: &str,
        ctx: &CallContext,
    ) {
        self.log_simple(
            operation,
            entity_type,
            entity_id,
            status,
            message,
            ctx,
            DispatchMode::Sync,
        )
        .await;
    }

    pub async fn search(
        &self,
        filter: &LogFilter,
        sort: Sort,
        page: PageRequest,
    ) -> AuditResult<Page<LogRecord>> {
        self.store.search(filter, sort, page).await
    }

    pub async fn statistics(&self) -> AuditResult<LogStatistics> {
        self.store.statistics().await
    }

    /// Statistics plus failure and slowness indicators
    pub async fn dashboard(&self) -> AuditResult<Dashboard> {
        let statistics = self.store.statistics().await?;
        let failures = self.store.recent_failures(PageRequest::first(1)).await?;
        let slow = self
            .store
            .slow_operations(self.config.slow_operation_threshold_ms, PageRequest::first(1))
            .await?;

        Ok(Dashboard {
            statistics,
            has_recent_failures: failures.total_elements > 0,
            slow_operations_count: slow.total_elements,
        })
    }

    pub async fn recent_failures(&self, page: PageRequest) -> AuditResult<Page<LogRecord>> {
        self.store.recent_failures(page).await
    }

    pub async fn authentication_logs(&self, page: PageRequest) -> AuditResult<Page<LogRecord>> {
        self.store.authentication_logs(page).await
    }

    pub async fn critical_operations(&self, page: PageRequest) -> AuditResult<Page<LogRecord>> {
        self.store.critical_operations(page).await
    }

    pub async fn slow_operations(
        &self,
        threshold_ms: i64,
        page: PageRequest,
    ) -> AuditResult<Page<LogRecord>> {
        self.store.slow_operations(threshold_ms, page).await
    }

    pub async fn by_correlation_id(&self, correlation_id: &str) -> AuditResult<Vec<LogRecord>> {
        self.store.by_correlation_id(correlation_id).await
    }

    pub async fn by_id(&self, id: i64) -> AuditResult<Option<LogRecord>> {
        self.store.by_id(id).await
    }

    pub async fn recent_activity_by_user(
        &self,
        user_id: &str,
        page: PageRequest,
    ) -> AuditResult<Page<LogRecord>> {
        self.store.recent_activity_by_user(user_id, page).await
    }

    pub async fn by_session_id(
        &self,
        session_id: &str,
        page: PageRequest,
    ) -> AuditResult<Page<LogRecord>> {
        self.store.by_session_id(session_id, page).await
    }

    /// Delete records older than `days_to_keep` days and return how many went.
    ///
    /// Storage failures are logged and reported as zero deletions.
    pub async fn cleanup_old_logs(&self, days_to_keep: u32) -> u64 {
        let cutoff = retention_cutoff(Utc::now(), days_to_keep);
        match self.store.delete_older_than(cutoff).await {
            Ok(deleted) => {
                info!(days_to_keep, deleted, cutoff = %cutoff, "Cleaned up old operation logs");
                deleted
            }
            Err(e) => {
                error!(days_to_keep, error = %e, "Failed to clean up old operation logs");
                0
            }
        }
    }

    /// Wait for queued async records to be stored
    pub async fn flush(&self) {
        self.dispatcher.flush().await;
    }

    pub async fn shutdown(&self) {
        self.dispatcher.shutdown().await;
    }
}

fn retention_cutoff(now: DateTime<Utc>, days_to_keep: u32) -> DateTime<Utc> {
    TimeDelta::try_days(i64::from(days_to_keep))
        .and_then(|keep| now.checked_sub_signed(keep))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
