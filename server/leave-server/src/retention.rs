//! Periodic purge of operation logs past the retention window

use crate::server::LeaveServer;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::info;

/// Spawn the retention sweep, or return `None` when it is disabled
///
/// The first sweep runs one full interval after startup.
pub fn spawn_retention_sweep(server: &LeaveServer) -> Option<JoinHandle<()>> {
    let period = server.logs.config().cleanup_interval()?;
    let retention_days = server.logs.config().retention_days;
    let logs = server.logs.clone();

    info!(
        retention_days,
        interval_secs = period.as_secs(),
        "Operation log retention sweep scheduled"
    );

    Some(tokio::spawn(async move {
        let start = Instant::now().checked_add(period).unwrap_or_else(Instant::now);
        let mut ticker = interval_at(start, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let deleted = logs.cleanup_old_logs(retention_days).await;
            info!(deleted, retention_days, "Retention sweep finished");
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use audit_engine::{CallContext, LogEntryBuilder, LogStore, MemoryLogStore};
    use chrono::{Duration, Utc};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_disabled_when_interval_is_zero() {
        let mut config = ServerConfig::default();
        config.audit.cleanup_interval_secs = 0;
        let server = LeaveServer::in_memory(config);
        assert!(spawn_retention_sweep(&server).is_none());
    }

    #[tokio::test]
    async fn test_sweep_purges_expired_records() {
        let mut config = ServerConfig::default();
        config.audit.cleanup_interval_secs = 1;
        config.audit.retention_days = 90;
        let store = Arc::new(MemoryLogStore::new());
        let server = LeaveServer::with_store(config, store.clone(), None);

        let mut expired = LogEntryBuilder::new()
            .operation("CREATE_LEAVE")
            .build(&CallContext::background());
        expired.timestamp = Utc::now() - Duration::days(200);
        store.append(expired).await.unwrap();
        store
            .append(LogEntryBuilder::new().operation("CREATE_LEAVE").build(&CallContext::background()))
            .await
            .unwrap();

        let handle = spawn_retention_sweep(&server).unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(1500)).await;
        handle.abort();

        assert_eq!(store.len(), 1);
    }
}
