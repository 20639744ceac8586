use crate::config::ServerConfig;
use anyhow::Result;
use audit_engine::{AppLogService, LogStore, MemoryLogStore, PgLogStore};
use chrono::{DateTime, Utc};
use database_layer::{DatabaseConfig, DatabasePool};
use std::sync::Arc;
use tracing::{info, warn};

/// Main LeaveScheduler server state
#[derive(Clone)]
pub struct LeaveServer {
    /// Server configuration
    pub config: Arc<ServerConfig>,
    /// Operation log service backing the monitoring API
    pub logs: AppLogService,
    /// Database pool, absent when logs are kept in memory
    pub db: Option<DatabasePool>,
    pub started_at: DateTime<Utc>,
}

impl LeaveServer {
    /// Connect the configured log store and start the log workers
    ///
    /// # Errors
    ///
    /// Fails when the database is unreachable or migrations do not apply.
    pub async fn new(config: ServerConfig) -> Result<Self> {
        match config.database_url.clone() {
            Some(url) => {
                let db = DatabasePool::new(&DatabaseConfig::new(url)).await?;
                db.run_migrations().await?;
                info!("Operation logs stored in Postgres");
                Ok(Self::with_store(
                    config,
                    Arc::new(PgLogStore::new(db.clone())),
                    Some(db),
                ))
            }
            None => {
                warn!("No database_url configured; operation logs are kept in memory only");
                Ok(Self::in_memory(config))
            }
        }
    }

    /// Server backed by an in-memory log store
    pub fn in_memory(config: ServerConfig) -> Self {
        Self::with_store(config, Arc::new(MemoryLogStore::new()), None)
    }

    pub fn with_store(
        config: ServerConfig,
        store: Arc<dyn LogStore>,
        db: Option<DatabasePool>,
    ) -> Self {
        let logs = AppLogService::new(store, config.audit.clone());
        Self {
            config: Arc::new(config),
            logs,
            db,
            started_at: Utc::now(),
        }
    }

    /// Seconds since the server state was created
    pub fn uptime_secs(&self) -> u64 {
        u64::try_from((Utc::now() - self.started_at).num_seconds()).unwrap_or(0)
    }

    /// Flush pending log records and release the database pool
    pub async fn shutdown(&self) {
        self.logs.shutdown().await;
        if let Some(db) = &self.db {
            db.close().await;
        }
    }
}
