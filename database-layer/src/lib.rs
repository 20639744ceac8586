//! Database layer for the LeaveScheduler engine
//!
//! Thin wrapper over a PostgreSQL connection pool:
//! - pool construction with sane timeouts ([`DatabasePool`])
//! - health checks
//! - embedded schema migrations (the `app_logs` operation-log table)
//!
//! # Example
//!
//! ```rust,no_run
//! use database_layer::{DatabaseConfig, DatabasePool};
//!
//! # async fn run() -> database_layer::DatabaseResult<()> {
//! let config = DatabaseConfig::new("postgresql://localhost:5432/leave_scheduler");
//! let db = DatabasePool::new(&config).await?;
//! db.run_migrations().await?;
//! assert!(db.is_healthy().await);
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod error;

pub use connection::*;
pub use error::*;
