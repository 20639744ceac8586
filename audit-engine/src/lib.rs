//! Operation logging and audit trail engine for the LeaveScheduler engine
//!
//! This crate records one structured log entry per intercepted business
//! operation and serves the queries used to monitor them:
//! - [`OperationInterceptor`] wraps an async operation, times it and logs its outcome
//! - [`HttpContext`] and [`Principal`] carry request and identity details explicitly
//! - [`infer_entity_type`] labels operations that did not declare an entity
//! - [`LogEntryBuilder`] applies defaults and payload truncation
//! - [`LogDispatcher`] persists entries inline or through a bounded worker pool
//! - [`LogStore`] with [`MemoryLogStore`] and [`PgLogStore`] backends
//! - [`AppLogService`] ties it together for callers
//!
//! Logging never changes what the wrapped operation returns. Storage and
//! serialization failures are reported through `tracing` only.
//!
//! # Example
//!
//! ```rust
//! use audit_engine::{
//!     AppLogService, AuditConfig, CallContext, Invocation, LogFilter, MemoryLogStore,
//!     OperationPolicy, PageRequest, Sort,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let service = AppLogService::new(Arc::new(MemoryLogStore::new()), AuditConfig::default());
//!     let ctx = CallContext::background();
//!
//!     let policy = OperationPolicy::new("CREATE_HOLIDAY").synchronous();
//!     let created: Result<u32, String> = service
//!         .interceptor()
//!         .intercept(&policy, Invocation::new().param("holidayId", 12), &ctx, || async { Ok(12) })
//!         .await;
//!     assert_eq!(created, Ok(12));
//!
//!     let page = service
//!         .search(&LogFilter::default(), Sort::default(), PageRequest::default())
//!         .await
//!         .unwrap();
//!     assert_eq!(page.total_elements, 1);
//!     assert_eq!(page.content[0].entry.entity_type.as_deref(), Some("Holiday"));
//! }
//! ```

pub mod builder;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod entry;
pub mod error;
pub mod inference;
pub mod interceptor;
pub mod postgres;
pub mod search;
pub mod service;
pub mod storage;

pub use builder::*;
pub use config::*;
pub use context::*;
pub use dispatcher::*;
pub use entry::*;
pub use error::*;
pub use inference::*;
pub use interceptor::*;
pub use postgres::*;
pub use search::*;
pub use service::*;
pub use storage::*;
