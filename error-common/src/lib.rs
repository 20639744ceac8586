//! Common error handling utilities for the LeaveScheduler engine
//!
//! Process-level error types shared by the binaries. Library crates keep
//! their own `thiserror` enums (`AuditError`, `DatabaseError`, ...) and
//! convert into [`LeaveError`] at the outermost boundary.
//!
//! # Example
//!
//! ```rust
//! use error_common::{LeaveError, Result};
//!
//! fn bind_address(port: u16) -> Result<String> {
//!     if port == 0 {
//!         return Err(LeaveError::ConfigError("port must be non-zero".into()));
//!     }
//!     Ok(format!("0.0.0.0:{port}"))
//! }
//!
//! assert!(bind_address(0).is_err());
//! ```

pub mod types;

pub use types::*;
