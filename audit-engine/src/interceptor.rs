//! Operation interception
//!
//! [`OperationInterceptor::intercept`] wraps one business operation:
//!
//! ```rust,no_run
//! use audit_engine::{AuditConfig, AppLogService, CallContext, Invocation, MemoryLogStore, OperationPolicy};
//! use std::sync::Arc;
//!
//! # async fn run() {
//! let service = AppLogService::new(Arc::new(MemoryLogStore::new()), AuditConfig::default());
//! let policy = OperationPolicy::new("APPROVE_LEAVE").entity_type("LeaveApplication");
//! let invocation = Invocation::new().param("leaveId", 42);
//!
//! let approved: Result<bool, String> = service
//!     .interceptor()
//!     .intercept(&policy, invocation, &CallContext::background(), || async { Ok(true) })
//!     .await;
//! # }
//! ```
//!
//! The caller always sees the operation's own result. A panic is logged as a
//! failure and then resumed.

use crate::builder::{LogEntryBuilder, Payload};
use crate::context::CallContext;
use crate::dispatcher::{DispatchMode, LogDispatcher};
use crate::entry::LogStatus;
use crate::inference::infer_entity_type;
use futures::FutureExt;
use serde::Serialize;
use std::any::Any;
use std::fmt::Display;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

pub const SUCCESS_MESSAGE: &str = "Operation completed successfully";
pub const FAILURE_MESSAGE: &str = "Operation failed";
pub const PANIC_MESSAGE: &str = "Operation panicked";

/// How a wrapped operation is logged
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationPolicy {
    pub operation_name: String,
    /// Entity label; inferred from the operation name and path when absent
    pub entity_type_hint: Option<String>,
    pub include_request_body: bool,
    pub include_response_body: bool,
    pub mode: DispatchMode,
}

impl OperationPolicy {
    /// Bodies captured, async dispatch
    pub fn new(operation_name: impl Into<String>) -> Self {
        Self {
            operation_name: operation_name.into(),
            entity_type_hint: None,
            include_request_body: true,
            include_response_body: true,
            mode: DispatchMode::Async,
        }
    }

    pub fn entity_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type_hint = Some(entity_type.into());
        self
    }

    pub fn without_request_body(mut self) -> Self {
        self.include_request_body = false;
        self
    }

    pub fn without_response_body(mut self) -> Self {
        self.include_response_body = false;
        self
    }

    /// Persist the record before the caller gets its result back
    pub fn synchronous(mut self) -> Self {
        self.mode = DispatchMode::Sync;
        self
    }

    fn effective_entity_type(&self, ctx: &CallContext) -> String {
        match self
            .entity_type_hint
            .as_deref()
            .map(str::trim)
            .filter(|hint| !hint.is_empty())
        {
            Some(hint) => hint.to_string(),
            None => infer_entity_type(Some(&self.operation_name), ctx.request_uri())
                .unwrap_or_default()
                .to_string(),
        }
    }
}

/// Arguments of the wrapped call, as far as logging cares
#[derive(Debug, Clone, Default)]
pub struct Invocation {
    params: Vec<(String, Option<String>)>,
    request_body: Option<Payload>,
}

impl Invocation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Display) -> Self {
        self.params.push((name.into(), Some(value.to_string())));
        self
    }

    pub fn optional_param<V: Display>(mut self, name: impl Into<String>, value: Option<V>) -> Self {
        self.params.push((name.into(), value.map(|v| v.to_string())));
        self
    }

    /// Snapshot the request body now, before the operation can consume it
    pub fn body<B: Serialize + ?Sized>(mut self, body: &B) -> Self {
        self.request_body = Some(Payload::capture(body));
        self
    }

    /// Value of the first present parameter whose name contains `id`
    pub fn entity_id(&self) -> Option<&str> {
        self.params
            .iter()
            .filter(|(name, _)| name.to_lowercase().contains("id"))
            .find_map(|(_, value)| value.as_deref())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| PANIC_MESSAGE.to_string())
}

fn failure_message(error: &impl Display) -> String {
    let message = error.to_string();
    if message.is_empty() {
        FAILURE_MESSAGE.to_string()
    } else {
        message
    }
}

#[derive(Clone)]
pub struct OperationInterceptor {
    dispatcher: Arc<LogDispatcher>,
    slow_threshold_ms: i64,
}

impl OperationInterceptor {
    pub fn new(dispatcher: Arc<LogDispatcher>, slow_threshold_ms: i64) -> Self {
        Self {
            dispatcher,
            slow_threshold_ms,
        }
    }

    /// Run `operation` once and log exactly one record for it
    pub async fn intercept<T, E, F, Fut>(
        &self,
        policy: &OperationPolicy,
        invocation: Invocation,
        ctx: &CallContext,
        operation: F,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        T: Serialize,
        E: Display,
    {
        let started = Instant::now();
        let entity_id = invocation.entity_id().map(ToString::to_string);
        let request_body = if policy.include_request_body {
            invocation.request_body
        } else {
            None
        };
        let entity_type = policy.effective_entity_type(ctx);

        let outcome = AssertUnwindSafe(async move { operation().await })
            .catch_unwind()
            .await;

        let elapsed_ms = i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX);
        let (status, message, response_body) = match &outcome {
            Ok(Ok(value)) => (
                LogStatus::Success,
                SUCCESS_MESSAGE.to_string(),
                policy
                    .include_response_body
                    .then(|| Payload::capture(value)),
            ),
            Ok(Err(error)) => (LogStatus::Failure, failure_message(error), None),
            Err(payload) => (LogStatus::Failure, panic_message(payload.as_ref()), None),
        };

        debug!(
            operation = %policy.operation_name,
            status = %status,
            elapsed_ms,
            "Operation intercepted"
        );
        if elapsed_ms > self.slow_threshold_ms {
            warn!(
                operation = %policy.operation_name,
                elapsed_ms,
                threshold_ms = self.slow_threshold_ms,
                "Slow operation detected"
            );
        }

        let entry = LogEntryBuilder::new()
            .operation(policy.operation_name.clone())
            .entity_type(Some(entity_type))
            .entity_id(entity_id)
            .status(status)
            .message(message)
            .request_body(request_body)
            .response_body(response_body)
            .execution_time_ms(elapsed_ms)
            .build(ctx);
        self.dispatcher.persist(entry, policy.mode).await;

        match outcome {
            Ok(result) => result,
            Err(payload) => panic::resume_unwind(payload),
        }
    }
}
