//! Log entry assembly
//!
//! [`LogEntryBuilder`] is the single construction path for every entry,
//! whether it comes from the interceptor or a convenience call. Defaults
//! for operation, status and message are applied in [`LogEntryBuilder::build`],
//! and the actor is always resolved from the [`CallContext`] rather than
//! passed in.

use crate::context::{CallContext, Principal};
use crate::entry::{LogEntry, LogStatus, ANONYMOUS, DEFAULT_MESSAGE, UNKNOWN_OPERATION};
use chrono::Utc;
use serde::Serialize;
use tracing::debug;

/// Longest serialized payload kept verbatim, in characters
pub const MAX_PAYLOAD_CHARS: usize = 10_000;
/// Appended to payloads cut at [`MAX_PAYLOAD_CHARS`]
pub const TRUNCATION_MARKER: &str = "... [TRUNCATED]";

/// A request or response body captured for logging
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(serde_json::Value),
    /// The value could not be serialized; holds the serializer's reason
    Unserializable(String),
}

impl Payload {
    /// Snapshot a value. Never fails; serialization errors are kept as data.
    pub fn capture<T: Serialize + ?Sized>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(json) => Payload::Json(json),
            Err(e) => Payload::Unserializable(e.to_string()),
        }
    }

    /// Text stored in the log entry
    pub fn render(&self) -> String {
        match self {
            Payload::Json(json) => match serde_json::to_string(json) {
                Ok(text) => truncate_payload(text),
                Err(e) => format!("Error serializing object: {e}"),
            },
            Payload::Unserializable(reason) => format!("Error serializing object: {reason}"),
        }
    }
}

/// Serialize any value the way payloads are stored
pub fn serialize_payload<T: Serialize + ?Sized>(value: &T) -> String {
    Payload::capture(value).render()
}

/// Cut text longer than [`MAX_PAYLOAD_CHARS`] and mark it
pub fn truncate_payload(mut text: String) -> String {
    if let Some((cut, _)) = text.char_indices().nth(MAX_PAYLOAD_CHARS) {
        text.truncate(cut);
        text.push_str(TRUNCATION_MARKER);
    }
    text
}

struct ResolvedActor {
    user_id: String,
    username: String,
    department: Option<String>,
}

fn resolve_actor(principal: &Principal) -> ResolvedActor {
    match principal {
        Principal::Authenticated(actor) => ResolvedActor {
            user_id: actor
                .user_id
                .clone()
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| ANONYMOUS.to_string()),
            username: actor.username.clone(),
            department: actor.department.clone(),
        },
        Principal::Anonymous => anonymous_actor(),
        Principal::Unrecognized(kind) => {
            debug!(principal_kind = %kind, "Unrecognized principal, logging as anonymous");
            anonymous_actor()
        }
    }
}

fn anonymous_actor() -> ResolvedActor {
    ResolvedActor {
        user_id: ANONYMOUS.to_string(),
        username: ANONYMOUS.to_string(),
        department: None,
    }
}

#[derive(Debug, Clone, Default)]
pub struct LogEntryBuilder {
    operation: Option<String>,
    entity_type: Option<String>,
    entity_id: Option<String>,
    status: Option<LogStatus>,
    message: Option<String>,
    request_body: Option<Payload>,
    response_body: Option<Payload>,
    response_status: Option<i32>,
    execution_time_ms: Option<i64>,
}

impl LogEntryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    pub fn entity_type(mut self, entity_type: Option<String>) -> Self {
        self.entity_type = entity_type;
        self
    }

    pub fn entity_id(mut self, entity_id: Option<String>) -> Self {
        self.entity_id = entity_id;
        self
    }

    pub fn status(mut self, status: LogStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn request_body(mut self, body: Option<Payload>) -> Self {
        self.request_body = body;
        self
    }

    pub fn response_body(mut self, body: Option<Payload>) -> Self {
        self.response_body = body;
        self
    }

    pub fn response_status(mut self, status: Option<i32>) -> Self {
        self.response_status = status;
        self
    }

    pub fn execution_time_ms(mut self, millis: i64) -> Self {
        self.execution_time_ms = Some(millis);
        self
    }

    /// Assemble the entry, stamping it with the current time
    pub fn build(self, ctx: &CallContext) -> LogEntry {
        let actor = resolve_actor(&ctx.principal);
        let http = ctx.http.as_ref();

        LogEntry {
            timestamp: Utc::now(),
            user_id: actor.user_id,
            username: actor.username,
            department: actor.department,
            operation: self
                .operation
                .filter(|op| !op.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_OPERATION.to_string()),
            entity_type: self.entity_type,
            entity_id: self.entity_id,
            status: self.status.unwrap_or_default(),
            message: self.message.unwrap_or_else(|| DEFAULT_MESSAGE.to_string()),
            http_method: http.map(|h| h.method.clone()),
            request_uri: http.map(|h| h.uri.clone()),
            ip_address: http.and_then(|h| h.ip_address.clone()),
            user_agent: http.and_then(|h| h.user_agent.clone()),
            correlation_id: http.map(|h| h.correlation_id.clone()),
            session_id: http.and_then(|h| h.session_id.clone()),
            request_headers: http.and_then(|h| h.headers.clone()),
            request_body: self.request_body.as_ref().map(Payload::render),
            response_body: self.response_body.as_ref().map(Payload::render),
            response_status: self.response_status,
            execution_time_ms: self.execution_time_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Actor, HttpContext};
    use proptest::prelude::*;
    use std::collections::HashMap;

    fn http_context() -> HttpContext {
        HttpContext {
            method: "POST".to_string(),
            uri: "/api/leave/apply".to_string(),
            ip_address: Some("10.0.0.5".to_string()),
            user_agent: Some("curl/8.0".to_string()),
            correlation_id: "corr-1".to_string(),
            session_id: Some("sess-1".to_string()),
            headers: Some(r#"{"accept":"*/*"}"#.to_string()),
        }
    }

    #[test]
    fn test_defaults_applied_when_nothing_supplied() {
        let entry = LogEntryBuilder::new().build(&CallContext::background());

        assert_eq!(entry.operation, UNKNOWN_OPERATION);
        assert_eq!(entry.status, LogStatus::Info);
        assert_eq!(entry.message, DEFAULT_MESSAGE);
        assert_eq!(entry.user_id, ANONYMOUS);
        assert_eq!(entry.username, ANONYMOUS);
        assert_eq!(entry.department, None);
        assert_eq!(entry.http_method, None);
        assert_eq!(entry.correlation_id, None);
    }

    #[test]
    fn test_blank_operation_is_defaulted() {
        let entry = LogEntryBuilder::new()
            .operation("  ")
            .build(&CallContext::background());
        assert_eq!(entry.operation, UNKNOWN_OPERATION);
    }

    #[test]
    fn test_authenticated_actor_and_http_context_copied() {
        let ctx = CallContext::background()
            .with_http(http_context())
            .with_principal(Principal::Authenticated(
                Actor::new("7", "alice").with_department("Engineering"),
            ));
        let entry = LogEntryBuilder::new()
            .operation("APPLY_LEAVE")
            .status(LogStatus::Success)
            .message("done")
            .execution_time_ms(15)
            .build(&ctx);

        assert_eq!(entry.user_id, "7");
        assert_eq!(entry.username, "alice");
        assert_eq!(entry.department.as_deref(), Some("Engineering"));
        assert_eq!(entry.http_method.as_deref(), Some("POST"));
        assert_eq!(entry.request_uri.as_deref(), Some("/api/leave/apply"));
        assert_eq!(entry.ip_address.as_deref(), Some("10.0.0.5"));
        assert_eq!(entry.correlation_id.as_deref(), Some("corr-1"));
        assert_eq!(entry.session_id.as_deref(), Some("sess-1"));
        assert_eq!(entry.execution_time_ms, Some(15));
    }

    #[test]
    fn test_actor_without_id_keeps_username() {
        let actor = Actor {
            user_id: None,
            username: "bob".to_string(),
            department: None,
        };
        let ctx = CallContext::background().with_principal(Principal::Authenticated(actor));
        let entry = LogEntryBuilder::new().build(&ctx);

        assert_eq!(entry.user_id, ANONYMOUS);
        assert_eq!(entry.username, "bob");
    }

    #[test]
    fn test_unrecognized_principal_is_anonymous() {
        let ctx = CallContext::background()
            .with_principal(Principal::Unrecognized("api-key".to_string()));
        let entry = LogEntryBuilder::new().build(&ctx);

        assert_eq!(entry.user_id, ANONYMOUS);
        assert_eq!(entry.username, ANONYMOUS);
    }

    #[test]
    fn test_small_payload_kept_verbatim() {
        let body = serde_json::json!({"days": 3, "type": "SICK"});
        assert_eq!(serialize_payload(&body), r#"{"days":3,"type":"SICK"}"#);
    }

    #[test]
    fn test_oversized_payload_truncated_with_marker() {
        let body = "x".repeat(MAX_PAYLOAD_CHARS * 2);
        let rendered = serialize_payload(&body);

        assert!(rendered.ends_with(TRUNCATION_MARKER));
        let kept = rendered.strip_suffix(TRUNCATION_MARKER).unwrap();
        assert_eq!(kept.chars().count(), MAX_PAYLOAD_CHARS);
    }

    #[test]
    fn test_truncation_counts_characters_not_bytes() {
        let text = "é".repeat(MAX_PAYLOAD_CHARS + 5);
        let truncated = truncate_payload(text);
        let kept = truncated.strip_suffix(TRUNCATION_MARKER).unwrap();
        assert_eq!(kept.chars().count(), MAX_PAYLOAD_CHARS);
    }

    #[test]
    fn test_payload_at_limit_not_truncated() {
        let text = "a".repeat(MAX_PAYLOAD_CHARS);
        assert_eq!(truncate_payload(text.clone()), text);
    }

    #[test]
    fn test_unserializable_payload_becomes_error_text() {
        let mut map: HashMap<(i32, i32), i32> = HashMap::new();
        map.insert((1, 2), 3);
        let rendered = serialize_payload(&map);

        assert!(rendered.starts_with("Error serializing object: "));
    }

    #[test]
    fn test_bodies_rendered_into_entry() {
        let entry = LogEntryBuilder::new()
            .request_body(Some(Payload::capture(&serde_json::json!({"id": 1}))))
            .response_body(Some(Payload::Unserializable("boom".to_string())))
            .build(&CallContext::background());

        assert_eq!(entry.request_body.as_deref(), Some(r#"{"id":1}"#));
        assert_eq!(
            entry.response_body.as_deref(),
            Some("Error serializing object: boom")
        );
    }

    proptest! {
        #[test]
        fn prop_truncation_is_deterministic(text in ".{0,200}", repeat in 1usize..120) {
            let body = text.repeat(repeat);
            let first = serialize_payload(&body);
            let second = serialize_payload(&body);
            prop_assert_eq!(&first, &second);

            let json_len = serde_json::to_string(&body).unwrap().chars().count();
            if json_len > MAX_PAYLOAD_CHARS {
                prop_assert!(first.ends_with(TRUNCATION_MARKER));
                let kept = first.strip_suffix(TRUNCATION_MARKER).unwrap();
                prop_assert_eq!(kept.chars().count(), MAX_PAYLOAD_CHARS);
            } else {
                prop_assert_eq!(first.chars().count(), json_len);
            }
        }
    }
}
