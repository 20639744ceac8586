//! Request and identity context for operation logging
//!
//! The host framework builds a [`CallContext`] for every intercepted call
//! and passes it in explicitly:
//! - [`HttpContext`] when the call runs inside an HTTP request, `None` for
//!   scheduled or background work
//! - [`Principal`] describing who is calling
//!
//! Extraction never fails. Unreadable headers are treated as missing.

use http::{HeaderMap, Method, Uri};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::IpAddr;
use uuid::Uuid;

pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";
pub const SESSION_ID_HEADER: &str = "x-session-id";
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";
pub const REAL_IP_HEADER: &str = "x-real-ip";

/// Headers copied into the log entry. Credentials never appear here.
const IMPORTANT_HEADERS: [&str; 6] = [
    "content-type",
    "accept",
    "user-agent",
    FORWARDED_FOR_HEADER,
    REAL_IP_HEADER,
    CORRELATION_ID_HEADER,
];

/// HTTP details of the request an operation runs in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpContext {
    pub method: String,
    /// Request path without the query string
    pub uri: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub correlation_id: String,
    pub session_id: Option<String>,
    /// JSON object of the important request headers
    pub headers: Option<String>,
}

impl HttpContext {
    /// Capture the loggable parts of an in-flight request
    pub fn from_request(
        method: &Method,
        uri: &Uri,
        headers: &HeaderMap,
        remote_addr: Option<IpAddr>,
    ) -> Self {
        Self {
            method: method.as_str().to_string(),
            uri: uri.path().to_string(),
            ip_address: resolve_client_ip(headers, remote_addr),
            user_agent: header_value(headers, http::header::USER_AGENT.as_str()),
            correlation_id: correlation_id(headers),
            session_id: header_value(headers, SESSION_ID_HEADER),
            headers: important_headers(headers),
        }
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}

fn usable_ip(candidate: Option<String>) -> Option<String> {
    candidate.filter(|ip| !ip.eq_ignore_ascii_case("unknown"))
}

/// Resolve the originating client address.
///
/// Order: first `X-Forwarded-For` entry, then `X-Real-IP`, then the socket
/// peer. A literal `unknown` in either header falls through to the next source.
pub fn resolve_client_ip(headers: &HeaderMap, remote_addr: Option<IpAddr>) -> Option<String> {
    let forwarded = header_value(headers, FORWARDED_FOR_HEADER).and_then(|value| {
        value
            .split(',')
            .next()
            .map(|first| first.trim().to_string())
            .filter(|first| !first.is_empty())
    });

    usable_ip(forwarded)
        .or_else(|| usable_ip(header_value(headers, REAL_IP_HEADER)))
        .or_else(|| remote_addr.map(|addr| addr.to_string()))
}

/// Inbound `X-Correlation-ID`, or a freshly minted UUID
pub fn correlation_id(headers: &HeaderMap) -> String {
    header_value(headers, CORRELATION_ID_HEADER).unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// Serialize the important headers as a JSON object with sorted keys.
///
/// Returns `None` when none of them are present.
pub fn important_headers(headers: &HeaderMap) -> Option<String> {
    let captured: BTreeMap<&str, String> = IMPORTANT_HEADERS
        .iter()
        .filter_map(|name| header_value(headers, name).map(|value| (*name, value)))
        .collect();

    if captured.is_empty() {
        return None;
    }
    serde_json::to_string(&captured).ok()
}

/// An authenticated user as seen by the logging subsystem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub user_id: Option<String>,
    pub username: String,
    pub department: Option<String>,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            username: username.into(),
            department: None,
        }
    }

    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }
}

/// Identity attached to a call
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Principal {
    Authenticated(Actor),
    #[default]
    Anonymous,
    /// A credential the logging subsystem does not know how to read
    Unrecognized(String),
}

/// Everything the interceptor needs to know about the surrounding call
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    pub http: Option<HttpContext>,
    pub principal: Principal,
}

impl CallContext {
    pub fn new(http: Option<HttpContext>, principal: Principal) -> Self {
        Self { http, principal }
    }

    /// Context for work that runs outside any request, such as scheduled jobs
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_http(mut self, http: HttpContext) -> Self {
        self.http = Some(http);
        self
    }

    pub fn with_principal(mut self, principal: Principal) -> Self {
        self.principal = principal;
        self
    }

    pub fn request_uri(&self) -> Option<&str> {
        self.http.as_ref().map(|h| h.uri.as_str())
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.http.as_ref().map(|h| h.correlation_id.as_str())
    }
}
