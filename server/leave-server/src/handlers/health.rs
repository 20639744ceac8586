use crate::server::LeaveServer;
use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::collections::BTreeMap;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `healthy` or `degraded`
    pub status: String,
    /// Current timestamp in RFC3339 format
    pub timestamp: String,
    pub version: String,
    /// System uptime in seconds
    pub uptime: u64,
    /// Log store backend in use (`memory` or `postgres`)
    pub log_store: String,
    /// Individual dependency checks
    pub checks: BTreeMap<String, String>,
}

/// Liveness plus a database probe when a database is configured
pub async fn health_check(State(server): State<LeaveServer>) -> (StatusCode, Json<HealthResponse>) {
    let mut checks = BTreeMap::new();
    let mut healthy = true;

    if let Some(db) = &server.db {
        let db_ok = db.is_healthy().await;
        healthy &= db_ok;
        checks.insert(
            "database".to_string(),
            if db_ok { "healthy" } else { "unhealthy" }.to_string(),
        );
    }
    checks.insert("log_store".to_string(), "healthy".to_string());

    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = HealthResponse {
        status: if healthy { "healthy" } else { "degraded" }.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime: server.uptime_secs(),
        log_store: server.logs.backend().to_string(),
        checks,
    };

    (status_code, Json(response))
}
