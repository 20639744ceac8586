use crate::{
    handlers::{app_logs, health},
    server::LeaveServer,
};
use axum::{
    routing::{delete, get},
    Router,
};

pub mod paths {
    pub const HEALTH: &str = "/health";
    pub const APP_LOGS: &str = "/api/app-logs";

    pub mod app_logs {
        pub const SEARCH: &str = "/";
        pub const STATISTICS: &str = "/statistics";
        pub const DASHBOARD: &str = "/dashboard";
        pub const RECENT_FAILURES: &str = "/recent-failures";
        pub const AUTHENTICATION: &str = "/authentication";
        pub const CRITICAL: &str = "/critical";
        pub const SLOW_OPERATIONS: &str = "/slow-operations";
        pub const TRACE: &str = "/trace/:correlation_id";
        pub const SESSION: &str = "/session/:session_id";
        pub const MY_ACTIVITY: &str = "/my-activity";
        pub const CLEANUP: &str = "/cleanup";
        pub const BY_ID: &str = "/:id";
    }
}

/// Create health check routes
pub fn health_routes() -> Router<LeaveServer> {
    Router::new().route(paths::HEALTH, get(health::health_check))
}

/// Create operation log monitoring routes
pub fn app_log_routes() -> Router<LeaveServer> {
    use paths::app_logs as p;

    Router::new()
        .route(p::SEARCH, get(app_logs::search_logs))
        .route(p::STATISTICS, get(app_logs::statistics))
        .route(p::DASHBOARD, get(app_logs::dashboard))
        .route(p::RECENT_FAILURES, get(app_logs::recent_failures))
        .route(p::AUTHENTICATION, get(app_logs::authentication_logs))
        .route(p::CRITICAL, get(app_logs::critical_operations))
        .route(p::SLOW_OPERATIONS, get(app_logs::slow_operations))
        .route(p::TRACE, get(app_logs::trace))
        .route(p::SESSION, get(app_logs::session_logs))
        .route(p::MY_ACTIVITY, get(app_logs::my_activity))
        .route(p::CLEANUP, delete(app_logs::cleanup))
        .route(p::BY_ID, get(app_logs::get_log))
}

/// Create the complete route table
pub fn create_routes() -> Router<LeaveServer> {
    Router::new()
        // Health check routes (no authentication required)
        .merge(health_routes())
        .nest(paths::APP_LOGS, app_log_routes())
}
