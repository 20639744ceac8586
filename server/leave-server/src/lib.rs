//! LeaveScheduler server - operation log monitoring API
//!
//! This library wires the `audit-engine` log service into an axum router:
//! bearer-token authentication, request context capture for the operation
//! interceptor, and the `/api/app-logs` monitoring endpoints.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod retention;
pub mod routes;
pub mod server;
pub mod types;

// Re-export commonly used types
pub use config::ServerConfig;
pub use error::*;
pub use server::LeaveServer;

use axum::{middleware::from_fn, Router};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// Create the main application router with all routes and middleware
pub fn create_app(server: LeaveServer) -> Router {
    let cors = middleware::create_cors_layer(&server.config.allowed_origins);

    routes::create_routes()
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(from_fn(middleware::correlation_id_middleware))
                .layer(from_fn(middleware::request_timing_middleware)),
        )
        .with_state(server)
}
