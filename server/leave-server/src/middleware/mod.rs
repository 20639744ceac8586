//! HTTP middleware and request extractors

pub mod auth_context;
pub mod request_context;

pub use auth_context::*;
pub use request_context::*;

use audit_engine::CORRELATION_ID_HEADER;
use axum::{
    extract::Request,
    http::{header, HeaderName, HeaderValue, Method},
    middleware::Next,
    response::Response,
};
use std::time::{Duration, Instant};
use tower_http::cors::CorsLayer;
use uuid::Uuid;

/// Request timing middleware
pub async fn request_timing_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let uri = request.uri().clone();

    let response = next.run(request).await;

    let elapsed = start.elapsed();

    tracing::info!(
        method = %method,
        uri = %uri,
        duration_ms = elapsed.as_millis(),
        status = response.status().as_u16(),
        "Request processed"
    );

    response
}

/// Give every request a correlation id and echo it on the response
///
/// Every record logged while handling the request carries the same id, so
/// a whole request can be traced through `/api/app-logs/trace/{id}`.
pub async fn correlation_id_middleware(mut request: Request, next: Next) -> Response {
    let header_name = HeaderName::from_static(CORRELATION_ID_HEADER);
    let existing = request
        .headers()
        .get(&header_name)
        .filter(|value| value.to_str().is_ok_and(|v| !v.trim().is_empty()))
        .cloned();

    let correlation_id = match existing {
        Some(value) => value,
        None => {
            let minted = HeaderValue::from_str(&Uuid::new_v4().to_string());
            match minted {
                Ok(value) => {
                    request.headers_mut().insert(header_name.clone(), value.clone());
                    value
                }
                Err(_) => return next.run(request).await,
            }
        }
    };

    let mut response = next.run(request).await;
    response.headers_mut().insert(header_name, correlation_id);
    response
}

/// Create the CORS layer for the configured origins
///
/// Origins that are not valid header values are skipped with a warning.
pub fn create_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static(CORRELATION_ID_HEADER),
            HeaderName::from_static(audit_engine::SESSION_ID_HEADER),
        ])
        .expose_headers([HeaderName::from_static(CORRELATION_ID_HEADER)])
        .max_age(Duration::from_secs(3600))
}
