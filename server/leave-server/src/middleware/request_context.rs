//! Request context extraction
//!
//! Captures the loggable HTTP details of a request (method, path, client
//! address, correlation and session ids, important headers) so handlers can
//! hand them to the operation interceptor.

use async_trait::async_trait;
use audit_engine::HttpContext;
use axum::extract::{ConnectInfo, FromRequestParts, OriginalUri};
use axum::http::request::Parts;
use std::convert::Infallible;
use std::net::SocketAddr;

/// HTTP details of the current request
#[derive(Debug, Clone)]
pub struct RequestContext(pub HttpContext);

impl RequestContext {
    pub fn from_parts(parts: &Parts) -> Self {
        // Nested routers see a stripped URI; the original one is what gets logged
        let uri = parts
            .extensions
            .get::<OriginalUri>()
            .map_or(&parts.uri, |OriginalUri(original)| original);
        let remote_addr = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        Self(HttpContext::from_request(
            &parts.method,
            uri,
            &parts.headers,
            remote_addr,
        ))
    }

    pub fn correlation_id(&self) -> &str {
        &self.0.correlation_id
    }

    pub fn into_inner(self) -> HttpContext {
        self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(parts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use std::net::{IpAddr, Ipv4Addr};

    fn parts(request: Request<()>) -> Parts {
        request.into_parts().0
    }

    #[test]
    fn test_uses_connect_info_when_no_proxy_headers() {
        let mut parts = parts(
            Request::get("/api/app-logs?page=2")
                .header("user-agent", "curl/8.0")
                .body(())
                .unwrap(),
        );
        parts.extensions.insert(ConnectInfo(SocketAddr::new(
            IpAddr::V4(Ipv4Addr::new(10, 1, 2, 3)),
            50000,
        )));

        let ctx = RequestContext::from_parts(&parts).into_inner();
        assert_eq!(ctx.method, "GET");
        assert_eq!(ctx.uri, "/api/app-logs");
        assert_eq!(ctx.ip_address.as_deref(), Some("10.1.2.3"));
        assert_eq!(ctx.user_agent.as_deref(), Some("curl/8.0"));
        assert!(!ctx.correlation_id.is_empty());
    }

    #[test]
    fn test_original_uri_wins_over_nested_uri() {
        let mut parts = parts(Request::get("/statistics").body(()).unwrap());
        parts.extensions.insert(OriginalUri(
            "/api/app-logs/statistics".parse().unwrap(),
        ));

        let ctx = RequestContext::from_parts(&parts);
        assert_eq!(ctx.0.uri, "/api/app-logs/statistics");
    }

    #[test]
    fn test_forwarded_header_and_correlation_id() {
        let parts = parts(
            Request::get("/")
                .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
                .header("x-correlation-id", "trace-42")
                .body(())
                .unwrap(),
        );

        let ctx = RequestContext::from_parts(&parts);
        assert_eq!(ctx.0.ip_address.as_deref(), Some("203.0.113.9"));
        assert_eq!(ctx.correlation_id(), "trace-42");
    }
}
