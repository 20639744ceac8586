use audit_engine::{Actor, CallContext, LogFilter, LogStatus, PageRequest, Principal, Sort};
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use leave_server::{create_app, middleware::Claims, LeaveServer, ServerConfig};
use serde_json::Value;
use tower::ServiceExt;

const SECRET: &str = "integration-test-secret";

struct TestApp {
    server: LeaveServer,
    app: Router,
}

impl TestApp {
    fn new() -> Self {
        let config = ServerConfig {
            jwt_secret: SECRET.to_string(),
            ..ServerConfig::default()
        };
        let server = LeaveServer::in_memory(config);
        let app = create_app(server.clone());
        Self { server, app }
    }

    async fn seed(&self, operation: &str, user_id: &str, status: LogStatus) {
        let ctx = CallContext::background()
            .with_principal(Principal::Authenticated(Actor::new(user_id, user_id)));
        self.server
            .logs
            .log_sync(operation, None, None, status, "seeded", &ctx)
            .await;
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap_or(Value::Null)
        };
        (status, json)
    }
}

fn token(user_id: &str, roles: &[&str]) -> String {
    let claims = Claims {
        sub: user_id.to_string(),
        username: Some(format!("{user_id}-name")),
        department: Some("HR".to_string()),
        roles: roles.iter().map(ToString::to_string).collect(),
        exp: chrono::Utc::now().timestamp() + 3600,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

fn get(uri: &str, bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(uri);
    if let Some(token) = bearer {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health_reports_memory_backend() {
    let test = TestApp::new();
    let (status, body) = test.send(get("/health", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["log_store"], "memory");
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let test = TestApp::new();
    let (status, body) = test.send(get("/api/app-logs", None)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error_type"], "authentication_error");
}

#[tokio::test]
async fn test_token_signed_with_other_secret_is_unauthorized() {
    let test = TestApp::new();
    let forged = encode(
        &Header::new(Algorithm::HS256),
        &Claims {
            sub: "mallory".to_string(),
            username: None,
            department: None,
            roles: vec!["ADMIN".to_string()],
            exp: chrono::Utc::now().timestamp() + 3600,
        },
        &EncodingKey::from_secret(b"not-the-secret"),
    )
    .unwrap();

    let (status, _) = test.send(get("/api/app-logs", Some(&forged))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_non_admin_is_forbidden() {
    let test = TestApp::new();
    let employee = token("u-2", &["EMPLOYEE"]);

    for uri in [
        "/api/app-logs",
        "/api/app-logs/statistics",
        "/api/app-logs/dashboard",
        "/api/app-logs/trace/abc",
        "/api/app-logs/1",
    ] {
        let (status, _) = test.send(get(uri, Some(&employee))).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{uri}");
    }
}

#[tokio::test]
async fn test_search_filters_and_pages() {
    let test = TestApp::new();
    test.seed("CREATE_LEAVE", "u-1", LogStatus::Success).await;
    test.seed("APPROVE_LEAVE", "u-1", LogStatus::Failure).await;
    test.seed("CREATE_HOLIDAY", "u-3", LogStatus::Success).await;
    let admin = token("admin-1", &["ADMIN"]);

    let (status, body) = test
        .send(get(
            "/api/app-logs?operation=leave&status=SUCCESS&size=5",
            Some(&admin),
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let page = &body["data"];
    assert_eq!(page["totalElements"], 1);
    assert_eq!(page["size"], 5);
    assert_eq!(page["content"][0]["operation"], "CREATE_LEAVE");
    assert_eq!(page["content"][0]["status"], "SUCCESS");
}

#[tokio::test]
async fn test_invalid_sort_field_is_bad_request() {
    let test = TestApp::new();
    let admin = token("admin-1", &["ADMIN"]);

    let (status, body) = test
        .send(get("/api/app-logs?sortBy=password", Some(&admin)))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_type"], "validation_error");
}

#[tokio::test]
async fn test_statistics_and_dashboard() {
    let test = TestApp::new();
    test.seed("USER_LOGIN", "u-1", LogStatus::Success).await;
    test.seed("USER_LOGIN", "u-2", LogStatus::Failure).await;
    let admin = token("admin-1", &["ADMIN"]);

    let (status, body) = test
        .send(get("/api/app-logs/statistics", Some(&admin)))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["totalLogs"], 2);
    assert_eq!(body["data"]["failedOperations"], 1);

    let (status, body) = test
        .send(get("/api/app-logs/dashboard", Some(&admin)))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["hasRecentFailures"], true);
    assert_eq!(body["data"]["slowOperationsCount"], 0);
    assert_eq!(body["data"]["totalLogs"], 2);
}

#[tokio::test]
async fn test_recent_failures_default_page_size() {
    let test = TestApp::new();
    test.seed("DELETE_LEAVE", "u-1", LogStatus::Failure).await;
    let admin = token("admin-1", &["ADMIN"]);

    let (status, body) = test
        .send(get("/api/app-logs/recent-failures", Some(&admin)))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["size"], 10);
    assert_eq!(body["data"]["totalElements"], 1);
}

#[tokio::test]
async fn test_unknown_id_is_not_found() {
    let test = TestApp::new();
    let admin = token("admin-1", &["ADMIN"]);

    let (status, body) = test.send(get("/api/app-logs/4242", Some(&admin))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_type"], "not_found");
}

#[tokio::test]
async fn test_get_by_id() {
    let test = TestApp::new();
    test.seed("CREATE_LEAVE", "u-1", LogStatus::Success).await;
    let admin = token("admin-1", &["ADMIN"]);

    let (status, body) = test.send(get("/api/app-logs/1", Some(&admin))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], 1);
    assert_eq!(body["data"]["userId"], "u-1");
}

#[tokio::test]
async fn test_my_activity_returns_only_callers_records() {
    let test = TestApp::new();
    test.seed("CREATE_LEAVE", "u-1", LogStatus::Success).await;
    test.seed("CREATE_LEAVE", "u-2", LogStatus::Success).await;
    test.seed("CANCEL_LEAVE", "u-1", LogStatus::Success).await;
    let employee = token("u-1", &["EMPLOYEE"]);

    let (status, body) = test
        .send(get("/api/app-logs/my-activity", Some(&employee)))
        .await;
    assert_eq!(status, StatusCode::OK);
    let content = body["data"]["content"].as_array().unwrap();
    assert_eq!(content.len(), 2);
    assert!(content.iter().all(|record| record["userId"] == "u-1"));
    // newest first
    assert_eq!(content[0]["operation"], "CANCEL_LEAVE");
}

#[tokio::test]
async fn test_cleanup_is_audited_synchronously() {
    let test = TestApp::new();
    let admin = token("admin-1", &["ADMIN"]);

    let request = Request::delete("/api/app-logs/cleanup?daysToKeep=30")
        .header("authorization", format!("Bearer {admin}"))
        .header("x-correlation-id", "purge-trace-1")
        .body(Body::empty())
        .unwrap();
    let (status, body) = test.send(request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["daysToKeep"], 30);
    assert_eq!(body["data"]["deleted"], 0);

    // Written through the sync channel, so it is visible without a flush
    let records = test
        .server
        .logs
        .by_correlation_id("purge-trace-1")
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    let entry = &records[0].entry;
    assert_eq!(entry.operation, "CLEANUP_APP_LOGS");
    assert_eq!(entry.entity_type.as_deref(), Some("AppLog"));
    assert_eq!(entry.status, LogStatus::Success);
    assert_eq!(entry.user_id, "admin-1");
    assert_eq!(entry.department.as_deref(), Some("HR"));
    assert_eq!(entry.http_method.as_deref(), Some("DELETE"));
    assert_eq!(entry.request_uri.as_deref(), Some("/api/app-logs/cleanup"));
    assert!(entry
        .response_body
        .as_deref()
        .is_some_and(|body| body.contains("\"daysToKeep\":30")));
}

#[tokio::test]
async fn test_cleanup_requires_admin() {
    let test = TestApp::new();
    let employee = token("u-1", &["EMPLOYEE"]);

    let request = Request::delete("/api/app-logs/cleanup")
        .header("authorization", format!("Bearer {employee}"))
        .body(Body::empty())
        .unwrap();
    let (status, _) = test.send(request).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let page = test
        .server
        .logs
        .search(&LogFilter::default(), Sort::default(), PageRequest::default())
        .await
        .unwrap();
    assert_eq!(page.total_elements, 0);
}

#[tokio::test]
async fn test_correlation_id_is_echoed() {
    let test = TestApp::new();

    let response = test
        .app
        .clone()
        .oneshot(
            Request::get("/health")
                .header("x-correlation-id", "trace-abc")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(
        response.headers().get("x-correlation-id").unwrap(),
        "trace-abc"
    );

    let minted = test.app.clone().oneshot(get("/health", None)).await.unwrap();
    assert!(minted.headers().contains_key("x-correlation-id"));
}
