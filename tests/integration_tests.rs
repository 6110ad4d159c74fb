use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use llm_quota_gateway::{config::Config, create_app, database::Database, handlers::AppState};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::{
    matchers::{header as header_matcher, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

const PASSWORD: &str = "Sup3rSecret";

struct TestApp {
    app: Router,
}

impl TestApp {
    async fn new(daily_quota: i64, azure: Option<&MockServer>, gemini: Option<&MockServer>) -> Self {
        let mut config = Config::default();
        config.bcrypt_cost = 4;
        config.quota.default_daily_quota = daily_quota;
        config.quota.chat_token_estimate = 1_000;

        if let Some(server) = azure {
            config.azure.endpoint = server.uri();
            config.azure.api_key = "azure-key".to_string();
        }
        if let Some(server) = gemini {
            config.gemini.base_url = server.uri();
            config.gemini.api_key = "gemini-key".to_string();
        }

        let database = Database::new("sqlite::memory:", 1).await.unwrap();
        database.migrate().await.unwrap();
        let state = AppState::new(database, config).unwrap();

        Self {
            app: create_app(state),
        }
    }

    async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let (status, bytes) = self.send_raw(method, uri, token, body).await;
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn send_raw(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Vec<u8>) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes.to_vec())
    }

    async fn register(&self, username: &str) -> StatusCode {
        let (status, _) = self
            .send(
                "POST",
                "/auth/register",
                None,
                Some(json!({
                    "username": username,
                    "email": format!("{}@example.com", username),
                    "password": PASSWORD
                })),
            )
            .await;
        status
    }

    async fn login(&self, username: &str) -> Value {
        let (status, body) = self
            .send(
                "POST",
                "/auth/login",
                None,
                Some(json!({ "username": username, "password": PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        body
    }

    async fn access_token(&self, username: &str) -> String {
        assert_eq!(self.register(username).await, StatusCode::CREATED);
        self.login(username).await["access_token"]
            .as_str()
            .unwrap()
            .to_string()
    }
}

fn chat_body() -> Value {
    json!({ "messages": [{ "role": "user", "content": "Hello" }] })
}

async fn mount_azure(server: &MockServer, total_tokens: u32, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/openai/deployments/gpt-4o/chat/completions"))
        .and(query_param("api-version", "2024-06-01"))
        .and(header_matcher("api-key", "azure-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1_700_000_000,
            "model": "gpt-4o",
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": "Hi there" },
                "finish_reason": "stop"
            }],
            "usage": {
                "prompt_tokens": 10,
                "completion_tokens": total_tokens - 10,
                "total_tokens": total_tokens
            }
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new(100_000, None, None).await;

    let (status, body) = app.send("GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_readiness_checks_database() {
    let app = TestApp::new(100_000, None, None).await;

    let (status, body) = app.send("GET", "/ready", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
    assert_eq!(body["checks"]["database"], "healthy");
}

#[tokio::test]
async fn test_register_login_and_profile() {
    let app = TestApp::new(100_000, None, None).await;

    let (status, body) = app
        .send(
            "POST",
            "/auth/register",
            None,
            Some(json!({
                "username": "alice",
                "email": "alice@example.com",
                "password": PASSWORD
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "User created successfully");

    let tokens = app.login("alice").await;
    assert_eq!(tokens["token_type"], "Bearer");
    assert_eq!(tokens["expires_in"], 900);
    assert!(tokens["refresh_token"].is_string());

    let token = tokens["access_token"].as_str().unwrap();
    let (status, profile) = app.send("GET", "/auth/profile", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["username"], "alice");
    assert_eq!(profile["email"], "alice@example.com");
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let app = TestApp::new(100_000, None, None).await;

    assert_eq!(app.register("bob").await, StatusCode::CREATED);
    assert_eq!(app.register("bob").await, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_register_rejects_weak_password() {
    let app = TestApp::new(100_000, None, None).await;

    let (status, body) = app
        .send(
            "POST",
            "/auth/register",
            None,
            Some(json!({
                "username": "carol",
                "email": "carol@example.com",
                "password": "short"
            })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);
}

#[tokio::test]
async fn test_login_with_wrong_password() {
    let app = TestApp::new(100_000, None, None).await;
    assert_eq!(app.register("dave").await, StatusCode::CREATED);

    let (status, body) = app
        .send(
            "POST",
            "/auth/login",
            None,
            Some(json!({ "username": "dave", "password": "Wr0ngPassword" })),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid credentials");
}

#[tokio::test]
async fn test_refresh_rotates_tokens() {
    let app = TestApp::new(100_000, None, None).await;
    assert_eq!(app.register("erin").await, StatusCode::CREATED);
    let tokens = app.login("erin").await;

    let (status, refreshed) = app
        .send(
            "POST",
            "/auth/refresh",
            None,
            Some(json!({ "refresh_token": tokens["refresh_token"] })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let token = refreshed["access_token"].as_str().unwrap();
    let (status, _) = app.send("GET", "/auth/profile", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);

    // An access token is not accepted where a refresh token is expected.
    let (status, _) = app
        .send(
            "POST",
            "/auth/refresh",
            None,
            Some(json!({ "refresh_token": tokens["access_token"] })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let app = TestApp::new(100_000, None, None).await;

    for (method, uri, body) in [
        ("GET", "/auth/profile", None),
        ("GET", "/quota", None),
        ("POST", "/azure/chat/completions", Some(chat_body())),
        ("POST", "/agent/make-html", Some(json!({ "parts": [] }))),
    ] {
        let (status, _) = app.send(method, uri, None, body.clone()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{} {}", method, uri);

        let (status, _) = app.send(method, uri, Some("not-a-jwt"), body).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{} {}", method, uri);
    }
}

#[tokio::test]
async fn test_fresh_user_quota_status() {
    let app = TestApp::new(5_000, None, None).await;
    let token = app.access_token("frank").await;

    let (status, body) = app.send("GET", "/quota", Some(&token), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["daily_quota"], 5_000);
    assert_eq!(body["tokens_used"], 0);
    assert_eq!(body["remaining"], 5_000);
}

#[tokio::test]
async fn test_chat_completion_charges_reported_usage() {
    let azure = MockServer::start().await;
    mount_azure(&azure, 1_250, 1).await;
    let app = TestApp::new(10_000, Some(&azure), None).await;
    let token = app.access_token("grace").await;

    let (status, body) = app
        .send("POST", "/azure/chat/completions", Some(&token), Some(chat_body()))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["choices"][0]["message"]["content"], "Hi there");
    assert_eq!(body["usage"]["total_tokens"], 1_250);

    let (_, quota) = app.send("GET", "/quota", Some(&token), None).await;
    assert_eq!(quota["tokens_used"], 1_250);
    assert_eq!(quota["remaining"], 8_750);
}

#[tokio::test]
async fn test_exhausted_quota_is_rejected_before_provider_call() {
    let azure = MockServer::start().await;
    // Two calls fit in 2_500 tokens at 1_000 reserved each; the third must not reach Azure.
    mount_azure(&azure, 300, 2).await;
    let app = TestApp::new(2_500, Some(&azure), None).await;
    let token = app.access_token("heidi").await;

    for _ in 0..2 {
        let (status, _) = app
            .send("POST", "/azure/chat/completions", Some(&token), Some(chat_body()))
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = app
        .send("POST", "/azure/chat/completions", Some(&token), Some(chat_body()))
        .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "daily token quota exceeded");

    let (_, quota) = app.send("GET", "/quota", Some(&token), None).await;
    assert_eq!(quota["tokens_used"], 2_000);
}

#[tokio::test]
async fn test_quota_is_per_user() {
    let azure = MockServer::start().await;
    mount_azure(&azure, 500, 2).await;
    let app = TestApp::new(1_000, Some(&azure), None).await;
    let ivan = app.access_token("ivan").await;
    let judy = app.access_token("judy").await;

    let (status, _) = app
        .send("POST", "/azure/chat/completions", Some(&ivan), Some(chat_body()))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app
        .send("POST", "/azure/chat/completions", Some(&ivan), Some(chat_body()))
        .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    let (status, _) = app
        .send("POST", "/azure/chat/completions", Some(&judy), Some(chat_body()))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_upstream_error_status_passes_through() {
    let azure = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_string("content filtered"))
        .mount(&azure)
        .await;
    let app = TestApp::new(10_000, Some(&azure), None).await;
    let token = app.access_token("kim").await;

    let (status, body) = app
        .send("POST", "/azure/chat/completions", Some(&token), Some(chat_body()))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "content filtered");
}

#[tokio::test]
async fn test_unconfigured_azure_charges_nothing() {
    let app = TestApp::new(10_000, None, None).await;
    let token = app.access_token("leo").await;

    let (status, body) = app
        .send("POST", "/azure/chat/completions", Some(&token), Some(chat_body()))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Azure OpenAI configuration is incomplete");

    let (_, quota) = app.send("GET", "/quota", Some(&token), None).await;
    assert_eq!(quota["tokens_used"], 0);
}

#[tokio::test]
async fn test_make_html_requires_contents() {
    let app = TestApp::new(10_000, None, None).await;
    let token = app.access_token("mallory").await;

    let (status, body) = app
        .send("POST", "/agent/make-html", Some(&token), Some(json!({ "parts": [] })))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No contents provided");
}

#[tokio::test]
async fn test_make_html_appends_instruction_to_single_content() {
    let gemini = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.0-flash:generateContent"))
        .and(header_matcher("x-goog-api-key", "gemini-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "<h1>Hello</h1>" }] }
            }],
            "usageMetadata": { "totalTokenCount": 1_400 }
        })))
        .expect(1)
        .mount(&gemini)
        .await;
    let app = TestApp::new(10_000, None, Some(&gemini)).await;
    let token = app.access_token("niaj").await;

    let (status, body) = app
        .send(
            "POST",
            "/agent/make-html",
            Some(&token),
            Some(json!({
                "parts": [{ "role": "user", "parts": [{ "text": "A heading saying hello" }] }]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["html"], "<h1>Hello</h1>");

    let requests = gemini.received_requests().await.unwrap();
    let sent: Value = serde_json::from_slice(&requests[0].body).unwrap();
    let contents = sent["contents"].as_array().unwrap();
    assert_eq!(contents.len(), 2);
    assert!(contents[1]["parts"][0]["text"]
        .as_str()
        .unwrap()
        .contains("HTML"));

    let (_, quota) = app.send("GET", "/quota", Some(&token), None).await;
    assert_eq!(quota["tokens_used"], 1_400);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = TestApp::new(100_000, None, None).await;
    app.send("GET", "/health", None, None).await;

    let (status, body) = app.send_raw("GET", "/metrics", None, None).await;
    let text = String::from_utf8(body).unwrap();

    assert_eq!(status, StatusCode::OK);
    assert!(text.contains("gateway_http_requests_total{method=\"GET\",status=\"2xx\"} 1"));
}

#[tokio::test]
async fn test_openapi_document_lists_routes() {
    let app = TestApp::new(100_000, None, None).await;

    let (status, body) = app.send("GET", "/api-docs/openapi.json", None, None).await;

    assert_eq!(status, StatusCode::OK);
    for route in [
        "/auth/login",
        "/auth/register",
        "/azure/chat/completions",
        "/agent/make-html",
        "/quota",
    ] {
        assert!(body["paths"].get(route).is_some(), "missing {}", route);
    }
    assert!(body["components"]["securitySchemes"]["bearer_auth"].is_object());
}
