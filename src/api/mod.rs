// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    body::Body,
    http::{HeaderName, Request},
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{Http, HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    models::{
        CheckResponse, CreateUserRequest, FtsUserRequest, ItemsResponse, MessageResponse,
        TokenResponse, UpdateUserRequest, UserEnvelope, UserResponse,
    },
    providers::ReceiptLineItem,
    state::AppState,
};

pub mod fts;
pub mod health;
pub mod token;
pub mod users;

pub const API_PREFIX: &str = "/api/v1.0";

const REQUEST_ID_HEADER: &str = "x-request-id";

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route(
            "/fts/users",
            get(fts::check_fts_user).post(fts::create_fts_user),
        )
        .route("/fts/receipts", get(fts::get_receipt))
        .route("/token", get(token::get_token))
        .route("/users", post(users::create_user))
        .route("/users/me", get(users::get_me).put(users::update_me))
        .route("/users/{id}", get(users::get_user));

    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .nest(API_PREFIX, v1_routes)
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                let rid = req
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("n/a");
                tracing::info_span!(
                    "http_request",
                    method = %req.method(),
                    uri = %req.uri().path(),
                    request_id = %rid,
                )
            }),
        )
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        // Registered last so it runs first.
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

/// Registers the `basic` and `bearer` security schemes.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme("basic", SecurityScheme::Http(Http::new(HttpAuthScheme::Basic)));
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        fts::create_fts_user,
        fts::check_fts_user,
        fts::get_receipt,
        token::get_token,
        users::create_user,
        users::get_user,
        users::get_me,
        users::update_me,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            CheckResponse,
            CreateUserRequest,
            FtsUserRequest,
            ItemsResponse,
            MessageResponse,
            ReceiptLineItem,
            TokenResponse,
            UpdateUserRequest,
            UserEnvelope,
            UserResponse,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "FTS", description = "Requests to the Federal Tax Service"),
        (name = "Token", description = "Bearer token issuance"),
        (name = "Users", description = "User registration and profiles"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::to_bytes,
        http::{header, Method, StatusCode},
        response::Response,
    };
    use base64::{engine::general_purpose::STANDARD, Engine};
    use httpmock::prelude::*;
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    const PHONE: &str = "+79990001122";
    const FTS_KEY: u64 = 123456;

    struct TestApp {
        state: AppState,
        _dir: TempDir,
    }

    impl TestApp {
        fn new(fts: &MockServer) -> Self {
            let (state, dir) = AppState::for_tests(&fts.base_url());
            Self { state, _dir: dir }
        }

        async fn send(&self, request: Request<Body>) -> Response {
            router(self.state.clone()).oneshot(request).await.unwrap()
        }
    }

    fn basic(user: &str, pass: &str) -> String {
        format!("Basic {}", STANDARD.encode(format!("{user}:{pass}")))
    }

    fn request(method: Method, uri: &str, auth: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(auth) = auth {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn json_of(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn mock_fts_login(server: &MockServer, accepted: bool) -> httpmock::Mock<'_> {
        server.mock(|when, then| {
            when.method(GET).path("/v1/mobile/users/login");
            if accepted {
                then.status(200).json_body(json!({}));
            } else {
                then.status(403).body("the user was not found or the specified password was not correct");
            }
        })
    }

    fn registration(username: &str) -> Value {
        json!({"username": username, "password": "pw", "phone": PHONE, "fts_key": FTS_KEY})
    }

    async fn register(app: &TestApp, username: &str) -> Value {
        let response = app
            .send(request(Method::POST, "/api/v1.0/users", None, Some(registration(username))))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        json_of(response).await
    }

    #[test]
    fn openapi_declares_both_security_schemes() {
        let doc = serde_json::to_value(ApiDoc::openapi()).unwrap();
        let schemes = &doc["components"]["securitySchemes"];
        assert_eq!(schemes["basic"]["scheme"], "basic");
        assert_eq!(schemes["bearer"]["scheme"], "bearer");
        assert!(doc["paths"]["/api/v1.0/fts/receipts"].is_object());
    }

    #[tokio::test]
    async fn liveness_and_readiness_report_ok() {
        let server = MockServer::start();
        let app = TestApp::new(&server);

        let response = app.send(request(Method::GET, "/health/live", None, None)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = app.send(request(Method::GET, "/health/ready", None, None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_of(response).await["checks"]["database"], "ok");
    }

    #[tokio::test]
    async fn responses_carry_a_request_id() {
        let server = MockServer::start();
        let app = TestApp::new(&server);
        let response = app.send(request(Method::GET, "/health/live", None, None)).await;
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));
    }

    #[tokio::test]
    async fn protected_routes_reject_missing_credentials() {
        let server = MockServer::start();
        let app = TestApp::new(&server);

        for uri in ["/api/v1.0/users/me", "/api/v1.0/users/1", "/api/v1.0/token"] {
            let response = app.send(request(Method::GET, uri, None, None)).await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
            assert_eq!(
                response.headers()[header::WWW_AUTHENTICATE],
                "Basic realm=\"Authentication Required\""
            );
            assert_eq!(
                json_of(response).await,
                json!({"error": "Unauthorized access", "error_code": "unauthorized"})
            );
        }
    }

    #[tokio::test]
    async fn receipt_handler_never_runs_without_credentials() {
        let server = MockServer::start();
        let upstream = server.mock(|when, then| {
            when.method(GET).path("/v1/inns/*/kkts/*/fss/1/tickets/2");
            then.status(200);
        });
        let app = TestApp::new(&server);

        let response = app
            .send(request(Method::GET, "/api/v1.0/fts/receipts?fn=1&fd=2&fp=3", Some("Bearer forged"), None))
            .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(upstream.calls(), 0);
    }

    #[tokio::test]
    async fn receipt_gate_rejects_bad_tokens_and_passwords_alike() {
        let server = MockServer::start();
        mock_fts_login(&server, true);
        let upstream = server.mock(|when, then| {
            when.method(GET).path("/v1/inns/*/kkts/*/fss/1/tickets/2");
            then.status(200);
        });
        let app = TestApp::new(&server);
        let id = register(&app, "alice").await["user"]["id"].as_u64().unwrap();

        let valid = app.state.tokens.issue(id, std::time::Duration::from_secs(600)).unwrap();
        let (body, signature) = valid.rsplit_once('.').unwrap();
        let flipped = if signature.starts_with('A') { 'B' } else { 'A' };
        let tampered = format!("{body}.{flipped}{}", &signature[1..]);

        let now = chrono::Utc::now().timestamp();
        let expired = jsonwebtoken::encode(
            &jsonwebtoken::Header::new(jsonwebtoken::Algorithm::HS256),
            &crate::auth::TokenClaims { id, iat: now - 120, exp: now - 60 },
            &jsonwebtoken::EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        let attempts = [
            format!("Bearer {tampered}"),
            format!("Bearer {expired}"),
            basic("alice", "not-the-password"),
            basic("mallory", "pw"),
        ];
        for auth in &attempts {
            let response = app
                .send(request(Method::GET, "/api/v1.0/fts/receipts?fn=1&fd=2&fp=3", Some(auth), None))
                .await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{auth}");
            assert_eq!(
                json_of(response).await,
                json!({"error": "Unauthorized access", "error_code": "unauthorized"})
            );
        }
        assert_eq!(upstream.calls(), 0);
    }

    #[tokio::test]
    async fn registration_token_and_profile_flow() {
        let server = MockServer::start();
        mock_fts_login(&server, true);
        let app = TestApp::new(&server);

        let created = register(&app, "alice").await;
        assert_eq!(created["user"]["username"], "alice");
        assert_eq!(created["user"]["phone"], PHONE);
        assert!(created["user"].get("password_hash").is_none());
        let id = created["user"]["id"].as_u64().unwrap();

        let response = app
            .send(request(Method::GET, "/api/v1.0/token", Some(&basic("alice", "pw")), None))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let token = json_of(response).await["token"].as_str().unwrap().to_string();
        let bearer = format!("Bearer {token}");

        let response = app.send(request(Method::GET, "/api/v1.0/users/me", Some(&bearer), None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_of(response).await, created);

        let response = app
            .send(request(Method::GET, &format!("/api/v1.0/users/{id}"), Some(&bearer), None))
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        // A token cannot mint another token.
        let response = app.send(request(Method::GET, "/api/v1.0/token", Some(&bearer), None)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unknown_user_id_is_not_found() {
        let server = MockServer::start();
        mock_fts_login(&server, true);
        let app = TestApp::new(&server);
        register(&app, "alice").await;

        let auth = basic("alice", "pw");
        let response = app.send(request(Method::GET, "/api/v1.0/users/999", Some(&auth), None)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_of(response).await["error"], "User id 999 doesn't exist");

        let response = app.send(request(Method::GET, "/api/v1.0/users/abc", Some(&auth), None)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts_and_keeps_original() {
        let server = MockServer::start();
        mock_fts_login(&server, true);
        let app = TestApp::new(&server);
        register(&app, "alice").await;

        let mut second = registration("alice");
        second["password"] = json!("other");
        let response = app.send(request(Method::POST, "/api/v1.0/users", None, Some(second))).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(json_of(response).await["error"], "Username 'alice' already exist");

        let response = app
            .send(request(Method::GET, "/api/v1.0/users/me", Some(&basic("alice", "pw")), None))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let response = app
            .send(request(Method::GET, "/api/v1.0/users/me", Some(&basic("alice", "other")), None))
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn registration_requires_fts_access() {
        let server = MockServer::start();
        mock_fts_login(&server, false);
        let app = TestApp::new(&server);

        let response = app
            .send(request(Method::POST, "/api/v1.0/users", None, Some(registration("bob"))))
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            json_of(response).await["error"],
            "Can't authorize in Federal Tax Service with given phone/key"
        );
    }

    #[tokio::test]
    async fn registration_validates_fields() {
        let server = MockServer::start();
        let app = TestApp::new(&server);

        let response = app
            .send(request(Method::POST, "/api/v1.0/users", None, Some(json!({"username": "x"}))))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_of(response).await["error"], "No password provided");

        let response = app
            .send(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/v1.0/users")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn profile_update_renames_and_rejects_taken_names() {
        let server = MockServer::start();
        mock_fts_login(&server, true);
        let app = TestApp::new(&server);
        register(&app, "alice").await;
        register(&app, "bob").await;

        let response = app
            .send(request(
                Method::PUT,
                "/api/v1.0/users/me",
                Some(&basic("alice", "pw")),
                Some(json!({"username": "alicia", "password": "new-pw"})),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_of(response).await["user"]["username"], "alicia");

        let response = app
            .send(request(Method::GET, "/api/v1.0/users/me", Some(&basic("alicia", "new-pw")), None))
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .send(request(
                Method::PUT,
                "/api/v1.0/users/me",
                Some(&basic("bob", "pw")),
                Some(json!({"username": "alicia"})),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn receipt_lookup_uses_caller_fts_login() {
        let server = MockServer::start();
        mock_fts_login(&server, true);
        let key = FTS_KEY.to_string();
        let receipt = server.mock(|when, then| {
            when.method(GET)
                .path("/v1/inns/*/kkts/*/fss/11/tickets/22")
                .query_param("fiscalSign", "33")
                .header("authorization", basic(PHONE, &key));
            then.status(200).json_body(json!({"document": {"receipt": {"items": [
                {"name": "Milk", "quantity": 2, "price": 50, "sum": 100},
                {"name": "Cheese", "quantity": 0.25, "price": 800, "sum": 200}
            ]}}}));
        });
        let app = TestApp::new(&server);
        register(&app, "alice").await;

        let response = app
            .send(request(
                Method::GET,
                "/api/v1.0/fts/receipts?fn=11&fd=22&fp=33",
                Some(&basic("alice", "pw")),
                None,
            ))
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        receipt.assert();
        assert_eq!(
            json_of(response).await,
            json!({"items": [
                {"name": "Milk", "quantity": 2, "price": 50.0},
                {"name": "Cheese", "quantity": 1, "price": 200.0}
            ]})
        );
    }

    #[tokio::test]
    async fn receipt_lookup_maps_upstream_failures() {
        let server = MockServer::start();
        mock_fts_login(&server, true);
        server.mock(|when, then| {
            when.method(GET).path("/v1/inns/*/kkts/*/fss/1/tickets/2");
            then.status(406).body("the ticket was not found");
        });
        let stuck = server.mock(|when, then| {
            when.method(GET).path("/v1/inns/*/kkts/*/fss/5/tickets/6");
            then.status(202);
        });
        let app = TestApp::new(&server);
        register(&app, "alice").await;
        let auth = basic("alice", "pw");

        let response = app
            .send(request(Method::GET, "/api/v1.0/fts/receipts?fn=1&fd=2&fp=3", Some(&auth), None))
            .await;
        assert_eq!(response.status(), StatusCode::NOT_ACCEPTABLE);
        assert_eq!(json_of(response).await["error"], "the ticket was not found");

        let response = app
            .send(request(Method::GET, "/api/v1.0/fts/receipts?fn=5&fd=6&fp=7", Some(&auth), None))
            .await;
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(json_of(response).await["error"], "Empty JSON response");
        assert_eq!(stuck.calls(), 11);

        let response = app
            .send(request(Method::GET, "/api/v1.0/fts/receipts?fn=5&fd=6", Some(&auth), None))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_of(response).await["error"], "No fp provided");
    }

    #[tokio::test]
    async fn fts_signup_restores_key_for_existing_phone() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v1/mobile/users/signup");
            then.status(409).body("user exists");
        });
        let restore = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/mobile/users/restore")
                .json_body(json!({"phone": PHONE}));
            then.status(204);
        });
        let app = TestApp::new(&server);

        let body = json!({"name": "Alice", "email": "alice@example.com", "phone": PHONE});
        let response = app.send(request(Method::POST, "/api/v1.0/fts/users", None, Some(body))).await;

        assert_eq!(response.status(), StatusCode::OK);
        restore.assert();
        assert_eq!(
            json_of(response).await["message"],
            format!("SMS with password was sent to {PHONE}")
        );
    }

    #[tokio::test]
    async fn fts_signup_passes_other_failures_through() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v1/mobile/users/signup");
            then.status(400).body("String does not match pattern ^\\+\\d+$: ghg");
        });
        let app = TestApp::new(&server);

        let body = json!({"name": "Alice", "email": "alice@example.com", "phone": "ghg"});
        let response = app.send(request(Method::POST, "/api/v1.0/fts/users", None, Some(body))).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_of(response).await["error"],
            "String does not match pattern ^\\+\\d+$: ghg"
        );
    }

    #[tokio::test]
    async fn fts_check_reports_verdict_and_requires_basic() {
        let server = MockServer::start();
        mock_fts_login(&server, false);
        let app = TestApp::new(&server);

        let response = app
            .send(request(Method::GET, "/api/v1.0/fts/users", Some(&basic(PHONE, "000000")), None))
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_of(response).await, json!({"check": false}));

        let response = app.send(request(Method::GET, "/api/v1.0/fts/users", None, None)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_of(response).await["error"],
            "The resource requires the Basic authentication"
        );
    }
}
