use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use blog_api::{
    AppConfig, AppState, MockEmailService, UnitOfWork, create_router, models::User,
};
use chrono::Utc;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceExt;
use uuid::Uuid;

// --- Test Harness ---

struct TestApp {
    router: Router,
    admin_id: Uuid,
    reader_id: Uuid,
}

fn user(role: &str, user_name: &str) -> User {
    User {
        id: Uuid::new_v4(),
        first_name: "Test".into(),
        last_name: "User".into(),
        user_name: user_name.into(),
        email: format!("{user_name}@example.com"),
        password_hash: String::new(),
        two_factor_enabled: true,
        role: role.into(),
        created_on: Utc::now(),
    }
}

/// Router over the in-memory store with one admin and one reader seeded.
/// `AppConfig::default()` is `Env::Local`, so the `x-user-id` header authenticates.
async fn test_app() -> TestApp {
    let uow = UnitOfWork::in_memory();
    let admin = user("admin", "admin");
    let reader = user("reader", "reader");
    uow.users.insert(&admin).await.unwrap();
    uow.users.insert(&reader).await.unwrap();

    let state = AppState::new(
        AppConfig::default(),
        uow,
        Arc::new(MockEmailService::new()),
    )
    .unwrap();

    TestApp {
        router: create_router(state),
        admin_id: admin.id,
        reader_id: reader.id,
    }
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Option<Value>) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).ok())
}

fn json_request(method: &str, uri: &str, as_user: Option<Uuid>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(id) = as_user {
        builder = builder.header("x-user-id", id.to_string());
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

// --- Tests ---

#[tokio::test]
async fn test_health_check() {
    let app = test_app().await;
    let response = app.router.clone().oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-correlation-id"));
}

#[tokio::test]
async fn test_health_check_over_tcp() {
    let app = test_app().await;

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let address = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, app.router).await.unwrap();
    });

    let response = reqwest::Client::new()
        .get(format!("{address}/health"))
        .header("x-correlation-id", "trace-me")
        .send()
        .await
        .expect("req fail");

    assert!(response.status().is_success());
    assert_eq!(
        response.headers().get("x-correlation-id").unwrap(),
        "trace-me"
    );
}

#[tokio::test]
async fn test_missing_entity_returns_404_envelope() {
    let app = test_app().await;
    let (status, body) = send(&app.router, get("/api/v1/categories/4040")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    let body = body.unwrap();
    assert_eq!(body["succeeded"], false);
    assert_eq!(body["result"], Value::Null);
    assert_eq!(body["errors"][0], "Category not found");
}

#[tokio::test]
async fn test_write_without_token_is_401() {
    let app = test_app().await;
    let request = json_request(
        "POST",
        "/api/v1/categories",
        None,
        json!({ "name": "Rust", "urlSlug": "rust" }),
    );

    let (status, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body.unwrap()["succeeded"], false);
}

#[tokio::test]
async fn test_write_as_non_admin_is_403() {
    let app = test_app().await;
    let request = json_request(
        "POST",
        "/api/v1/tags",
        Some(app.reader_id),
        json!({ "name": "Rust", "urlSlug": "rust" }),
    );

    let (status, _) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_category_lifecycle() {
    let app = test_app().await;

    let create = json_request(
        "POST",
        "/api/v1/categories",
        Some(app.admin_id),
        json!({ "name": "Rust", "urlSlug": "rust", "description": "Systems" }),
    );
    let (status, body) = send(&app.router, create).await;
    assert_eq!(status, StatusCode::CREATED);
    let body = body.unwrap();
    assert_eq!(body["succeeded"], true);
    assert_eq!(body["result"]["urlSlug"], "rust");
    let id = body["result"]["id"].as_i64().unwrap();

    // Public read of the same resource, slug comes back decrypted.
    let (status, body) = send(&app.router, get(&format!("/api/v1/categories/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["result"]["urlSlug"], "rust");

    let duplicate = json_request(
        "POST",
        "/api/v1/categories",
        Some(app.admin_id),
        json!({ "name": "Rust again", "urlSlug": "rust" }),
    );
    let (status, body) = send(&app.router, duplicate).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body.unwrap()["errors"][0], "UrlSlug already exists.");

    let (status, body) = send(&app.router, get("/api/v1/categories?pageIndex=1&pageSize=10")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["result"]["totalCount"], 1);

    let delete = Request::builder()
        .method("DELETE")
        .uri(format!("/api/v1/categories/{id}"))
        .header("x-user-id", app.admin_id.to_string())
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app.router, delete).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app.router, get(&format!("/api/v1/categories/{id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_payload_is_400_with_messages() {
    let app = test_app().await;
    let request = json_request(
        "POST",
        "/api/v1/post-tags",
        Some(app.admin_id),
        json!({ "postId": 1, "tagIds": [] }),
    );

    let (status, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let errors = body.unwrap()["errors"].as_array().unwrap().clone();
    assert!(!errors.is_empty());
}

#[tokio::test]
async fn test_sign_in_with_unknown_user_is_401() {
    let app = test_app().await;
    let request = json_request(
        "POST",
        "/api/v1/auth/sign-in",
        None,
        json!({ "userName": "nobody", "password": "irrelevant" }),
    );

    let (status, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body.unwrap()["errors"][0], "Incorrect username or password.");
}

#[tokio::test]
async fn test_revoke_with_bad_access_token_is_401() {
    let app = test_app().await;
    let request = json_request(
        "POST",
        "/api/v1/token/revoke",
        None,
        json!({ "accessToken": "garbage", "refreshToken": "garbage" }),
    );

    let (status, _) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = test_app().await;
    let (status, body) = send(&app.router, get("/api-docs/openapi.json")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.unwrap()["paths"]["/api/v1/posts"].is_object());
}

#[tokio::test]
async fn test_openapi_list_responses_describe_a_page() {
    let app = test_app().await;
    let (_, body) = send(&app.router, get("/api-docs/openapi.json")).await;
    let body = body.unwrap();

    for path in ["/api/v1/categories", "/api/v1/tags", "/api/v1/posts"] {
        let schema = &body["paths"][path]["get"]["responses"]["200"]["content"]["application/json"]["schema"];
        assert_ne!(schema["type"], "array", "{path} documents a bare array");
        let properties = &schema["properties"];
        assert_eq!(properties["items"]["type"], "array", "{path}");
        assert!(properties["totalCount"].is_object(), "{path}");
        assert!(properties["totalPages"].is_object(), "{path}");
    }
}
