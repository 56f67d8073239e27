//! # Integration Tests for folio-api
//!
//! Drives the full router in memory: health probes, registration and
//! sessions, content lifecycle (draft, publish, view counting, slug
//! conflicts), taxonomy references, products filters, the contact inbox,
//! uploads, rate limiting and the OpenAPI document.

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use folio_api::auth::Role;
use folio_api::middleware::rate_limit::RateLimitConfig;
use folio_api::state::{AppConfig, AppState, UserRecord};
use folio_core::Email;

const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13];

/// Helper: seed a user and a live session directly, skipping argon2.
fn seed_session(state: &AppState, role: Role) -> String {
    let now = Utc::now();
    let user = UserRecord {
        id: Uuid::new_v4(),
        name: format!("{} user", role.as_str()),
        email: Email::parse(&format!("{}@example.com", Uuid::new_v4())).unwrap(),
        password_hash: String::new(),
        role,
        created_at: now,
        updated_at: now,
    };
    state.users.insert_unique(user.clone()).unwrap();
    let (token, record) = folio_api::session::issue(user.id, 1, now);
    state.sessions.insert_unique(record).unwrap();
    token.to_string()
}

/// Helper: app with one admin and one editor session.
fn test_app() -> (Router, AppState, String, String) {
    let state = AppState::new();
    let admin = seed_session(&state, Role::Admin);
    let editor = seed_session(&state, Role::Editor);
    (folio_api::app(state.clone()), state, admin, editor)
}

/// Helper: send a request, returning status and parsed JSON (or `Null`).
async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

fn multipart_body(field: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(b"--XBOUNDARY\r\n");
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{field}\"; filename=\"image\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(b"\r\n--XBOUNDARY--\r\n");
    body
}

async fn upload(app: &Router, token: &str, body: Vec<u8>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/api/admin/uploads")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(
            header::CONTENT_TYPE,
            "multipart/form-data; boundary=XBOUNDARY",
        )
        .body(Body::from(body))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

// -- Health Probes ------------------------------------------------------------

#[tokio::test]
async fn test_health_probes() {
    let (app, ..) = test_app();
    let response = app
        .clone()
        .oneshot(Request::builder().uri("/health/liveness").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(Request::builder().uri("/health/readiness").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"ready");
}

// -- Auth ---------------------------------------------------------------------

#[tokio::test]
async fn test_register_login_me_logout() {
    let app = folio_api::app(AppState::new());

    let (status, user) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "name": "Owner", "email": "Owner@Example.com", "password": "correct horse" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(user["role"], "admin");
    assert_eq!(user["email"], "owner@example.com");
    assert!(user.get("password_hash").is_none());

    // Registration is closed once a user exists.
    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "name": "Eve", "email": "eve@example.com", "password": "correct horse" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "owner@example.com", "password": "wrong horse" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, login) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "OWNER@example.com", "password": "correct horse" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = login["token"].as_str().unwrap().to_string();
    assert_eq!(token.len(), 64);

    let (status, me) = send(&app, "GET", "/api/auth/me", Some(token.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["name"], "Owner");

    let (status, _) = send(&app, "POST", "/api/auth/logout", Some(token.as_str()), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "GET", "/api/auth/me", Some(token.as_str()), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_routes_require_session() {
    let (app, _, _, editor) = test_app();
    let (status, body) = send(&app, "GET", "/api/admin/posts", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let (status, _) = send(&app, "GET", "/api/admin/posts", Some("not-a-token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Editors cannot list users.
    let (status, _) = send(&app, "GET", "/api/admin/users", Some(editor.as_str()), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_login_rate_limited() {
    let state = AppState::new();
    let app = folio_api::app_with_limits(
        state,
        RateLimitConfig {
            max_requests: 2,
            window: Duration::from_secs(60),
        },
    );
    let creds = json!({ "email": "nobody@example.com", "password": "whatever1" });
    for _ in 0..2 {
        let (status, _) = send(&app, "POST", "/api/auth/login", None, Some(creds.clone())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
    let (status, body) = send(&app, "POST", "/api/auth/login", None, Some(creds)).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"]["code"], "RATE_LIMITED");
}

// -- Posts --------------------------------------------------------------------

#[tokio::test]
async fn test_post_lifecycle() {
    let (app, _, admin, editor) = test_app();

    let (status, post) = send(
        &app,
        "POST",
        "/api/admin/posts",
        Some(editor.as_str()),
        Some(json!({ "title": "Hello, World!", "content": "<p>First post body</p>", "tags": ["Rust"] })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(post["slug"], "hello-world");
    assert_eq!(post["status"], "draft");
    assert_eq!(post["excerpt"], "First post body");
    let id = post["id"].as_str().unwrap().to_string();

    // Drafts are hidden from the public site.
    let (_, page) = send(&app, "GET", "/api/posts", None, None).await;
    assert_eq!(page["total"], 0);
    let (status, _) = send(&app, "GET", "/api/posts/hello-world", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, post) = send(
        &app,
        "PUT",
        &format!("/api/admin/posts/{id}"),
        Some(editor.as_str()),
        Some(json!({ "title": "Hello, World!", "content": "<p>Edited</p>", "status": "published", "tags": ["Rust"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(post["published_at"].is_string());

    let (_, page) = send(&app, "GET", "/api/posts?tag=rust", None, None).await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["total_pages"], 1);

    let (_, first) = send(&app, "GET", "/api/posts/hello-world", None, None).await;
    let (_, second) = send(&app, "GET", "/api/posts/hello-world", None, None).await;
    assert_eq!(first["views"], 1);
    assert_eq!(second["views"], 2);

    // Same title again collides on the derived slug.
    let (status, body) = send(
        &app,
        "POST",
        "/api/admin/posts",
        Some(editor.as_str()),
        Some(json!({ "title": "Hello World", "content": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");

    let (status, _) = send(&app, "DELETE", &format!("/api/admin/posts/{id}"), Some(editor.as_str()), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, "DELETE", &format!("/api/admin/posts/{id}"), Some(admin.as_str()), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "GET", &format!("/api/admin/posts/{id}"), Some(admin.as_str()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_into_taken_slug_conflicts() {
    let (app, state, _, editor) = test_app();

    for title in ["First", "Second"] {
        let (status, _) = send(
            &app,
            "POST",
            "/api/admin/posts",
            Some(editor.as_str()),
            Some(json!({ "title": title, "content": "<p>Body</p>" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }
    let second = state.posts.find_by_key("second").unwrap();

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/admin/posts/{}", second.id),
        Some(editor.as_str()),
        Some(json!({ "title": "Second", "slug": "first", "content": "<p>Body</p>" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");

    // The failed update left the document untouched.
    let (_, unchanged) = send(
        &app,
        "GET",
        &format!("/api/admin/posts/{}", second.id),
        Some(editor.as_str()),
        None,
    )
    .await;
    assert_eq!(unchanged["slug"], "second");
}

#[tokio::test]
async fn test_bad_requests() {
    let (app, _, admin, _) = test_app();

    let request = Request::builder()
        .method("POST")
        .uri("/api/admin/posts")
        .header(header::AUTHORIZATION, format!("Bearer {admin}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, "POST", "/api/admin/posts", Some(admin.as_str()), Some(json!({ "title": "  " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, _) = send(&app, "GET", "/api/posts?limit=1000", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(&app, "GET", "/api/posts?page=abc", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// -- Taxonomy -----------------------------------------------------------------

#[tokio::test]
async fn test_category_references() {
    let (app, _, admin, editor) = test_app();

    let (status, _) = send(
        &app,
        "POST",
        "/api/admin/projects",
        Some(editor.as_str()),
        Some(json!({ "title": "Site", "category": "web" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, category) = send(
        &app,
        "POST",
        "/api/admin/categories",
        Some(editor.as_str()),
        Some(json!({ "name": "Web", "kind": "project" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let category_id = category["id"].as_str().unwrap().to_string();

    // Same slug under another kind is a different category.
    let (status, _) = send(
        &app,
        "POST",
        "/api/admin/categories",
        Some(editor.as_str()),
        Some(json!({ "name": "Web", "kind": "blog" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(
        &app,
        "POST",
        "/api/admin/projects",
        Some(editor.as_str()),
        Some(json!({ "title": "Site", "category": "web", "status": "published" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, categories) = send(&app, "GET", "/api/categories?kind=project", None, None).await;
    assert_eq!(categories.as_array().unwrap().len(), 1);

    let uri = format!("/api/admin/categories/{category_id}");
    let (status, _) = send(&app, "DELETE", &uri, Some(admin.as_str()), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = send(
        &app,
        "PUT",
        &uri,
        Some(editor.as_str()),
        Some(json!({ "name": "Web", "slug": "websites", "kind": "project" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, renamed) = send(
        &app,
        "PUT",
        &uri,
        Some(editor.as_str()),
        Some(json!({ "name": "Web Work", "slug": "web", "kind": "project" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(renamed["name"], "Web Work");
}

#[tokio::test]
async fn test_tags_created_and_counted() {
    let (app, state, admin, editor) = test_app();
    send(
        &app,
        "POST",
        "/api/admin/posts",
        Some(editor.as_str()),
        Some(json!({ "title": "One", "tags": ["Web Dev"], "status": "published" })),
    )
    .await;
    send(
        &app,
        "POST",
        "/api/admin/posts",
        Some(editor.as_str()),
        Some(json!({ "title": "Two", "tags": ["web dev"] })),
    )
    .await;
    assert_eq!(state.tags.len(), 1);

    let (_, tags) = send(&app, "GET", "/api/tags", None, None).await;
    assert_eq!(tags[0]["slug"], "web-dev");
    assert_eq!(tags[0]["name"], "Web Dev");
    assert_eq!(tags[0]["count"], 1);

    let tag_id = tags[0]["id"].as_str().unwrap();
    let (status, _) = send(&app, "DELETE", &format!("/api/admin/tags/{tag_id}"), Some(admin.as_str()), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

// -- Products -----------------------------------------------------------------

#[tokio::test]
async fn test_products_filter_by_kind() {
    let (app, _, _, editor) = test_app();
    for (title, kind) in [("Rust Book", "ebook"), ("Axum Course", "course")] {
        let (status, _) = send(
            &app,
            "POST",
            "/api/admin/products",
            Some(editor.as_str()),
            Some(json!({ "title": title, "kind": kind, "price_cents": 1500, "status": "published" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, page) = send(&app, "GET", "/api/products?kind=ebook", None, None).await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["slug"], "rust-book");
    assert_eq!(page["items"][0]["currency"], "USD");

    let (status, _) = send(
        &app,
        "POST",
        "/api/admin/products",
        Some(editor.as_str()),
        Some(json!({ "title": "Free", "price_cents": -5 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// -- Messages -----------------------------------------------------------------

#[tokio::test]
async fn test_contact_inbox() {
    let (app, _, admin, editor) = test_app();
    let (status, message) = send(
        &app,
        "POST",
        "/api/messages",
        None,
        Some(json!({ "name": "Grace", "email": "grace@example.com", "subject": "Hi", "body": "Loved the post." })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(message["read"], false);
    let id = message["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        "POST",
        "/api/messages",
        None,
        Some(json!({ "name": "Bot", "email": "nope", "body": "spam" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, page) = send(&app, "GET", "/api/admin/messages?unread=true", Some(editor.as_str()), None).await;
    assert_eq!(page["total"], 1);

    let (status, updated) = send(
        &app,
        "PATCH",
        &format!("/api/admin/messages/{id}"),
        Some(editor.as_str()),
        Some(json!({ "read": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["read"], true);

    let (_, stats) = send(&app, "GET", "/api/admin/stats", Some(editor.as_str()), None).await;
    assert_eq!(stats["messages"]["total"], 1);
    assert_eq!(stats["messages"]["unread"], 0);
    assert!(stats["requests"]["requests"].as_u64().unwrap() >= 3);

    let (status, _) = send(&app, "DELETE", &format!("/api/admin/messages/{id}"), Some(admin.as_str()), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

// -- Uploads ------------------------------------------------------------------

#[tokio::test]
async fn test_upload_image() {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig {
        upload_dir: dir.path().to_path_buf(),
        max_upload_bytes: 1024,
        ..AppConfig::default()
    };
    let state = AppState::with_config(config, None);
    let token = seed_session(&state, Role::Editor);
    let app = folio_api::app(state);

    let (status, body) = upload(&app, &token, multipart_body("file", "image/png", PNG)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["content_type"], "image/png");
    assert_eq!(body["size"], PNG.len());
    let filename = body["filename"].as_str().unwrap();
    assert!(filename.ends_with(".png"));
    assert_eq!(body["url"], format!("/uploads/{filename}"));
    assert!(dir.path().join(filename).exists());

    // Served back from /uploads.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/uploads/{filename}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let (status, _) = upload(&app, &token, multipart_body("file", "image/svg+xml", b"<svg/>")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = upload(&app, &token, multipart_body("file", "image/png", b"")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = upload(&app, &token, multipart_body("image", "image/png", PNG)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut big = PNG.to_vec();
    big.resize(2048, 0);
    let (status, _) = upload(&app, &token, multipart_body("file", "image/png", &big)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_beyond_body_limit_is_413() {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig {
        upload_dir: dir.path().to_path_buf(),
        max_upload_bytes: 1024,
        ..AppConfig::default()
    };
    let state = AppState::with_config(config, None);
    let token = seed_session(&state, Role::Editor);
    let app = folio_api::app(state);

    // Past the upload limit plus the multipart framing allowance.
    let mut huge = PNG.to_vec();
    huge.resize(1024 + 64 * 1024 + 4096, 0);
    let (status, body) = upload(&app, &token, multipart_body("file", "image/png", &huge)).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["error"]["code"], "PAYLOAD_TOO_LARGE");
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

// -- OpenAPI ------------------------------------------------------------------

#[tokio::test]
async fn test_openapi_spec() {
    let (app, ..) = test_app();
    let (status, spec) = send(&app, "GET", "/openapi.json", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(spec["info"]["title"], "Folio API");
    assert!(spec["paths"]["/api/admin/posts/{id}"].is_object());
}
