//! End-to-end tests against the full router

use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tempfile::TempDir;

use commonroom::api::build_router;
use commonroom::app::build_state;
use commonroom::config::Config;
use commonroom::db::{create_test_pool, migrations};

struct TestApp {
    server: TestServer,
    _uploads: TempDir,
}

async fn spawn_app() -> TestApp {
    spawn_app_with(|_| {}).await
}

async fn spawn_app_with(configure: impl FnOnce(&mut Config)) -> TestApp {
    let pool = create_test_pool().await.unwrap();
    migrations::run_migrations(&pool).await.unwrap();

    let uploads = TempDir::new().unwrap();
    let mut config = Config::default();
    config.upload.path = uploads.path().to_path_buf();
    configure(&mut config);

    let state = build_state(&config, pool).unwrap();
    let router = build_router(state, &config.server.cors_origin);

    TestApp {
        server: TestServer::new(router).unwrap(),
        _uploads: uploads,
    }
}

impl TestApp {
    /// Register an account and return its bearer token
    async fn register(&self, name: &str, email: &str) -> (String, Value) {
        let response = self
            .server
            .post("/api/register")
            .json(&json!({ "name": name, "email": email, "password": "correct horse" }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        (body["token"].as_str().unwrap().to_string(), body["user"].clone())
    }

    async fn create_room(&self, admin_token: &str) -> i64 {
        let response = self
            .server
            .post("/api/admin/rooms")
            .authorization_bearer(admin_token)
            .json(&json!({
                "name": "Main Hall",
                "description": "Stage and kitchen",
                "capacity": 80,
                "features": ["stage", "kitchen"],
                "hourly_rate": 40.0
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        response.json::<Value>()["id"].as_i64().unwrap()
    }
}

fn booking_body(room_id: i64, start_hours: i64, end_hours: i64) -> Value {
    let base = Utc::now() + Duration::days(7);
    json!({
        "room_id": room_id,
        "name": "Morgan",
        "email": "morgan@example.org",
        "start_time": base + Duration::hours(start_hours),
        "end_time": base + Duration::hours(end_hours),
        "attendees": 20
    })
}

#[tokio::test]
async fn health_reports_database() {
    let app = spawn_app().await;
    let response = app.server.get("/health").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "ok");
}

#[tokio::test]
async fn first_account_is_admin() {
    let app = spawn_app().await;
    let (_, first) = app.register("Ada", "ada@example.org").await;
    let (_, second) = app.register("Ben", "ben@example.org").await;

    assert_eq!(first["role"], "admin");
    assert_eq!(second["role"], "member");
    assert!(first.get("password_hash").is_none());
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let app = spawn_app().await;
    app.register("Ada", "ada@example.org").await;

    let response = app
        .server
        .post("/api/register")
        .json(&json!({ "name": "Ada", "email": "ADA@example.org", "password": "correct horse" }))
        .await;
    response.assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn login_and_logout() {
    let app = spawn_app().await;
    app.register("Ada", "ada@example.org").await;

    let wrong = app
        .server
        .post("/api/login")
        .json(&json!({ "email": "ada@example.org", "password": "nope nope" }))
        .await;
    wrong.assert_status(StatusCode::UNAUTHORIZED);

    let response = app
        .server
        .post("/api/login")
        .json(&json!({ "email": "ada@example.org", "password": "correct horse" }))
        .await;
    response.assert_status_ok();
    let cookie = response.header("set-cookie");
    assert!(cookie.to_str().unwrap().starts_with("session="));
    let token = response.json::<Value>()["token"].as_str().unwrap().to_string();

    app.server
        .get("/api/auth/me")
        .authorization_bearer(&token)
        .await
        .assert_status_ok();

    app.server
        .post("/api/logout")
        .authorization_bearer(&token)
        .await
        .assert_status(StatusCode::NO_CONTENT);

    app.server
        .get("/api/auth/me")
        .authorization_bearer(&token)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn auth_routes_answer_under_both_prefixes() {
    let app = spawn_app().await;

    let registered = app
        .server
        .post("/api/auth/register")
        .json(&json!({ "name": "Ada", "email": "ada@example.org", "password": "correct horse" }))
        .await;
    registered.assert_status(StatusCode::CREATED);

    let login = app
        .server
        .post("/api/auth/login")
        .json(&json!({ "email": "ada@example.org", "password": "correct horse" }))
        .await;
    login.assert_status_ok();
    let token = login.json::<Value>()["token"].as_str().unwrap().to_string();

    app.server
        .post("/api/auth/logout")
        .authorization_bearer(&token)
        .await
        .assert_status(StatusCode::NO_CONTENT);

    app.server
        .post("/api/logout")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn repeated_failures_are_rate_limited() {
    let app = spawn_app().await;
    app.register("Ada", "ada@example.org").await;

    let mut last = StatusCode::OK;
    for _ in 0..6 {
        let response = app
            .server
            .post("/api/login")
            .json(&json!({ "email": "ada@example.org", "password": "wrong password" }))
            .await;
        last = response.status_code();
    }
    assert_eq!(last, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn contact_accepts_json_and_rejects_blank_fields() {
    let app = spawn_app().await;

    let response = app
        .server
        .post("/api/contact")
        .json(&json!({
            "name": "Jordan",
            "email": "jordan@example.org",
            "subject": "Volunteering",
            "message": "How can I help?"
        }))
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["subject"], "Volunteering");

    let bad = app
        .server
        .post("/api/contact")
        .json(&json!({
            "name": "Jordan",
            "email": "not-an-email",
            "subject": "Hi",
            "message": "Hello"
        }))
        .await;
    bad.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(bad.json::<Value>()["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn contact_multipart_stores_attachments_and_subscribes() {
    let app = spawn_app().await;

    let form = MultipartForm::new()
        .add_text("name", "Jordan")
        .add_text("email", "jordan@example.org")
        .add_text("subject", "Floor plan")
        .add_text("message", "Attached is our plan")
        .add_text("newsletter", "on")
        .add_part(
            "attachments",
            Part::bytes(b"%PDF-1.4".to_vec())
                .file_name("plan.pdf")
                .mime_type("application/pdf"),
        );

    let response = app.server.post("/api/contact").multipart(form).await;
    response.assert_status_ok();
    let body: Value = response.json();
    let url = body["attachments"][0].as_str().unwrap().to_string();
    assert!(url.starts_with("/uploads/"));
    assert_eq!(body["newsletter_opt_in"], true);

    app.server.get(&url).await.assert_status_ok();

    let again = app
        .server
        .post("/api/newsletter/subscribe")
        .json(&json!({ "email": "jordan@example.org" }))
        .await;
    assert_eq!(again.json::<Value>()["already_subscribed"], true);
}

#[tokio::test]
async fn contact_rejects_disallowed_attachment() {
    let app = spawn_app().await;

    let form = MultipartForm::new()
        .add_text("name", "Jordan")
        .add_text("email", "jordan@example.org")
        .add_text("subject", "Script")
        .add_text("message", "Run this")
        .add_part(
            "attachments",
            Part::bytes(b"MZ".to_vec())
                .file_name("run.exe")
                .mime_type("application/x-msdownload"),
        );

    let response = app.server.post("/api/contact").multipart(form).await;
    response.assert_status(StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn newsletter_subscribe_is_idempotent() {
    let app = spawn_app().await;

    let first = app
        .server
        .post("/api/newsletter/subscribe")
        .json(&json!({ "email": "Quinn@Example.org" }))
        .await;
    first.assert_status_ok();
    assert_eq!(first.json::<Value>()["already_subscribed"], false);

    let second = app
        .server
        .post("/api/newsletter/subscribe")
        .json(&json!({ "email": "quinn@example.org" }))
        .await;
    assert_eq!(second.json::<Value>()["already_subscribed"], true);

    let bad = app
        .server
        .post("/api/newsletter/subscribe")
        .json(&json!({ "email": "quinn" }))
        .await;
    bad.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn overlapping_bookings_conflict() {
    let app = spawn_app().await;
    let (admin, _) = app.register("Ada", "ada@example.org").await;
    let (member, _) = app.register("Ben", "ben@example.org").await;
    let room_id = app.create_room(&admin).await;

    let first = app
        .server
        .post("/api/bookings")
        .authorization_bearer(&member)
        .json(&booking_body(room_id, 0, 2))
        .await;
    first.assert_status(StatusCode::CREATED);
    let booking: Value = first.json();
    assert_eq!(booking["status"], "pending");
    assert_eq!(booking["total_cents"], 8000);

    app.server
        .post("/api/bookings")
        .authorization_bearer(&member)
        .json(&booking_body(room_id, 1, 3))
        .await
        .assert_status(StatusCode::CONFLICT);

    // Back-to-back slots do not overlap
    app.server
        .post("/api/bookings")
        .authorization_bearer(&member)
        .json(&booking_body(room_id, 2, 3))
        .await
        .assert_status(StatusCode::CREATED);

    let mine = app
        .server
        .get("/api/bookings/mine")
        .authorization_bearer(&member)
        .await;
    assert_eq!(mine.json::<Value>().as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn admin_confirms_booking() {
    let app = spawn_app().await;
    let (admin, _) = app.register("Ada", "ada@example.org").await;
    let (member, _) = app.register("Ben", "ben@example.org").await;
    let room_id = app.create_room(&admin).await;

    let booking: Value = app
        .server
        .post("/api/bookings")
        .authorization_bearer(&member)
        .json(&booking_body(room_id, 0, 1))
        .await
        .json();
    let id = booking["id"].as_i64().unwrap();

    app.server
        .put(&format!("/api/admin/bookings/{}/status", id))
        .authorization_bearer(&member)
        .json(&json!({ "status": "confirmed" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let confirmed = app
        .server
        .put(&format!("/api/admin/bookings/{}/status", id))
        .authorization_bearer(&admin)
        .json(&json!({ "status": "confirmed" }))
        .await;
    confirmed.assert_status_ok();
    assert_eq!(confirmed.json::<Value>()["status"], "confirmed");

    let pending = app
        .server
        .get("/api/admin/bookings?status=pending")
        .authorization_bearer(&admin)
        .await;
    assert_eq!(pending.json::<Value>()["total"], 0);
}

#[tokio::test]
async fn donations_update_total() {
    let app = spawn_app().await;

    let initial: Value = app.server.get("/api/donations/total").await.json();
    assert_eq!(initial["total"], 0.0);

    app.server
        .post("/api/donations")
        .json(&json!({ "amount": 25.5, "donor_name": "Kim" }))
        .await
        .assert_status(StatusCode::CREATED);

    app.server
        .post("/api/donations")
        .json(&json!({ "amount": 0 }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let after: Value = app.server.get("/api/donations/total").await.json();
    assert_eq!(after["total"], 25.5);
}

#[tokio::test]
async fn public_pages_render() {
    let app = spawn_app().await;
    for path in ["/", "/about", "/events", "/rentals", "/fundraising", "/contact", "/auth"] {
        let response = app.server.get(path).await;
        response.assert_status_ok();
        assert!(response.text().contains("Commonroom Community Center"), "{}", path);
    }
}

#[tokio::test]
async fn protected_pages_redirect() {
    let app = spawn_app().await;

    let anonymous = app.server.get("/admin").await;
    anonymous.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(anonymous.header("location"), "/auth");

    let profile = app.server.get("/profile").await;
    profile.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(profile.header("location"), "/auth");

    let (admin, _) = app.register("Ada", "ada@example.org").await;
    let (member, _) = app.register("Ben", "ben@example.org").await;

    let as_member = app.server.get("/admin").authorization_bearer(&member).await;
    as_member.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(as_member.header("location"), "/");

    app.server
        .get("/profile")
        .authorization_bearer(&member)
        .await
        .assert_status_ok();
    app.server
        .get("/admin")
        .authorization_bearer(&admin)
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn unknown_paths_render_not_found_page() {
    let app = spawn_app().await;
    let response = app.server.get("/no-such-page").await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert!(response.text().contains("/no-such-page"));
}

#[tokio::test]
async fn admin_api_requires_admin() {
    let app = spawn_app().await;
    app.server
        .get("/api/admin/stats")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    let (admin, _) = app.register("Ada", "ada@example.org").await;
    app.register("Ben", "ben@example.org").await;
    app.server
        .post("/api/contact")
        .json(&json!({
            "name": "Jordan",
            "email": "jordan@example.org",
            "subject": "Hall hire",
            "message": "Is the hall free on Sunday?"
        }))
        .await
        .assert_status_ok();

    let stats = app
        .server
        .get("/api/admin/stats")
        .authorization_bearer(&admin)
        .await;
    stats.assert_status_ok();
    let body: Value = stats.json();
    assert_eq!(body["users"], 2);
    assert_eq!(body["admins"], 1);
    assert_eq!(body["messages"], 1);
    assert_eq!(body["system"]["emails_sent"], 1);
}

fn png_part(bytes: Vec<u8>) -> Part {
    Part::bytes(bytes).file_name("Logo.PNG").mime_type("image/png")
}

#[tokio::test]
async fn upload_stores_file_and_serves_it_back() {
    let app = spawn_app().await;
    let (token, _) = app.register("Ada", "ada@example.org").await;

    let form = MultipartForm::new().add_part("file", png_part(b"\x89PNG\r\n".to_vec()));
    let response = app
        .server
        .post("/api/upload")
        .authorization_bearer(&token)
        .multipart(form)
        .await;
    response.assert_status_ok();
    let stored: Value = response.json();
    let url = stored["url"].as_str().unwrap().to_string();
    assert!(url.starts_with("/uploads/"));
    assert!(url.ends_with(".png"));
    assert_eq!(stored["original_name"], "Logo.PNG");

    let served = app.server.get(&url).await;
    served.assert_status_ok();
    assert_eq!(served.as_bytes().as_ref(), b"\x89PNG\r\n");
}

#[tokio::test]
async fn upload_requires_session_and_file_field() {
    let app = spawn_app().await;

    let anonymous = MultipartForm::new().add_part("file", png_part(b"png".to_vec()));
    app.server
        .post("/api/upload")
        .multipart(anonymous)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    let (token, _) = app.register("Ada", "ada@example.org").await;
    let without_file = MultipartForm::new().add_text("note", "no file here");
    let response = app
        .server
        .post("/api/upload")
        .authorization_bearer(&token)
        .multipart(without_file)
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn upload_maps_type_and_size_failures() {
    let app = spawn_app_with(|config| {
        config.upload.max_file_size = 16;
        config.upload.max_attachments = 1;
    })
    .await;
    let (token, _) = app.register("Ada", "ada@example.org").await;

    let script = MultipartForm::new().add_part(
        "file",
        Part::bytes(b"#!/bin/sh".to_vec())
            .file_name("run.sh")
            .mime_type("application/x-sh"),
    );
    app.server
        .post("/api/upload")
        .authorization_bearer(&token)
        .multipart(script)
        .await
        .assert_status(StatusCode::UNSUPPORTED_MEDIA_TYPE);

    // Over the per-file ceiling but under the request body limit
    let big = MultipartForm::new().add_part("file", png_part(vec![0u8; 1024]));
    app.server
        .post("/api/upload")
        .authorization_bearer(&token)
        .multipart(big)
        .await
        .assert_status(StatusCode::PAYLOAD_TOO_LARGE);

    // Over the request body limit itself
    let huge = MultipartForm::new().add_part("file", png_part(vec![0u8; 128 * 1024]));
    app.server
        .post("/api/upload")
        .authorization_bearer(&token)
        .multipart(huge)
        .await
        .assert_status(StatusCode::PAYLOAD_TOO_LARGE);
}
