//! HTTP API tests driven through the router without a socket

use axum::body::{to_bytes, Body};
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use taskdesk_core::test_utils::{RecordingNotifier, TEST_PASSWORD};
use taskdesk_core::{AppConfig, TaskDatabase};
use taskdesk_server::{router, AppState};
use tower::ServiceExt;

const BOUNDARY: &str = "taskdesk-test-boundary";

struct TestApp {
    router: Router,
    notifier: Arc<RecordingNotifier>,
    uploads: TempDir,
}

struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl TestResponse {
    fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

async fn test_app_with(config: AppConfig) -> TestApp {
    test_app_on(TaskDatabase::in_memory().await.unwrap(), config)
}

fn test_app_on(db: TaskDatabase, mut config: AppConfig) -> TestApp {
    let uploads = TempDir::new().unwrap();
    config.upload_dir = uploads.path().to_path_buf();

    let notifier = Arc::new(RecordingNotifier::new());
    let state = AppState::with_notifier(db, &config, notifier.clone());
    TestApp {
        router: router(state),
        notifier,
        uploads,
    }
}

fn multipart_body(field: &str, filename: &str, content: &[u8]) -> Vec<u8> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

async fn test_app() -> TestApp {
    test_app_with(AppConfig::for_testing()).await
}

impl TestApp {
    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(value) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(value.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.dispatch(request).await
    }

    async fn upload(
        &self,
        task_id: &str,
        token: &str,
        field: &str,
        filename: &str,
        content: &[u8],
    ) -> TestResponse {
        let request = Request::builder()
            .method(Method::POST)
            .uri(format!("/tasks/{task_id}/file"))
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(field, filename, content)))
            .unwrap();
        self.dispatch(request).await
    }

    async fn dispatch(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        TestResponse {
            status,
            headers,
            body: body.to_vec(),
        }
    }

    async fn register(&self, username: &str) -> TestResponse {
        self.send(
            Method::POST,
            "/register",
            None,
            Some(json!({
                "username": username,
                "email": format!("{username}@example.com"),
                "password": TEST_PASSWORD,
                "password_confirmation": TEST_PASSWORD,
            })),
        )
        .await
    }

    async fn login(&self, username: &str, password: &str) -> TestResponse {
        self.send(
            Method::POST,
            "/login",
            None,
            Some(json!({ "username": username, "password": password })),
        )
        .await
    }

    /// Register and sign in, returning the session token
    async fn sign_up(&self, username: &str) -> String {
        assert_eq!(self.register(username).await.status, StatusCode::CREATED);
        let response = self.login(username, TEST_PASSWORD).await;
        assert_eq!(response.status, StatusCode::OK);
        response.json()["token"].as_str().unwrap().to_string()
    }

    async fn create_task(&self, token: &str, body: Value) -> Value {
        let response = self.send(Method::POST, "/tasks", Some(token), Some(body)).await;
        assert_eq!(response.status, StatusCode::CREATED);
        response.json()
    }
}

#[tokio::test]
async fn test_health_reports_database() {
    let app = test_app().await;
    let response = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "connected");
}

#[tokio::test]
async fn test_register_and_login() {
    let app = test_app().await;

    let response = app.register("alice").await;
    assert_eq!(response.status, StatusCode::CREATED);
    let user = response.json();
    assert_eq!(user["username"], "alice");
    assert!(user.get("password_hash").is_none());

    assert_eq!(app.register("alice").await.status, StatusCode::CONFLICT);

    let session = app.login("alice", TEST_PASSWORD).await;
    assert_eq!(session.status, StatusCode::OK);
    let session = session.json();
    assert_eq!(session["token_type"], "Bearer");
    assert_eq!(session["user"]["username"], "alice");

    let wrong = app.login("alice", "not-the-password").await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    let unknown = app.login("nobody", TEST_PASSWORD).await;
    assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.json(), unknown.json());
}

#[tokio::test]
async fn test_invalid_registration_lists_fields() {
    let app = test_app().await;
    let response = app
        .send(
            Method::POST,
            "/register",
            None,
            Some(json!({
                "username": "bad name!",
                "email": "not-an-email",
                "password": "short",
                "password_confirmation": "different",
            })),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    let fields = &response.json()["fields"];
    assert!(fields.get("username").is_some());
    assert!(fields.get("email").is_some());
    assert!(fields.get("password").is_some());
}

#[tokio::test]
async fn test_task_routes_require_session() {
    let app = test_app().await;

    let missing = app.send(Method::GET, "/tasks", None, None).await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);

    let garbage = app.send(Method::GET, "/tasks", Some("garbage"), None).await;
    assert_eq!(garbage.status, StatusCode::UNAUTHORIZED);

    let export = app.send(Method::GET, "/tasks?export=pdf", None, None).await;
    assert_eq!(export.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_task_crud() {
    let app = test_app().await;
    let token = app.sign_up("alice").await;

    let created = app
        .create_task(
            &token,
            json!({ "name": "Buy milk", "description": "2 litres", "priority": 10 }),
        )
        .await;
    assert_eq!(created["status"], "open");
    assert_eq!(created["priority"], 10);
    let id = created["id"].as_str().unwrap().to_string();
    let uri = format!("/tasks/{id}");

    let fetched = app.send(Method::GET, &uri, Some(&token), None).await;
    assert_eq!(fetched.status, StatusCode::OK);
    assert_eq!(fetched.json()["name"], "Buy milk");

    let updated = app
        .send(
            Method::PUT,
            &uri,
            Some(&token),
            Some(json!({ "status": "completed" })),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    let updated = updated.json();
    assert_eq!(updated["status"], "completed");
    assert_eq!(updated["name"], "Buy milk");
    assert_eq!(updated["created_at"], created["created_at"]);

    let listed = app.send(Method::GET, "/tasks", Some(&token), None).await;
    assert_eq!(listed.status, StatusCode::OK);
    assert_eq!(listed.json().as_array().unwrap().len(), 1);

    let deleted = app.send(Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);
    let gone = app.send(Method::GET, &uri, Some(&token), None).await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_tasks_survive_restart() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("taskdesk.db");

    let token = {
        let app = test_app_on(
            TaskDatabase::new(&path).await.unwrap(),
            AppConfig::for_testing(),
        );
        let token = app.sign_up("alice").await;
        app.create_task(&token, json!({ "name": "Persist me" })).await;
        token
    };

    let app = test_app_on(
        TaskDatabase::new(&path).await.unwrap(),
        AppConfig::for_testing(),
    );
    let listed = app.send(Method::GET, "/tasks", Some(&token), None).await;
    assert_eq!(listed.status, StatusCode::OK);
    let tasks = listed.json();
    assert_eq!(tasks.as_array().unwrap().len(), 1);
    assert_eq!(tasks[0]["name"], "Persist me");
}

#[tokio::test]
async fn test_create_task_with_only_a_name() {
    let app = test_app().await;
    let token = app.sign_up("alice").await;
    let task = app.create_task(&token, json!({ "name": "Water plants" })).await;

    assert_eq!(task["description"], "");
    assert_eq!(task["priority"], 1);
    assert_eq!(task["status"], "open");
    assert!(task["file"].is_null());
}

#[tokio::test]
async fn test_invalid_task_is_rejected() {
    let app = test_app().await;
    let token = app.sign_up("alice").await;

    let response = app
        .send(
            Method::POST,
            "/tasks",
            Some(&token),
            Some(json!({ "name": "", "priority": 0 })),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    let fields = &response.json()["fields"];
    assert!(fields.get("name").is_some());
    assert!(fields.get("priority").is_some());
}

#[tokio::test]
async fn test_other_users_tasks_are_not_found() {
    let app = test_app().await;
    let alice = app.sign_up("alice").await;
    let bob = app.sign_up("bob").await;

    let task = app.create_task(&alice, json!({ "name": "Private" })).await;
    let uri = format!("/tasks/{}", task["id"].as_str().unwrap());

    let read = app.send(Method::GET, &uri, Some(&bob), None).await;
    assert_eq!(read.status, StatusCode::NOT_FOUND);
    let write = app
        .send(Method::PUT, &uri, Some(&bob), Some(json!({ "name": "Mine" })))
        .await;
    assert_eq!(write.status, StatusCode::NOT_FOUND);
    let delete = app.send(Method::DELETE, &uri, Some(&bob), None).await;
    assert_eq!(delete.status, StatusCode::NOT_FOUND);

    let bobs_list = app.send(Method::GET, "/tasks", Some(&bob), None).await;
    assert!(bobs_list.json().as_array().unwrap().is_empty());

    let still_there = app.send(Method::GET, &uri, Some(&alice), None).await;
    assert_eq!(still_there.json()["name"], "Private");

    let malformed = app
        .send(Method::GET, "/tasks/not-a-uuid", Some(&alice), None)
        .await;
    assert_eq!(malformed.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_filtered_listing() {
    let app = test_app().await;
    let token = app.sign_up("alice").await;

    app.create_task(&token, json!({ "name": "Buy milk" })).await;
    app.create_task(
        &token,
        json!({ "name": "Ship report", "status": "in_progress" }),
    )
    .await;
    app.create_task(&token, json!({ "name": "Buy bread", "status": "completed" }))
        .await;

    let response = app
        .send(Method::GET, "/tasks?name=BUY&status=all", Some(&token), None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let mut names: Vec<String> = response
        .json()
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap().to_string())
        .collect();
    names.sort();
    assert_eq!(names, vec!["Buy bread", "Buy milk"]);

    let in_progress = app
        .send(Method::GET, "/tasks?status=in_progress", Some(&token), None)
        .await;
    let tasks = in_progress.json();
    assert_eq!(tasks.as_array().unwrap().len(), 1);
    assert_eq!(tasks[0]["name"], "Ship report");
}

#[tokio::test]
async fn test_invalid_filter_lists_fields() {
    let app = test_app().await;
    let token = app.sign_up("alice").await;

    for uri in [
        "/tasks?status=done&start_date=soon",
        "/tasks?export=pdf&status=done&start_date=soon",
    ] {
        let response = app.send(Method::GET, uri, Some(&token), None).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{uri}");
        let body = response.json();
        assert_eq!(body["error"], "Invalid input");
        assert!(body["fields"].get("status").is_some());
        assert!(body["fields"].get("start_date").is_some());
    }
}

#[tokio::test]
async fn test_pdf_export_download() {
    let app = test_app().await;
    let token = app.sign_up("alice").await;
    app.create_task(&token, json!({ "name": "Buy milk" })).await;

    let response = app
        .send(Method::GET, "/tasks?export=pdf", Some(&token), None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.headers[header::CONTENT_TYPE], "application/pdf");
    assert_eq!(
        response.headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"tasks_report.pdf\""
    );
    assert_eq!(response.headers[header::CACHE_CONTROL], "no-store");
    assert!(response.body.starts_with(b"%PDF"));
}

#[tokio::test]
async fn test_pdf_export_with_no_matches() {
    let app = test_app().await;
    let token = app.sign_up("alice").await;

    let response = app
        .send(Method::GET, "/tasks?export=pdf&name=nothing", Some(&token), None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.starts_with(b"%PDF"));
}

#[tokio::test]
async fn test_oversized_export_fails() {
    let mut config = AppConfig::for_testing();
    config.report_max_tasks = 1;
    let app = test_app_with(config).await;
    let token = app.sign_up("alice").await;
    app.create_task(&token, json!({ "name": "One" })).await;
    app.create_task(&token, json!({ "name": "Two" })).await;

    let response = app
        .send(Method::GET, "/tasks?export=pdf", Some(&token), None)
        .await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        String::from_utf8(response.body.clone()).unwrap(),
        "Error generating PDF"
    );

    // The page listing has no such limit
    let page = app.send(Method::GET, "/tasks", Some(&token), None).await;
    assert_eq!(page.json().as_array().unwrap().len(), 2);
}

#[cfg(feature = "export-csv")]
#[tokio::test]
async fn test_csv_export_download() {
    let app = test_app().await;
    let token = app.sign_up("alice").await;
    app.create_task(&token, json!({ "name": "Buy milk" })).await;

    let response = app
        .send(Method::GET, "/tasks?export=csv", Some(&token), None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"tasks_report.csv\""
    );
    let text = String::from_utf8(response.body).unwrap();
    assert!(text.starts_with("id,name,description,status"));
    assert!(text.contains("Buy milk"));
}

#[tokio::test]
async fn test_profile_update_and_password_change() {
    let app = test_app().await;
    let token = app.sign_up("alice").await;

    let profile = app.send(Method::GET, "/profile", Some(&token), None).await;
    assert_eq!(profile.json()["email"], "alice@example.com");

    let updated = app
        .send(
            Method::PUT,
            "/profile",
            Some(&token),
            Some(json!({ "email": "alice@work.example" })),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.json()["email"], "alice@work.example");

    let wrong_old = app
        .send(
            Method::POST,
            "/change-password",
            Some(&token),
            Some(json!({
                "old_password": "not-it",
                "new_password": "another-pass-2",
                "new_password_confirmation": "another-pass-2",
            })),
        )
        .await;
    assert_eq!(wrong_old.status, StatusCode::BAD_REQUEST);
    assert!(wrong_old.json()["fields"].get("old_password").is_some());

    let changed = app
        .send(
            Method::POST,
            "/change-password",
            Some(&token),
            Some(json!({
                "old_password": TEST_PASSWORD,
                "new_password": "another-pass-2",
                "new_password_confirmation": "another-pass-2",
            })),
        )
        .await;
    assert_eq!(changed.status, StatusCode::NO_CONTENT);

    let old = app.login("alice", TEST_PASSWORD).await;
    assert_eq!(old.status, StatusCode::UNAUTHORIZED);
    let new = app.login("alice", "another-pass-2").await;
    assert_eq!(new.status, StatusCode::OK);
}

#[tokio::test]
async fn test_password_reset_flow() {
    let app = test_app().await;
    app.sign_up("alice").await;

    let unknown = app
        .send(
            Method::POST,
            "/password-reset",
            None,
            Some(json!({ "email": "nobody@example.com" })),
        )
        .await;
    assert_eq!(unknown.status, StatusCode::ACCEPTED);
    assert!(app.notifier.sent().await.is_empty());

    let requested = app
        .send(
            Method::POST,
            "/password-reset",
            None,
            Some(json!({ "email": "alice@example.com" })),
        )
        .await;
    assert_eq!(requested.status, StatusCode::ACCEPTED);
    let reset_token = app.notifier.last_token().await.unwrap();

    let confirm = json!({
        "token": reset_token,
        "new_password": "brand-new-pass-3",
        "new_password_confirmation": "brand-new-pass-3",
    });
    let confirmed = app
        .send(
            Method::POST,
            "/password-reset/confirm",
            None,
            Some(confirm.clone()),
        )
        .await;
    assert_eq!(confirmed.status, StatusCode::NO_CONTENT);
    assert_eq!(
        app.login("alice", "brand-new-pass-3").await.status,
        StatusCode::OK
    );

    let reused = app
        .send(Method::POST, "/password-reset/confirm", None, Some(confirm))
        .await;
    assert_eq!(reused.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_deleted_account_loses_access() {
    let app = test_app().await;
    let token = app.sign_up("alice").await;
    let task = app.create_task(&token, json!({ "name": "Buy milk" })).await;
    let id = task["id"].as_str().unwrap();
    let uploaded = app.upload(id, &token, "file", "list.txt", b"milk").await;
    assert_eq!(uploaded.status, StatusCode::OK);

    let deleted = app
        .send(Method::DELETE, "/profile", Some(&token), None)
        .await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);
    assert_eq!(std::fs::read_dir(app.uploads.path()).unwrap().count(), 0);

    let after = app.send(Method::GET, "/tasks", Some(&token), None).await;
    assert_eq!(after.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        app.login("alice", TEST_PASSWORD).await.status,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn test_file_upload_and_download() {
    let app = test_app().await;
    let token = app.sign_up("alice").await;
    let task = app
        .create_task(
            &token,
            json!({ "name": "Read notes", "file": "../../etc/passwd" }),
        )
        .await;
    assert!(task["file"].is_null());
    let id = task["id"].as_str().unwrap();

    let uploaded = app
        .upload(id, &token, "file", "meeting notes.txt", b"hello world")
        .await;
    assert_eq!(uploaded.status, StatusCode::OK);
    let reference = uploaded.json()["file"].as_str().unwrap().to_string();
    assert!(reference.ends_with("_meeting_notes.txt"));
    assert!(app.uploads.path().join(&reference).is_file());

    let fetched = app.send(Method::GET, &format!("/tasks/{id}"), Some(&token), None).await;
    assert_eq!(fetched.json()["file"], reference.as_str());

    let download = app
        .send(Method::GET, &format!("/tasks/{id}/file"), Some(&token), None)
        .await;
    assert_eq!(download.status, StatusCode::OK);
    assert_eq!(download.body, b"hello world");
    assert_eq!(
        download.headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"meeting_notes.txt\""
    );
}

#[tokio::test]
async fn test_attachments_are_owner_scoped() {
    let app = test_app().await;
    let alice = app.sign_up("alice").await;
    let bob = app.sign_up("bob").await;
    let task = app.create_task(&alice, json!({ "name": "Private" })).await;
    let id = task["id"].as_str().unwrap();
    app.upload(id, &alice, "file", "secret.txt", b"for alice").await;

    let download = app
        .send(Method::GET, &format!("/tasks/{id}/file"), Some(&bob), None)
        .await;
    assert_eq!(download.status, StatusCode::NOT_FOUND);

    let overwrite = app.upload(id, &bob, "file", "evil.txt", b"for bob").await;
    assert_eq!(overwrite.status, StatusCode::NOT_FOUND);

    let unauthenticated = app.send(Method::GET, &format!("/tasks/{id}/file"), None, None).await;
    assert_eq!(unauthenticated.status, StatusCode::UNAUTHORIZED);

    let download = app
        .send(Method::GET, &format!("/tasks/{id}/file"), Some(&alice), None)
        .await;
    assert_eq!(download.body, b"for alice");
}

#[tokio::test]
async fn test_replaced_and_deleted_files_are_removed() {
    let app = test_app().await;
    let token = app.sign_up("alice").await;
    let task = app.create_task(&token, json!({ "name": "Drafts" })).await;
    let id = task["id"].as_str().unwrap();

    let first = app.upload(id, &token, "file", "v1.txt", b"one").await.json();
    let first = app.uploads.path().join(first["file"].as_str().unwrap());
    let second = app.upload(id, &token, "file", "v2.txt", b"two").await.json();
    let second = app.uploads.path().join(second["file"].as_str().unwrap());
    assert!(!first.exists());
    assert!(second.is_file());

    let cleared = app
        .send(
            Method::PUT,
            &format!("/tasks/{id}"),
            Some(&token),
            Some(json!({ "clear_file": true })),
        )
        .await;
    assert_eq!(cleared.status, StatusCode::OK);
    assert!(cleared.json()["file"].is_null());
    assert!(!second.exists());

    let third = app.upload(id, &token, "file", "v3.txt", b"three").await.json();
    let third = app.uploads.path().join(third["file"].as_str().unwrap());
    let deleted = app
        .send(Method::DELETE, &format!("/tasks/{id}"), Some(&token), None)
        .await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);
    assert!(!third.exists());
}

#[tokio::test]
async fn test_upload_rejects_bad_bodies() {
    let mut config = AppConfig::for_testing();
    config.max_upload_bytes = 256;
    let app = test_app_with(config).await;
    let token = app.sign_up("alice").await;
    let task = app.create_task(&token, json!({ "name": "Scan" })).await;
    let id = task["id"].as_str().unwrap();

    let missing = app
        .send(Method::GET, &format!("/tasks/{id}/file"), Some(&token), None)
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.json()["error"], "No file attached");

    let wrong_field = app.upload(id, &token, "document", "a.txt", b"x").await;
    assert_eq!(wrong_field.status, StatusCode::BAD_REQUEST);

    let empty = app.upload(id, &token, "file", "a.txt", b"").await;
    assert_eq!(empty.status, StatusCode::BAD_REQUEST);

    let too_large = app.upload(id, &token, "file", "big.bin", &[7u8; 4096]).await;
    assert_eq!(too_large.status, StatusCode::PAYLOAD_TOO_LARGE);

    let task = app
        .send(Method::GET, &format!("/tasks/{id}"), Some(&token), None)
        .await;
    assert!(task.json()["file"].is_null());
}
