//! Tests for the backend client.
//!
//! Each test starts a small axum app on an ephemeral port that imitates the
//! notes backend and records what it was asked.

use super::*;
use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

// ============================================================================
// Fake backend
// ============================================================================

type Log = Arc<Mutex<Vec<String>>>;

const TOKEN: &str = "tok-1";

fn user_json() -> Value {
    json!({
        "id": 1,
        "name": "Asha",
        "email": "asha@example.com",
        "role": "user",
        "free_views": 1,
        "is_subscription_enabled": true
    })
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

async fn login(Json(body): Json<Value>) -> Response {
    if body["password"] == "secret1" {
        Json(json!({ "token": TOKEN, "user": user_json() })).into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Invalid credentials" })),
        )
            .into_response()
    }
}

async fn me(headers: HeaderMap) -> Response {
    if bearer(&headers) == Some(TOKEN) {
        Json(user_json()).into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Token expired" })),
        )
            .into_response()
    }
}

async fn forgot(Json(body): Json<Value>) -> Json<Value> {
    assert!(body["email"].is_string());
    Json(json!({ "message": "If that email is registered, a code has been sent." }))
}

async fn filtered(
    State(log): State<Log>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let material = params.get("material_type").cloned().unwrap_or_default();
    let q = params.get("q").cloned().unwrap_or_default();
    log.lock().unwrap().push(format!("filtered {} {}", material, q));
    Json(json!([{
        "id": 5,
        "title": format!("{}:{}", material, q),
        "created_at": "2024-05-01T08:00:00Z",
        "approval_status": "approved",
        "is_free": true
    }]))
}

async fn favourite_ids() -> Json<Value> {
    Json(json!([3, "9"]))
}

async fn add_favourite(State(log): State<Log>, Path(id): Path<String>) -> StatusCode {
    log.lock().unwrap().push(format!("fav+ {}", id));
    if id == "bad" {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::CREATED
    }
}

async fn remove_favourite(State(log): State<Log>, Path(id): Path<String>) -> StatusCode {
    log.lock().unwrap().push(format!("fav- {}", id));
    StatusCode::NO_CONTENT
}

async fn delete_note(State(log): State<Log>, Path(id): Path<String>) -> StatusCode {
    log.lock().unwrap().push(format!("delete {}", id));
    StatusCode::NO_CONTENT
}

async fn view(Path(id): Path<String>) -> Response {
    ([(CONTENT_TYPE, "application/pdf")], format!("%PDF-1.4 note {}", id)).into_response()
}

async fn upload(mut multipart: Multipart) -> Json<Value> {
    let mut files = 0;
    let mut thumbnails = 0;
    let mut fields = Vec::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        let data = field.bytes().await.unwrap();
        match name.as_str() {
            "files" => files += 1,
            "thumbnails" => thumbnails += 1,
            _ => fields.push(format!("{}={}", name, String::from_utf8_lossy(&data))),
        }
    }
    Json(json!({
        "message": format!("{} files, {} thumbnails, {}", files, thumbnails, fields.join("&"))
    }))
}

async fn spawn_backend() -> (ApiClient, Log) {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/api/users/login", post(login))
        .route("/api/users/me", get(me))
        .route("/api/users/forgot-password", post(forgot))
        .route("/api/notes/filtered", get(filtered))
        .route("/api/notes/upload", post(upload))
        .route("/api/notes/favourites/ids", get(favourite_ids))
        .route(
            "/api/notes/favourites/{id}",
            post(add_favourite).delete(remove_favourite),
        )
        .route("/api/notes/{id}", delete(delete_note))
        .route("/api/notes/{id}/view", get(view))
        .with_state(log.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let base = Url::parse(&format!("http://{}/api/", addr)).unwrap();
    (ApiClient::new(base, Duration::from_secs(5)).unwrap(), log)
}

// ============================================================================
// Users
// ============================================================================

#[tokio::test]
async fn test_login_returns_token_and_user() {
    let (api, _) = spawn_backend().await;
    let resp = api.login("asha@example.com", "secret1").await.unwrap();
    assert_eq!(resp.token, TOKEN);
    assert_eq!(resp.user.id, "1");
    assert_eq!(resp.user.free_views, 1);
}

#[tokio::test]
async fn test_login_failure_carries_backend_message() {
    let (api, _) = spawn_backend().await;
    let err = api.login("asha@example.com", "wrong").await.unwrap_err();
    assert!(err.is_unauthorized());
    assert_eq!(err.user_message(), "Invalid credentials");
}

#[tokio::test]
async fn test_me_uses_bearer_token() {
    let (api, _) = spawn_backend().await;
    assert_eq!(api.me(TOKEN).await.unwrap().name, "Asha");

    let err = api.me("stale").await.unwrap_err();
    assert_eq!(err.user_message(), "Token expired");
}

#[tokio::test]
async fn test_forgot_password_passes_backend_message_through() {
    let (api, _) = spawn_backend().await;
    let resp = api.forgot_password("nobody@example.com").await.unwrap();
    assert_eq!(
        resp.message.as_deref(),
        Some("If that email is registered, a code has been sent.")
    );
}

// ============================================================================
// Notes
// ============================================================================

#[tokio::test]
async fn test_filtered_sends_query_params() {
    let (api, log) = spawn_backend().await;
    let params = vec![
        ("material_type".to_string(), "OriNotes".to_string()),
        ("q".to_string(), "organic chem".to_string()),
    ];
    let notes = api.filtered_notes(TOKEN, &params).await.unwrap();

    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].id, "5");
    assert_eq!(notes[0].title, "OriNotes:organic chem");
    assert_eq!(*log.lock().unwrap(), vec!["filtered OriNotes organic chem"]);
}

#[tokio::test]
async fn test_favourite_ids_accepts_mixed_ids() {
    let (api, _) = spawn_backend().await;
    assert_eq!(api.favourite_ids(TOKEN).await.unwrap(), vec!["3", "9"]);
}

#[tokio::test]
async fn test_favourite_toggle_requests() {
    let (api, log) = spawn_backend().await;
    api.add_favourite(TOKEN, "3").await.unwrap();
    api.remove_favourite(TOKEN, "3").await.unwrap();

    let err = api.add_favourite(TOKEN, "bad").await.unwrap_err();
    assert_eq!(err.user_message(), "Request failed (500)");

    assert_eq!(*log.lock().unwrap(), vec!["fav+ 3", "fav- 3", "fav+ bad"]);
}

#[tokio::test]
async fn test_delete_encodes_note_id() {
    let (api, log) = spawn_backend().await;
    api.delete_note(TOKEN, "a b/c").await.unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["delete a b/c"]);
}

#[tokio::test]
async fn test_view_returns_document() {
    let (api, _) = spawn_backend().await;
    let doc = api.view_note(TOKEN, "12").await.unwrap();
    assert_eq!(doc.content_type, "application/pdf");
    assert_eq!(doc.bytes, b"%PDF-1.4 note 12".to_vec());
}

#[tokio::test]
async fn test_upload_sends_files_thumbnails_and_fields() {
    let (api, _) = spawn_backend().await;
    let files = vec![
        UploadFile {
            name: "a.pdf".to_string(),
            bytes: b"%PDF-a".to_vec(),
            thumbnail: Some("data:image/svg+xml;base64,AA==".to_string()),
        },
        UploadFile {
            name: "b.pdf".to_string(),
            bytes: b"%PDF-b".to_vec(),
            thumbnail: None,
        },
    ];
    let fields = vec![
        ("material_type".to_string(), "personal_material".to_string()),
        ("course".to_string(), "B.Tech".to_string()),
    ];

    let receipt = api.upload_notes(TOKEN, &files, &fields).await.unwrap();
    assert_eq!(
        receipt.message.as_deref(),
        Some("2 files, 2 thumbnails, material_type=personal_material&course=B.Tech")
    );
}

// ============================================================================
// Transport failures
// ============================================================================

#[tokio::test]
async fn test_unreachable_backend_is_network_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let base = Url::parse(&format!("http://{}/api/", addr)).unwrap();
    let api = ApiClient::new(base, Duration::from_secs(2)).unwrap();
    let err = api.my_notes(TOKEN).await.unwrap_err();

    assert!(matches!(err, ApiError::Network(_)));
    assert_eq!(
        err.user_message(),
        "Could not reach the server. Please try again."
    );
}

#[test]
fn test_error_message_prefers_error_field() {
    assert_eq!(
        error_message(r#"{"error":"Invalid OTP","message":"ignored"}"#),
        "Invalid OTP"
    );
    assert_eq!(error_message(r#"{"message":"Expired"}"#), "Expired");
    assert_eq!(error_message("<html>502</html>"), "");
    assert_eq!(error_message(""), "");
}

#[test]
fn test_endpoint_joins_relative_to_base() {
    let api = ApiClient::new(
        Url::parse("http://backend.local/api/").unwrap(),
        Duration::from_secs(1),
    )
    .unwrap();
    assert_eq!(
        api.endpoint("/notes/filtered").unwrap().as_str(),
        "http://backend.local/api/notes/filtered"
    );
    assert_eq!(
        ApiClient::note_path("a/b", "/view"),
        "notes/a%2Fb/view"
    );
}
