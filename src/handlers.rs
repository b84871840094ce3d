//! HTTP route handlers for the web application.
//!
//! This module contains the landing page, sign-in and registration, the
//! dashboard, the uploader's own notes, note viewing, and the JSON endpoints
//! the page scripts call. Browsing, uploads and password reset live in their
//! own modules.

use crate::access::FREE_VIEW_LIMIT;
use crate::auth::{clear_cookie, session_cookie, with_cookie, Session};
use crate::error::{ApiError, AppError};
use crate::favourites::FavouriteSet;
use crate::models::{ApprovalStatus, Note, User};
use crate::password_reset::{validate_email, MIN_PASSWORD_LEN};
use crate::templates::{
    base_html, error_box, free_views_detail, html_escape, info_box, own_note_card, stat_card,
    success_box, viewer_modal,
};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::{
        header::{CACHE_CONTROL, CONTENT_DISPOSITION, CONTENT_TYPE},
        StatusCode,
    },
    response::{Html, IntoResponse, Redirect, Response},
    Form, Json,
};
use axum_extra::extract::CookieJar;
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

pub const FAVOURITE_FAILED: &str = "Failed to update favourites.";

/// The signed-in session, or a redirect to the login page.
pub async fn current_session(state: &AppState, jar: &CookieJar) -> Result<Session, Response> {
    state
        .sessions
        .current(jar)
        .await
        .ok_or_else(|| Redirect::to("/login").into_response())
}

/// Re-read the user from the backend after anything that may change the
/// server-side counters. Failure keeps the stale copy.
async fn refresh_user(state: &AppState, session: &Session) -> Option<User> {
    match state.api.me(&session.token).await {
        Ok(user) => {
            state
                .sessions
                .update(&session.id, |s| s.user = user.clone())
                .await;
            Some(user)
        }
        Err(e) => {
            warn!("could not refresh user: {}", e);
            None
        }
    }
}

// ============================================================================
// Home
// ============================================================================

pub async fn home(State(state): State<Arc<AppState>>, jar: CookieJar) -> Html<String> {
    let session = state.sessions.current(&jar).await;

    let actions = if session.is_some() {
        r#"<a class="btn" href="/dashboard">Go to Dashboard</a>"#
    } else {
        r#"<a class="btn" href="/login">Login</a> <a class="btn secondary" href="/register">Register</a>"#
    };

    let content = format!(
        r#"<h1>OriNotes</h1>
        <p>Course notes from students, for students. Browse by institution, field and course, or search by title.</p>
        <h2>How to use</h2>
        <ol class="steps">
            <li>Create an account and log in.</li>
            <li>Open “Notes” and pick a material type, then narrow it down step by step.</li>
            <li>Every account gets {limit} free views of premium notes; free notes are always open.</li>
            <li>Share your own PDFs from “Upload”. They appear once approved.</li>
            <li>Visit “My Notes” to track views and approval status of your uploads.</li>
        </ol>
        <p>{actions}</p>"#,
        limit = FREE_VIEW_LIMIT,
        actions = actions,
    );

    Html(base_html("Home", &content, session.as_ref().map(|s| &s.user)))
}

// ============================================================================
// Authentication Handlers
// ============================================================================

fn login_form(error: Option<&str>, notice: Option<&str>, email: &str) -> String {
    format!(
        r#"<div class="form-card">
            <h1>Login</h1>
            {error}{notice}
            <form method="post" action="/login">
                <div class="form-group">
                    <label for="email">Email</label>
                    <input id="email" type="email" name="email" value="{email}" required autofocus>
                </div>
                <div class="form-group">
                    <label for="password">Password</label>
                    <input id="password" type="password" name="password" required>
                </div>
                <button class="btn" type="submit">Login</button>
            </form>
            <p class="meta"><a href="/forgot-password">Forgot password?</a> &middot; <a href="/register">Create an account</a></p>
        </div>"#,
        error = error.map(error_box).unwrap_or_default(),
        notice = notice.map(success_box).unwrap_or_default(),
        email = html_escape(email),
    )
}

pub async fn login_page(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    if state.sessions.current(&jar).await.is_some() {
        return Redirect::to("/dashboard").into_response();
    }
    Html(base_html("Login", &login_form(None, None, ""), None)).into_response()
}

#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

pub async fn login_submit(
    State(state): State<Arc<AppState>>,
    Form(form): Form<LoginForm>,
) -> Response {
    let login = match state.api.login(form.email.trim(), &form.password).await {
        Ok(login) => login,
        Err(e) => {
            warn!("login failed: {}", e);
            let html = login_form(Some(&e.user_message()), None, &form.email);
            return (StatusCode::UNAUTHORIZED, Html(base_html("Login", &html, None))).into_response();
        }
    };

    // A failed favourites load only costs the stars.
    let favourites: FavouriteSet = match state.api.favourite_ids(&login.token).await {
        Ok(ids) => ids.into_iter().collect(),
        Err(e) => {
            warn!("could not load favourites: {}", e);
            FavouriteSet::default()
        }
    };

    let value = state.sessions.create(login.token, login.user, favourites).await;
    with_cookie(
        Redirect::to("/dashboard").into_response(),
        &session_cookie(&value, state.config.secure_cookies),
    )
}

fn register_form(error: Option<&str>, name: &str, email: &str) -> String {
    format!(
        r#"<div class="form-card">
            <h1>Register</h1>
            {error}
            <form method="post" action="/register">
                <div class="form-group">
                    <label for="name">Name</label>
                    <input id="name" name="name" value="{name}" required>
                </div>
                <div class="form-group">
                    <label for="email">Email</label>
                    <input id="email" type="email" name="email" value="{email}" required>
                </div>
                <div class="form-group">
                    <label for="password">Password</label>
                    <input id="password" type="password" name="password" minlength="{min}" required>
                </div>
                <div class="form-group">
                    <label for="confirm">Confirm password</label>
                    <input id="confirm" type="password" name="confirm" minlength="{min}" required>
                </div>
                <button class="btn" type="submit">Register</button>
            </form>
            <p class="meta">Already registered? <a href="/login">Login</a></p>
        </div>"#,
        error = error.map(error_box).unwrap_or_default(),
        name = html_escape(name),
        email = html_escape(email),
        min = MIN_PASSWORD_LEN,
    )
}

pub async fn register_page() -> Html<String> {
    Html(base_html("Register", &register_form(None, "", ""), None))
}

#[derive(Deserialize)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm: String,
}

fn validate_registration(form: &RegisterForm) -> Result<String, ApiError> {
    if form.name.trim().is_empty() {
        return Err(ApiError::Validation("Please enter your name.".to_string()));
    }
    let email = validate_email(&form.email)?;
    crate::password_reset::validate_new_password(&form.password, &form.confirm)?;
    Ok(email)
}

pub async fn register_submit(
    State(state): State<Arc<AppState>>,
    Form(form): Form<RegisterForm>,
) -> Response {
    let result = match validate_registration(&form) {
        Ok(email) => match state.api.register(form.name.trim(), &email, &form.password).await {
            Ok(()) => Ok(email),
            Err(e) => Err(e),
        },
        Err(e) => Err(e),
    };

    match result {
        Ok(email) => {
            info!("account registered");
            let html = login_form(None, Some("Registration successful. Please log in."), &email);
            Html(base_html("Login", &html, None)).into_response()
        }
        Err(e) => {
            let html = register_form(Some(&e.user_message()), &form.name, &form.email);
            (StatusCode::BAD_REQUEST, Html(base_html("Register", &html, None))).into_response()
        }
    }
}

pub async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    state.sessions.destroy(&jar).await;
    with_cookie(
        Redirect::to("/").into_response(),
        &clear_cookie(state.config.secure_cookies),
    )
}

// ============================================================================
// Dashboard
// ============================================================================

#[derive(Debug, Default, PartialEq, Eq)]
pub struct UploadStats {
    pub approved: usize,
    pub pending: usize,
    pub rejected: usize,
    pub total_views: u64,
}

pub fn upload_stats(notes: &[Note]) -> UploadStats {
    notes.iter().fold(UploadStats::default(), |mut stats, note| {
        match note.approval_status {
            ApprovalStatus::Approved => stats.approved += 1,
            ApprovalStatus::Pending => stats.pending += 1,
            ApprovalStatus::Rejected => stats.rejected += 1,
        }
        stats.total_views += note.view_count;
        stats
    })
}

fn subscription_status(user: &User) -> String {
    match user.subscription_expiry {
        Some(expiry) if user.is_subscribed(Utc::now()) => {
            format!("Active until {}", expiry.format("%Y-%m-%d"))
        }
        _ => "Free Tier".to_string(),
    }
}

pub async fn dashboard(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    let session = match current_session(&state, &jar).await {
        Ok(s) => s,
        Err(redirect) => return redirect,
    };
    let user = refresh_user(&state, &session).await.unwrap_or(session.user.clone());

    let (stats, notes_error) = match state.api.my_notes(&session.token).await {
        Ok(notes) => (upload_stats(&notes), None),
        Err(e) => {
            warn!("could not load own notes: {}", e);
            (UploadStats::default(), Some(error_box("Failed to load your upload stats.")))
        }
    };

    let subscription_note = if user.is_subscribed(Utc::now()) {
        String::new()
    } else if user.is_subscription_enabled {
        info_box("Subscribe to unlock every premium note without using free views.")
    } else {
        info_box("Subscriptions are currently disabled.")
    };

    let content = format!(
        r#"<h1>Welcome back, {name}</h1>
        {notes_error}
        <div class="stat-grid">
            {approved}{pending}{views}
            <div id="subscription">{subscription}</div>
        </div>
        {subscription_note}
        <p><a class="btn" href="/notes">Browse Notes</a> <a class="btn secondary" href="/upload">Upload Notes</a></p>"#,
        name = html_escape(user.display_name()),
        notes_error = notes_error.unwrap_or_default(),
        approved = stat_card("Approved Uploads", &stats.approved.to_string(), None),
        pending = stat_card("Pending Review", &stats.pending.to_string(), None),
        views = stat_card("Views on Your Notes", &stats.total_views.to_string(), None),
        subscription = stat_card(
            "Subscription Status",
            &subscription_status(&user),
            Some(&free_views_detail(&user))
        ),
        subscription_note = subscription_note,
    );

    Html(base_html("Dashboard", &content, Some(&user))).into_response()
}

// ============================================================================
// My Notes
// ============================================================================

pub async fn my_notes(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    let session = match current_session(&state, &jar).await {
        Ok(s) => s,
        Err(redirect) => return redirect,
    };

    let body = match state.api.my_notes(&session.token).await {
        Ok(notes) if notes.is_empty() => {
            r#"<p class="meta">You haven't uploaded any notes yet.</p>"#.to_string()
        }
        Ok(notes) => {
            let cards: String = notes.iter().map(own_note_card).collect();
            format!(r#"<div class="card-grid">{}</div>{}"#, cards, viewer_modal())
        }
        Err(e) => {
            warn!("could not load own notes: {}", e);
            error_box("Failed to fetch your notes.")
        }
    };

    let content = format!("<h1>My Notes</h1>{}", body);
    Html(base_html("My Notes", &content, Some(&session.user))).into_response()
}

#[derive(Deserialize)]
pub struct DeleteRequest {
    #[serde(default)]
    pub confirm: bool,
}

/// DELETE /api/notes/{id}; refuses unless the body carries `"confirm": true`.
pub async fn delete_note(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Path(id): Path<String>,
    Json(body): Json<DeleteRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let session = state
        .sessions
        .current(&jar)
        .await
        .ok_or(AppError::Unauthorized)?;

    if !body.confirm {
        return Err(AppError::BadRequest("Deletion must be confirmed.".to_string()));
    }

    state.api.delete_note(&session.token, &id).await?;
    info!(note = %id, "note deleted");
    Ok(Json(serde_json::json!({ "deleted": id })))
}

// ============================================================================
// Viewing
// ============================================================================

/// GET /notes/{id}/view - stream the document. The backend applies the
/// access gate and counts free views; the user is refreshed afterwards.
pub async fn view_note(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Path(id): Path<String>,
) -> Response {
    let session = match current_session(&state, &jar).await {
        Ok(s) => s,
        Err(redirect) => return redirect,
    };

    match state.api.view_note(&session.token, &id).await {
        Ok(doc) => {
            refresh_user(&state, &session).await;
            (
                [
                    (CONTENT_TYPE, doc.content_type),
                    (CONTENT_DISPOSITION, "inline".to_string()),
                    (CACHE_CONTROL, "private, no-store".to_string()),
                ],
                doc.bytes,
            )
                .into_response()
        }
        Err(e) if e.is_unauthorized() => {
            state.sessions.destroy(&jar).await;
            Redirect::to("/login").into_response()
        }
        Err(e) => {
            warn!(note = %id, "view failed: {}", e);
            let status = match &e {
                ApiError::Status { status, .. } => {
                    StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
                }
                _ => StatusCode::BAD_GATEWAY,
            };
            let content = format!(
                r#"<h1>Cannot open note</h1>{}<p><a href="/notes">Back to notes</a></p>"#,
                error_box(&e.user_message())
            );
            (status, Html(base_html("Cannot open note", &content, Some(&session.user)))).into_response()
        }
    }
}

// ============================================================================
// Favourites
// ============================================================================

/// POST /api/favourites/{id} - flip the favourite locally, then confirm with
/// the backend; a failed call rolls the local change back.
pub async fn toggle_favourite(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let session = state
        .sessions
        .current(&jar)
        .await
        .ok_or(AppError::Unauthorized)?;

    let change = state
        .sessions
        .update(&session.id, |s| s.favourites.toggle(&id))
        .await
        .ok_or(AppError::Unauthorized)?;

    let result = if change.is_added() {
        state.api.add_favourite(&session.token, change.note_id()).await
    } else {
        state.api.remove_favourite(&session.token, change.note_id()).await
    };

    match result {
        Ok(()) => Ok(Json(serde_json::json!({
            "id": change.note_id(),
            "favourite": change.is_added(),
        }))),
        Err(e) => {
            warn!(note = %id, "favourite update failed: {}", e);
            state
                .sessions
                .update(&session.id, |s| s.favourites.apply(&change.inverse()))
                .await;
            Err(AppError::Upstream(FAVOURITE_FAILED.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiClient;
    use crate::config::Config;
    use axum::body::to_bytes;
    use axum_extra::extract::cookie::Cookie;
    use std::time::Duration;

    fn note(status: ApprovalStatus, views: u64) -> Note {
        Note {
            id: "n".to_string(),
            title: "t".to_string(),
            created_at: Utc::now(),
            approval_status: status,
            rejection_reason: None,
            is_free: false,
            view_count: views,
            user_id: None,
            thumbnail: None,
        }
    }

    /// State whose backend address refuses connections.
    async fn offline_state() -> Arc<AppState> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let config = Config::from_lookup(|key| match key {
            "ORINOTES_BACKEND_URL" => Some(format!("http://{}/api/", addr)),
            "ORINOTES_SESSION_SECRET" => Some("test-secret".to_string()),
            "ORINOTES_REQUEST_TIMEOUT_SECS" => Some("2".to_string()),
            _ => None,
        })
        .unwrap();
        let api = ApiClient::new(config.backend_url.clone(), Duration::from_secs(2)).unwrap();
        Arc::new(AppState::with_api(config, api))
    }

    fn user() -> User {
        serde_json::from_value(serde_json::json!({ "id": 1, "name": "Dev" })).unwrap()
    }

    #[test]
    fn test_upload_stats() {
        let stats = upload_stats(&[
            note(ApprovalStatus::Approved, 10),
            note(ApprovalStatus::Approved, 5),
            note(ApprovalStatus::Pending, 0),
            note(ApprovalStatus::Rejected, 1),
        ]);
        assert_eq!(
            stats,
            UploadStats {
                approved: 2,
                pending: 1,
                rejected: 1,
                total_views: 16
            }
        );
    }

    #[test]
    fn test_registration_validation() {
        let form = RegisterForm {
            name: "Dev".to_string(),
            email: "dev@example.com".to_string(),
            password: "abcdef".to_string(),
            confirm: "abcdeX".to_string(),
        };
        assert_eq!(
            validate_registration(&form).unwrap_err().user_message(),
            "Passwords do not match."
        );
    }

    #[tokio::test]
    async fn test_failed_favourite_toggle_is_rolled_back() {
        let state = offline_state().await;
        let value = state
            .sessions
            .create("tok".to_string(), user(), FavouriteSet::default())
            .await;
        let jar = CookieJar::new().add(Cookie::new(crate::auth::SESSION_COOKIE, value));

        let err = toggle_favourite(State(state.clone()), jar.clone(), Path("5".to_string()))
            .await
            .unwrap_err();

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], FAVOURITE_FAILED);

        let session = state.sessions.current(&jar).await.unwrap();
        assert!(!session.favourites.contains("5"));
    }

    #[tokio::test]
    async fn test_delete_requires_confirmation() {
        let state = offline_state().await;
        let value = state
            .sessions
            .create("tok".to_string(), user(), FavouriteSet::default())
            .await;
        let jar = CookieJar::new().add(Cookie::new(crate::auth::SESSION_COOKIE, value));

        let err = delete_note(
            State(state),
            jar,
            Path("5".to_string()),
            Json(DeleteRequest { confirm: false }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_pages_redirect_without_session() {
        let state = offline_state().await;
        let response = dashboard(State(state), CookieJar::new()).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }
}
