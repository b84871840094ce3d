//! Three-step password reset: email, then the emailed code, then a new
//! password.
//!
//! A [`ResetFlow`] links the steps. It is created only after the backend
//! accepted step 1 and advances only on backend success, so a later step can
//! never run before an earlier one succeeded.

use crate::error::ApiError;
use crate::templates::{base_html, error_box, html_escape, info_box, success_box, RESET_DONE_JS};
use crate::AppState;
use axum::{
    extract::{Query, State},
    response::Html,
    Form,
};
use axum_extra::extract::CookieJar;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

pub const OTP_MAX_LEN: usize = 6;
pub const MIN_PASSWORD_LEN: usize = 6;

/// How long a started reset stays usable.
pub const FLOW_TTL_MINUTES: i64 = 15;

// ============================================================================
// Validation
// ============================================================================

pub fn validate_email(email: &str) -> Result<String, ApiError> {
    let email = email.trim();
    let valid = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$")
        .map(|re| re.is_match(email))
        .unwrap_or(false);
    if valid {
        Ok(email.to_string())
    } else {
        Err(ApiError::Validation("Please enter a valid email address.".to_string()))
    }
}

pub fn validate_otp(otp: &str) -> Result<String, ApiError> {
    let otp = otp.trim();
    if otp.is_empty() {
        return Err(ApiError::Validation("Please enter the code from your email.".to_string()));
    }
    if otp.chars().count() > OTP_MAX_LEN {
        return Err(ApiError::Validation(format!(
            "The code is at most {} characters.",
            OTP_MAX_LEN
        )));
    }
    Ok(otp.to_string())
}

pub fn validate_new_password(password: &str, confirm: &str) -> Result<(), ApiError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation(format!(
            "Password must be at least {} characters.",
            MIN_PASSWORD_LEN
        )));
    }
    if password != confirm {
        return Err(ApiError::Validation("Passwords do not match.".to_string()));
    }
    Ok(())
}

// ============================================================================
// Flow
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetStep {
    /// Code sent; waiting for the user to enter it.
    VerifyCode,
    /// Code accepted; waiting for the new password.
    NewPassword,
}

#[derive(Debug, Clone)]
pub struct ResetFlow {
    pub id: String,
    pub email: String,
    pub otp: Option<String>,
    pub step: ResetStep,
    pub created: DateTime<Utc>,
}

impl ResetFlow {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now - self.created > Duration::minutes(FLOW_TTL_MINUTES)
    }
}

#[derive(Default)]
pub struct ResetFlowStore {
    flows: RwLock<HashMap<String, ResetFlow>>,
}

impl ResetFlowStore {
    /// Record that a code was sent to `email` and return the flow id.
    pub async fn start(&self, email: String) -> String {
        let id: String = rand::thread_rng()
            .sample_iter(&rand::distributions::Alphanumeric)
            .take(24)
            .map(char::from)
            .collect();
        let flow = ResetFlow {
            id: id.clone(),
            email,
            otp: None,
            step: ResetStep::VerifyCode,
            created: Utc::now(),
        };
        self.flows.write().await.insert(id.clone(), flow);
        id
    }

    /// The flow if it exists, has not expired and is at `step`.
    pub async fn at_step(&self, id: &str, step: ResetStep) -> Option<ResetFlow> {
        let flow = self.flows.read().await.get(id).cloned()?;
        if flow.is_expired(Utc::now()) {
            self.flows.write().await.remove(id);
            return None;
        }
        (flow.step == step).then_some(flow)
    }

    pub async fn code_verified(&self, id: &str, otp: String) {
        if let Some(flow) = self.flows.write().await.get_mut(id) {
            flow.otp = Some(otp);
            flow.step = ResetStep::NewPassword;
        }
    }

    pub async fn finish(&self, id: &str) {
        self.flows.write().await.remove(id);
    }

    pub async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut flows = self.flows.write().await;
        let before = flows.len();
        flows.retain(|_, f| !f.is_expired(now));
        before - flows.len()
    }
}

// ============================================================================
// Pages
// ============================================================================

const RESTART_MESSAGE: &str = "This reset link has expired. Please start again.";

enum ResetPage<'a> {
    Email { email: &'a str },
    Code { flow: &'a ResetFlow },
    Password { flow: &'a ResetFlow },
    Done,
}

fn render_reset(page: ResetPage<'_>, notice: Option<&str>, error: Option<&str>) -> String {
    let mut html = String::from(r#"<div class="form-card"><h1>Reset Password</h1>"#);
    if let Some(err) = error {
        html.push_str(&error_box(err));
    }
    if let Some(text) = notice {
        html.push_str(&info_box(text));
    }

    let body = match page {
        ResetPage::Email { email } => format!(
            r#"<form method="post" action="/forgot-password">
                <div class="form-group">
                    <label for="email">Email</label>
                    <input id="email" type="email" name="email" value="{}" required>
                </div>
                <button class="btn" type="submit">Send Code</button>
            </form>"#,
            html_escape(email)
        ),
        ResetPage::Code { flow } => format!(
            r#"<p class="meta">Code sent to {email}</p>
            <form method="post" action="/forgot-password/verify">
                <input type="hidden" name="flow" value="{id}">
                <div class="form-group">
                    <label for="otp">Code</label>
                    <input id="otp" name="otp" maxlength="{max}" autocomplete="one-time-code" required>
                </div>
                <button class="btn" type="submit">Verify Code</button>
            </form>"#,
            email = html_escape(&flow.email),
            id = html_escape(&flow.id),
            max = OTP_MAX_LEN,
        ),
        ResetPage::Password { flow } => format!(
            r#"<form method="post" action="/forgot-password/reset">
                <input type="hidden" name="flow" value="{id}">
                <div class="form-group">
                    <label for="password">New password</label>
                    <input id="password" type="password" name="password" minlength="{min}" required>
                </div>
                <div class="form-group">
                    <label for="confirm">Confirm password</label>
                    <input id="confirm" type="password" name="confirm" minlength="{min}" required>
                </div>
                <button class="btn" type="submit">Reset Password</button>
            </form>"#,
            id = html_escape(&flow.id),
            min = MIN_PASSWORD_LEN,
        ),
        ResetPage::Done => format!(
            r#"{}<p><a href="/login">Continue to login</a></p><script>{}</script>"#,
            success_box("Password reset successfully. Redirecting to login..."),
            RESET_DONE_JS
        ),
    };

    html.push_str(&body);
    html.push_str("</div>");
    html
}

async fn page(state: &AppState, jar: &CookieJar, content: String) -> Html<String> {
    let session = state.sessions.current(jar).await;
    Html(base_html(
        "Reset Password",
        &content,
        session.as_ref().map(|s| &s.user),
    ))
}

#[derive(Deserialize)]
pub struct FlowQuery {
    pub flow: Option<String>,
}

pub async fn forgot_password_page(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(query): Query<FlowQuery>,
) -> Html<String> {
    let id = query.flow.unwrap_or_default();

    let content = if let Some(flow) = state.reset_flows.at_step(&id, ResetStep::VerifyCode).await {
        render_reset(ResetPage::Code { flow: &flow }, None, None)
    } else if let Some(flow) = state.reset_flows.at_step(&id, ResetStep::NewPassword).await {
        render_reset(ResetPage::Password { flow: &flow }, None, None)
    } else {
        render_reset(ResetPage::Email { email: "" }, None, None)
    };
    page(&state, &jar, content).await
}

#[derive(Deserialize)]
pub struct EmailForm {
    pub email: String,
}

pub async fn request_code(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<EmailForm>,
) -> Html<String> {
    let result = match validate_email(&form.email) {
        Ok(email) => state
            .api
            .forgot_password(&email)
            .await
            .map(|resp| (email, resp.message)),
        Err(e) => Err(e),
    };

    let content = match result {
        Ok((email, message)) => {
            let id = state.reset_flows.start(email).await;
            debug!("password reset code requested");
            let flow = state.reset_flows.at_step(&id, ResetStep::VerifyCode).await;
            match flow {
                Some(flow) => render_reset(ResetPage::Code { flow: &flow }, message.as_deref(), None),
                None => render_reset(ResetPage::Email { email: "" }, None, Some(RESTART_MESSAGE)),
            }
        }
        Err(e) => render_reset(
            ResetPage::Email { email: &form.email },
            None,
            Some(&e.user_message()),
        ),
    };
    page(&state, &jar, content).await
}

#[derive(Deserialize)]
pub struct CodeForm {
    pub flow: String,
    pub otp: String,
}

pub async fn verify_code(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<CodeForm>,
) -> Html<String> {
    let Some(flow) = state.reset_flows.at_step(&form.flow, ResetStep::VerifyCode).await else {
        let content = render_reset(ResetPage::Email { email: "" }, None, Some(RESTART_MESSAGE));
        return page(&state, &jar, content).await;
    };

    let result = match validate_otp(&form.otp) {
        Ok(otp) => state
            .api
            .verify_reset_otp(&flow.email, &otp)
            .await
            .map(|resp| (otp, resp.message)),
        Err(e) => Err(e),
    };

    let content = match result {
        Ok((otp, message)) => {
            state.reset_flows.code_verified(&flow.id, otp).await;
            render_reset(ResetPage::Password { flow: &flow }, message.as_deref(), None)
        }
        Err(e) => render_reset(ResetPage::Code { flow: &flow }, None, Some(&e.user_message())),
    };
    page(&state, &jar, content).await
}

#[derive(Deserialize)]
pub struct PasswordForm {
    pub flow: String,
    pub password: String,
    pub confirm: String,
}

pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<PasswordForm>,
) -> Html<String> {
    let flow = state
        .reset_flows
        .at_step(&form.flow, ResetStep::NewPassword)
        .await;
    let Some((flow, otp)) = flow.and_then(|f| f.otp.clone().map(|otp| (f, otp))) else {
        let content = render_reset(ResetPage::Email { email: "" }, None, Some(RESTART_MESSAGE));
        return page(&state, &jar, content).await;
    };

    let result = match validate_new_password(&form.password, &form.confirm) {
        Ok(()) => state
            .api
            .reset_password(&flow.email, &otp, &form.password)
            .await
            .map(|_| ()),
        Err(e) => Err(e),
    };

    let content = match result {
        Ok(()) => {
            state.reset_flows.finish(&flow.id).await;
            info!("password reset completed");
            render_reset(ResetPage::Done, None, None)
        }
        Err(e) => render_reset(ResetPage::Password { flow: &flow }, None, Some(&e.user_message())),
    };
    page(&state, &jar, content).await
}
