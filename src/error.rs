//! Error types shared by the API client and the HTTP handlers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Failure talking to the notes backend, or input rejected before dispatch.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Form input failed client-side validation; nothing was sent.
    #[error("{0}")]
    Validation(String),

    /// Connection, timeout or body-read failure.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The backend answered with a non-2xx status.
    #[error("Backend returned {status}: {message}")]
    Status { status: u16, message: String },

    /// The backend answered 2xx but the body was not what we expected.
    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Invalid backend URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ApiError {
    /// Text suitable for showing next to the control that triggered the call.
    ///
    /// Backend messages are passed through as-is; transport failures get a
    /// generic sentence so internal addresses never reach the page.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Validation(msg) => msg.clone(),
            ApiError::Status { message, .. } if !message.is_empty() => message.clone(),
            ApiError::Status { status, .. } => format!("Request failed ({})", status),
            ApiError::Network(_) => "Could not reach the server. Please try again.".to_string(),
            ApiError::Decode(_) | ApiError::Url(_) => {
                "The server sent an unexpected response.".to_string()
            }
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Status { status: 401, .. })
    }
}

/// Error returned from the JSON endpoints the page scripts call.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not logged in")]
    Unauthorized,

    #[error("{0}")]
    BadRequest(String),

    /// A backend call failed; the message is shown as-is.
    #[error("{0}")]
    Upstream(String),

    #[error("{0}")]
    Backend(#[from] ApiError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            AppError::Backend(e) if e.is_unauthorized() => {
                (StatusCode::UNAUTHORIZED, e.user_message())
            }
            AppError::Backend(ApiError::Validation(msg)) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Backend(e) => (StatusCode::BAD_GATEWAY, e.user_message()),
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
