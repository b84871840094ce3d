//! Client for the notes REST backend.
//!
//! One `ApiClient` is shared by every request. Calls that act on behalf of a
//! user take the session's bearer token explicitly.

use crate::error::ApiError;
use crate::models::{
    parse_id_list, AvailableFilters, ForgotPasswordRequest, LoginRequest, LoginResponse,
    MessageResponse, Note, RegisterRequest, ResetPasswordRequest, UploadReceipt, User,
    VerifyOtpRequest,
};
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// A PDF ready to be sent with [`ApiClient::upload_notes`].
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub bytes: Vec<u8>,
    pub thumbnail: Option<String>,
}

/// Raw document returned by `GET /notes/{id}/view`.
#[derive(Debug, Clone)]
pub struct NoteDocument {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
}

impl ApiClient {
    pub fn new(base: Url, timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Resolve `path` (no leading slash) against the backend base URL.
    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base.join(path.trim_start_matches('/'))?)
    }

    fn note_path(id: &str, suffix: &str) -> String {
        format!("notes/{}{}", urlencoding::encode(id), suffix)
    }

    // ------------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------------

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let req = self
            .http
            .post(self.endpoint("users/login")?)
            .json(&LoginRequest { email, password });
        decode(send(req).await?).await
    }

    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<(), ApiError> {
        let req = self
            .http
            .post(self.endpoint("users/register")?)
            .json(&RegisterRequest {
                name,
                email,
                password,
            });
        send(req).await?;
        Ok(())
    }

    pub async fn me(&self, token: &str) -> Result<User, ApiError> {
        let req = self.http.get(self.endpoint("users/me")?).bearer_auth(token);
        decode(send(req).await?).await
    }

    pub async fn forgot_password(&self, email: &str) -> Result<MessageResponse, ApiError> {
        let req = self
            .http
            .post(self.endpoint("users/forgot-password")?)
            .json(&ForgotPasswordRequest { email });
        decode_or_default(send(req).await?).await
    }

    pub async fn verify_reset_otp(&self, email: &str, otp: &str) -> Result<MessageResponse, ApiError> {
        let req = self
            .http
            .post(self.endpoint("users/verify-reset-otp")?)
            .json(&VerifyOtpRequest { email, otp });
        decode_or_default(send(req).await?).await
    }

    pub async fn reset_password(
        &self,
        email: &str,
        otp: &str,
        new_password: &str,
    ) -> Result<MessageResponse, ApiError> {
        let req = self
            .http
            .post(self.endpoint("users/reset-password")?)
            .json(&ResetPasswordRequest {
                email,
                otp,
                new_password,
            });
        decode_or_default(send(req).await?).await
    }

    // ------------------------------------------------------------------------
    // Notes
    // ------------------------------------------------------------------------

    pub async fn available_subjects(&self, token: &str) -> Result<AvailableFilters, ApiError> {
        let req = self
            .http
            .get(self.endpoint("notes/available-subjects")?)
            .bearer_auth(token);
        decode(send(req).await?).await
    }

    /// `GET /notes/filtered` with the given query pairs.
    pub async fn filtered_notes(
        &self,
        token: &str,
        params: &[(String, String)],
    ) -> Result<Vec<Note>, ApiError> {
        let req = self
            .http
            .get(self.endpoint("notes/filtered")?)
            .query(params)
            .bearer_auth(token);
        decode(send(req).await?).await
    }

    pub async fn my_notes(&self, token: &str) -> Result<Vec<Note>, ApiError> {
        let req = self.http.get(self.endpoint("notes/me")?).bearer_auth(token);
        decode(send(req).await?).await
    }

    pub async fn delete_note(&self, token: &str, id: &str) -> Result<(), ApiError> {
        let req = self
            .http
            .delete(self.endpoint(&Self::note_path(id, ""))?)
            .bearer_auth(token);
        send(req).await?;
        Ok(())
    }

    pub async fn view_note(&self, token: &str, id: &str) -> Result<NoteDocument, ApiError> {
        let req = self
            .http
            .get(self.endpoint(&Self::note_path(id, "/view"))?)
            .bearer_auth(token);
        let resp = send(req).await?;
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/pdf")
            .to_string();
        let bytes = resp.bytes().await?.to_vec();
        Ok(NoteDocument {
            content_type,
            bytes,
        })
    }

    pub async fn favourite_ids(&self, token: &str) -> Result<Vec<String>, ApiError> {
        let req = self
            .http
            .get(self.endpoint("notes/favourites/ids")?)
            .bearer_auth(token);
        let value: serde_json::Value = decode(send(req).await?).await?;
        parse_id_list(value).map_err(|e| ApiError::Decode(e.to_string()))
    }

    pub async fn add_favourite(&self, token: &str, id: &str) -> Result<(), ApiError> {
        let path = format!("notes/favourites/{}", urlencoding::encode(id));
        let req = self.http.post(self.endpoint(&path)?).bearer_auth(token);
        send(req).await?;
        Ok(())
    }

    pub async fn remove_favourite(&self, token: &str, id: &str) -> Result<(), ApiError> {
        let path = format!("notes/favourites/{}", urlencoding::encode(id));
        let req = self.http.delete(self.endpoint(&path)?).bearer_auth(token);
        send(req).await?;
        Ok(())
    }

    /// `POST /notes/upload` as multipart: one `files` part per PDF, a
    /// `thumbnails` part per file (empty when there is no preview), then the
    /// metadata fields.
    pub async fn upload_notes(
        &self,
        token: &str,
        files: &[UploadFile],
        fields: &[(String, String)],
    ) -> Result<UploadReceipt, ApiError> {
        let mut form = Form::new();
        for file in files {
            let part = Part::bytes(file.bytes.clone())
                .file_name(file.name.clone())
                .mime_str("application/pdf")?;
            form = form
                .part("files", part)
                .text("thumbnails", file.thumbnail.clone().unwrap_or_default());
        }
        for (key, value) in fields {
            form = form.text(key.clone(), value.clone());
        }

        let req = self
            .http
            .post(self.endpoint("notes/upload")?)
            .multipart(form)
            .bearer_auth(token);
        decode_or_default(send(req).await?).await
    }
}

// ============================================================================
// Response handling
// ============================================================================

async fn send(req: RequestBuilder) -> Result<Response, ApiError> {
    let resp = req.send().await.map_err(|e| {
        warn!("backend request failed: {}", e);
        ApiError::Network(e)
    })?;

    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    let message = error_message(&body);
    debug!(status = status.as_u16(), %message, "backend rejected request");
    Err(ApiError::Status {
        status: status.as_u16(),
        message,
    })
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, ApiError> {
    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Like [`decode`] but an empty or non-JSON body yields `T::default()`.
async fn decode_or_default<T: DeserializeOwned + Default>(resp: Response) -> Result<T, ApiError> {
    let bytes = resp.bytes().await?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    Ok(serde_json::from_slice(&bytes).unwrap_or_default())
}

/// The backend's explanation from an error body: `error`, then `message`.
pub(crate) fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            ["error", "message"]
                .iter()
                .find_map(|key| v.get(*key).and_then(|m| m.as_str()).map(str::to_string))
        })
        .unwrap_or_default()
}

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;
