//! Sessions for signed-in users.
//!
//! The browser only ever holds an HMAC-signed session id. The backend token,
//! the user record and the favourite set stay on the server in a
//! [`SessionStore`]. A session is created at sign-in and destroyed at sign-out
//! or when it expires.

use crate::favourites::FavouriteSet;
use crate::models::User;
use axum::http::{header::SET_COOKIE, HeaderValue};
use axum::response::Response;
use axum_extra::extract::CookieJar;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;
use std::collections::HashMap;
use subtle::ConstantTimeEq;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

type HmacSha256 = Hmac<Sha256>;

/// Session cookie name
pub const SESSION_COOKIE: &str = "orinotes_session";

/// Session time-to-live in hours
pub const SESSION_TTL_HOURS: i64 = 24;

const SESSION_ID_LEN: usize = 32;

// ============================================================================
// Session Structure
// ============================================================================

#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    /// Bearer token for backend calls.
    pub token: String,
    pub user: User,
    pub favourites: FavouriteSet,
    pub created: DateTime<Utc>,
    pub expires: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires
    }
}

// ============================================================================
// Session Store
// ============================================================================

pub struct SessionStore {
    secret: Vec<u8>,
    ttl: Duration,
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new(secret: Vec<u8>) -> Self {
        Self::with_ttl(secret, Duration::hours(SESSION_TTL_HOURS))
    }

    pub fn with_ttl(secret: Vec<u8>, ttl: Duration) -> Self {
        Self {
            secret,
            ttl,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Start a session and return the signed cookie value for it.
    pub async fn create(&self, token: String, user: User, favourites: FavouriteSet) -> String {
        let id = random_id();
        let now = Utc::now();
        info!(user = %user.id, "session started");

        let session = Session {
            id: id.clone(),
            token,
            user,
            favourites,
            created: now,
            expires: now + self.ttl,
        };
        self.sessions.write().await.insert(id.clone(), session);

        self.sign(&id)
    }

    /// The session named by the request's cookie, if it is signed correctly
    /// and has not expired. Expired sessions are dropped on sight.
    pub async fn current(&self, jar: &CookieJar) -> Option<Session> {
        let id = self.verify(jar.get(SESSION_COOKIE)?.value())?;

        let session = self.sessions.read().await.get(&id).cloned()?;
        if session.is_expired(Utc::now()) {
            debug!(user = %session.user.id, "session expired");
            self.sessions.write().await.remove(&id);
            return None;
        }
        Some(session)
    }

    /// Run `f` against the stored session; `None` when it no longer exists.
    pub async fn update<R>(&self, id: &str, f: impl FnOnce(&mut Session) -> R) -> Option<R> {
        self.sessions.write().await.get_mut(id).map(f)
    }

    pub async fn destroy(&self, jar: &CookieJar) {
        let Some(id) = jar
            .get(SESSION_COOKIE)
            .and_then(|cookie| self.verify(cookie.value()))
        else {
            return;
        };

        if let Some(session) = self.sessions.write().await.remove(&id) {
            info!(user = %session.user.id, "session ended");
        }
    }

    /// Remove every expired session.
    pub async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired(now));
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// `<id>.<hex hmac(id)>`
    fn sign(&self, id: &str) -> String {
        format!("{}.{}", id, hex_encode(&self.mac(id)))
    }

    /// Session id from a cookie value, or `None` if the signature is wrong.
    fn verify(&self, value: &str) -> Option<String> {
        let (id, signature) = value.split_once('.')?;
        let expected = hex_encode(&self.mac(id));

        // Constant-time comparison to prevent timing attacks
        let sig_bytes = signature.as_bytes();
        let expected_bytes = expected.as_bytes();
        if sig_bytes.len() != expected_bytes.len() {
            return None;
        }
        if sig_bytes.ct_eq(expected_bytes).unwrap_u8() != 1 {
            return None;
        }

        Some(id.to_string())
    }

    fn mac(&self, id: &str) -> Vec<u8> {
        // HMAC accepts keys of any length.
        let mut mac = match HmacSha256::new_from_slice(&self.secret) {
            Ok(m) => m,
            Err(_) => return Vec::new(),
        };
        mac.update(id.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}

// ============================================================================
// Cookies
// ============================================================================

pub fn session_cookie(value: &str, secure: bool) -> String {
    format!(
        "{}={}; Path=/; HttpOnly;{} SameSite=Lax; Max-Age={}",
        SESSION_COOKIE,
        value,
        if secure { " Secure;" } else { "" },
        SESSION_TTL_HOURS * 3600
    )
}

pub fn clear_cookie(secure: bool) -> String {
    format!(
        "{}=; Path=/; HttpOnly;{} Max-Age=0",
        SESSION_COOKIE,
        if secure { " Secure;" } else { "" },
    )
}

/// Attach a `Set-Cookie` header to `response`.
pub fn with_cookie(mut response: Response, cookie: &str) -> Response {
    match HeaderValue::from_str(cookie) {
        Ok(value) => {
            response.headers_mut().append(SET_COOKIE, value);
        }
        Err(e) => warn!("dropping malformed cookie: {}", e),
    }
    response
}

// ============================================================================
// Encoding Helpers
// ============================================================================

fn random_id() -> String {
    rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(SESSION_ID_LEN)
        .map(char::from)
        .collect()
}

/// Encode bytes as hexadecimal
pub fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum_extra::extract::cookie::Cookie;

    fn user() -> User {
        serde_json::from_value(serde_json::json!({ "id": 7, "name": "Ravi" })).unwrap()
    }

    fn jar_with(value: &str) -> CookieJar {
        CookieJar::new().add(Cookie::new(SESSION_COOKIE, value.to_string()))
    }

    #[tokio::test]
    async fn test_create_then_lookup() {
        let store = SessionStore::new(b"secret".to_vec());
        let value = store
            .create("tok".to_string(), user(), FavouriteSet::default())
            .await;

        let session = store.current(&jar_with(&value)).await.expect("session");
        assert_eq!(session.token, "tok");
        assert_eq!(session.user.id, "7");
    }

    #[tokio::test]
    async fn test_tampered_cookie_rejected() {
        let store = SessionStore::new(b"secret".to_vec());
        let value = store
            .create("tok".to_string(), user(), FavouriteSet::default())
            .await;
        let (id, sig) = value.split_once('.').unwrap();

        let forged = format!("{}x.{}", id, sig);
        assert!(store.current(&jar_with(&forged)).await.is_none());
        assert!(store.current(&jar_with(id)).await.is_none());

        let other = SessionStore::new(b"another".to_vec());
        assert!(other.current(&jar_with(&value)).await.is_none());
    }

    #[tokio::test]
    async fn test_expired_session_is_removed() {
        let store = SessionStore::with_ttl(b"secret".to_vec(), Duration::seconds(-1));
        let value = store
            .create("tok".to_string(), user(), FavouriteSet::default())
            .await;

        assert!(store.current(&jar_with(&value)).await.is_none());
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_destroy_and_update() {
        let store = SessionStore::new(b"secret".to_vec());
        let value = store
            .create("tok".to_string(), user(), FavouriteSet::default())
            .await;
        let jar = jar_with(&value);
        let id = store.current(&jar).await.unwrap().id;

        let change = store.update(&id, |s| s.favourites.toggle("4")).await;
        assert!(change.unwrap().is_added());
        assert!(store.current(&jar).await.unwrap().favourites.contains("4"));

        store.destroy(&jar).await;
        assert!(store.current(&jar).await.is_none());
        assert!(store.update(&id, |_| ()).await.is_none());
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let store = SessionStore::with_ttl(b"k".to_vec(), Duration::seconds(-1));
        store.create("a".to_string(), user(), FavouriteSet::default()).await;
        store.create("b".to_string(), user(), FavouriteSet::default()).await;
        assert_eq!(store.purge_expired().await, 2);
    }

    #[test]
    fn test_cookie_strings() {
        assert_eq!(
            session_cookie("abc.def", true),
            "orinotes_session=abc.def; Path=/; HttpOnly; Secure; SameSite=Lax; Max-Age=86400"
        );
        assert_eq!(
            clear_cookie(false),
            "orinotes_session=; Path=/; HttpOnly; Max-Age=0"
        );
    }
}
