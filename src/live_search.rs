//! Live search over a WebSocket.
//!
//! Each connection owns one [`DebouncedSearch`]. Client messages are
//! `{"type":"query","q":"..."}`; the server answers with `cleared`,
//! `loading`, `results` (rendered cards) and `error` messages. Closing the
//! socket closes the search, so late responses are dropped.

use crate::api::ApiClient;
use crate::browse::search_params;
use crate::favourites::FavouriteSet;
use crate::filters::MaterialType;
use crate::models::User;
use crate::search::{DebouncedSearch, FetchFn, SearchUpdate};
use crate::templates::note_cards;
use crate::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use chrono::{DateTime, Utc};
use futures_util::{FutureExt, SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    Query { q: String },
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    Cleared,
    Loading { query: String },
    Results { query: String, count: usize, html: String },
    Error { message: String },
}

pub fn render_update(
    update: SearchUpdate,
    user: &User,
    favourites: &FavouriteSet,
    now: DateTime<Utc>,
) -> ServerMessage {
    match update {
        SearchUpdate::Cleared => ServerMessage::Cleared,
        SearchUpdate::Loading { query, .. } => ServerMessage::Loading { query },
        SearchUpdate::Results { query, notes, .. } => ServerMessage::Results {
            count: notes.len(),
            html: note_cards(&notes, user, favourites, now),
            query,
        },
        SearchUpdate::Failed { message, .. } => ServerMessage::Error { message },
    }
}

/// Material type the page was showing when the socket was opened.
#[derive(Debug, Default, Deserialize)]
pub struct SearchScope {
    pub material_type: Option<String>,
}

impl SearchScope {
    pub fn material(&self) -> Option<MaterialType> {
        self.material_type.as_deref().and_then(MaterialType::from_key)
    }
}

/// GET /ws/search?material_type=...
pub async fn ws_handler(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(scope): Query<SearchScope>,
    ws: WebSocketUpgrade,
) -> Response {
    let Some(session) = state.sessions.current(&jar).await else {
        return (StatusCode::UNAUTHORIZED, "Not logged in").into_response();
    };

    let material = scope.material();
    ws.on_upgrade(move |socket| handle_ws(socket, state, session.id, session.token, material))
}

/// Filtered fetch for one socket, with the same parameters as a direct search.
fn filtered_fetch(api: ApiClient, token: String, material: Option<MaterialType>) -> FetchFn {
    Arc::new(move |q: String| {
        let api = api.clone();
        let token = token.clone();
        async move { api.filtered_notes(&token, &search_params(&q, material)).await }.boxed()
    })
}

async fn handle_ws(
    socket: WebSocket,
    state: Arc<AppState>,
    session_id: String,
    token: String,
    material: Option<MaterialType>,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    let fetch = filtered_fetch(state.api.clone(), token, material);
    let (mut search, mut updates) = DebouncedSearch::new(state.config.search_debounce, fetch);

    // Forward search updates to the client
    let state_clone = state.clone();
    let mut forward_task = tokio::spawn(async move {
        while let Some(update) = updates.recv().await {
            // Render with the session's current user and favourites.
            let Some((user, favourites)) = state_clone
                .sessions
                .update(&session_id, |s| (s.user.clone(), s.favourites.clone()))
                .await
            else {
                break;
            };

            let msg = render_update(update, &user, &favourites, Utc::now());
            let json = match serde_json::to_string(&msg) {
                Ok(j) => j,
                Err(_) => continue,
            };
            if ws_tx.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(ClientMessage::Query { q }) => search.input(&q),
                            Err(e) => debug!("ignoring search message: {}", e),
                        }
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    _ => {}
                }
            }
            _ = &mut forward_task => break,
        }
    }

    // Cleanup
    search.close();
    forward_task.abort();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ApprovalStatus, Note};

    fn user() -> User {
        serde_json::from_value(serde_json::json!({ "id": 1, "name": "Kiran" })).unwrap()
    }

    #[test]
    fn test_client_message_parses() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"query","q":"alg"}"#).unwrap();
        let ClientMessage::Query { q } = msg;
        assert_eq!(q, "alg");
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"other"}"#).is_err());
    }

    #[test]
    fn test_server_message_shape() {
        let json = serde_json::to_value(ServerMessage::Loading {
            query: "alg".to_string(),
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({ "type": "loading", "query": "alg" }));

        let json = serde_json::to_value(ServerMessage::Cleared).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "cleared" }));
    }

    #[test]
    fn test_results_rendered_as_cards() {
        let note = Note {
            id: "3".to_string(),
            title: "Linear Algebra".to_string(),
            created_at: Utc::now(),
            approval_status: ApprovalStatus::Approved,
            rejection_reason: None,
            is_free: true,
            view_count: 0,
            user_id: None,
            thumbnail: None,
        };
        let msg = render_update(
            SearchUpdate::Results {
                seq: 4,
                query: "linear".to_string(),
                notes: vec![note],
            },
            &user(),
            &FavouriteSet::default(),
            Utc::now(),
        );

        match msg {
            ServerMessage::Results { query, count, html } => {
                assert_eq!(query, "linear");
                assert_eq!(count, 1);
                assert!(html.contains("Linear Algebra"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_scope_parses_material() {
        let scope = SearchScope {
            material_type: Some("OriNotes".to_string()),
        };
        assert_eq!(scope.material(), Some(MaterialType::Legacy));
        assert_eq!(SearchScope::default().material(), None);

        let unknown = SearchScope {
            material_type: Some("bogus".to_string()),
        };
        assert_eq!(unknown.material(), None);
    }

    #[tokio::test]
    async fn test_fetch_carries_material_type() {
        use axum::{extract::Query, routing::get, Json, Router};
        use std::collections::HashMap;
        use std::sync::Mutex;
        use std::time::Duration;

        let seen: Arc<Mutex<Vec<HashMap<String, String>>>> = Arc::default();
        let log = seen.clone();
        let app = Router::new().route(
            "/api/notes/filtered",
            get(move |Query(params): Query<HashMap<String, String>>| {
                let log = log.clone();
                async move {
                    log.lock().unwrap().push(params);
                    Json(serde_json::json!([]))
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let base = url::Url::parse(&format!("http://{}/api/", addr)).unwrap();
        let api = ApiClient::new(base, Duration::from_secs(5)).unwrap();
        let fetch = filtered_fetch(api, "tok".to_string(), Some(MaterialType::University));

        assert!((*fetch)("algebra".to_string()).await.unwrap().is_empty());

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].get("q").map(String::as_str), Some("algebra"));
        assert_eq!(seen[0].get("material_type").map(String::as_str), Some("university"));
    }

    #[test]
    fn test_failure_becomes_error() {
        let msg = render_update(
            SearchUpdate::Failed {
                seq: 1,
                query: "abc".to_string(),
                message: "Could not reach the server. Please try again.".to_string(),
            },
            &user(),
            &FavouriteSet::default(),
            Utc::now(),
        );
        assert_eq!(
            msg,
            ServerMessage::Error {
                message: "Could not reach the server. Please try again.".to_string()
            }
        );
    }
}
