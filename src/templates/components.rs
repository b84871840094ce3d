//! Shared HTML components for the OriNotes pages.
//!
//! Contains the navigation bar, base HTML template, note cards and the small
//! building blocks the pages are assembled from.

use crate::access::{self, AccessDecision, FREE_VIEW_LIMIT};
use crate::favourites::FavouriteSet;
use crate::models::{ApprovalStatus, Note, User};
use chrono::{DateTime, Utc};

use super::scripts::COMMON_JS;
use super::styles::STYLE;

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// `?k=v&...` with every key and value percent-encoded; empty for no pairs.
pub fn query_string(pairs: &[(&str, &str)]) -> String {
    if pairs.is_empty() {
        return String::new();
    }
    let joined: Vec<String> = pairs
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect();
    format!("?{}", joined.join("&"))
}

// ============================================================================
// Navigation Bar
// ============================================================================

pub fn nav_bar(user: Option<&User>) -> String {
    let links = match user {
        Some(user) => format!(
            r#"<a href="/dashboard">Dashboard</a>
            <a href="/notes">Notes</a>
            <a href="/my-notes">My Notes</a>
            <a href="/upload">Upload</a>
            <span class="spacer"></span>
            <span class="who">{}</span>
            <a href="/logout">Logout</a>"#,
            html_escape(user.display_name())
        ),
        None => r#"<span class="spacer"></span>
            <a href="/login">Login</a>
            <a href="/register">Register</a>"#
            .to_string(),
    };

    format!(
        r#"<nav class="nav-bar">
            <a href="/" class="brand">OriNotes</a>
            {}
        </nav>"#,
        links
    )
}

// ============================================================================
// Base HTML Template
// ============================================================================

pub fn base_html(title: &str, content: &str, user: Option<&User>) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title} - OriNotes</title>
    <style>{style}</style>
</head>
<body>
    {nav}
    <div class="container">
        {content}
    </div>
    <script>{script}</script>
</body>
</html>"#,
        title = html_escape(title),
        style = STYLE,
        nav = nav_bar(user),
        content = content,
        script = COMMON_JS,
    )
}

// ============================================================================
// Messages
// ============================================================================

pub fn error_box(text: &str) -> String {
    format!(r#"<div class="message error">{}</div>"#, html_escape(text))
}

pub fn success_box(text: &str) -> String {
    format!(r#"<div class="message success">{}</div>"#, html_escape(text))
}

pub fn info_box(text: &str) -> String {
    format!(r#"<div class="message info">{}</div>"#, html_escape(text))
}

// ============================================================================
// Note Cards
// ============================================================================

fn thumbnail_img(note: &Note) -> String {
    match note.thumbnail.as_deref() {
        Some(src) if src.starts_with("data:image/") || src.starts_with("https://") => format!(
            r#"<img class="thumb" src="{}" alt="Preview of {}">"#,
            html_escape(src),
            html_escape(&note.title)
        ),
        _ => String::new(),
    }
}

fn view_href(note: &Note) -> String {
    format!("/notes/{}/view", urlencoding::encode(&note.id))
}

/// Card for a browsable note: access-gated action plus favourite toggle.
pub fn note_card(note: &Note, decision: AccessDecision, favourite: bool) -> String {
    let action = match (decision, decision.action_label()) {
        (AccessDecision::Denied { .. }, Some(label)) => format!(
            r#"<a class="btn subscribe" href="/dashboard#subscription">{}</a>"#,
            html_escape(&label)
        ),
        (_, Some(label)) => format!(
            r#"<a class="btn" href="{}" target="_blank" rel="noopener">{}</a>"#,
            view_href(note),
            html_escape(&label)
        ),
        (_, None) => format!(
            r#"<p class="notice" title="{}">Subscriptions disabled</p>"#,
            html_escape(decision.denial_message().unwrap_or_default())
        ),
    };

    format!(
        r#"<div class="note-card{locked}" data-note-id="{id}">
            {thumb}
            <h3>{title}</h3>
            <p class="meta">Views: {views} &middot; {created}</p>
            <div class="actions">
                {action}
                <button class="fav-toggle{on}" data-note-id="{id}" onclick="toggleFavourite(this)" title="Favourite">&#9733;</button>
            </div>
        </div>"#,
        locked = if decision.is_granted() { "" } else { " locked" },
        id = html_escape(&note.id),
        thumb = thumbnail_img(note),
        title = html_escape(&note.title),
        views = note.view_count,
        created = note.created_at.format("%Y-%m-%d"),
        action = action,
        on = if favourite { " on" } else { "" },
    )
}

/// Grid of [`note_card`]s, or an empty-state line.
pub fn note_cards(notes: &[Note], user: &User, favourites: &FavouriteSet, now: DateTime<Utc>) -> String {
    if notes.is_empty() {
        return r#"<p class="meta">No notes found for this selection.</p>"#.to_string();
    }

    let cards: String = notes
        .iter()
        .map(|note| {
            note_card(
                note,
                access::evaluate(note, user, now),
                favourites.contains(&note.id),
            )
        })
        .collect();
    format!(r#"<div class="card-grid">{}</div>"#, cards)
}

pub fn status_badge(status: ApprovalStatus) -> String {
    format!(
        r#"<span class="status-badge {status}">{status}</span>"#,
        status = status
    )
}

/// Card on the uploader's own list: status, rejection reason, view and delete.
pub fn own_note_card(note: &Note) -> String {
    let reason = match (note.approval_status, note.rejection_reason.as_deref()) {
        (ApprovalStatus::Rejected, Some(reason)) if !reason.is_empty() => format!(
            r#"<p class="reason">Reason: {}</p>"#,
            html_escape(reason)
        ),
        _ => String::new(),
    };

    format!(
        r#"<div class="note-card" data-note-id="{id}">
            {thumb}
            <h3>{title} {badge}</h3>
            <p class="meta">Views: {views} &middot; Uploaded {created}</p>
            {reason}
            <div class="actions">
                <button class="btn secondary" onclick="openViewer('{id_js}')">View</button>
                <button class="btn danger" data-note-id="{id}" data-title="{title}" onclick="deleteNote(this)">Delete</button>
            </div>
        </div>"#,
        id = html_escape(&note.id),
        id_js = html_escape(&note.id.replace('\\', "\\\\").replace('\'', "\\'")),
        thumb = thumbnail_img(note),
        title = html_escape(&note.title),
        badge = status_badge(note.approval_status),
        views = note.view_count,
        created = note.created_at.format("%Y-%m-%d"),
        reason = reason,
    )
}

pub fn viewer_modal() -> &'static str {
    r#"<div class="modal-overlay" id="viewer-overlay" onclick="if(event.target===this)closeViewer()">
        <div class="modal">
            <div class="modal-header"><button class="btn secondary" onclick="closeViewer()">Close</button></div>
            <iframe id="viewer-frame" src="about:blank" title="Note viewer"></iframe>
        </div>
    </div>"#
}

// ============================================================================
// Selection Grid
// ============================================================================

/// Grid of option tiles; each tile is `(href, label)`.
pub fn selection_grid(title: &str, options: &[(String, String)]) -> String {
    let tiles: String = options
        .iter()
        .map(|(href, label)| {
            format!(
                r#"<a href="{}">{}</a>"#,
                html_escape(href),
                html_escape(label)
            )
        })
        .collect();

    format!(
        r#"<h2>{}</h2><div class="selection-grid">{}</div>"#,
        html_escape(title),
        tiles
    )
}

// ============================================================================
// Dashboard
// ============================================================================

pub fn stat_card(label: &str, value: &str, detail: Option<&str>) -> String {
    format!(
        r#"<div class="stat-card"><p class="label">{}</p><p class="value">{}</p>{}</div>"#,
        html_escape(label),
        html_escape(value),
        detail
            .map(|d| format!(r#"<p class="detail">{}</p>"#, html_escape(d)))
            .unwrap_or_default()
    )
}

pub fn free_views_detail(user: &User) -> String {
    format!("Free Views Used: {} / {}", user.free_views.min(FREE_VIEW_LIMIT), FREE_VIEW_LIMIT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    fn note(id: &str, is_free: bool) -> Note {
        Note {
            id: id.to_string(),
            title: "Rust & <Friends>".to_string(),
            created_at: Utc::now(),
            approval_status: ApprovalStatus::Approved,
            rejection_reason: None,
            is_free,
            view_count: 3,
            user_id: None,
            thumbnail: None,
        }
    }

    fn user(free_views: u32, subscriptions: bool) -> User {
        User {
            id: "u".to_string(),
            name: "Meera".to_string(),
            email: "m@example.com".to_string(),
            role: Role::User,
            subscription_expiry: None,
            free_views,
            is_subscription_enabled: subscriptions,
        }
    }

    #[test]
    fn test_card_escapes_title() {
        let html = note_card(&note("1", true), AccessDecision::FreeNote, false);
        assert!(html.contains("Rust &amp; &lt;Friends&gt;"));
        assert!(html.contains("View Note"));
        assert!(html.contains(r#"href="/notes/1/view""#));
    }

    #[test]
    fn test_card_labels_follow_gate() {
        let now = Utc::now();
        let favourites = FavouriteSet::default();

        let html = note_cards(&[note("1", false)], &user(1, true), &favourites, now);
        assert!(html.contains("View (Free 1/2)"));

        let html = note_cards(&[note("1", false)], &user(2, true), &favourites, now);
        assert!(html.contains("Subscribe"));
        assert!(html.contains("locked"));

        let html = note_cards(&[note("1", false)], &user(2, false), &favourites, now);
        assert!(html.contains("Subscriptions disabled"));
        assert!(!html.contains("/notes/1/view"));
    }

    #[test]
    fn test_favourite_marked() {
        let favourites: FavouriteSet = vec!["7".to_string()].into_iter().collect();
        let html = note_cards(&[note("7", true)], &user(0, true), &favourites, Utc::now());
        assert!(html.contains("fav-toggle on"));
    }

    #[test]
    fn test_empty_cards() {
        let html = note_cards(&[], &user(0, true), &FavouriteSet::default(), Utc::now());
        assert!(html.contains("No notes found"));
    }

    #[test]
    fn test_rejected_card_shows_reason() {
        let mut n = note("4", true);
        n.approval_status = ApprovalStatus::Rejected;
        n.rejection_reason = Some("Duplicate upload".to_string());
        let html = own_note_card(&n);
        assert!(html.contains("status-badge rejected"));
        assert!(html.contains("Reason: Duplicate upload"));
    }

    #[test]
    fn test_query_string_encodes() {
        assert_eq!(query_string(&[]), "");
        assert_eq!(
            query_string(&[("field", "Class 12"), ("course", "B.Tech")]),
            "?field=Class%2012&course=B.Tech"
        );
    }

    #[test]
    fn test_nav_depends_on_user() {
        assert!(nav_bar(None).contains("/login"));
        let u = user(0, true);
        let nav = nav_bar(Some(&u));
        assert!(nav.contains("/logout"));
        assert!(nav.contains("Meera"));
    }
}
