//! The Notes page: material type, cascading filters or the university form,
//! search, and the resulting note cards.

use crate::auth::Session;
use crate::catalog::LEGACY_BROWSE;
use crate::filters::{FilterSelection, MaterialType};
use crate::handlers::current_session;
use crate::models::AvailableFilters;
use crate::search::MIN_QUERY_CHARS;
use crate::templates::{
    base_html, error_box, html_escape, info_box, note_cards, query_string, selection_grid,
    LIVE_SEARCH_JS,
};
use crate::AppState;
use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use chrono::Utc;
use std::sync::Arc;
use tracing::warn;

const FETCH_FAILED: &str = "Failed to fetch notes. Please try again.";

/// Query keys sent by the university browse form.
const UNIVERSITY_KEYS: [&str; 3] = ["course", "subject", "semester"];

/// Semesters offered in the university form.
const MAX_SEMESTER: u8 = 8;

fn param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.trim())
        .filter(|v| !v.is_empty())
}

/// Cards for `GET /notes/filtered` with `params`, or an inline error.
async fn fetch_cards(state: &AppState, session: &Session, params: &[(String, String)]) -> String {
    match state.api.filtered_notes(&session.token, params).await {
        Ok(notes) => note_cards(&notes, &session.user, &session.favourites, Utc::now()),
        Err(e) => {
            warn!("filtered fetch failed: {}", e);
            error_box(FETCH_FAILED)
        }
    }
}

/// Query for a title search, scoped to `material` when one is chosen. Both
/// the direct and the live search send exactly this.
pub fn search_params(q: &str, material: Option<MaterialType>) -> Vec<(String, String)> {
    let mut query = vec![("q".to_string(), q.to_string())];
    if let Some(m) = material {
        query.push(("material_type".to_string(), m.key().to_string()));
    }
    query
}

fn search_box(material: Option<MaterialType>, q: &str) -> String {
    let hidden = material
        .map(|m| format!(r#"<input type="hidden" name="material_type" value="{}">"#, m.key()))
        .unwrap_or_default();
    format!(
        r#"<form class="live-search" method="get" action="/notes">
            {hidden}
            <input id="live-search-input" type="search" name="q" value="{q}" placeholder="Search notes by title..." autocomplete="off">
            <button class="btn secondary" type="submit">Search</button>
        </form>
        <p id="search-status" class="search-status"></p>"#,
        hidden = hidden,
        q = html_escape(q),
    )
}

fn material_grid() -> String {
    let options: Vec<(String, String)> = [MaterialType::Legacy, MaterialType::University]
        .iter()
        .map(|m| (format!("/notes?material_type={}", m.key()), m.label().to_string()))
        .collect();
    selection_grid("Select Material Type", &options)
}

/// Breadcrumb links; each drops the levels after it.
fn breadcrumbs(selection: &FilterSelection) -> String {
    let material = MaterialType::Legacy.key();
    let mut links = vec![r#"<a href="/notes">&larr; Start Over</a>"#.to_string()];
    let pairs = selection.pairs();

    for i in 0..pairs.len() {
        let mut query = vec![("material_type", material)];
        query.extend(pairs[..=i].iter().copied());
        links.push(format!(
            r#"<a href="/notes{}">{}</a>"#,
            html_escape(&query_string(&query)),
            html_escape(pairs[i].1)
        ));
    }
    format!(r#"<p class="breadcrumbs">{}</p>"#, links.join(" / "))
}

/// Next selection grid, or `None` once the selection is complete.
fn cascade_grid(selection: &FilterSelection) -> Option<String> {
    let step = selection.next_step()?;
    let material = MaterialType::Legacy.key();

    let options: Vec<(String, String)> = step
        .options
        .iter()
        .map(|option| {
            let mut query = vec![("material_type", material)];
            query.extend(selection.pairs());
            query.push((step.level.key(), option.as_str()));
            (format!("/notes{}", query_string(&query)), option.clone())
        })
        .collect();

    Some(selection_grid(&step.level.prompt(), &options))
}

fn select_field(name: &str, label: &str, options: &[String], current: Option<&str>) -> String {
    let opts: String = options
        .iter()
        .map(|o| {
            format!(
                r#"<option value="{v}"{sel}>{v}</option>"#,
                v = html_escape(o),
                sel = if current == Some(o.as_str()) { " selected" } else { "" }
            )
        })
        .collect();
    format!(
        r#"<div class="form-group">
            <label for="{name}">{label}</label>
            <select id="{name}" name="{name}"><option value="">Any</option>{opts}</select>
        </div>"#,
        name = name,
        label = label,
        opts = opts,
    )
}

fn university_form(filters: &AvailableFilters, params: &[(String, String)]) -> String {
    let semesters: Vec<String> = (1..=MAX_SEMESTER).map(|n| n.to_string()).collect();
    format!(
        r#"<h2>Refine by Course / Subject</h2>
        <form method="get" action="/notes">
            <input type="hidden" name="material_type" value="{material}">
            <input type="hidden" name="go" value="1">
            <div class="form-row">{course}{subject}{semester}</div>
            <button class="btn" type="submit">Get Notes</button>
            <a class="btn secondary" href="/notes?material_type={material}">Clear</a>
        </form>"#,
        material = MaterialType::University.key(),
        course = select_field("course", "Course", &filters.courses, param(params, "course")),
        subject = select_field("subject", "Subject", &filters.subjects, param(params, "subject")),
        semester = select_field("semester", "Semester", &semesters, param(params, "semester")),
    )
}

/// GET /notes
pub async fn notes_page(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(params): Query<Vec<(String, String)>>,
) -> Response {
    let session = match current_session(&state, &jar).await {
        Ok(s) => s,
        Err(redirect) => return redirect,
    };

    let material = param(&params, "material_type").and_then(MaterialType::from_key);
    let q = param(&params, "q").unwrap_or("");

    let mut html = String::from("<h1>Browse Notes</h1>");
    html.push_str(&search_box(material, q));

    // Direct search (no script): same minimum as the live search.
    let mut results = String::new();
    if !q.is_empty() {
        if q.chars().count() < MIN_QUERY_CHARS {
            results = info_box("Type at least 3 characters to search.");
        } else {
            results = fetch_cards(&state, &session, &search_params(q, material)).await;
        }
    }
    html.push_str(&format!(r#"<div id="search-results">{}</div>"#, results));

    match material {
        None => html.push_str(&material_grid()),
        Some(MaterialType::Legacy) => {
            let selection = FilterSelection::from_params(
                &LEGACY_BROWSE,
                params.iter().map(|(k, v)| (k.as_str(), v.as_str())),
            );
            html.push_str(&breadcrumbs(&selection));

            match cascade_grid(&selection) {
                Some(grid) => html.push_str(&grid),
                None => {
                    let mut query = vec![(
                        "material_type".to_string(),
                        MaterialType::Legacy.key().to_string(),
                    )];
                    query.extend(selection.pairs().into_iter().map(|(k, v)| (k.to_string(), v.to_string())));
                    html.push_str("<h2>Available Notes</h2>");
                    html.push_str(&fetch_cards(&state, &session, &query).await);
                }
            }
        }
        Some(MaterialType::University) => {
            html.push_str(r#"<p class="breadcrumbs"><a href="/notes">&larr; Start Over</a></p>"#);

            let filters = match state.api.available_subjects(&session.token).await {
                Ok(f) => f,
                Err(e) => {
                    warn!("available subjects unavailable: {}", e);
                    html.push_str(&error_box("Failed to load browsing filters"));
                    AvailableFilters::default()
                }
            };
            html.push_str(&university_form(&filters, &params));

            if param(&params, "go").is_some() {
                let mut query = vec![(
                    "material_type".to_string(),
                    MaterialType::University.key().to_string(),
                )];
                for key in UNIVERSITY_KEYS {
                    if let Some(value) = param(&params, key) {
                        query.push((key.to_string(), value.to_string()));
                    }
                }
                html.push_str("<h2>Available Notes</h2>");
                html.push_str(&fetch_cards(&state, &session, &query).await);
            }
        }
    }

    html.push_str(&format!("<script>{}</script>", LIVE_SEARCH_JS));
    Html(base_html("Notes", &html, Some(&session.user))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::FilterLevel;

    #[test]
    fn test_grid_links_carry_ancestors() {
        let selection = FilterSelection::new(&LEGACY_BROWSE).apply(FilterLevel::InstitutionType, "School");
        let grid = cascade_grid(&selection).unwrap();
        assert!(grid.contains("Select Field / Class"));
        assert!(grid.contains(
            "/notes?material_type=OriNotes&amp;institution_type=School&amp;field=Class%2012"
        ));
    }

    #[test]
    fn test_complete_selection_has_no_grid() {
        let selection = FilterSelection::new(&LEGACY_BROWSE)
            .apply(FilterLevel::InstitutionType, "School")
            .apply(FilterLevel::Field, "Class 12");
        assert!(cascade_grid(&selection).is_none());
    }

    #[test]
    fn test_breadcrumbs_truncate_path() {
        let selection = FilterSelection::new(&LEGACY_BROWSE)
            .apply(FilterLevel::InstitutionType, "College")
            .apply(FilterLevel::Field, "Engineering");
        let html = breadcrumbs(&selection);
        assert!(html.contains("Start Over"));
        assert!(html.contains(r#"href="/notes?material_type=OriNotes&amp;institution_type=College">College"#));
    }

    #[test]
    fn test_university_form_marks_selection() {
        let filters = AvailableFilters {
            courses: vec!["BCA".to_string(), "MBA".to_string()],
            ..Default::default()
        };
        let params = vec![("course".to_string(), "MBA".to_string())];
        let html = university_form(&filters, &params);
        assert!(html.contains(r#"<option value="MBA" selected>"#));
        assert!(html.contains(r#"<option value="8">"#));
    }

    #[test]
    fn test_search_params_scope() {
        assert_eq!(search_params("alg", None), vec![("q".to_string(), "alg".to_string())]);
        assert_eq!(
            search_params("alg", Some(MaterialType::University)),
            vec![
                ("q".to_string(), "alg".to_string()),
                ("material_type".to_string(), "university".to_string()),
            ]
        );
    }

    #[test]
    fn test_param_ignores_blank() {
        let params = vec![
            ("q".to_string(), "   ".to_string()),
            ("course".to_string(), " BCA ".to_string()),
        ];
        assert_eq!(param(&params, "q"), None);
        assert_eq!(param(&params, "course"), Some("BCA"));
    }
}
