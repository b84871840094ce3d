//! Note uploads.
//!
//! A submission is staged into an [`UploadBatch`] (at most [`MAX_FILES`]
//! PDFs, non-PDFs skipped), each accepted file gets a thumbnail attempt, and
//! the batch is sent only once the [`UploadMetadata`] for the chosen material
//! type is complete.

use crate::api::UploadFile;
use crate::catalog::{PERSONAL_UPLOAD, UNIVERSITY_UPLOAD};
use crate::filters::{FilterLevel, FilterSelection, Hierarchy, OTHER_OPTION};
use crate::handlers::current_session;
use crate::templates::{base_html, error_box, html_escape, info_box, selection_grid, success_box, UPLOAD_JS};
use crate::thumbnail::generate_thumbnail_async;
use crate::AppState;
use axum::{
    extract::{Multipart, Query, State},
    response::{Html, IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

pub const MAX_FILES: usize = 10;

/// Request body cap for the upload route.
pub const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum UploadError {
    #[error("Maximum 10 PDFs allowed per upload.")]
    TooManyFiles,

    #[error("Please select at least one PDF.")]
    NoFiles,

    #[error("Please complete all metadata fields before uploading.")]
    IncompleteMetadata,
}

// ============================================================================
// Batch
// ============================================================================

/// A file as received from the browser.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl IncomingFile {
    pub fn is_pdf(&self) -> bool {
        self.content_type
            .as_deref()
            .and_then(|ct| ct.split(';').next())
            .is_some_and(|ct| ct.trim().eq_ignore_ascii_case(PDF_CONTENT_TYPE))
    }
}

#[derive(Debug, Default)]
pub struct UploadBatch {
    files: Vec<UploadFile>,
}

/// What happened to one drop of files.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub accepted: usize,
    /// One "<name> is not a PDF" line per rejected file.
    pub skipped: Vec<String>,
}

impl UploadBatch {
    /// Stage a drop of files. The count limit covers files already staged
    /// plus the whole drop; exceeding it stages nothing.
    pub fn add_files(&mut self, incoming: Vec<IncomingFile>) -> Result<BatchOutcome, UploadError> {
        if self.files.len() + incoming.len() > MAX_FILES {
            return Err(UploadError::TooManyFiles);
        }

        let mut outcome = BatchOutcome::default();
        for file in incoming {
            if file.is_pdf() {
                self.files.push(UploadFile {
                    name: file.name,
                    bytes: file.bytes,
                    thumbnail: None,
                });
                outcome.accepted += 1;
            } else {
                outcome.skipped.push(format!("{} is not a PDF", file.name));
            }
        }
        Ok(outcome)
    }

    /// Try a thumbnail for every staged file that lacks one, one at a time.
    pub async fn attach_thumbnails(&mut self) {
        for file in self.files.iter_mut().filter(|f| f.thumbnail.is_none()) {
            file.thumbnail = generate_thumbnail_async(file.bytes.clone()).await;
            if file.thumbnail.is_none() {
                info!(file = %file.name, "no preview for upload");
            }
        }
    }

    pub fn files(&self) -> &[UploadFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

// ============================================================================
// Metadata
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadMaterial {
    Personal,
    University,
}

impl UploadMaterial {
    pub const ALL: [UploadMaterial; 2] = [UploadMaterial::Personal, UploadMaterial::University];

    pub fn key(self) -> &'static str {
        match self {
            UploadMaterial::Personal => "personal_material",
            UploadMaterial::University => "university_material",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.key() == key)
    }

    pub fn label(self) -> &'static str {
        match self {
            UploadMaterial::Personal => "Personal Material",
            UploadMaterial::University => "University Material",
        }
    }

    pub fn hierarchy(self) -> &'static Hierarchy {
        match self {
            UploadMaterial::Personal => &PERSONAL_UPLOAD,
            UploadMaterial::University => &UNIVERSITY_UPLOAD,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploadMetadata {
    pub material: UploadMaterial,
    pub selection: FilterSelection,
    /// Free-text replacements for levels set to "Other".
    pub other: BTreeMap<FilterLevel, String>,
}

impl UploadMetadata {
    /// Build from submitted form pairs; `None` without a known material type.
    pub fn from_form(params: &[(String, String)]) -> Option<Self> {
        let material = params
            .iter()
            .find(|(k, _)| k == "material_type")
            .and_then(|(_, v)| UploadMaterial::from_key(v))?;

        let selection = FilterSelection::from_form(material.hierarchy(), params);
        let other = material
            .hierarchy()
            .levels
            .iter()
            .filter(|spec| spec.allows_other)
            .filter_map(|spec| {
                let key = spec.level.other_key();
                params
                    .iter()
                    .find(|(k, _)| *k == key)
                    .map(|(_, v)| (spec.level, v.trim().to_string()))
            })
            .filter(|(_, v)| !v.is_empty())
            .collect();

        Some(Self {
            material,
            selection,
            other,
        })
    }

    /// Levels currently set to "Other".
    fn other_levels(&self) -> impl Iterator<Item = FilterLevel> + '_ {
        self.material
            .hierarchy()
            .levels
            .iter()
            .map(|spec| spec.level)
            .filter(|level| self.selection.get(*level) == Some(OTHER_OPTION))
    }

    /// Every level is chosen or skipped, and every "Other" has its text.
    pub fn is_complete(&self) -> bool {
        self.selection.is_complete() && self.other_levels().all(|level| self.other.contains_key(&level))
    }

    /// Form fields sent with the upload, "Other" replaced by its text.
    pub fn fields(&self) -> Vec<(String, String)> {
        let mut fields = vec![("material_type".to_string(), self.material.key().to_string())];
        for (key, value) in self.selection.pairs() {
            let value = FilterLevel::from_key(key)
                .filter(|_| value == OTHER_OPTION)
                .and_then(|level| self.other.get(&level))
                .map(String::as_str)
                .unwrap_or(value);
            fields.push((key.to_string(), value.to_string()));
        }
        fields
    }
}

// ============================================================================
// Page
// ============================================================================

/// Outcome shown under the form after a submission.
#[derive(Default)]
struct UploadFeedback {
    error: Option<String>,
    skipped: Vec<String>,
    success: Option<String>,
    uploaded: Vec<UploadFile>,
}

fn cascade_selects(meta: &UploadMetadata) -> String {
    let hierarchy = meta.material.hierarchy();
    let selection = &meta.selection;
    let next = selection.next_step().map(|step| step.level);

    let mut html = String::new();
    for spec in hierarchy.levels {
        let current = selection.get(spec.level);
        if current.is_none() && next != Some(spec.level) {
            continue;
        }

        let mut options = hierarchy.options_for(selection, spec.level);
        if spec.allows_other {
            options.push(OTHER_OPTION.to_string());
        }

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

        html.push_str(&format!(
            r#"<div class="form-group">
                <label for="sel-{key}">{label}</label>
                <select id="sel-{key}" name="{key}" onchange="cascadeChange(this)">
                    <option value="">-- {prompt} --</option>{opts}
                </select>
            </div>"#,
            key = spec.level.key(),
            label = spec.level.label(),
            prompt = spec.level.prompt(),
            opts = opts,
        ));

        if current.is_none() {
            break;
        }
    }
    html
}

fn render_upload_form(meta: &UploadMetadata) -> String {
    // Raw selection; "Other" text travels in its own input.
    let hidden: String = std::iter::once(("material_type", meta.material.key()))
        .chain(meta.selection.pairs())
        .map(|(k, v)| {
            format!(
                r#"<input type="hidden" name="{}" value="{}">"#,
                k,
                html_escape(v)
            )
        })
        .collect();

    let other_inputs: String = meta
        .other_levels()
        .map(|level| {
            format!(
                r#"<div class="form-group">
                    <label for="{key}">{label} (Other)</label>
                    <input id="{key}" name="{key}" value="{value}" required>
                </div>"#,
                key = level.other_key(),
                label = level.label(),
                value = html_escape(meta.other.get(&level).map(String::as_str).unwrap_or("")),
            )
        })
        .collect();

    let ready = meta.selection.is_complete();
    format!(
        r#"<form id="upload-form" method="post" action="/upload" enctype="multipart/form-data" data-ready="{ready}">
            {hidden}
            {other_inputs}
            <div class="form-group">
                <label for="files">PDF files (up to 10)</label>
                <input id="files" type="file" name="files" accept="application/pdf" multiple required>
            </div>
            <div id="upload-feedback"></div>
            <button class="btn" type="submit"{disabled}>Upload All Notes</button>
        </form>"#,
        ready = ready,
        hidden = hidden,
        other_inputs = other_inputs,
        disabled = if ready { "" } else { " disabled" },
    )
}

fn render_feedback(feedback: &UploadFeedback) -> String {
    let mut html = String::new();
    if let Some(err) = &feedback.error {
        html.push_str(&error_box(err));
    }
    for line in &feedback.skipped {
        html.push_str(&info_box(line));
    }
    if let Some(ok) = &feedback.success {
        html.push_str(&success_box(ok));
    }
    if !feedback.uploaded.is_empty() {
        html.push_str(r#"<ul class="upload-list">"#);
        for file in &feedback.uploaded {
            let preview = file
                .thumbnail
                .as_deref()
                .map(|src| format!(r#"<img src="{}" alt="">"#, html_escape(src)))
                .unwrap_or_default();
            html.push_str(&format!("<li>{}<span>{}</span></li>", preview, html_escape(&file.name)));
        }
        html.push_str("</ul>");
    }
    html
}

fn render_upload_page(meta: Option<&UploadMetadata>, feedback: &UploadFeedback) -> String {
    let mut html = String::from("<h1>Upload Notes</h1>");

    match meta {
        None => {
            let options: Vec<(String, String)> = UploadMaterial::ALL
                .iter()
                .map(|m| (format!("/upload?material_type={}", m.key()), m.label().to_string()))
                .collect();
            html.push_str(&selection_grid("Select Material Type", &options));
        }
        Some(meta) => {
            html.push_str(&format!(
                r#"<p class="breadcrumbs">{} &middot; <a href="/upload">Change material type</a></p>
                <form method="get" action="/upload">
                    <input type="hidden" name="material_type" value="{}">
                    <input type="hidden" name="changed" value="">
                    <div class="form-row">{}</div>
                    <noscript><button class="btn secondary" type="submit">Update</button></noscript>
                </form>"#,
                meta.material.label(),
                meta.material.key(),
                cascade_selects(meta),
            ));
            html.push_str(&render_upload_form(meta));
        }
    }

    html.push_str(&render_feedback(feedback));
    html.push_str(&format!("<script>{}</script>", UPLOAD_JS));
    html
}

pub async fn upload_page(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(params): Query<Vec<(String, String)>>,
) -> Response {
    let session = match current_session(&state, &jar).await {
        Ok(s) => s,
        Err(redirect) => return redirect,
    };

    let meta = UploadMetadata::from_form(&params);
    let content = render_upload_page(meta.as_ref(), &UploadFeedback::default());
    Html(base_html("Upload Notes", &content, Some(&session.user))).into_response()
}

pub async fn upload_submit(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut multipart: Multipart,
) -> Response {
    let session = match current_session(&state, &jar).await {
        Ok(s) => s,
        Err(redirect) => return redirect,
    };

    let mut params = Vec::new();
    let mut incoming = Vec::new();
    let mut feedback = UploadFeedback::default();

    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                let name = field.name().unwrap_or_default().to_string();
                if name == "files" {
                    let file_name = field.file_name().unwrap_or("upload.pdf").to_string();
                    let content_type = field.content_type().map(str::to_string);
                    match field.bytes().await {
                        // An empty file input still submits one nameless part.
                        Ok(bytes) if bytes.is_empty() && file_name.is_empty() => {}
                        Ok(bytes) => incoming.push(IncomingFile {
                            name: file_name,
                            content_type,
                            bytes: bytes.to_vec(),
                        }),
                        Err(e) => {
                            warn!("failed to read uploaded file: {}", e);
                            feedback.error = Some("Could not read the uploaded files.".to_string());
                            break;
                        }
                    }
                } else if let Ok(text) = field.text().await {
                    params.push((name, text));
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!("malformed upload form: {}", e);
                feedback.error = Some("Could not read the uploaded files.".to_string());
                break;
            }
        }
    }

    let meta = UploadMetadata::from_form(&params);

    if feedback.error.is_none() {
        match submit(&state, &session.token, meta.as_ref(), incoming).await {
            Ok(done) => feedback = done,
            Err(message) => feedback.error = Some(message),
        }
    }

    let content = render_upload_page(meta.as_ref(), &feedback);
    Html(base_html("Upload Notes", &content, Some(&session.user))).into_response()
}

/// Validate, stage, preview and send one submission.
async fn submit(
    state: &AppState,
    token: &str,
    meta: Option<&UploadMetadata>,
    incoming: Vec<IncomingFile>,
) -> Result<UploadFeedback, String> {
    let mut batch = UploadBatch::default();
    let outcome = batch.add_files(incoming).map_err(|e| e.to_string())?;

    let meta = meta
        .filter(|m| m.is_complete())
        .ok_or_else(|| UploadError::IncompleteMetadata.to_string())?;

    if batch.is_empty() {
        if outcome.skipped.is_empty() {
            return Err(UploadError::NoFiles.to_string());
        }
        return Err(outcome.skipped.join("; "));
    }

    batch.attach_thumbnails().await;

    let receipt = state
        .api
        .upload_notes(token, batch.files(), &meta.fields())
        .await
        .map_err(|e| {
            warn!("upload failed: {}", e);
            e.user_message()
        })?;

    info!(files = batch.len(), material = meta.material.key(), "notes uploaded");
    Ok(UploadFeedback {
        error: None,
        skipped: outcome.skipped,
        success: Some(receipt.message.unwrap_or_else(|| {
            format!("Uploaded {} note(s). They will appear once approved.", batch.len())
        })),
        uploaded: batch.files,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pdf(name: &str) -> IncomingFile {
        IncomingFile {
            name: name.to_string(),
            content_type: Some("application/pdf".to_string()),
            bytes: b"%PDF-1.4".to_vec(),
        }
    }

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_eleven_files_rejected_entirely() {
        let mut batch = UploadBatch::default();
        let drop: Vec<IncomingFile> = (0..11).map(|i| pdf(&format!("n{}.pdf", i))).collect();

        let err = batch.add_files(drop).unwrap_err();
        assert_eq!(err.to_string(), "Maximum 10 PDFs allowed per upload.");
        assert!(batch.is_empty());
    }

    #[test]
    fn test_limit_counts_staged_files() {
        let mut batch = UploadBatch::default();
        batch
            .add_files((0..8).map(|i| pdf(&format!("a{}.pdf", i))).collect())
            .unwrap();
        assert_eq!(
            batch.add_files(vec![pdf("x.pdf"), pdf("y.pdf"), pdf("z.pdf")]),
            Err(UploadError::TooManyFiles)
        );
        assert_eq!(batch.len(), 8);
        assert!(batch.add_files(vec![pdf("x.pdf"), pdf("y.pdf")]).is_ok());
        assert_eq!(batch.len(), 10);
    }

    #[test]
    fn test_non_pdf_skipped() {
        let mut batch = UploadBatch::default();
        let outcome = batch
            .add_files(vec![
                pdf("notes.pdf"),
                IncomingFile {
                    name: "photo.png".to_string(),
                    content_type: Some("image/png".to_string()),
                    bytes: vec![0x89, b'P', b'N', b'G'],
                },
                IncomingFile {
                    name: "mystery".to_string(),
                    content_type: None,
                    bytes: Vec::new(),
                },
            ])
            .unwrap();

        assert_eq!(outcome.accepted, 1);
        assert_eq!(outcome.skipped, vec!["photo.png is not a PDF", "mystery is not a PDF"]);
        assert_eq!(batch.files()[0].name, "notes.pdf");
    }

    #[test]
    fn test_content_type_parameters_ignored() {
        let file = IncomingFile {
            name: "a.pdf".to_string(),
            content_type: Some("Application/PDF; charset=binary".to_string()),
            bytes: Vec::new(),
        };
        assert!(file.is_pdf());
    }

    #[tokio::test]
    async fn test_thumbnail_failure_keeps_file() {
        let mut batch = UploadBatch::default();
        batch.add_files(vec![pdf("broken.pdf")]).unwrap();
        batch.attach_thumbnails().await;
        assert_eq!(batch.len(), 1);
        assert!(batch.files()[0].thumbnail.is_none());
    }

    #[test]
    fn test_personal_metadata_completeness() {
        let partial = UploadMetadata::from_form(&pairs(&[
            ("material_type", "personal_material"),
            ("field", "Engineering"),
        ]))
        .unwrap();
        assert!(!partial.is_complete());

        let done = UploadMetadata::from_form(&pairs(&[
            ("material_type", "personal_material"),
            ("field", "Engineering"),
            ("course", "B.Tech"),
            ("subject", "Civil"),
        ]))
        .unwrap();
        assert!(done.is_complete());
        assert_eq!(
            done.fields(),
            pairs(&[
                ("material_type", "personal_material"),
                ("field", "Engineering"),
                ("course", "B.Tech"),
                ("subject", "Civil"),
            ])
        );
    }

    #[test]
    fn test_other_requires_text() {
        let base = [
            ("material_type", "university_material"),
            ("state", "Delhi"),
            ("institution_type", "Central University"),
            ("institution", "Other"),
            ("course", "MBA"),
            ("semester", "2"),
            ("subject", "Marketing Management"),
        ];
        let missing = UploadMetadata::from_form(&pairs(&base)).unwrap();
        assert!(missing.selection.is_complete());
        assert!(!missing.is_complete());

        let mut with_text = pairs(&base);
        with_text.push(("other_institution".to_string(), "  Ashoka University ".to_string()));
        let meta = UploadMetadata::from_form(&with_text).unwrap();
        assert!(meta.is_complete());
        assert!(meta
            .fields()
            .contains(&("institution".to_string(), "Ashoka University".to_string())));
    }

    #[test]
    fn test_subject_required_without_subject_table() {
        let base = [
            ("material_type", "university_material"),
            ("state", "Delhi"),
            ("institution_type", "Central University"),
            ("institution", "University of Delhi"),
            ("course", "B.Sc"),
            ("semester", "3"),
        ];
        let meta = UploadMetadata::from_form(&pairs(&base)).unwrap();
        assert!(!meta.is_complete());
        assert_eq!(
            meta.selection.next_step().map(|step| step.level),
            Some(FilterLevel::Subject)
        );

        let html = cascade_selects(&meta);
        assert!(html.contains(r#"name="subject""#));
        assert!(html.contains(r#"<option value="Other">Other</option>"#));

        let mut with_other = pairs(&base);
        with_other.push(("subject".to_string(), "Other".to_string()));
        with_other.push(("other_subject".to_string(), "Optics".to_string()));
        let meta = UploadMetadata::from_form(&with_other).unwrap();
        assert!(meta.is_complete());
        assert!(meta
            .fields()
            .contains(&("subject".to_string(), "Optics".to_string())));
    }

    #[test]
    fn test_unknown_material_is_none() {
        assert!(UploadMetadata::from_form(&pairs(&[("material_type", "nope")])).is_none());
        assert!(UploadMetadata::from_form(&[]).is_none());
    }

    #[test]
    fn test_page_shows_next_select_only() {
        let meta = UploadMetadata::from_form(&pairs(&[
            ("material_type", "personal_material"),
            ("field", "Engineering"),
        ]))
        .unwrap();
        let html = cascade_selects(&meta);
        assert!(html.contains(r#"name="field""#));
        assert!(html.contains(r#"name="course""#));
        assert!(!html.contains(r#"name="subject""#));

        let page = render_upload_page(Some(&meta), &UploadFeedback::default());
        assert!(page.contains(r#"data-ready="false""#));
    }
}
