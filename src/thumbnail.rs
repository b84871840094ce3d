//! First-page previews for PDFs staged for upload.
//!
//! Page 1 is rasterized with PDFium at a reduced scale and returned as a PNG
//! data URL. When no PDFium library can be bound, the preview falls back to
//! an SVG outline sized from page 1's MediaBox with its first text lines; a
//! page without text gets no preview. Anything that goes wrong (not a PDF,
//! corrupt, encrypted, a panic inside the PDF libraries) yields `None`; a
//! missing preview never blocks an upload.

use crate::templates::html_escape;
use base64::{engine::general_purpose::STANDARD, Engine};
use image::{ImageFormat, RgbaImage};
use lopdf::{Document, Object, ObjectId};
use pdfium_render::prelude::*;
use std::io::Cursor;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, warn};

pub const THUMBNAIL_SCALE: f32 = 0.3;

/// US Letter, used when a page carries no usable MediaBox.
const FALLBACK_PAGE: PageSize = PageSize {
    width: 612.0,
    height: 792.0,
};

const MAX_PREVIEW_LINES: usize = 14;
const MAX_LINE_CHARS: usize = 48;

/// Guards the Parent walk against cyclic page trees.
const MAX_TREE_DEPTH: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq)]
struct PageSize {
    width: f32,
    height: f32,
}

pub fn generate_thumbnail(bytes: &[u8]) -> Option<String> {
    if !has_pdf_header(bytes) {
        return None;
    }

    match panic::catch_unwind(AssertUnwindSafe(|| render_first_page(bytes))) {
        Ok(Ok(url)) => Some(url),
        Ok(Err(reason)) => {
            debug!(%reason, "no thumbnail");
            None
        }
        Err(_) => {
            warn!("PDF parser panicked while building a thumbnail");
            None
        }
    }
}

/// [`generate_thumbnail`] on the blocking pool.
pub async fn generate_thumbnail_async(bytes: Vec<u8>) -> Option<String> {
    tokio::task::spawn_blocking(move || generate_thumbnail(&bytes))
        .await
        .ok()
        .flatten()
}

/// The `%PDF-` marker may appear anywhere in the first 1024 bytes.
fn has_pdf_header(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(1024)];
    head.windows(5).any(|w| w == b"%PDF-")
}

fn render_first_page(bytes: &[u8]) -> Result<String, String> {
    let doc = Document::load_mem(bytes).map_err(|e| format!("unreadable PDF: {}", e))?;
    if doc.is_encrypted() {
        return Err("document is encrypted".to_string());
    }

    let pages = doc.get_pages();
    let (&first, &page_id) = pages
        .iter()
        .next()
        .ok_or_else(|| "document has no pages".to_string())?;

    match rasterize_first_page(bytes) {
        Ok(png) => return Ok(format!("data:image/png;base64,{}", STANDARD.encode(png))),
        Err(reason) => debug!(%reason, "no raster preview, using page outline"),
    }

    let lines = first_page_lines(&doc, first);
    if lines.is_empty() {
        return Err("page 1 has no text to outline".to_string());
    }
    let size = media_box(&doc, page_id).unwrap_or(FALLBACK_PAGE);
    let svg = render_svg(size, &lines);

    Ok(format!("data:image/svg+xml;base64,{}", STANDARD.encode(svg)))
}

/// PNG of page 1 at [`THUMBNAIL_SCALE`]. Fails when no PDFium library is
/// found next to the binary or on the system.
fn rasterize_first_page(bytes: &[u8]) -> Result<Vec<u8>, String> {
    let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| Pdfium::bind_to_system_library())
        .map_err(|e| format!("PDFium unavailable: {:?}", e))?;
    let pdfium = Pdfium::new(bindings);

    let document = pdfium
        .load_pdf_from_byte_slice(bytes, None)
        .map_err(|e| format!("PDFium could not open the document: {:?}", e))?;
    let page = document
        .pages()
        .first()
        .map_err(|e| format!("no first page: {:?}", e))?;

    let config = PdfRenderConfig::new().scale_page_by_factor(THUMBNAIL_SCALE);
    let bitmap = page
        .render_with_config(&config)
        .map_err(|e| format!("render failed: {:?}", e))?;

    let width = u32::try_from(bitmap.width()).map_err(|_| "bad bitmap width".to_string())?;
    let height = u32::try_from(bitmap.height()).map_err(|_| "bad bitmap height".to_string())?;
    let image = RgbaImage::from_raw(width, height, bitmap.as_rgba_bytes())
        .ok_or_else(|| "bitmap size mismatch".to_string())?;

    let mut png = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| format!("PNG encoding failed: {}", e))?;
    Ok(png)
}

/// MediaBox of `page_id`, inherited from ancestors in the page tree when the
/// page itself does not carry one.
fn media_box(doc: &Document, page_id: ObjectId) -> Option<PageSize> {
    let mut current = page_id;

    for _ in 0..MAX_TREE_DEPTH {
        let dict = doc.get_dictionary(current).ok()?;

        if let Ok(obj) = dict.get(b"MediaBox") {
            return page_size(doc, obj);
        }

        current = dict.get(b"Parent").ok()?.as_reference().ok()?;
    }

    None
}

fn page_size(doc: &Document, obj: &Object) -> Option<PageSize> {
    let obj = match obj {
        Object::Reference(id) => doc.get_object(*id).ok()?,
        other => other,
    };

    let coords: Vec<f32> = obj
        .as_array()
        .ok()?
        .iter()
        .filter_map(|o| o.as_float().ok())
        .collect();
    if coords.len() != 4 {
        return None;
    }

    let width = (coords[2] - coords[0]).abs();
    let height = (coords[3] - coords[1]).abs();
    if width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0 {
        Some(PageSize { width, height })
    } else {
        None
    }
}

/// Non-empty text lines of page `first`; empty when the text cannot be
/// extracted. Every other page is removed before extraction, so later pages
/// are never parsed.
fn first_page_lines(doc: &Document, first: u32) -> Vec<String> {
    let later: Vec<u32> = doc.get_pages().into_keys().filter(|&n| n != first).collect();
    let mut single = doc.clone();
    single.delete_pages(&later);

    let mut buf = Vec::new();
    if let Err(e) = single.save_to(&mut buf) {
        debug!("could not isolate page 1: {}", e);
        return Vec::new();
    }

    match pdf_extract::extract_text_from_mem(&buf) {
        Ok(text) => text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .take(MAX_PREVIEW_LINES)
            .map(|line| line.chars().take(MAX_LINE_CHARS).collect())
            .collect(),
        Err(e) => {
            debug!("page text unavailable: {}", e);
            Vec::new()
        }
    }
}

fn render_svg(page: PageSize, lines: &[String]) -> String {
    let width = page.width * THUMBNAIL_SCALE;
    let height = page.height * THUMBNAIL_SCALE;
    let font_size = (width / 36.0).max(3.0);
    let line_height = font_size * 1.4;
    let margin = width * 0.08;

    let mut text = String::new();
    for (i, line) in lines.iter().enumerate() {
        let y = margin + line_height * (i as f32 + 1.0);
        if y > height - margin {
            break;
        }
        text.push_str(&format!(
            r#"<text x="{:.1}" y="{:.1}">{}</text>"#,
            margin,
            y,
            html_escape(line)
        ));
    }

    format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="{w:.0}" height="{h:.0}" viewBox="0 0 {w:.1} {h:.1}"><rect width="100%" height="100%" fill="#ffffff" stroke="#cbd5e1"/><g font-family="Helvetica, Arial, sans-serif" font-size="{fs:.1}" fill="#334155">{text}</g></svg>"##,
        w = width,
        h = height,
        fs = font_size,
        text = text,
    )
}
