//! HTML templates and styling for OriNotes.
//!
//! ## Module Structure
//!
//! - `styles` - CSS constants and theme definitions
//! - `scripts` - page JavaScript (favourites, live search, upload, delete)
//! - `components` - base template, nav bar, note cards and other shared pieces

mod components;
mod scripts;
mod styles;

pub use components::{
    base_html, error_box, free_views_detail, html_escape, info_box, nav_bar, note_card,
    note_cards, own_note_card, query_string, selection_grid, stat_card, status_badge,
    success_box, viewer_modal,
};
pub use scripts::{LIVE_SEARCH_JS, RESET_DONE_JS, UPLOAD_JS};
pub use styles::STYLE;
