//! CSS styles for the OriNotes pages.
//!
//! Contains the main STYLE constant with all CSS for the web interface.

// ============================================================================
// CSS Styles
// ============================================================================

pub const STYLE: &str = r#"
/* Solarized Light Theme */
:root {
    --base03: #002b36;
    --base02: #073642;
    --base01: #586e75;
    --base00: #657b83;
    --base1: #93a1a1;
    --base2: #eee8d5;
    --base3: #fdf6e3;

    --yellow: #b58900;
    --orange: #cb4b16;
    --red: #dc322f;
    --violet: #6c71c4;
    --blue: #268bd2;
    --cyan: #2aa198;
    --green: #859900;

    --bg: var(--base3);
    --fg: var(--base00);
    --muted: var(--base1);
    --border: var(--base2);
    --link: var(--blue);
    --link-hover: var(--cyan);
    --accent: var(--base2);
    --card-bg: #fffdf7;
}

* { box-sizing: border-box; margin: 0; padding: 0; }

body {
    font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, "Helvetica Neue", Arial, sans-serif;
    line-height: 1.6;
    color: var(--fg);
    background: var(--bg);
}

.container {
    max-width: 1100px;
    margin: 0 auto;
    padding: 1rem;
}

a { color: var(--link); text-decoration: none; }
a:hover { color: var(--link-hover); text-decoration: underline; }

h1, h2, h3 { font-weight: 600; margin-top: 1.5em; margin-bottom: 0.5em; color: var(--base01); }
h1 { font-size: 1.6rem; }
h2 { font-size: 1.25rem; }

.nav-bar {
    position: sticky;
    top: 0;
    background: var(--bg);
    border-bottom: 1px solid var(--border);
    padding: 0.5rem 1rem;
    display: flex;
    gap: 1rem;
    align-items: center;
    flex-wrap: wrap;
    z-index: 100;
}

.nav-bar a { font-size: 0.9rem; }
.nav-bar .brand { font-weight: 700; color: var(--cyan); }
.nav-bar .spacer { flex: 1; }
.nav-bar .who { font-size: 0.85rem; color: var(--muted); }

/* Buttons and forms */

.btn {
    display: inline-block;
    padding: 0.45rem 1rem;
    border: 1px solid var(--link);
    border-radius: 4px;
    background: var(--link);
    color: white;
    cursor: pointer;
    font-size: 0.9rem;
    font-family: inherit;
}
.btn:hover { background: var(--link-hover); border-color: var(--link-hover); color: white; text-decoration: none; }
.btn:disabled { opacity: 0.5; cursor: not-allowed; }
.btn.secondary { background: var(--accent); color: var(--fg); border-color: var(--border); }
.btn.danger { background: var(--red); border-color: var(--red); }
.btn.subscribe { background: var(--violet); border-color: var(--violet); }

.form-card {
    max-width: 420px;
    margin: 2rem auto;
    padding: 1.5rem;
    background: var(--card-bg);
    border: 1px solid var(--border);
    border-radius: 6px;
}

.form-group { display: flex; flex-direction: column; gap: 0.25rem; margin-bottom: 1rem; }
.form-group label { font-size: 0.85rem; color: var(--base01); }
.form-group input, .form-group select {
    padding: 0.45rem 0.75rem;
    border: 1px solid var(--border);
    border-radius: 4px;
    background: white;
    color: var(--fg);
    font-size: 0.95rem;
    font-family: inherit;
}

.form-row { display: grid; grid-template-columns: repeat(auto-fit, minmax(200px, 1fr)); gap: 1rem; }

.message { padding: 0.6rem 1rem; border-radius: 4px; margin: 1rem 0; font-size: 0.9rem; }
.message.error { background: #fbe9e7; color: var(--red); border: 1px solid #f5c6c0; }
.message.success { background: #f1f6e0; color: #5b6b00; border: 1px solid #dbe6b0; }
.message.info { background: var(--accent); color: var(--base01); }

/* Selection grid */

.selection-grid {
    display: grid;
    grid-template-columns: repeat(auto-fill, minmax(180px, 1fr));
    gap: 1rem;
    margin: 1rem 0 2rem;
}

.selection-grid a {
    display: block;
    padding: 1.25rem;
    text-align: center;
    background: var(--card-bg);
    border: 2px solid var(--border);
    border-radius: 6px;
    font-weight: 600;
    color: var(--base01);
}
.selection-grid a:hover { border-color: var(--cyan); text-decoration: none; }

.breadcrumbs { font-size: 0.85rem; color: var(--muted); margin: 0.5rem 0; }
.breadcrumbs a { margin: 0 0.25rem; }

/* Search */

.live-search { display: flex; gap: 0.5rem; margin: 1rem 0; }
.live-search input {
    flex: 1;
    padding: 0.5rem 0.75rem;
    border: 1px solid var(--border);
    border-radius: 4px;
    font-size: 0.95rem;
}
.search-status { font-size: 0.85rem; color: var(--muted); min-height: 1.2em; }

/* Note cards */

.card-grid {
    display: grid;
    grid-template-columns: repeat(auto-fill, minmax(240px, 1fr));
    gap: 1rem;
    margin-top: 1rem;
}

.note-card {
    display: flex;
    flex-direction: column;
    justify-content: space-between;
    gap: 0.5rem;
    padding: 1rem;
    background: var(--card-bg);
    border: 1px solid var(--border);
    border-radius: 6px;
}
.note-card.locked { border-color: #f5c6c0; }
.note-card h3 { margin: 0; font-size: 1rem; }
.note-card .meta { font-size: 0.8rem; color: var(--muted); }
.note-card .thumb { width: 100%; max-height: 180px; object-fit: contain; background: white; border: 1px solid var(--border); }
.note-card .actions { display: flex; gap: 0.5rem; align-items: center; flex-wrap: wrap; }
.note-card .notice { font-size: 0.8rem; color: var(--yellow); }
.note-card .reason { font-size: 0.8rem; color: var(--red); }

.fav-toggle {
    background: none;
    border: none;
    font-size: 1.3rem;
    cursor: pointer;
    color: var(--muted);
}
.fav-toggle.on { color: var(--yellow); }
.fav-toggle:disabled { opacity: 0.5; }

.status-badge {
    font-size: 0.65rem;
    padding: 0.1rem 0.4rem;
    border-radius: 3px;
    text-transform: uppercase;
    letter-spacing: 0.05em;
    background: var(--accent);
}
.status-badge.approved { background: #e4eec2; color: #5b6b00; }
.status-badge.pending { background: #f6ebc6; color: var(--yellow); }
.status-badge.rejected { background: #f9d9d5; color: var(--red); }

/* Dashboard */

.stat-grid {
    display: grid;
    grid-template-columns: repeat(auto-fill, minmax(200px, 1fr));
    gap: 1rem;
    margin: 1rem 0;
}
.stat-card { padding: 1rem; background: var(--card-bg); border: 1px solid var(--border); border-radius: 6px; }
.stat-card .label { font-size: 0.8rem; color: var(--muted); }
.stat-card .value { font-size: 1.5rem; font-weight: 700; color: var(--base01); }
.stat-card .detail { font-size: 0.8rem; color: var(--muted); }

.steps { margin: 1rem 0 1rem 1.5rem; }
.steps li { margin: 0.4rem 0; }

/* Upload */

.upload-list { list-style: none; display: grid; grid-template-columns: repeat(auto-fill, minmax(160px, 1fr)); gap: 1rem; }
.upload-list li { font-size: 0.8rem; text-align: center; }
.upload-list img { width: 100%; border: 1px solid var(--border); background: white; }

/* PDF modal */

.modal-overlay {
    display: none;
    position: fixed;
    inset: 0;
    background: rgba(0, 43, 54, 0.6);
    z-index: 200;
    align-items: center;
    justify-content: center;
}
.modal-overlay.active { display: flex; }
.modal {
    width: 90vw;
    height: 90vh;
    background: var(--bg);
    border-radius: 6px;
    display: flex;
    flex-direction: column;
}
.modal-header { display: flex; justify-content: flex-end; padding: 0.5rem; }
.modal iframe { flex: 1; border: none; }
"#;
