//! Page scripts.
//!
//! Every action that disables a control re-enables it in `finally`, so a
//! failed request never leaves the page stuck in a loading state.

// ============================================================================
// Shared
// ============================================================================

/// Favourite toggle, PDF modal and note deletion. Included on every page.
pub const COMMON_JS: &str = r#"
async function toggleFavourite(btn) {
    const id = btn.dataset.noteId;
    const wasOn = btn.classList.contains('on');
    btn.classList.toggle('on', !wasOn);
    btn.disabled = true;
    try {
        const response = await fetch('/api/favourites/' + encodeURIComponent(id), { method: 'POST' });
        const data = await response.json().catch(() => ({}));
        if (!response.ok) {
            throw new Error(data.error || 'Failed to update favourites.');
        }
        btn.classList.toggle('on', !!data.favourite);
    } catch (e) {
        btn.classList.toggle('on', wasOn);
        alert(e.message || 'Failed to update favourites.');
    } finally {
        btn.disabled = false;
    }
}

function openViewer(id) {
    const overlay = document.getElementById('viewer-overlay');
    if (!overlay) return;
    document.getElementById('viewer-frame').src = '/notes/' + encodeURIComponent(id) + '/view';
    overlay.classList.add('active');
}

function closeViewer() {
    const overlay = document.getElementById('viewer-overlay');
    if (!overlay) return;
    overlay.classList.remove('active');
    document.getElementById('viewer-frame').src = 'about:blank';
}

async function deleteNote(btn) {
    const title = btn.dataset.title || 'this note';
    if (!confirm('Are you sure you want to delete "' + title + '"?')) return;

    btn.disabled = true;
    try {
        const response = await fetch('/api/notes/' + encodeURIComponent(btn.dataset.noteId), {
            method: 'DELETE',
            headers: { 'Content-Type': 'application/json' },
            body: JSON.stringify({ confirm: true })
        });
        if (!response.ok) {
            const data = await response.json().catch(() => ({}));
            throw new Error(data.error || 'Failed to delete note.');
        }
        const card = btn.closest('.note-card');
        if (card) card.remove();
    } catch (e) {
        alert(e.message);
    } finally {
        btn.disabled = false;
    }
}

function cascadeChange(select) {
    const form = select.form;
    if (form.elements['changed']) {
        form.elements['changed'].value = select.name;
    }
    form.submit();
}
"#;

// ============================================================================
// Browse page
// ============================================================================

/// Live search over a WebSocket. Without it the form falls back to a plain
/// GET submit.
pub const LIVE_SEARCH_JS: &str = r#"
(function () {
    const input = document.getElementById('live-search-input');
    const results = document.getElementById('search-results');
    const status = document.getElementById('search-status');
    if (!input || !results || !('WebSocket' in window)) return;

    const scheme = location.protocol === 'https:' ? 'wss://' : 'ws://';
    const material = input.form && input.form.elements['material_type'];
    const scope = material ? '?material_type=' + encodeURIComponent(material.value) : '';
    let socket = null;

    function connect() {
        socket = new WebSocket(scheme + location.host + '/ws/search' + scope);
        socket.onmessage = function (event) {
            let msg;
            try { msg = JSON.parse(event.data); } catch (e) { return; }
            switch (msg.type) {
                case 'cleared':
                    results.innerHTML = '';
                    status.textContent = '';
                    break;
                case 'loading':
                    status.textContent = 'Searching...';
                    break;
                case 'results':
                    results.innerHTML = msg.html;
                    status.textContent = msg.count + ' result(s) for "' + msg.query + '"';
                    break;
                case 'error':
                    status.textContent = msg.message;
                    break;
            }
        };
        socket.onclose = function () { socket = null; };
    }

    function send() {
        socket.send(JSON.stringify({ type: 'query', q: input.value }));
    }

    input.addEventListener('input', function () {
        if (!socket) connect();
        if (socket.readyState === WebSocket.OPEN) {
            send();
        } else {
            socket.addEventListener('open', send, { once: true });
        }
    });

    input.form.addEventListener('submit', function (e) {
        if (socket && socket.readyState === WebSocket.OPEN) {
            e.preventDefault();
            send();
        }
    });
})();
"#;

// ============================================================================
// Upload page
// ============================================================================

pub const UPLOAD_JS: &str = r#"
(function () {
    const form = document.getElementById('upload-form');
    if (!form) return;
    const picker = form.querySelector('input[type=file]');
    const button = form.querySelector('button[type=submit]');
    const feedback = document.getElementById('upload-feedback');

    picker.addEventListener('change', function () {
        if (picker.files.length > 10) {
            feedback.textContent = 'Maximum 10 PDFs allowed per upload.';
            feedback.className = 'message error';
            picker.value = '';
        } else {
            feedback.textContent = '';
            feedback.className = '';
        }
    });

    form.addEventListener('submit', function () {
        button.disabled = true;
        button.textContent = 'Uploading...';
    });

    // Back/forward cache can restore the page mid-submit.
    window.addEventListener('pageshow', function () {
        button.disabled = form.dataset.ready !== 'true';
        button.textContent = 'Upload All Notes';
    });
})();
"#;

// ============================================================================
// Password reset
// ============================================================================

pub const RESET_DONE_JS: &str = r#"
setTimeout(function () { window.location.href = '/login'; }, 2000);
"#;
