//! Debounced search dispatch.
//!
//! Every keystroke goes through [`DebouncedSearch::input`]. A fetch is only
//! issued once the query has been stable for the quiet period, and only the
//! response to the most recent input is ever published: each input bumps a
//! sequence number and responses carrying an older number are dropped.

use crate::error::ApiError;
use crate::models::Note;
use futures_util::future::BoxFuture;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Queries shorter than this never reach the backend.
pub const MIN_QUERY_CHARS: usize = 3;

pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(500);

/// Performs the actual filtered fetch for a query.
pub type FetchFn =
    Arc<dyn Fn(String) -> BoxFuture<'static, Result<Vec<Note>, ApiError>> + Send + Sync>;

#[derive(Debug)]
pub enum SearchUpdate {
    /// Query too short; any displayed results should be removed.
    Cleared,
    Loading {
        seq: u64,
        query: String,
    },
    Results {
        seq: u64,
        query: String,
        notes: Vec<Note>,
    },
    Failed {
        seq: u64,
        query: String,
        message: String,
    },
}

pub struct DebouncedSearch {
    fetch: FetchFn,
    quiet: Duration,
    latest: Arc<AtomicU64>,
    closed: Arc<AtomicBool>,
    pending: Option<JoinHandle<()>>,
    updates: mpsc::UnboundedSender<SearchUpdate>,
}

impl DebouncedSearch {
    pub fn new(quiet: Duration, fetch: FetchFn) -> (Self, mpsc::UnboundedReceiver<SearchUpdate>) {
        let (updates, rx) = mpsc::unbounded_channel();
        let search = Self {
            fetch,
            quiet,
            latest: Arc::new(AtomicU64::new(0)),
            closed: Arc::new(AtomicBool::new(false)),
            pending: None,
            updates,
        };
        (search, rx)
    }

    /// Record a new query value. Must be called from within a tokio runtime.
    pub fn input(&mut self, raw: &str) {
        let seq = self.latest.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some(timer) = self.pending.take() {
            timer.abort();
        }

        let query = raw.trim().to_string();
        if query.chars().count() < MIN_QUERY_CHARS {
            self.updates.send(SearchUpdate::Cleared).ok();
            return;
        }

        let job = FetchJob {
            seq,
            query,
            fetch: self.fetch.clone(),
            latest: self.latest.clone(),
            closed: self.closed.clone(),
            updates: self.updates.clone(),
        };
        let quiet = self.quiet;

        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(quiet).await;
            if !job.is_current() {
                return;
            }
            // The request outlives this timer: aborting the timer on the next
            // keystroke must not cancel a fetch that already started.
            tokio::spawn(job.run());
        }));
    }

    /// Sequence number of the most recent input.
    pub fn latest_seq(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }

    /// Stop scheduling and ignore every response still in flight.
    pub fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
        if let Some(timer) = self.pending.take() {
            timer.abort();
        }
    }
}

impl Drop for DebouncedSearch {
    fn drop(&mut self) {
        self.close();
    }
}

struct FetchJob {
    seq: u64,
    query: String,
    fetch: FetchFn,
    latest: Arc<AtomicU64>,
    closed: Arc<AtomicBool>,
    updates: mpsc::UnboundedSender<SearchUpdate>,
}

impl FetchJob {
    fn is_current(&self) -> bool {
        !self.closed.load(Ordering::SeqCst) && self.latest.load(Ordering::SeqCst) == self.seq
    }

    async fn run(self) {
        // A clear may have landed after the timer fired.
        if !self.is_current() {
            return;
        }
        self.updates
            .send(SearchUpdate::Loading {
                seq: self.seq,
                query: self.query.clone(),
            })
            .ok();

        let result = (self.fetch)(self.query.clone()).await;

        if !self.is_current() {
            debug!(seq = self.seq, query = %self.query, "discarding stale search response");
            return;
        }

        let update = match result {
            Ok(notes) => SearchUpdate::Results {
                seq: self.seq,
                query: self.query,
                notes,
            },
            Err(e) => SearchUpdate::Failed {
                seq: self.seq,
                query: self.query,
                message: e.user_message(),
            },
        };
        self.updates.send(update).ok();
    }
}
