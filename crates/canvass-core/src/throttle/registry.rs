//! Session registry: per-identity request accounting.
//!
//! The registry owns every piece of throttling state in the process. All
//! mutation happens under one mutex because admission is check-then-act:
//! two concurrent requests must not both observe "one slot left" and both
//! be admitted. Entries are created lazily on first use and evicted by a
//! periodic sweep once they go stale.

use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use uuid::Uuid;

/// Throttling state for one session (or origin) identity.
#[derive(Debug, Clone)]
struct SessionEntry {
    /// In-window request instants, oldest first.
    timestamps: Vec<Instant>,
    /// Most recent activity: creation or the last recorded request.
    last_seen: Instant,
    /// Creation timestamp (RFC 3339), kept for diagnostics.
    #[allow(dead_code)]
    created_at: String,
}

impl SessionEntry {
    fn new(now: Instant) -> Self {
        Self {
            timestamps: Vec::new(),
            last_seen: now,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Drops timestamps that have left the window.
    fn prune(&mut self, now: Instant, window: Duration) {
        self.timestamps
            .retain(|ts| now.saturating_duration_since(*ts) < window);
    }

    fn in_window(&self, now: Instant, window: Duration) -> usize {
        self.timestamps
            .iter()
            .filter(|ts| now.saturating_duration_since(**ts) < window)
            .count()
    }
}

/// Outcome of an atomic admit-and-record attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The request was recorded; `count` is the resulting in-window size.
    Admitted { count: usize },
    /// The limit is reached; `retry_after` is the time until the oldest
    /// in-window timestamp expires.
    Limited { retry_after: Duration },
}

/// Tracks request timestamps per identity over a rolling window.
///
/// Used twice by the gate: once keyed by session token, once keyed by
/// origin. The registry takes the current time as a parameter everywhere so
/// window arithmetic stays deterministic under test.
#[derive(Debug)]
pub struct SessionRegistry {
    window: Duration,
    entries: Mutex<HashMap<String, SessionEntry>>,
}

impl SessionRegistry {
    /// Creates a registry with the given rolling window.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// The configured rolling window.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Mints a new opaque session token and registers an empty entry.
    pub async fn issue(&self, now: Instant) -> String {
        let token = Uuid::new_v4().to_string();
        let mut entries = self.entries.lock().await;
        entries.insert(token.clone(), SessionEntry::new(now));
        token
    }

    /// Records a request for the identity and returns the resulting
    /// in-window count. Unknown identities are created lazily.
    pub async fn record(&self, id: &str, now: Instant) -> usize {
        let mut entries = self.entries.lock().await;
        let entry = entries
            .entry(id.to_string())
            .or_insert_with(|| SessionEntry::new(now));
        entry.prune(now, self.window);
        entry.timestamps.push(now);
        entry.last_seen = now;
        entry.timestamps.len()
    }

    /// Atomically checks the identity against `max` and records the request
    /// only if it is under the limit.
    ///
    /// This is the admission primitive: the check and the append happen
    /// under one lock acquisition, so concurrent requests can never both
    /// claim the last slot.
    pub async fn try_record(&self, id: &str, now: Instant, max: usize) -> Admission {
        let mut entries = self.entries.lock().await;
        let entry = entries
            .entry(id.to_string())
            .or_insert_with(|| SessionEntry::new(now));
        entry.prune(now, self.window);
        if entry.timestamps.len() >= max {
            let oldest = entry.timestamps[0];
            let retry_after = self
                .window
                .saturating_sub(now.saturating_duration_since(oldest));
            return Admission::Limited { retry_after };
        }
        entry.timestamps.push(now);
        entry.last_seen = now;
        Admission::Admitted {
            count: entry.timestamps.len(),
        }
    }

    /// Read-only in-window count. Returns 0 for unknown identities and
    /// never mutates state (used by status queries).
    pub async fn count_in_window(&self, id: &str, now: Instant) -> usize {
        let entries = self.entries.lock().await;
        entries
            .get(id)
            .map(|entry| entry.in_window(now, self.window))
            .unwrap_or(0)
    }

    /// Evicts every identity whose most recent activity is older than
    /// `stale_after`. Returns the number of evicted entries.
    pub async fn sweep(&self, now: Instant, stale_after: Duration) -> usize {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, entry| now.saturating_duration_since(entry.last_seen) <= stale_after);
        before - entries.len()
    }

    /// Number of tracked identities (stale or not).
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Whether no identities are tracked.
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}
