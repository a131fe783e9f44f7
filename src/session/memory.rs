//! In-memory session backend.
//!
//! Uses `DashMap` for concurrent access without external locks. Expiry is
//! sliding: every successful load or save pushes the deadline out by
//! `idle_timeout` (default: 2 hours), so an active tab keeps its token.

use dashmap::DashMap;
use std::time::{Duration, Instant};

use super::{SessionBackend, SessionData};

/// Idle lifetime applied by [`InMemoryBackend::new`].
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(2 * 3600);

struct Entry {
    data: SessionData,
    last_seen: Instant,
}

/// In-memory session store.
///
/// Sessions are lost on restart and are not shared across processes.
pub struct InMemoryBackend {
    store: DashMap<String, Entry>,
    idle_timeout: Duration,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::with_idle_timeout(DEFAULT_IDLE_TIMEOUT)
    }

    pub fn with_idle_timeout(idle_timeout: Duration) -> Self {
        Self {
            store: DashMap::new(),
            idle_timeout,
        }
    }

    /// Number of sessions currently stored, expired ones included until purged.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Drop every expired session. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let before = self.store.len();
        let timeout = self.idle_timeout;
        self.store.retain(|_, entry| entry.last_seen.elapsed() <= timeout);
        before.saturating_sub(self.store.len())
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionBackend for InMemoryBackend {
    async fn load(&self, session_id: &str) -> Option<SessionData> {
        let mut entry = self.store.get_mut(session_id)?;

        if entry.last_seen.elapsed() > self.idle_timeout {
            drop(entry);
            self.store.remove(session_id);
            return None;
        }

        entry.last_seen = Instant::now();
        Some(entry.data.clone())
    }

    async fn save(&self, session_id: &str, data: &SessionData) {
        self.store.insert(
            session_id.to_string(),
            Entry {
                data: data.clone(),
                last_seen: Instant::now(),
            },
        );
    }

    async fn delete(&self, session_id: &str) {
        self.store.remove(session_id);
    }
}
