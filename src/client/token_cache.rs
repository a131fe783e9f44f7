//! Per-client record of whether the CSRF cookie has been primed.

use std::sync::atomic::{AtomicBool, Ordering};

/// `unprimed -> primed` after a successful bootstrap, back to `unprimed`
/// whenever the server reports a mismatch.
///
/// One cache belongs to one client and is shared by all of its in-flight
/// requests. Two requests racing past an unprimed cache both bootstrap;
/// the endpoint is idempotent, so that only costs a round trip.
#[derive(Debug, Default)]
pub struct TokenCache {
    pub primed: AtomicBool,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_primed(&self) -> bool {
        self.primed.load(Ordering::Acquire)
    }

    pub fn mark_primed(&self) {
        self.primed.store(true, Ordering::Release);
    }

    pub fn invalidate(&self) {
        self.primed.store(false, Ordering::Release);
    }
}
