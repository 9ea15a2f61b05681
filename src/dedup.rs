//! At-most-once admission ledger for logical events.
//!
//! The platform delivers events at-least-once and retries aggressively, so
//! every delivery passes through here before any side-effecting work. The
//! registry keeps event identity and first-seen instant only — never
//! payloads — and evicts entries after a bounded retention window, which
//! must exceed the platform's maximum redelivery interval (documented as
//! roughly one hour).

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// First sighting — the caller owns the side-effecting path.
    Proceed,
    /// Redelivery of an already-accepted event; acknowledge and stop.
    AlreadyHandled,
}

/// Tracks which event ids have been accepted within the retention window.
#[derive(Debug)]
pub struct EventRegistry {
    ttl: Duration,
    seen: Mutex<HashMap<String, Instant>>,
}

impl EventRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            seen: Mutex::new(HashMap::new()),
        }
    }

    /// Admit or reject one delivery of `event_id`.
    ///
    /// A retry-marked delivery short-circuits unconditionally: the platform
    /// itself is signaling a redelivery, independent of registry state.
    /// Otherwise membership is test-and-set under a single lock, so two
    /// near-simultaneous deliveries of one unseen id cannot both observe
    /// [`Admission::Proceed`].
    pub fn admit(&self, retry_delivery: bool, event_id: &str) -> Admission {
        if retry_delivery {
            return Admission::AlreadyHandled;
        }

        let now = Instant::now();
        let mut seen = self.seen.lock();

        seen.retain(|_, first_seen| now.duration_since(*first_seen) < self.ttl);

        if seen.contains_key(event_id) {
            return Admission::AlreadyHandled;
        }
        seen.insert(event_id.to_owned(), now);
        Admission::Proceed
    }

    /// Drop entries older than the retention window. Returns how many were
    /// removed. Entries still inside the window are never touched.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let mut seen = self.seen.lock();
        let before = seen.len();
        seen.retain(|_, first_seen| now.duration_since(*first_seen) < self.ttl);
        before - seen.len()
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.seen.lock().len()
    }
}
