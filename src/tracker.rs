// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Submission event tracker backing the per-IP rate limit.
//!
//! Every accepted submission is recorded as an event tied to the client
//! address. The handler asks "how many events does this address currently
//! have?" before dispatching mail; a background task purges events older
//! than the retention window on a fixed cadence.
//!
//! Reads do not filter by age. Between purge runs a stale event still
//! counts toward the limit, so the effective window is up to
//! (retention window + purge interval) wide. This imprecision is
//! intentional and documented behavior, not a defect.

use crate::config::RateLimitConfig;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{watch, RwLock};
use tracing::{debug, info};

/// A single recorded submission.
#[derive(Debug, Clone)]
struct Event {
    /// Client address that triggered the submission
    address: String,
    /// Creation instant, compared against the purge cutoff
    recorded_at: Instant,
}

/// Thread-safe submission tracker.
///
/// Events are keyed by a monotonically increasing sequence number rather
/// than by timestamp, so two submissions landing on the same instant can
/// never overwrite each other. The map is guarded by a single
/// reader/writer lock: counts overlap with each other, while `record`
/// and the purge take exclusive access.
pub struct RateTracker {
    /// Retention window; events older than `now - window` are purged
    window: Duration,
    /// Cadence of the background purge loop
    purge_interval: Duration,
    /// Live events, keyed by insertion sequence number
    events: RwLock<HashMap<u64, Event>>,
    /// Next event key
    next_seq: AtomicU64,
}

impl RateTracker {
    /// Create a tracker with the given rate limit configuration.
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            window: config.window(),
            purge_interval: config.purge_interval(),
            events: RwLock::new(HashMap::new()),
            next_seq: AtomicU64::new(0),
        }
    }

    /// Record a submission event for `address` at the current instant.
    ///
    /// Takes the write lock for the duration of the insertion. Infallible.
    pub async fn record(&self, address: &str) {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let mut events = self.events.write().await;
        events.insert(
            seq,
            Event {
                address: address.to_string(),
                recorded_at: Instant::now(),
            },
        );
        debug!(%address, seq, live = events.len(), "Recorded submission event");
    }

    /// Count the currently-stored events for `address`.
    ///
    /// Deliberately age-agnostic: entries past the retention window still
    /// count until the next purge removes them. Concurrent counts overlap.
    pub async fn count_for(&self, address: &str) -> usize {
        let events = self.events.read().await;
        events.values().filter(|e| e.address == address).count()
    }

    /// Remove every event recorded strictly before `cutoff`.
    ///
    /// Idempotent: a second call with the same cutoff removes nothing.
    /// Returns the number of events removed.
    pub async fn purge_older_than(&self, cutoff: Instant) -> usize {
        let mut events = self.events.write().await;
        let before = events.len();
        events.retain(|_, e| e.recorded_at >= cutoff);
        before - events.len()
    }

    /// Run the periodic purge until `shutdown` fires.
    ///
    /// Every purge interval, events older than `now - window` are removed.
    /// The loop terminates when the sender side of `shutdown` signals or
    /// is dropped, so tests and graceful shutdown can stop it
    /// deterministically.
    pub async fn run_purge(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.purge_interval);
        // The first tick fires immediately; skip it so a fresh process
        // does not purge an empty map.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    // A window reaching past the monotonic clock's origin
                    // (host uptime shorter than the configured window) has
                    // no representable cutoff; nothing can be stale yet.
                    let Some(cutoff) = Instant::now().checked_sub(self.window) else {
                        continue;
                    };
                    let removed = self.purge_older_than(cutoff).await;
                    if removed > 0 {
                        debug!(removed, "Purged stale submission events");
                    }
                }
                _ = shutdown.changed() => {
                    info!("Purge task shutting down");
                    break;
                }
            }
        }
    }

    /// Retention window this tracker purges against.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Cadence of the purge loop.
    pub fn purge_interval(&self) -> Duration {
        self.purge_interval
    }
}
