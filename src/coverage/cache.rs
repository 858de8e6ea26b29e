//! Per-panel result cache
//!
//! Entries are keyed by [`NodeId`] and expire after a TTL measured against a
//! [`Clock`]. Nothing here watches the scene: callers invalidate when a
//! panel or its surroundings change.

use super::CoverageResult;
use crate::scene::NodeId;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Source of the current time.
pub trait Clock {
    fn now(&self) -> Instant;
}

/// Monotonic wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Cached coverage results with age-based expiry.
#[derive(Debug, Clone, Default)]
pub struct CoverageCache {
    entries: HashMap<NodeId, CoverageResult>,
    ttl: Duration,
}

impl CoverageCache {
    /// Create an empty cache. A zero `ttl` never expires.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
        }
    }

    /// Maximum entry age.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn is_fresh(&self, result: &CoverageResult, now: Instant) -> bool {
        self.ttl.is_zero() || now.saturating_duration_since(result.timestamp) <= self.ttl
    }

    /// The entry for `panel`, if present and not older than the TTL.
    pub fn get(&self, panel: NodeId, now: Instant) -> Option<CoverageResult> {
        self.entries
            .get(&panel)
            .filter(|result| self.is_fresh(result, now))
            .copied()
    }

    /// Store or replace the entry for `panel`.
    pub fn insert(&mut self, panel: NodeId, result: CoverageResult) {
        self.entries.insert(panel, result);
    }

    /// Drop one entry, or every entry when `panel` is `None`.
    pub fn invalidate(&mut self, panel: Option<NodeId>) {
        match panel {
            Some(id) => {
                self.entries.remove(&id);
            }
            None => self.entries.clear(),
        }
    }

    /// Drop every entry older than the TTL. Returns how many were removed.
    pub fn purge_expired(&mut self, now: Instant) -> usize {
        if self.ttl.is_zero() {
            return 0;
        }
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries
            .retain(|_, result| now.saturating_duration_since(result.timestamp) <= ttl);
        before - self.entries.len()
    }

    /// Number of stored entries, expired or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
