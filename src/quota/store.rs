//! Counter Store
//!
//! In-memory storage for per-window counters. Expiry is lazy: a record past
//! its `reset_at` reads as absent, and stale records are only dropped by a
//! sweep once the map reaches its high-water mark. A sweep that leaves the
//! map at or above the threshold pushes the mark up by half a threshold, so
//! a map full of live records is not rescanned on every insertion.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};

use super::limits::Scope;

/// Default number of stored records that triggers a staleness sweep
pub const DEFAULT_SWEEP_THRESHOLD: usize = 10_000;

/// Identity of one counter: (scope, action, user)
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct CounterKey {
    pub scope: Scope,
    pub action: String,
    pub user_id: String,
}

impl CounterKey {
    pub fn new(scope: Scope, action: &str, user_id: &str) -> Self {
        Self {
            scope,
            action: action.to_string(),
            user_id: user_id.to_string(),
        }
    }

}

/// Usage within one window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterRecord {
    /// Permitted operations so far
    pub count: u32,

    /// End of the window
    pub reset_at: Instant,
}

impl CounterRecord {
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.reset_at
    }

    /// Time left until the window rolls over
    pub fn resets_in(&self, now: Instant) -> Duration {
        self.reset_at.saturating_duration_since(now)
    }
}

/// Read-only view of a live counter, for dashboards
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterSnapshot {
    pub user_id: String,
    pub action: String,
    pub scope: Scope,
    pub count: u32,
    pub resets_in_secs: u64,
}

/// Map of counters with a high-water-mark sweep
#[derive(Debug)]
pub struct CounterStore {
    records: HashMap<CounterKey, CounterRecord>,
    sweep_threshold: usize,
    next_sweep_at: usize,
    sweeps: u64,
}

impl CounterStore {
    pub fn new(sweep_threshold: usize) -> Self {
        let sweep_threshold = sweep_threshold.max(1);
        Self {
            records: HashMap::new(),
            sweep_threshold,
            next_sweep_at: sweep_threshold,
            sweeps: 0,
        }
    }

    pub fn sweep_threshold(&self) -> usize {
        self.sweep_threshold
    }

    /// Record for `key` if its window is still open
    pub fn live(&self, key: &CounterKey, now: Instant) -> Option<&CounterRecord> {
        self.records.get(key).filter(|r| !r.is_expired(now))
    }

    /// Count one permitted use, opening a new window when needed.
    ///
    /// Returns the count after the increment.
    pub fn consume(&mut self, key: CounterKey, now: Instant) -> u32 {
        if let Some(record) = self.records.get_mut(&key) {
            if !record.is_expired(now) {
                record.count += 1;
                return record.count;
            }
            *record = CounterRecord {
                count: 1,
                reset_at: now + key.scope.window(),
            };
            return 1;
        }

        let window = key.scope.window();
        self.records.insert(
            key,
            CounterRecord {
                count: 1,
                reset_at: now + window,
            },
        );
        1
    }

    /// Whether the next insertion should be preceded by a sweep
    pub fn needs_sweep(&self) -> bool {
        self.records.len() >= self.next_sweep_at
    }

    /// Size at which the next opportunistic sweep runs
    pub fn next_sweep_at(&self) -> usize {
        self.next_sweep_at
    }

    /// Sweeps performed so far
    pub fn sweeps(&self) -> u64 {
        self.sweeps
    }

    /// Remove every record whose window has closed
    pub fn sweep_expired(&mut self, now: Instant) -> usize {
        let before = self.records.len();
        self.records.retain(|_, r| !r.is_expired(now));
        self.sweeps += 1;
        self.rearm();
        before - self.records.len()
    }

    /// Remove every record of one user
    pub fn remove_user(&mut self, user_id: &str) -> usize {
        let before = self.records.len();
        self.records.retain(|k, _| k.user_id != user_id);
        if self.records.len() < self.sweep_threshold {
            self.next_sweep_at = self.sweep_threshold;
        }
        before - self.records.len()
    }

    fn rearm(&mut self) {
        let len = self.records.len();
        self.next_sweep_at = if len >= self.sweep_threshold {
            len + (self.sweep_threshold / 2).max(1)
        } else {
            self.sweep_threshold
        };
    }

    /// Number of stored records, stale ones included
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Snapshots of all unexpired records
    pub fn snapshot(&self, now: Instant) -> Vec<CounterSnapshot> {
        self.records
            .iter()
            .filter(|(_, r)| !r.is_expired(now))
            .map(|(k, r)| CounterSnapshot {
                user_id: k.user_id.clone(),
                action: k.action.clone(),
                scope: k.scope,
                count: r.count,
                resets_in_secs: ceil_secs(r.resets_in(now)),
            })
            .collect()
    }
}

impl Default for CounterStore {
    fn default() -> Self {
        Self::new(DEFAULT_SWEEP_THRESHOLD)
    }
}

/// Whole seconds, rounded up, never below one
pub(crate) fn ceil_secs(d: Duration) -> u64 {
    let secs = d.as_secs() + u64::from(d.subsec_nanos() > 0);
    secs.max(1)
}
