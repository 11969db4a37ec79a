//! Quota Enforcer
//!
//! Two fixed windows per (user, action): a minute window and a day window.
//! A check is evaluated minute-first and short-circuits on the first
//! exhausted window. Counters are only incremented when both windows accept,
//! and the whole check-then-increment runs under the store lock.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::clock::{Clock, SystemClock};
use super::limits::{QuotaLimits, Scope};
use super::store::{ceil_secs, CounterKey, CounterSnapshot, CounterStore, DEFAULT_SWEEP_THRESHOLD};
use crate::metrics;

/// Outcome of one quota check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaDecision {
    /// Whether the operation may proceed
    pub allowed: bool,

    /// Advisory wait hint in seconds, at least 1
    #[serde(rename = "retryAfterSeconds")]
    pub retry_after_secs: u64,

    /// Lesser of the two windows' remaining allowance
    pub remaining: u32,
}

impl QuotaDecision {
    pub fn allowed(remaining: u32, retry_after_secs: u64) -> Self {
        Self {
            allowed: true,
            retry_after_secs: retry_after_secs.max(1),
            remaining,
        }
    }

    pub fn rejected(retry_after_secs: u64) -> Self {
        Self {
            allowed: false,
            retry_after_secs: retry_after_secs.max(1),
            remaining: 0,
        }
    }
}

/// Current state of one window, as seen by a read-only query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowUsage {
    pub scope: Scope,
    pub count: u32,
    pub limit: u32,
    pub remaining: u32,

    /// `None` when no window is open for this key
    pub resets_in_secs: Option<u64>,
}

/// Read-only view of both windows for one (user, action)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaUsage {
    pub minute: WindowUsage,
    pub day: WindowUsage,
    pub remaining: u32,
}

/// Per-user, per-action quota enforcer
///
/// Cloning is cheap and clones share the same counters.
pub struct QuotaEnforcer<C: Clock = SystemClock> {
    inner: Arc<EnforcerInner<C>>,
}

struct EnforcerInner<C> {
    clock: C,
    store: Mutex<CounterStore>,
}

impl<C: Clock> Clone for QuotaEnforcer<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Clock> std::fmt::Debug for QuotaEnforcer<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let store = self.inner.store.lock();
        f.debug_struct("QuotaEnforcer")
            .field("records", &store.len())
            .field("sweep_threshold", &store.sweep_threshold())
            .finish()
    }
}

impl QuotaEnforcer<SystemClock> {
    /// Create an enforcer on the system clock with the default sweep threshold
    pub fn new() -> Self {
        Self::with_clock(SystemClock, DEFAULT_SWEEP_THRESHOLD)
    }

    pub fn with_sweep_threshold(sweep_threshold: usize) -> Self {
        Self::with_clock(SystemClock, sweep_threshold)
    }
}

impl Default for QuotaEnforcer<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> QuotaEnforcer<C> {
    /// Create an enforcer reading time from `clock`
    pub fn with_clock(clock: C, sweep_threshold: usize) -> Self {
        Self {
            inner: Arc::new(EnforcerInner {
                clock,
                store: Mutex::new(CounterStore::new(sweep_threshold)),
            }),
        }
    }

    /// Decide whether `user_id` may perform `action` now, consuming one unit
    /// of both windows when allowed.
    ///
    /// A rejected check leaves every counter untouched. When the minute
    /// window rejects, the day window is not evaluated at all.
    pub fn check_and_consume(
        &self,
        user_id: &str,
        action: &str,
        limits: &QuotaLimits,
    ) -> QuotaDecision {
        let now = self.inner.clock.now();
        let mut store = self.inner.store.lock();

        let mut retry_after_secs = 1;
        let mut remaining = u32::MAX;
        let mut accepted = Vec::with_capacity(Scope::ALL.len());

        for scope in Scope::ALL {
            let key = CounterKey::new(scope, action, user_id);
            let ceiling = limits.ceiling(scope);
            let (count, resets_in) = match store.live(&key, now) {
                Some(record) => (record.count, record.resets_in(now)),
                None => (0, scope.window()),
            };

            retry_after_secs = retry_after_secs.max(ceil_secs(resets_in));

            if count >= ceiling {
                tracing::debug!(
                    user_id,
                    action,
                    scope = %scope,
                    count,
                    ceiling,
                    retry_after_secs,
                    "Quota window exhausted"
                );
                return QuotaDecision::rejected(retry_after_secs);
            }

            remaining = remaining.min(ceiling - count - 1);
            accepted.push(key);
        }

        if store.needs_sweep() {
            let removed = sweep(&mut store, now);
            if removed > 0 {
                tracing::info!(removed, remaining = store.len(), "Swept expired quota counters");
            } else {
                tracing::debug!(
                    stored = store.len(),
                    next_sweep_at = store.next_sweep_at(),
                    "Quota sweep found nothing expired"
                );
            }
        }

        for key in accepted {
            store.consume(key, now);
        }
        metrics::QUOTA_STORED_COUNTERS.set(store.len() as i64);

        QuotaDecision::allowed(remaining, retry_after_secs)
    }

    /// Both windows for (user, action) without consuming anything
    pub fn usage(&self, user_id: &str, action: &str, limits: &QuotaLimits) -> QuotaUsage {
        let now = self.inner.clock.now();
        let store = self.inner.store.lock();

        let window = |scope: Scope| {
            let limit = limits.ceiling(scope);
            let key = CounterKey::new(scope, action, user_id);
            match store.live(&key, now) {
                Some(record) => WindowUsage {
                    scope,
                    count: record.count,
                    limit,
                    remaining: limit.saturating_sub(record.count),
                    resets_in_secs: Some(ceil_secs(record.resets_in(now))),
                },
                None => WindowUsage {
                    scope,
                    count: 0,
                    limit,
                    remaining: limit,
                    resets_in_secs: None,
                },
            }
        };

        let minute = window(Scope::Minute);
        let day = window(Scope::Day);
        QuotaUsage {
            minute,
            day,
            remaining: minute.remaining.min(day.remaining),
        }
    }

    /// Drop every record whose window has closed
    pub fn sweep_expired(&self) -> usize {
        let now = self.inner.clock.now();
        sweep(&mut self.inner.store.lock(), now)
    }

    /// Sweeps performed so far, opportunistic and explicit
    pub fn sweeps(&self) -> u64 {
        self.inner.store.lock().sweeps()
    }

    /// Forget all counters of one user
    pub fn reset_user(&self, user_id: &str) -> usize {
        let mut store = self.inner.store.lock();
        let removed = store.remove_user(user_id);
        metrics::QUOTA_STORED_COUNTERS.set(store.len() as i64);
        removed
    }

    /// Stored records, stale ones included
    pub fn len(&self) -> usize {
        self.inner.store.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.store.lock().is_empty()
    }

    /// Unexpired counters, for the admin dashboard
    pub fn snapshot(&self) -> Vec<CounterSnapshot> {
        let now = self.inner.clock.now();
        self.inner.store.lock().snapshot(now)
    }
}

fn sweep(store: &mut CounterStore, now: std::time::Instant) -> usize {
    let removed = store.sweep_expired(now);
    metrics::QUOTA_SWEEPS_TOTAL.inc();
    metrics::QUOTA_SWEPT_RECORDS_TOTAL.inc_by(removed as u64);
    metrics::QUOTA_STORED_COUNTERS.set(store.len() as i64);
    removed
}
