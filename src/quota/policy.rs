//! Quota Policy
//!
//! Resolves named actions to their configured ceilings and wraps the
//! enforcer with exemptions, metrics and logging.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::clock::{Clock, SystemClock};
use super::config::QuotaSettings;
use super::enforcer::{QuotaDecision, QuotaEnforcer, QuotaUsage};
use super::limits::QuotaLimits;
use super::store::CounterSnapshot;
use crate::error::QuotaError;
use crate::metrics;

/// Running totals of policy decisions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyStats {
    pub allowed: u64,
    pub rejected: u64,
}

/// Quota policy shared by request handlers
#[derive(Debug, Clone)]
pub struct QuotaPolicy<C: Clock = SystemClock> {
    settings: Arc<QuotaSettings>,
    enforcer: QuotaEnforcer<C>,
    allowed: Arc<AtomicU64>,
    rejected: Arc<AtomicU64>,
}

impl QuotaPolicy<SystemClock> {
    /// Create a policy with its own enforcer
    pub fn new(settings: QuotaSettings) -> Self {
        let enforcer = QuotaEnforcer::with_sweep_threshold(settings.sweep_threshold);
        Self::with_enforcer(settings, enforcer)
    }
}

impl<C: Clock> QuotaPolicy<C> {
    pub fn with_enforcer(settings: QuotaSettings, enforcer: QuotaEnforcer<C>) -> Self {
        Self {
            settings: Arc::new(settings),
            enforcer,
            allowed: Arc::new(AtomicU64::new(0)),
            rejected: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Check and consume quota for `action` on behalf of `user_id`
    pub fn check(&self, user_id: &str, action: &str) -> Result<QuotaDecision, QuotaError> {
        let limits = self.resolve(user_id, action)?;

        if !self.settings.enabled || self.is_exempt(user_id) {
            return Ok(QuotaDecision::allowed(u32::MAX, 1));
        }

        let decision = self.enforcer.check_and_consume(user_id, action, &limits);

        if decision.allowed {
            self.allowed.fetch_add(1, Ordering::Relaxed);
            metrics::QUOTA_DECISIONS_TOTAL
                .with_label_values(&[action, "allowed"])
                .inc();
            tracing::debug!(user_id, action, remaining = decision.remaining, "Quota check passed");
        } else {
            self.rejected.fetch_add(1, Ordering::Relaxed);
            metrics::QUOTA_DECISIONS_TOTAL
                .with_label_values(&[action, "rejected"])
                .inc();
            tracing::warn!(
                user_id,
                action,
                retry_after_secs = decision.retry_after_secs,
                "Quota exceeded"
            );
        }

        Ok(decision)
    }

    /// Current usage without consuming
    pub fn usage(&self, user_id: &str, action: &str) -> Result<QuotaUsage, QuotaError> {
        let limits = self.resolve(user_id, action)?;
        Ok(self.enforcer.usage(user_id, action, &limits))
    }

    fn resolve(&self, user_id: &str, action: &str) -> Result<QuotaLimits, QuotaError> {
        if user_id.is_empty() {
            return Err(QuotaError::EmptyUserId);
        }
        self.limits_for(action)
            .ok_or_else(|| QuotaError::UnknownAction(action.to_string()))
    }

    pub fn limits_for(&self, action: &str) -> Option<QuotaLimits> {
        self.settings.actions.get(action).copied()
    }

    /// Configured action names, sorted
    pub fn actions(&self) -> Vec<String> {
        self.settings.actions.keys().cloned().collect()
    }

    pub fn is_exempt(&self, user_id: &str) -> bool {
        self.settings.exempt_users.iter().any(|u| u == user_id)
    }

    pub fn settings(&self) -> &QuotaSettings {
        &self.settings
    }

    pub fn stats(&self) -> PolicyStats {
        PolicyStats {
            allowed: self.allowed.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }

    pub fn snapshot(&self) -> Vec<CounterSnapshot> {
        self.enforcer.snapshot()
    }

    pub fn reset_user(&self, user_id: &str) -> usize {
        let removed = self.enforcer.reset_user(user_id);
        if removed > 0 {
            tracing::info!(user_id, removed, "Reset quota counters for user");
        }
        removed
    }

    pub fn sweep_expired(&self) -> usize {
        let removed = self.enforcer.sweep_expired();
        removed
    }

    pub fn enforcer(&self) -> &QuotaEnforcer<C> {
        &self.enforcer
    }
}
