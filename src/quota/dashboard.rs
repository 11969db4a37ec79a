//! Admin Dashboard Support
//!
//! Data structures for monitoring live quota counters from an admin view.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::clock::Clock;
use super::limits::QuotaLimits;
use super::policy::QuotaPolicy;
use super::store::CounterSnapshot;

/// Dashboard data for admin interface
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardData {
    /// Timestamp of data generation
    pub timestamp: chrono::DateTime<chrono::Utc>,

    /// Summary statistics
    pub summary: QuotaSummary,

    /// Per-user live counters
    pub users: Vec<UserQuotaStats>,

    /// Configured ceilings per action
    pub actions: BTreeMap<String, ActionLimits>,

    /// Users exempt from ceilings
    pub exempt_users: Vec<String>,
}

/// Summary of quota usage across all users
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaSummary {
    /// Unexpired counter records
    pub live_counters: usize,

    /// Records held in memory, expired ones not yet swept included
    pub stored_counters: usize,

    /// Staleness sweeps since startup
    pub sweeps: u64,

    /// Distinct users with at least one live counter
    pub tracked_users: usize,

    /// Distinct actions with at least one live counter
    pub tracked_actions: usize,

    /// Checks allowed since startup
    pub allowed_total: u64,

    /// Checks rejected since startup
    pub rejected_total: u64,
}

/// Ceilings of one configured action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionLimits {
    pub per_minute: u32,
    pub per_day: u32,
}

impl From<QuotaLimits> for ActionLimits {
    fn from(limits: QuotaLimits) -> Self {
        Self {
            per_minute: limits.per_minute(),
            per_day: limits.per_day(),
        }
    }
}

/// Live counters of a single user
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserQuotaStats {
    pub user_id: String,
    pub counters: Vec<CounterSnapshot>,
}

/// Dashboard builder for constructing dashboard data
pub struct DashboardBuilder<C: Clock> {
    policy: QuotaPolicy<C>,
}

impl<C: Clock> DashboardBuilder<C> {
    pub fn new(policy: QuotaPolicy<C>) -> Self {
        Self { policy }
    }

    /// Build dashboard data
    pub fn build(&self) -> DashboardData {
        let snapshot = self.policy.snapshot();
        let stats = self.policy.stats();
        let actions: BTreeMap<String, ActionLimits> = self
            .policy
            .actions()
            .into_iter()
            .filter_map(|action| {
                let limits = self.policy.limits_for(&action)?;
                Some((action, ActionLimits::from(limits)))
            })
            .collect();

        let live_counters = snapshot.len();
        let tracked_actions = snapshot
            .iter()
            .map(|s| s.action.as_str())
            .collect::<BTreeSet<_>>()
            .len();

        let mut by_user: BTreeMap<String, Vec<CounterSnapshot>> = BTreeMap::new();
        for counter in snapshot {
            by_user
                .entry(counter.user_id.clone())
                .or_default()
                .push(counter);
        }

        let users: Vec<UserQuotaStats> = by_user
            .into_iter()
            .map(|(user_id, mut counters)| {
                counters.sort_by(|a, b| a.action.cmp(&b.action).then(a.scope.cmp(&b.scope)));
                UserQuotaStats { user_id, counters }
            })
            .collect();

        DashboardData {
            timestamp: chrono::Utc::now(),
            summary: QuotaSummary {
                live_counters,
                stored_counters: self.policy.enforcer().len(),
                sweeps: self.policy.enforcer().sweeps(),
                tracked_users: users.len(),
                tracked_actions,
                allowed_total: stats.allowed,
                rejected_total: stats.rejected,
            },
            users,
            actions,
            exempt_users: self.policy.settings().exempt_users.clone(),
        }
    }
}
