//! Quota Enforcement Module
//!
//! Per-user, per-action quotas for the dashboard's expensive endpoints
//! (AI email drafts, planning assistant chat).
//!
//! # Features
//!
//! - Fixed minute and day windows enforced together
//! - Side-effect-free rejections with a `Retry-After` hint
//! - Lazy window expiry with a high-water-mark sweep
//! - Named action ceilings and exempt users from configuration
//! - Admin dashboard snapshot of live counters
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Quota Policy                           │
//! │        (action registry, exemptions, metrics, logs)         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────┐   │
//! │  │     Quota Enforcer (minute window → day window)      │   │
//! │  └─────────────────────────────────────────────────────┘   │
//! │  ┌─────────────────────────────────────────────────────┐   │
//! │  │        Counter Store (in-memory, lazy expiry)        │   │
//! │  └─────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Counters live in process memory only. Separate processes keep separate
//! counters.

pub mod clock;
pub mod config;
pub mod dashboard;
pub mod enforcer;
pub mod limits;
pub mod policy;
pub mod store;

#[cfg(test)]
mod proptests;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::QuotaSettings;
pub use dashboard::{ActionLimits, DashboardBuilder, DashboardData};
pub use enforcer::{QuotaDecision, QuotaEnforcer, QuotaUsage, WindowUsage};
pub use limits::{QuotaLimits, Scope};
pub use policy::{PolicyStats, QuotaPolicy};
pub use store::{CounterKey, CounterRecord, CounterSnapshot, CounterStore};
