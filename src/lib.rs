//! Dashboard Quota Library
//!
//! Per-user, per-action quota enforcement for the productivity dashboard's
//! AI-backed endpoints, plus the configuration, logging, metrics and HTTP
//! plumbing of the standalone quota service.

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod quota;
pub mod server;

pub use error::QuotaError;
pub use quota::{QuotaDecision, QuotaEnforcer, QuotaLimits, QuotaPolicy};
