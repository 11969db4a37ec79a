//! Quota Ceilings and Windows

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::error::QuotaError;

/// Length of the short-term window
pub const MINUTE_WINDOW: Duration = Duration::from_secs(60);

/// Length of the long-term window
pub const DAY_WINDOW: Duration = Duration::from_secs(24 * 3600);

/// Window a counter belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Trailing minute
    Minute,
    /// Trailing day
    Day,
}

impl Scope {
    /// Evaluation order. The finer window always comes first.
    pub const ALL: [Scope; 2] = [Scope::Minute, Scope::Day];

    /// Window length for this scope
    pub fn window(&self) -> Duration {
        match self {
            Scope::Minute => MINUTE_WINDOW,
            Scope::Day => DAY_WINDOW,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Minute => "minute",
            Scope::Day => "day",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-minute and per-day ceilings for one action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaLimits {
    per_minute: u32,
    per_day: u32,
}

impl QuotaLimits {
    /// Create limits, rejecting zero ceilings
    pub fn new(per_minute: u32, per_day: u32) -> Result<Self, QuotaError> {
        if per_minute == 0 || per_day == 0 {
            return Err(QuotaError::InvalidLimits {
                per_minute,
                per_day,
            });
        }
        Ok(Self {
            per_minute,
            per_day,
        })
    }

    /// Limits known to be non-zero at compile time
    pub(crate) const fn new_unchecked(per_minute: u32, per_day: u32) -> Self {
        Self {
            per_minute,
            per_day,
        }
    }

    pub fn per_minute(&self) -> u32 {
        self.per_minute
    }

    pub fn per_day(&self) -> u32 {
        self.per_day
    }

    /// Ceiling for the given scope
    pub fn ceiling(&self, scope: Scope) -> u32 {
        match scope {
            Scope::Minute => self.per_minute,
            Scope::Day => self.per_day,
        }
    }

    /// Check the ceilings after deserialization bypassed [`QuotaLimits::new`]
    pub fn validate(&self) -> Result<(), QuotaError> {
        Self::new(self.per_minute, self.per_day).map(|_| ())
    }
}
