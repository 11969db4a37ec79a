//! Quota Error Types
//!
//! Exceeding a quota is not an error; it is reported through
//! [`QuotaDecision`](crate::quota::QuotaDecision). These variants cover
//! misconfiguration and malformed caller input only.

/// Error types for quota operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuotaError {
    /// A ceiling of zero was configured
    #[error("Invalid quota limits: per_minute={per_minute}, per_day={per_day} (both must be > 0)")]
    InvalidLimits { per_minute: u32, per_day: u32 },

    /// A configured action carries a zero ceiling
    #[error("Quota action '{action}' has invalid limits: per_minute={per_minute}, per_day={per_day} (both must be > 0)")]
    InvalidActionLimits {
        action: String,
        per_minute: u32,
        per_day: u32,
    },

    /// Sweep threshold of zero
    #[error("Quota sweep threshold must be > 0")]
    ZeroSweepThreshold,

    /// The action has no configured ceilings
    #[error("Unknown quota action: {0}")]
    UnknownAction(String),

    /// Caller identity missing
    #[error("User id must not be empty")]
    EmptyUserId,
}
