//! Quota Configuration
//!
//! Ceilings per named action plus enforcement switches.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::limits::QuotaLimits;
use super::store::DEFAULT_SWEEP_THRESHOLD;
use crate::error::QuotaError;

/// AI email draft generation
pub const EMAIL_AI_COMPOSE: &str = "email-ai-compose";

/// Conversational day-planning assistant
pub const ASSISTANT_CHAT: &str = "assistant-chat";

/// Default interval of the background sweep in the service binary
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 300;

/// Quota enforcement settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QuotaSettings {
    /// Enable quota enforcement
    pub enabled: bool,

    /// Stored counter count that triggers a staleness sweep
    pub sweep_threshold: usize,

    /// Background sweep interval for the service (0 disables)
    pub sweep_interval_secs: u64,

    /// Users exempt from all ceilings
    pub exempt_users: Vec<String>,

    /// Ceilings per action name
    pub actions: BTreeMap<String, QuotaLimits>,
}

impl Default for QuotaSettings {
    fn default() -> Self {
        let mut actions = BTreeMap::new();
        actions.insert(
            EMAIL_AI_COMPOSE.to_string(),
            QuotaLimits::new_unchecked(5, 120),
        );
        actions.insert(
            ASSISTANT_CHAT.to_string(),
            QuotaLimits::new_unchecked(10, 300),
        );

        Self {
            enabled: true,
            sweep_threshold: DEFAULT_SWEEP_THRESHOLD,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
            exempt_users: Vec::new(),
            actions,
        }
    }
}

impl QuotaSettings {
    /// Settings with a single action and nothing else
    #[cfg(test)]
    pub(crate) fn single(action: &str, limits: QuotaLimits) -> Self {
        let mut actions = BTreeMap::new();
        actions.insert(action.to_string(), limits);
        Self {
            actions,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), QuotaError> {
        if self.sweep_threshold == 0 {
            return Err(QuotaError::ZeroSweepThreshold);
        }
        for (action, limits) in &self.actions {
            if limits.validate().is_err() {
                return Err(QuotaError::InvalidActionLimits {
                    action: action.clone(),
                    per_minute: limits.per_minute(),
                    per_day: limits.per_day(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = QuotaSettings::default();
        assert!(settings.enabled);
        assert_eq!(settings.sweep_threshold, DEFAULT_SWEEP_THRESHOLD);
        assert_eq!(
            settings.actions.get(EMAIL_AI_COMPOSE),
            Some(&QuotaLimits::new(5, 120).unwrap())
        );
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_zero_action_limit_invalid() {
        let settings: QuotaSettings = toml::from_str(
            r#"
            [actions.compose]
            per_minute = 0
            per_day = 10
            "#,
        )
        .unwrap();
        assert_eq!(
            settings.validate(),
            Err(QuotaError::InvalidActionLimits {
                action: "compose".to_string(),
                per_minute: 0,
                per_day: 10,
            })
        );
    }

    #[test]
    fn test_zero_sweep_threshold_invalid() {
        let settings = QuotaSettings {
            sweep_threshold: 0,
            ..QuotaSettings::default()
        };
        assert_eq!(settings.validate(), Err(QuotaError::ZeroSweepThreshold));
    }

    #[test]
    fn test_partial_settings_keep_defaults() {
        let settings: QuotaSettings = toml::from_str("exempt_users = [\"ops\"]").unwrap();
        assert_eq!(settings.exempt_users, vec!["ops".to_string()]);
        assert!(settings.actions.contains_key(ASSISTANT_CHAT));
    }
}
