//! Domain configuration

use crate::{ConfigError, HandyError, HandyResult, Task, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Who may mark an in-progress task completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum CompletionPolicy {
    /// Only the task's poster.
    #[default]
    PosterOnly,
    /// The poster or the assigned helper.
    PosterOrHelper,
}

impl CompletionPolicy {
    pub fn allows(&self, task: &Task, actor: UserId) -> bool {
        match self {
            CompletionPolicy::PosterOnly => task.poster_id == actor,
            CompletionPolicy::PosterOrHelper => task.is_participant(actor),
        }
    }

    pub fn as_db_str(&self) -> &'static str {
        match self {
            CompletionPolicy::PosterOnly => "poster_only",
            CompletionPolicy::PosterOrHelper => "poster_or_helper",
        }
    }
}

impl fmt::Display for CompletionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_db_str())
    }
}

impl FromStr for CompletionPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "poster_only" | "poster" => Ok(CompletionPolicy::PosterOnly),
            "poster_or_helper" | "poster_or_assigned_helper" => {
                Ok(CompletionPolicy::PosterOrHelper)
            }
            other => Err(ConfigError::InvalidValue {
                field: "completion_policy".to_string(),
                value: other.to_string(),
                reason: "expected poster_only or poster_or_helper".to_string(),
            }),
        }
    }
}

/// Tunables for the marketplace services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct MarketConfig {
    pub completion_policy: CompletionPolicy,
    /// Page size used when a task listing asks for 0 rows.
    pub default_page_limit: usize,
    /// Upper bound on any page size.
    pub max_page_limit: usize,
    /// Page size used when a message listing asks for 0 rows.
    pub default_message_page_limit: usize,
    /// Maximum message length, in characters.
    pub max_message_length: usize,
    pub max_attachments: usize,
    /// Buffer size of the realtime event channel.
    pub event_capacity: usize,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            completion_policy: CompletionPolicy::PosterOnly,
            default_page_limit: 20,
            max_page_limit: 100,
            default_message_page_limit: 50,
            max_message_length: 5000,
            max_attachments: 10,
            event_capacity: 1024,
        }
    }
}

impl MarketConfig {
    pub fn validate(&self) -> HandyResult<()> {
        let positive = [
            ("default_page_limit", self.default_page_limit),
            ("max_page_limit", self.max_page_limit),
            ("default_message_page_limit", self.default_message_page_limit),
            ("max_message_length", self.max_message_length),
            ("event_capacity", self.event_capacity),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(HandyError::Config(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: value.to_string(),
                    reason: format!("{} must be greater than 0", field),
                }));
            }
        }

        if self.default_page_limit > self.max_page_limit {
            return Err(HandyError::Config(ConfigError::InvalidValue {
                field: "default_page_limit".to_string(),
                value: self.default_page_limit.to_string(),
                reason: "default_page_limit must not exceed max_page_limit".to_string(),
            }));
        }
        if self.default_message_page_limit > self.max_page_limit {
            return Err(HandyError::Config(ConfigError::InvalidValue {
                field: "default_message_page_limit".to_string(),
                value: self.default_message_page_limit.to_string(),
                reason: "default_message_page_limit must not exceed max_page_limit".to_string(),
            }));
        }
        Ok(())
    }

    /// Clamp a requested task page size: 0 means default, anything above the cap is capped.
    pub fn task_page_limit(&self, requested: usize) -> usize {
        clamp_limit(requested, self.default_page_limit, self.max_page_limit)
    }

    /// Clamp a requested message page size.
    pub fn message_page_limit(&self, requested: usize) -> usize {
        clamp_limit(requested, self.default_message_page_limit, self.max_page_limit)
    }
}

fn clamp_limit(requested: usize, default: usize, max: usize) -> usize {
    match requested {
        0 => default,
        n => n.min(max),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = MarketConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.completion_policy, CompletionPolicy::PosterOnly);
        assert_eq!(config.default_page_limit, 20);
        assert_eq!(config.default_message_page_limit, 50);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let config = MarketConfig {
            event_capacity: 0,
            ..MarketConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(HandyError::Config(ConfigError::InvalidValue { field, .. })) if field == "event_capacity"
        ));
    }

    #[test]
    fn test_default_above_max_rejected() {
        let config = MarketConfig {
            default_page_limit: 500,
            ..MarketConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_page_limits() {
        let config = MarketConfig::default();
        assert_eq!(config.task_page_limit(0), 20);
        assert_eq!(config.task_page_limit(7), 7);
        assert_eq!(config.task_page_limit(10_000), 100);
        assert_eq!(config.message_page_limit(0), 50);
    }

    #[test]
    fn test_completion_policy_parse() {
        assert_eq!(
            "poster-or-helper".parse::<CompletionPolicy>().unwrap(),
            CompletionPolicy::PosterOrHelper
        );
        assert_eq!("poster_only".parse::<CompletionPolicy>().unwrap(), CompletionPolicy::PosterOnly);
        assert!("anyone".parse::<CompletionPolicy>().is_err());
    }
}
