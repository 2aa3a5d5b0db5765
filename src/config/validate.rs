// src/config/validate.rs

use std::time::Duration;

use crate::config::duration::parse_duration;
use crate::config::model::{
    CacheConfig, ExecutionConfig, MonitoringConfig, RawSchedulerConfig, SchedulerConfig,
};
use crate::errors::{PhasedagError, Result};

impl TryFrom<RawSchedulerConfig> for SchedulerConfig {
    type Error = PhasedagError;

    fn try_from(raw: RawSchedulerConfig) -> std::result::Result<Self, Self::Error> {
        let operation_timeout = match raw.execution.operation_timeout.as_deref() {
            Some(s) => Some(duration_field("execution.operation_timeout", s)?),
            None => None,
        };

        let config = SchedulerConfig {
            log_level: raw.log_level,
            cache: CacheConfig {
                max_entries: raw.cache.max_entries,
                ttl: duration_field("cache.ttl", &raw.cache.ttl)?,
                memory_budget_bytes: raw.cache.memory_budget_bytes,
            },
            execution: ExecutionConfig {
                max_concurrent_operations: raw.execution.max_concurrent_operations,
                operation_timeout,
            },
            monitoring: MonitoringConfig {
                interval: duration_field("monitoring.interval", &raw.monitoring.interval)?,
                response_time_warning: duration_field(
                    "monitoring.response_time_warning",
                    &raw.monitoring.response_time_warning,
                )?,
                response_time_target: duration_field(
                    "monitoring.response_time_target",
                    &raw.monitoring.response_time_target,
                )?,
                cache_hit_rate_warning: raw.monitoring.cache_hit_rate_warning,
            },
        };

        config.validate()?;
        Ok(config)
    }
}

impl SchedulerConfig {
    /// Check semantic constraints that serde defaults cannot express.
    pub fn validate(&self) -> Result<()> {
        validate_cache(&self.cache)?;
        validate_execution(&self.execution)?;
        validate_monitoring(&self.monitoring)?;
        Ok(())
    }
}

fn duration_field(field: &str, value: &str) -> Result<Duration> {
    parse_duration(value)
        .map_err(|e| PhasedagError::ConfigError(format!("[{field}]: {e}")))
}

fn validate_cache(cache: &CacheConfig) -> Result<()> {
    if cache.max_entries == 0 {
        return Err(PhasedagError::ConfigError(
            "[cache].max_entries must be >= 1 (got 0)".to_string(),
        ));
    }
    if cache.ttl.is_zero() {
        return Err(PhasedagError::ConfigError(
            "[cache].ttl must be greater than zero".to_string(),
        ));
    }
    if cache.memory_budget_bytes == 0 {
        return Err(PhasedagError::ConfigError(
            "[cache].memory_budget_bytes must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_execution(execution: &ExecutionConfig) -> Result<()> {
    if execution.max_concurrent_operations == 0 {
        return Err(PhasedagError::ConfigError(
            "[execution].max_concurrent_operations must be >= 1 (got 0)".to_string(),
        ));
    }
    if let Some(timeout) = execution.operation_timeout {
        if timeout.is_zero() {
            return Err(PhasedagError::ConfigError(
                "[execution].operation_timeout must be greater than zero when set".to_string(),
            ));
        }
    }
    Ok(())
}

fn validate_monitoring(monitoring: &MonitoringConfig) -> Result<()> {
    if monitoring.interval.is_zero() {
        return Err(PhasedagError::ConfigError(
            "[monitoring].interval must be greater than zero".to_string(),
        ));
    }
    if !(0.0..=1.0).contains(&monitoring.cache_hit_rate_warning) {
        return Err(PhasedagError::ConfigError(format!(
            "[monitoring].cache_hit_rate_warning must be within [0, 1] (got {})",
            monitoring.cache_hit_rate_warning
        )));
    }
    if monitoring.response_time_target > monitoring.response_time_warning {
        return Err(PhasedagError::ConfigError(format!(
            "[monitoring].response_time_target ({:?}) must not exceed response_time_warning ({:?})",
            monitoring.response_time_target, monitoring.response_time_warning
        )));
    }
    Ok(())
}
