// src/config/model.rs

use std::time::Duration;

use serde::Deserialize;

use crate::logging::LogLevel;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// log_level = "debug"
///
/// [cache]
/// max_entries = 1000
/// ttl = "30m"
/// memory_budget_bytes = 67108864
///
/// [execution]
/// max_concurrent_operations = 5
/// operation_timeout = "2m"
///
/// [monitoring]
/// interval = "30s"
/// response_time_warning = "5s"
/// response_time_target = "2s"
/// cache_hit_rate_warning = 0.5
/// ```
///
/// All sections are optional and have reasonable defaults. Durations stay as
/// strings here; [`SchedulerConfig`] is the parsed, validated form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSchedulerConfig {
    #[serde(default)]
    pub log_level: Option<LogLevel>,

    #[serde(default)]
    pub cache: RawCacheSection,

    #[serde(default)]
    pub execution: RawExecutionSection,

    #[serde(default)]
    pub monitoring: RawMonitoringSection,
}

/// `[cache]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RawCacheSection {
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    #[serde(default = "default_ttl")]
    pub ttl: String,

    #[serde(default = "default_memory_budget_bytes")]
    pub memory_budget_bytes: u64,
}

impl Default for RawCacheSection {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            ttl: default_ttl(),
            memory_budget_bytes: default_memory_budget_bytes(),
        }
    }
}

/// `[execution]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RawExecutionSection {
    #[serde(default = "default_max_concurrent_operations")]
    pub max_concurrent_operations: usize,

    /// Optional upper bound for a single operation's work. Unset means
    /// operations run to completion.
    #[serde(default)]
    pub operation_timeout: Option<String>,
}

impl Default for RawExecutionSection {
    fn default() -> Self {
        Self {
            max_concurrent_operations: default_max_concurrent_operations(),
            operation_timeout: None,
        }
    }
}

/// `[monitoring]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RawMonitoringSection {
    #[serde(default = "default_interval")]
    pub interval: String,

    #[serde(default = "default_response_time_warning")]
    pub response_time_warning: String,

    #[serde(default = "default_response_time_target")]
    pub response_time_target: String,

    #[serde(default = "default_cache_hit_rate_warning")]
    pub cache_hit_rate_warning: f64,
}

impl Default for RawMonitoringSection {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            response_time_warning: default_response_time_warning(),
            response_time_target: default_response_time_target(),
            cache_hit_rate_warning: default_cache_hit_rate_warning(),
        }
    }
}

fn default_max_entries() -> usize {
    1000
}

fn default_ttl() -> String {
    "30m".to_string()
}

fn default_memory_budget_bytes() -> u64 {
    64 * 1024 * 1024
}

fn default_max_concurrent_operations() -> usize {
    5
}

fn default_interval() -> String {
    "30s".to_string()
}

fn default_response_time_warning() -> String {
    "5s".to_string()
}

fn default_response_time_target() -> String {
    "2s".to_string()
}

fn default_cache_hit_rate_warning() -> f64 {
    0.5
}

/// Validated scheduler configuration.
///
/// Every field is public and independently settable; call
/// [`SchedulerConfig::validate`] (done by `Scheduler::new`) after editing.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    pub log_level: Option<LogLevel>,
    pub cache: CacheConfig,
    pub execution: ExecutionConfig,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// Entry count above which the memory-pressure pass runs.
    pub max_entries: usize,
    /// Base time-to-live for cached results.
    pub ttl: Duration,
    /// Estimated byte budget enforced by manual maintenance.
    pub memory_budget_bytes: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionConfig {
    pub max_concurrent_operations: usize,
    pub operation_timeout: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonitoringConfig {
    /// How often the adaptive optimizer inspects metrics.
    pub interval: Duration,
    /// Average response time above which response-time tuning kicks in.
    pub response_time_warning: Duration,
    /// Average response time under which tuning relaxes again.
    pub response_time_target: Duration,
    /// Hit rate below which cache tuning kicks in.
    pub cache_hit_rate_warning: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            log_level: None,
            cache: CacheConfig {
                max_entries: default_max_entries(),
                ttl: Duration::from_secs(30 * 60),
                memory_budget_bytes: default_memory_budget_bytes(),
            },
            execution: ExecutionConfig {
                max_concurrent_operations: default_max_concurrent_operations(),
                operation_timeout: None,
            },
            monitoring: MonitoringConfig {
                interval: Duration::from_secs(30),
                response_time_warning: Duration::from_secs(5),
                response_time_target: Duration::from_secs(2),
                cache_hit_rate_warning: default_cache_hit_rate_warning(),
            },
        }
    }
}

impl SchedulerConfig {
    pub fn with_cache_max_entries(mut self, max_entries: usize) -> Self {
        self.cache.max_entries = max_entries;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache.ttl = ttl;
        self
    }

    pub fn with_memory_budget_bytes(mut self, bytes: u64) -> Self {
        self.cache.memory_budget_bytes = bytes;
        self
    }

    pub fn with_max_concurrent_operations(mut self, max: usize) -> Self {
        self.execution.max_concurrent_operations = max;
        self
    }

    pub fn with_operation_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.execution.operation_timeout = timeout;
        self
    }

    pub fn with_monitoring_interval(mut self, interval: Duration) -> Self {
        self.monitoring.interval = interval;
        self
    }

    pub fn with_response_time_thresholds(mut self, warning: Duration, target: Duration) -> Self {
        self.monitoring.response_time_warning = warning;
        self.monitoring.response_time_target = target;
        self
    }

    pub fn with_cache_hit_rate_warning(mut self, threshold: f64) -> Self {
        self.monitoring.cache_hit_rate_warning = threshold;
        self
    }
}
