// tests/config_loading.rs

use std::io::Write;
use std::time::Duration;

use tempfile::NamedTempFile;

use phasedag::config::duration::parse_duration;
use phasedag::config::{SchedulerConfig, load_and_validate, load_from_path};
use phasedag::errors::PhasedagError;
use phasedag::logging::LogLevel;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", contents).unwrap();
    file
}

#[test]
fn full_config_is_parsed() {
    let file = write_config(
        r#"
log_level = "debug"

[cache]
max_entries = 250
ttl = "10m"
memory_budget_bytes = 4096

[execution]
max_concurrent_operations = 8
operation_timeout = "1500ms"

[monitoring]
interval = "15s"
response_time_warning = "3s"
response_time_target = "1s"
cache_hit_rate_warning = 0.4
"#,
    );

    let cfg = load_and_validate(file.path()).unwrap();

    assert_eq!(cfg.log_level, Some(LogLevel::Debug));
    assert_eq!(cfg.cache.max_entries, 250);
    assert_eq!(cfg.cache.ttl, Duration::from_secs(600));
    assert_eq!(cfg.cache.memory_budget_bytes, 4096);
    assert_eq!(cfg.execution.max_concurrent_operations, 8);
    assert_eq!(cfg.execution.operation_timeout, Some(Duration::from_millis(1500)));
    assert_eq!(cfg.monitoring.interval, Duration::from_secs(15));
    assert_eq!(cfg.monitoring.response_time_warning, Duration::from_secs(3));
    assert_eq!(cfg.monitoring.response_time_target, Duration::from_secs(1));
    assert_eq!(cfg.monitoring.cache_hit_rate_warning, 0.4);
}

#[test]
fn empty_file_uses_defaults() {
    let file = write_config("");
    let cfg = load_and_validate(file.path()).unwrap();
    assert_eq!(cfg, SchedulerConfig::default());
}

#[test]
fn raw_config_keeps_duration_strings() {
    let file = write_config("[cache]\nttl = \"45s\"\n");
    let raw = load_from_path(file.path()).unwrap();
    assert_eq!(raw.cache.ttl, "45s");
    assert_eq!(raw.execution.max_concurrent_operations, 5);
}

#[test]
fn zero_concurrency_is_rejected() {
    let file = write_config("[execution]\nmax_concurrent_operations = 0\n");

    match load_and_validate(file.path()) {
        Err(PhasedagError::ConfigError(msg)) => {
            assert!(msg.contains("max_concurrent_operations"));
        }
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn hit_rate_outside_unit_interval_is_rejected() {
    let file = write_config("[monitoring]\ncache_hit_rate_warning = 1.5\n");
    assert!(matches!(
        load_and_validate(file.path()),
        Err(PhasedagError::ConfigError(_))
    ));
}

#[test]
fn target_above_warning_is_rejected() {
    let file = write_config(
        "[monitoring]\nresponse_time_warning = \"1s\"\nresponse_time_target = \"2s\"\n",
    );
    assert!(matches!(
        load_and_validate(file.path()),
        Err(PhasedagError::ConfigError(_))
    ));
}

#[test]
fn bad_duration_names_the_field() {
    let file = write_config("[cache]\nttl = \"5 parsecs\"\n");

    match load_and_validate(file.path()) {
        Err(PhasedagError::ConfigError(msg)) => assert!(msg.contains("cache.ttl")),
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn malformed_toml_is_a_toml_error() {
    let file = write_config("[cache\nmax_entries = 3");
    assert!(matches!(
        load_and_validate(file.path()),
        Err(PhasedagError::TomlError(_))
    ));
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = load_and_validate(dir.path().join("absent.toml"));
    assert!(matches!(result, Err(PhasedagError::IoError(_))));
}

#[test]
fn in_code_config_is_validated_by_the_scheduler() {
    let cfg = SchedulerConfig::default().with_cache_max_entries(0);
    assert!(matches!(
        phasedag::Scheduler::new(cfg),
        Err(PhasedagError::ConfigError(_))
    ));
}

#[test]
fn duration_strings() {
    assert_eq!(parse_duration("250ms"), Ok(Duration::from_millis(250)));
    assert_eq!(parse_duration("30s"), Ok(Duration::from_secs(30)));
    assert_eq!(parse_duration("5m"), Ok(Duration::from_secs(300)));
    assert_eq!(parse_duration("1h"), Ok(Duration::from_secs(3600)));
    assert!(parse_duration("").is_err());
    assert!(parse_duration("10").is_err());
    assert!(parse_duration("10d").is_err());
}

#[test]
fn oversized_durations_are_rejected_instead_of_wrapping() {
    assert_eq!(
        parse_duration(&format!("{}s", u64::MAX)),
        Ok(Duration::from_secs(u64::MAX))
    );
    assert!(parse_duration("9999999999999999h").is_err());
    assert!(parse_duration(&format!("{}m", u64::MAX / 2)).is_err());

    let file = write_config("[cache]\nttl = \"9999999999999999h\"\n");
    match load_and_validate(file.path()) {
        Err(PhasedagError::ConfigError(msg)) => assert!(msg.contains("cache.ttl")),
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn huge_ttl_builds_a_scheduler_with_saturated_bounds() {
    let cfg = SchedulerConfig::default().with_cache_ttl(Duration::from_secs(u64::MAX / 2));
    let scheduler = phasedag::Scheduler::new(cfg).unwrap();

    let tuning = scheduler.tuning().snapshot();
    assert_eq!(tuning.cache_ttl, Duration::from_secs(u64::MAX / 2));
    assert_eq!(tuning.max_cache_ttl, Duration::MAX);
    assert!(tuning.min_cache_ttl < tuning.cache_ttl);
}

#[test]
fn scheduler_from_path_builds_from_file() {
    let file = write_config("log_level = \"warn\"\n\n[execution]\nmax_concurrent_operations = 3\n");
    let scheduler = phasedag::scheduler_from_path(file.path()).unwrap();
    assert_eq!(scheduler.config().execution.max_concurrent_operations, 3);
    assert_eq!(scheduler.tuning().concurrency_hint(), 3);

    // The subscriber is already installed now; loading again still succeeds.
    let again = phasedag::scheduler_from_path(file.path()).unwrap();
    assert_eq!(again.config(), scheduler.config());
}
