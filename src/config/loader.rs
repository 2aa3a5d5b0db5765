// src/config/loader.rs

use std::fs;
use std::path::Path;

use crate::config::model::{RawSchedulerConfig, SchedulerConfig};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw
/// `RawSchedulerConfig`.
///
/// This only performs TOML deserialization; durations are still strings and
/// nothing is range-checked. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawSchedulerConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawSchedulerConfig = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path, parse durations and validate ranges.
///
/// This is the recommended entry point for host applications that keep the
/// scheduler settings in a file.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<SchedulerConfig> {
    let raw_config = load_from_path(&path)?;
    let config = SchedulerConfig::try_from(raw_config)?;
    Ok(config)
}
