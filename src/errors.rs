// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PhasedagError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Duplicate operation id: {0}")]
    DuplicateOperation(String),

    #[error("Cyclic dependency could not be resolved: {0}")]
    CyclicDependencyUnresolved(String),

    #[error("Execution plan defect: {0}")]
    PlanDefect(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, PhasedagError>;
