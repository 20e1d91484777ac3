//! Error types for the reel engine

use std::path::PathBuf;

use dc_core::ConfigError;
use thiserror::Error;

/// Failure loading a settings file
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yml::Error),

    #[error("unsupported settings format: {0}")]
    UnsupportedFormat(String),

    #[error(transparent)]
    Invalid(#[from] ConfigError),
}

/// Failure scanning a symbol directory
#[derive(Error, Debug)]
pub enum SymbolLoadError {
    #[error("symbol directory not found: {0}")]
    MissingDirectory(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Command rejected by the spin coordinator
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoordinatorError {
    #[error("a spin is in progress")]
    Busy,

    #[error(transparent)]
    Config(#[from] ConfigError),
}
