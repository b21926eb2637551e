//! ert-config: run configuration file format and validation.

use std::path::{Path, PathBuf};

pub mod schema;
pub mod validate;

pub use schema::*;
pub use validate::{ValidationError, validate_config};

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("YAML error in {path}: {source}")]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Load by extension: `.json` as JSON, anything else as YAML.
pub fn load(path: &Path) -> ConfigResult<ErtConfig> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => load_json(path),
        _ => load_yaml(path),
    }
}

pub fn load_yaml(path: &Path) -> ConfigResult<ErtConfig> {
    let content = read(path)?;
    let config: ErtConfig = serde_yaml::from_str(&content).map_err(|source| ConfigError::Yaml {
        path: path.to_path_buf(),
        source,
    })?;
    validate_config(&config)?;
    Ok(config)
}

pub fn save_yaml(path: &Path, config: &ErtConfig) -> ConfigResult<()> {
    validate_config(config)?;
    let content = serde_yaml::to_string(config).map_err(|source| ConfigError::Yaml {
        path: path.to_path_buf(),
        source,
    })?;
    write(path, content)
}

pub fn load_json(path: &Path) -> ConfigResult<ErtConfig> {
    let content = read(path)?;
    let config: ErtConfig = serde_json::from_str(&content).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    validate_config(&config)?;
    Ok(config)
}

pub fn save_json(path: &Path, config: &ErtConfig) -> ConfigResult<()> {
    validate_config(config)?;
    let content = serde_json::to_string_pretty(config).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    write(path, content)
}

fn read(path: &Path) -> ConfigResult<String> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn write(path: &Path, content: String) -> ConfigResult<()> {
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}
