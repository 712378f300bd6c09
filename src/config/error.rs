//! Errors raised while loading `hotserve.toml`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    /// Only for a file named explicitly with `--config`
    #[error("config file `{0}` not found")]
    NotFound(PathBuf),

    #[error("invalid TOML")]
    Toml(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Validation(String),
}
