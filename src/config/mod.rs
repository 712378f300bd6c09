//! Configuration management for `hotserve.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section.rs    # [serve] and [reload]
//! ├── error.rs      # ConfigError
//! └── mod.rs        # Config (this file)
//! ```
//!
//! The config file is optional. Values are resolved in order: defaults,
//! then the file, then command-line flags.

mod error;
pub mod section;

pub use error::ConfigError;
pub use section::{ReloadConfig, ServeConfig};

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cli::Cli;
use crate::log;
use crate::reload::PathClassifier;
use crate::reload::classify::normalize_extension;

/// Config file looked up when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "hotserve.toml";

/// Upper bound for `reload.debounce_ms`.
const MAX_DEBOUNCE_MS: u64 = 60_000;

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing hotserve.toml
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Config file the values were read from, if any (internal use only)
    #[serde(skip)]
    pub config_path: Option<PathBuf>,

    /// Development server settings
    #[serde(default)]
    pub serve: ServeConfig,

    /// Live reload settings
    #[serde(default)]
    pub reload: ReloadConfig,
}

impl Config {
    /// Load configuration from CLI arguments.
    ///
    /// A missing default config file is fine; a missing file named explicitly
    /// with `--config` is an error.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let mut config = match Self::locate(&cli.config)? {
            Some(path) => Self::from_path(&path)?,
            None => Self::default(),
        };

        config.apply_cli(cli);
        config.validate()?;
        Ok(config)
    }

    fn locate(path: &Path) -> Result<Option<PathBuf>, ConfigError> {
        if path.is_file() {
            return Ok(Some(path.to_path_buf()));
        }
        if path.as_os_str().is_empty() || path == Path::new(DEFAULT_CONFIG_FILE) {
            return Ok(None);
        }
        Err(ConfigError::NotFound(path.to_path_buf()))
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (mut config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        // Paths inside the file are relative to the file itself
        if let Some(base) = path.parent() {
            config.resolve_relative(base);
        }
        config.config_path = Some(path.to_path_buf());
        crate::debug!("serve"; "loaded config from {}", path.display());

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    /// Print warning about unknown fields.
    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring:", display_path);
        for field in fields {
            eprintln!("- {}", field);
        }
    }

    fn resolve_relative(&mut self, base: &Path) {
        if base.as_os_str().is_empty() {
            return;
        }
        if self.serve.root.is_relative() {
            self.serve.root = base.join(&self.serve.root);
        }
        if let Some(root) = self.reload.root.as_mut()
            && root.is_relative()
        {
            *root = base.join(&*root);
        }
    }

    // ========================================================================
    // cli configuration updates
    // ========================================================================

    /// Command-line flags override file values.
    pub fn apply_cli(&mut self, cli: &Cli) {
        Self::update_option(&mut self.serve.root, cli.root.as_ref());
        Self::update_option(&mut self.serve.index, cli.index.as_ref());
        Self::update_option(&mut self.serve.interface, cli.interface.as_ref());
        Self::update_option(&mut self.serve.port, cli.port.as_ref());
        Self::update_option(&mut self.serve.open, cli.open.as_ref());

        Self::update_option(&mut self.reload.enable, cli.watch.as_ref());
        Self::update_option(&mut self.reload.debounce_ms, cli.debounce.as_ref());
        Self::update_option(&mut self.reload.extensions, cli.extensions.as_ref());
    }

    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Check values that cannot be caught by deserialization.
    ///
    /// Directory existence is checked when the server starts, not here.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let index = self.serve.index.trim();
        if index.is_empty() {
            return Err(ConfigError::Validation("[serve] index must not be empty".into()));
        }
        if Path::new(index)
            .components()
            .any(|c| !matches!(c, std::path::Component::Normal(_)))
        {
            return Err(ConfigError::Validation(format!(
                "[serve] index `{index}` must be a relative path inside the served root"
            )));
        }

        if self.reload.debounce_ms > MAX_DEBOUNCE_MS {
            return Err(ConfigError::Validation(format!(
                "[reload] debounce_ms must be at most {MAX_DEBOUNCE_MS}, got {}",
                self.reload.debounce_ms
            )));
        }

        let has_extension = self
            .reload
            .extensions
            .iter()
            .any(|ext| normalize_extension(ext).is_some());
        if self.reload.enable && !has_extension {
            return Err(ConfigError::Validation(
                "[reload] extensions must name at least one extension".into(),
            ));
        }

        Ok(())
    }

    // ========================================================================
    // accessors
    // ========================================================================

    /// Directory files are served from.
    pub fn serve_root(&self) -> &Path {
        &self.serve.root
    }

    /// Directory tree watched for changes.
    pub fn watch_root(&self) -> &Path {
        self.reload.root.as_deref().unwrap_or(&self.serve.root)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.reload.debounce_ms)
    }

    pub fn classifier(&self) -> PathClassifier {
        PathClassifier::new(&self.reload.extensions)
    }
}

/// Parse config, panicking on unknown fields (to catch typos in tests).
#[cfg(test)]
pub fn test_parse_config(content: &str) -> Config {
    let (parsed, ignored) = Config::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}
