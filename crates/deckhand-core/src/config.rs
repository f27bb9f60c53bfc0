//! Runtime configuration: defaults, TOML file, environment overrides.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::dispatch::{CapabilityPolicy, DispatchConfig, DEFAULT_MIN_FRAGMENT_LEN};
use crate::publish::{SnapshotDestination, DEFAULT_SLICE_SIZE, PPTX_MIME};

pub const ENV_BACKEND_URL: &str = "DECKHAND_BACKEND_URL";
pub const ENV_SNAPSHOT_PATH: &str = "DECKHAND_SNAPSHOT_PATH";
pub const ENV_MIN_FRAGMENT_LEN: &str = "DECKHAND_MIN_FRAGMENT_LEN";

/// Errors produced while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value {value:?} for {var}")]
    Env { var: &'static str, value: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeckhandConfig {
    pub backend_url: String,
    pub snapshot: SnapshotDestination,
    /// Publish one snapshot per slide instead of one for the whole deck.
    pub per_slide: bool,
    pub min_fragment_len: usize,
    /// Let a unit edit slides other than its own.
    pub allow_cross_slide: bool,
    pub slice_size: usize,
    pub upload_filename: String,
    pub upload_filetype: String,
    pub request_timeout_secs: u64,
    /// Extra attempts for a failed preparation step.
    pub retry_attempts: u32,
}

impl Default for DeckhandConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:8000".to_string(),
            snapshot: SnapshotDestination::default(),
            per_slide: false,
            min_fragment_len: DEFAULT_MIN_FRAGMENT_LEN,
            allow_cross_slide: false,
            slice_size: DEFAULT_SLICE_SIZE,
            upload_filename: "presentation.pptx".to_string(),
            upload_filetype: PPTX_MIME.to_string(),
            request_timeout_secs: 30,
            retry_attempts: 1,
        }
    }
}

impl DeckhandConfig {
    /// Defaults overridden by the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Read a TOML file, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let mut config = Self::from_toml(&text)?;
        config.apply_env()?;
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_vars(|var| std::env::var(var).ok())
    }

    fn apply_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(url) = lookup(ENV_BACKEND_URL) {
            self.backend_url = url;
        }
        if let Some(path) = lookup(ENV_SNAPSHOT_PATH) {
            self.snapshot.path = path;
        }
        if let Some(value) = lookup(ENV_MIN_FRAGMENT_LEN) {
            self.min_fragment_len = value.trim().parse().map_err(|_| ConfigError::Env {
                var: ENV_MIN_FRAGMENT_LEN,
                value,
            })?;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backend_url.trim().is_empty() {
            return Err(ConfigError::Invalid("backend_url must not be empty".into()));
        }
        if self.snapshot.name.trim().is_empty() {
            return Err(ConfigError::Invalid("snapshot.name must not be empty".into()));
        }
        if self.slice_size == 0 {
            return Err(ConfigError::Invalid("slice_size must be positive".into()));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn dispatch_config(&self) -> DispatchConfig {
        DispatchConfig {
            min_fragment_len: self.min_fragment_len,
            policy: if self.allow_cross_slide {
                CapabilityPolicy::permissive()
            } else {
                CapabilityPolicy::standard()
            },
        }
    }
}
