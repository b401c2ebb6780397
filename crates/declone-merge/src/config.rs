use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default number of clone locators merged per batch.
pub const DEFAULT_BATCH_SIZE: usize = 250;

/// Default name of the store clones are promoted into.
pub const DEFAULT_TARGET_STORE: &str = "web";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("batch size must be a positive integer, got {0}")]
    InvalidBatchSize(usize),

    #[error("target store name must not be empty")]
    EmptyTargetStore,

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration for the clone promoter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromoterConfig {
    /// Locators pulled from the manifest and merged together. Must be positive.
    pub batch_size: usize,
    /// Store whose relationship partition is read and written.
    pub target_store: String,
}

impl Default for PromoterConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            target_store: DEFAULT_TARGET_STORE.to_string(),
        }
    }
}

impl PromoterConfig {
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_target_store(mut self, store: impl Into<String>) -> Self {
        self.target_store = store.into();
        self
    }

    /// Parse and validate a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidBatchSize(self.batch_size));
        }
        if self.target_store.trim().is_empty() {
            return Err(ConfigError::EmptyTargetStore);
        }
        Ok(())
    }
}
