//! Core configuration traits

use crate::errors::EmoteError;
use std::path::Path;

/// Core trait for emotebase configuration types
pub trait EngineSettings: Clone + Default + Send + Sync + 'static {
    /// Prefix of environment variables that override file values
    const ENV_PREFIX: &'static str;

    /// Get default configuration values
    fn defaults() -> Self {
        Self::default()
    }

    /// Parse configuration from TOML text
    fn from_toml_str(text: &str) -> Result<Self, EmoteError>;

    /// Load configuration from a file
    fn load_from_file(path: &Path) -> Result<Self, EmoteError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            EmoteError::internal(format!("Failed to read config file {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Set a configuration value from a string key
    fn set_from_string(&mut self, key: &str, value: &str) -> Result<(), EmoteError>;

    /// Merge `(key, value)` pairs whose key carries the environment prefix
    fn merge_with_vars<I>(&mut self, vars: I) -> Result<(), EmoteError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            if let Some(config_key) = key.strip_prefix(Self::ENV_PREFIX) {
                self.set_from_string(&config_key.to_lowercase(), &value)?;
            }
        }
        Ok(())
    }

    /// Merge with process environment variables
    fn merge_with_env(&mut self) -> Result<(), EmoteError> {
        self.merge_with_vars(std::env::vars())
    }

    /// Validate the configuration
    fn validate(&self) -> Result<(), EmoteError>;
}
