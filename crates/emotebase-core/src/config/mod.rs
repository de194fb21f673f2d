//! Engine configuration
//!
//! ```toml
//! lock_shards = 64
//! message_query_limit = 100
//! max_lineage_depth = 32
//! ```
//!
//! Every key may be overridden by an `EMOTEBASE_<KEY>` environment variable.

mod traits;
mod validation;

pub use traits::EngineSettings;
pub use validation::{ConfigValidator, ValidationError};

use serde::{Deserialize, Serialize};

use crate::errors::EmoteError;

/// Tunables for the mutation engine and query layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Number of shards in the entity lock table
    pub lock_shards: usize,
    /// Candidate messages examined per unread-message query
    pub message_query_limit: usize,
    /// Longest parent chain followed when resolving a lineage root
    pub max_lineage_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lock_shards: 64,
            message_query_limit: 100,
            max_lineage_depth: 32,
        }
    }
}

impl EngineSettings for EngineConfig {
    const ENV_PREFIX: &'static str = "EMOTEBASE_";

    fn from_toml_str(text: &str) -> Result<Self, EmoteError> {
        let config: Self = toml::from_str(text)
            .map_err(|e| EmoteError::invalid_request(format!("Invalid TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    fn set_from_string(&mut self, key: &str, value: &str) -> Result<(), EmoteError> {
        let slot = match key {
            "lock_shards" => &mut self.lock_shards,
            "message_query_limit" => &mut self.message_query_limit,
            "max_lineage_depth" => &mut self.max_lineage_depth,
            _ => return Ok(()),
        };
        *slot = value.parse().map_err(|_| {
            EmoteError::from(ValidationError::InvalidFormat {
                field: key.to_string(),
                expected: "unsigned integer".to_string(),
                actual: value.to_string(),
            })
        })?;
        Ok(())
    }

    fn validate(&self) -> Result<(), EmoteError> {
        ConfigValidator::new()
            .range("lock_shards", self.lock_shards as u64, Some(1), Some(4096))
            .range(
                "message_query_limit",
                self.message_query_limit as u64,
                Some(1),
                Some(10_000),
            )
            .range("max_lineage_depth", self.max_lineage_depth as u64, Some(1), None)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::defaults();
        assert!(config.validate().is_ok());
        assert_eq!(config.message_query_limit, 100);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml_str("lock_shards = 8").unwrap();
        assert_eq!(config.lock_shards, 8);
        assert_eq!(config.max_lineage_depth, 32);
    }

    #[test]
    fn test_out_of_range_rejected() {
        let err = EngineConfig::from_toml_str("lock_shards = 0").unwrap_err();
        assert!(matches!(err, EmoteError::InvalidRequest { .. }));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = EngineConfig::default();
        config
            .merge_with_vars([
                ("EMOTEBASE_MESSAGE_QUERY_LIMIT".to_string(), "25".to_string()),
                ("UNRELATED".to_string(), "1".to_string()),
            ])
            .unwrap();
        assert_eq!(config.message_query_limit, 25);

        let err = config
            .merge_with_vars([("EMOTEBASE_LOCK_SHARDS".to_string(), "many".to_string())])
            .unwrap_err();
        assert!(err.detail().contains("lock_shards"));
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("emotebase-{}.toml", std::process::id()));
        std::fs::write(&path, "message_query_limit = 40\nmax_lineage_depth = 4\n").unwrap();
        let loaded = EngineConfig::load_from_file(&path);
        std::fs::remove_file(&path).unwrap();

        let config = loaded.unwrap();
        assert_eq!(config.message_query_limit, 40);
        assert_eq!(config.max_lineage_depth, 4);
        assert_eq!(config.lock_shards, 64);
    }

    #[test]
    fn test_load_from_missing_file() {
        let path = std::env::temp_dir().join("emotebase-missing-config.toml");
        let err = EngineConfig::load_from_file(&path).unwrap_err();
        assert!(matches!(err, EmoteError::InternalServerError { .. }));
        assert!(err.detail().contains("emotebase-missing-config.toml"));
    }

    #[test]
    fn test_merge_with_env() {
        // No other test reads this variable.
        std::env::set_var("EMOTEBASE_MAX_LINEAGE_DEPTH", "7");
        let mut config = EngineConfig::default();
        let merged = config.merge_with_env();
        std::env::remove_var("EMOTEBASE_MAX_LINEAGE_DEPTH");

        merged.unwrap();
        assert_eq!(config.max_lineage_depth, 7);
    }
}
