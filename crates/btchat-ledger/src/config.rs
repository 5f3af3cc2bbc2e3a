//! Ledger configuration
//!
//! Layering is defaults, then an optional TOML file, then `BTCHAT_*`
//! environment variables, then [`LedgerConfig::validate`].

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::warn;

/// Environment variable prefix for configuration overrides.
pub const ENV_PREFIX: &str = "BTCHAT_";

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// File that failed to read
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Config file or override is not well formed.
    #[error("failed to parse config: {0}")]
    Parse(String),

    /// Config values violate a constraint.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Tunable ledger limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LedgerConfig {
    /// Free posts granted to each new user
    pub initial_free_posts: u32,
    /// Maximum post length in characters
    pub max_post_length: usize,
    /// Maximum comment length in characters
    pub max_comment_length: usize,
    /// Maximum bio length in characters
    pub max_bio_length: usize,
    /// Upper bound on records returned by a listing read
    pub max_page_size: usize,
}

impl LedgerConfig {
    /// Default free post allowance for new users.
    pub const DEFAULT_INITIAL_FREE_POSTS: u32 = 5;
    /// Default post length limit, matching the client's counter.
    pub const DEFAULT_MAX_POST_LENGTH: usize = 280;
    /// Default comment length limit.
    pub const DEFAULT_MAX_COMMENT_LENGTH: usize = 280;
    /// Default bio length limit.
    pub const DEFAULT_MAX_BIO_LENGTH: usize = 160;
    /// Default listing page size cap.
    pub const DEFAULT_MAX_PAGE_SIZE: usize = 100;

    /// Parse a config from TOML text. Missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load a config file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Resolve the effective config: defaults, optional file, process
    /// environment, then validation.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::default(),
        };
        config.merge_with_env(std::env::vars())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `BTCHAT_*` overrides from the given variables.
    ///
    /// Unrelated variables are ignored. Unknown `BTCHAT_*` keys are skipped
    /// with a warning; malformed values for known keys are errors.
    pub fn merge_with_env<I>(&mut self, vars: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            let Some(name) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            match name {
                "INITIAL_FREE_POSTS" => self.initial_free_posts = parse_env(&key, &value)?,
                "MAX_POST_LENGTH" => self.max_post_length = parse_env(&key, &value)?,
                "MAX_COMMENT_LENGTH" => self.max_comment_length = parse_env(&key, &value)?,
                "MAX_BIO_LENGTH" => self.max_bio_length = parse_env(&key, &value)?,
                "MAX_PAGE_SIZE" => self.max_page_size = parse_env(&key, &value)?,
                // Read by the CLI, not part of ledger limits.
                "JOURNAL" | "CONFIG" | "LOG" => {}
                _ => warn!(variable = %key, "ignoring unknown configuration variable"),
            }
        }
        Ok(())
    }

    /// Check that every limit admits at least one record.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_post_length == 0 {
            return Err(ConfigError::Invalid("max_post_length must be > 0".into()));
        }
        if self.max_comment_length == 0 {
            return Err(ConfigError::Invalid(
                "max_comment_length must be > 0".into(),
            ));
        }
        if self.max_page_size == 0 {
            return Err(ConfigError::Invalid("max_page_size must be > 0".into()));
        }
        Ok(())
    }

    /// Clamp a caller-supplied page size to the configured cap.
    pub fn page_limit(&self, requested: usize) -> usize {
        requested.min(self.max_page_size)
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            initial_free_posts: Self::DEFAULT_INITIAL_FREE_POSTS,
            max_post_length: Self::DEFAULT_MAX_POST_LENGTH,
            max_comment_length: Self::DEFAULT_MAX_COMMENT_LENGTH,
            max_bio_length: Self::DEFAULT_MAX_BIO_LENGTH,
            max_page_size: Self::DEFAULT_MAX_PAGE_SIZE,
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Parse(format!("{key}: expected a number, got {value:?}")))
}
