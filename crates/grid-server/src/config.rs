//! Server configuration
//!
//! Loaded from an optional TOML file; every key has a default.
//!
//! ```toml
//! bind = "127.0.0.1:8080"
//! seed_rows = 50
//!
//! [page_limits]
//! default_page_size = 10
//! max_page_size = 100
//!
//! [mutation]
//! max_price_cents = 100000000
//! failure_sentinel = 999
//! ```

use grid_model::PageLimits;
use grid_store::MutationPolicy;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read config {path}: {source}")]
    Io {
        /// Path that failed
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// File is not valid TOML for this schema
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Values parse but contradict each other
    #[error("inconsistent config: {0}")]
    Invalid(String),
}

/// Server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address
    pub bind: SocketAddr,
    /// Entities seeded at startup
    pub seed_rows: usize,
    /// Page-size policy
    pub page_limits: PageLimits,
    /// Write bounds and failure sentinel
    pub mutation: MutationPolicy,
}

impl ServerConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from TOML text
    ///
    /// # Errors
    /// Returns `ConfigError::Parse` or `ConfigError::Invalid`
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file, or defaults when no path is given
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read or parsed
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// With listen address
    #[inline]
    #[must_use]
    pub fn with_bind(mut self, bind: SocketAddr) -> Self {
        self.bind = bind;
        self
    }

    /// With seed size
    #[inline]
    #[must_use]
    pub fn with_seed_rows(mut self, rows: usize) -> Self {
        self.seed_rows = rows;
        self
    }

    /// Check cross-field consistency
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` describing the first problem found
    pub fn validate(&self) -> Result<(), ConfigError> {
        let limits = &self.page_limits;
        if limits.max_page_size == 0 {
            return Err(ConfigError::Invalid("max_page_size must be at least 1".into()));
        }
        if limits.default_page_size == 0 || limits.default_page_size > limits.max_page_size {
            return Err(ConfigError::Invalid(format!(
                "default_page_size {} must be within 1..={}",
                limits.default_page_size, limits.max_page_size
            )));
        }
        let policy = &self.mutation;
        if policy.min_price > policy.max_price || policy.min_price.cents() < 0 {
            return Err(ConfigError::Invalid(format!(
                "price bounds {}..={} are not a non-negative range",
                policy.min_price, policy.max_price
            )));
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8080)),
            seed_rows: 50,
            page_limits: PageLimits::default(),
            mutation: MutationPolicy::default(),
        }
    }
}
