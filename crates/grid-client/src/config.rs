//! Client configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timing and endpoint settings for the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server root, e.g. `http://127.0.0.1:8080`
    pub base_url: String,
    /// Quiet period before a search term is sent
    pub debounce_ms: u64,
    /// How long a failed cell shows its error before the value is restored
    pub error_display_ms: u64,
    /// How long the error indicator stays after the value is restored
    pub error_clear_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            debounce_ms: 300,
            error_display_ms: 1500,
            error_clear_ms: 1000,
        }
    }
}

impl ClientConfig {
    /// Set the server root
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Search debounce window
    #[inline]
    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Error display window
    #[inline]
    #[must_use]
    pub fn error_display(&self) -> Duration {
        Duration::from_millis(self.error_display_ms)
    }

    /// Indicator clear delay
    #[inline]
    #[must_use]
    pub fn error_clear(&self) -> Duration {
        Duration::from_millis(self.error_clear_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_interaction_timings() {
        let config = ClientConfig::default();
        assert_eq!(config.debounce(), Duration::from_millis(300));
        assert_eq!(config.error_display(), Duration::from_millis(1500));
        assert_eq!(config.error_clear(), Duration::from_millis(1000));
    }
}
