//! Client configuration
//!
//! Rendering and logging settings for executors. Every section has defaults,
//! so an empty file is a valid configuration.
//!
//! ```toml
//! [render]
//! param_prefix = "p_"
//! placeholder = "dollar"   # or "braces" for legacy servers
//!
//! [logging]
//! log_queries = true
//! slow_query_threshold_ms = 250
//! ```

use crate::error::ConfigError;
use cypherkit_query::{is_identifier, PlaceholderStyle, RenderOptions, DEFAULT_PARAM_PREFIX};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Top-level client configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub render: RenderConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Prefix for generated parameter names
    pub param_prefix: String,
    /// Placeholder token style
    pub placeholder: PlaceholderStyle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Emit query text at debug level
    pub log_queries: bool,
    /// Warn about queries slower than this
    pub slow_query_threshold_ms: Option<u64>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            param_prefix: DEFAULT_PARAM_PREFIX.to_string(),
            placeholder: PlaceholderStyle::Dollar,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_queries: true,
            slow_query_threshold_ms: None,
        }
    }
}

impl RenderConfig {
    /// Render options for executors
    pub fn options(&self) -> RenderOptions {
        RenderOptions {
            param_prefix: self.param_prefix.clone(),
            placeholder: self.placeholder,
        }
    }
}

impl LoggingConfig {
    pub fn slow_query_threshold(&self) -> Option<Duration> {
        self.slow_query_threshold_ms.map(Duration::from_millis)
    }
}

impl ClientConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ClientConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub async fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Loading client config");

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.display().to_string(),
                source,
            })?;
        Self::from_toml_str(&content)
    }

    /// Check values that deserialize fine but would produce broken queries
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_identifier(&self.render.param_prefix) {
            return Err(ConfigError::Invalid {
                field: "render.param_prefix",
                reason: format!(
                    "{:?} must start with a letter or underscore and contain only letters, digits, and underscores",
                    self.render.param_prefix
                ),
            });
        }
        Ok(())
    }
}
