//! Configuration loader for listeners
//!
//! Loads [`ListenerConfig`] from YAML files. A missing file is an empty
//! configuration, not an error.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{EventError, EventResult};

use super::ListenerConfig;

/// Configuration loader for listener files
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load listener configuration from a file path
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or contains invalid YAML.
    pub fn load_from_path(path: &Path) -> EventResult<ListenerConfig> {
        // If file doesn't exist, return empty config (not an error)
        if !path.exists() {
            debug!(path = %path.display(), "Listener configuration not found");
            return Ok(ListenerConfig::default());
        }

        let content = fs::read_to_string(path)?;
        let config = Self::parse(&content)?;
        debug!(
            path = %path.display(),
            listeners = config.listeners.len(),
            subscribers = config.subscribers.len(),
            "Loaded listener configuration"
        );
        Ok(config)
    }

    /// Parse YAML configuration content
    ///
    /// Expected YAML format:
    /// ```yaml
    /// listeners:
    ///   - event: user.created
    ///     service: welcome_mailer
    ///     method: send
    ///     priority: 10
    /// subscribers:
    ///   - service: audit_log
    /// ```
    pub fn parse(content: &str) -> EventResult<ListenerConfig> {
        if content.trim().is_empty() {
            return Ok(ListenerConfig::default());
        }

        let value: serde_yaml::Value = serde_yaml::from_str(content)?;
        if value.is_null() {
            return Ok(ListenerConfig::default());
        }
        if !value.is_mapping() {
            return Err(EventError::Configuration(
                "listener configuration must be a mapping".to_string(),
            ));
        }

        serde_yaml::from_value(value)
            .map_err(|e| EventError::Configuration(format!("Failed to parse listeners: {}", e)))
    }
}
