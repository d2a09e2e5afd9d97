//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Where render output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    /// Build live nodes and bind reactivity.
    #[default]
    Dom,
    /// Produce marker-annotated markup only; nothing is bound.
    String,
}

/// Per-thread engine settings, installed with [`crate::Renderer::install`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub mode: RenderMode,
    /// Extra time an animation primitive waits past its nominal duration
    /// before giving up on the end event.
    pub animation_grace_ms: u64,
    /// Element wrapping raw-html values that don't name their own.
    pub raw_html_wrapper: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mode: RenderMode::Dom,
            animation_grace_ms: 50,
            raw_html_wrapper: "span".to_string(),
        }
    }
}

impl EngineConfig {
    /// Parse a config from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let tag = &self.raw_html_wrapper;
        let valid = tag.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
            && tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
        if valid {
            Ok(())
        } else {
            Err(ConfigError::InvalidWrapper(tag.clone()))
        }
    }
}
