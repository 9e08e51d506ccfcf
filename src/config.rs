//! Configuration management
//!
//! TOML config with serde defaults, stored under the platform config dir.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Completion provider settings
    #[serde(default)]
    pub provider: ProviderSettings,
    /// Adaptation engine knobs
    #[serde(default)]
    pub engine: EngineSettings,
    /// Playbook snapshot persistence
    #[serde(default)]
    pub snapshot: SnapshotSettings,
}

/// Which OpenAI-compatible endpoint to call, and how
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Base URL of the chat-completions API
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Model identifier
    #[serde(default = "default_model")]
    pub model: String,
    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Completion token cap
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

/// Retry and window sizes for the adaptation loop
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Attempt budget per role call
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    /// How many recent reflections feed back into generator prompts
    #[serde(default = "default_reflection_window")]
    pub reflection_window: usize,
    /// Reflector refinement rounds per sample
    #[serde(default = "default_refinement_rounds")]
    pub max_refinement_rounds: usize,
}

/// Where the playbook snapshot lives between runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotSettings {
    #[serde(default = "default_snapshot_path")]
    pub path: PathBuf,
}

fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_api_key_env() -> String {
    "OPENROUTER_API_KEY".to_string()
}

fn default_model() -> String {
    "openai/gpt-oss-120b:free".to_string()
}

fn default_temperature() -> f32 {
    0.0
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_max_retries() -> usize {
    crate::roles::DEFAULT_MAX_RETRIES
}

fn default_reflection_window() -> usize {
    crate::adapter::DEFAULT_REFLECTION_WINDOW
}

fn default_refinement_rounds() -> usize {
    1
}

fn default_snapshot_path() -> PathBuf {
    data_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("playbook.json")
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            reflection_window: default_reflection_window(),
            max_refinement_rounds: default_refinement_rounds(),
        }
    }
}

impl Default for SnapshotSettings {
    fn default() -> Self {
        Self {
            path: default_snapshot_path(),
        }
    }
}

/// Path to the config file
pub fn config_path() -> Result<PathBuf> {
    let dir = dirs::config_dir().context("Could not determine config directory")?;
    Ok(dir.join("adaptive-playbook").join("config.toml"))
}

/// Data directory for snapshots and run artifacts
pub fn data_dir() -> Result<PathBuf> {
    let dir = dirs::data_local_dir().context("Could not determine data directory")?;
    Ok(dir.join("adaptive-playbook"))
}

impl Config {
    /// Load from the default location; missing file means defaults
    pub fn load() -> Result<Self> {
        let path = config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        toml::from_str(&content).context("Failed to parse config file")
    }

    /// Persist to the default location
    pub fn save(&self) -> Result<()> {
        let path = config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        Ok(())
    }

    /// Resolve the API key from the configured environment variable
    pub fn api_key(&self) -> Result<String> {
        std::env::var(&self.provider.api_key_env).with_context(|| {
            format!(
                "API key not found: set the {} environment variable",
                self.provider.api_key_env
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_apply_to_empty_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.engine.max_retries, 3);
        assert_eq!(config.engine.reflection_window, 3);
        assert_eq!(config.engine.max_refinement_rounds, 1);
        assert_eq!(config.provider.api_key_env, "OPENROUTER_API_KEY");
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config: Config = toml::from_str("[engine]\nmax_retries = 5\n").unwrap();
        assert_eq!(config.engine.max_retries, 5);
        assert_eq!(config.engine.reflection_window, 3);
    }
}
