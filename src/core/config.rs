//! Configuration management for Planrun.
//!
//! Handles loading and saving configuration from TOML files.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::ai::{CompletionOptions, DEFAULT_OLLAMA_MODEL, DEFAULT_OLLAMA_URL};
use crate::workflow::ExecutorConfig;

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// AI settings
    pub ai: AiConfig,

    /// Plan execution settings
    pub execution: ExecutionConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Workspace root (defaults to the current directory)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_root: Option<PathBuf>,

    /// Record file operations without writing them
    pub dry_run: bool,
}

/// AI integration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Provider to use: auto, claude, or ollama
    pub provider: String,

    /// Model override for Claude
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Ollama settings
    pub ollama: OllamaConfig,
}

/// Ollama settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    /// Ollama API base URL
    pub base_url: String,

    /// Model to use
    pub model: String,
}

/// Plan execution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    pub planning_temperature: f32,
    pub planning_max_tokens: u32,
    pub execution_temperature: f32,
    pub execution_max_tokens: u32,

    /// Per-file character limit for gathered context
    pub max_context_file_chars: usize,

    /// Per-dependency character limit for prior task results
    pub max_dependency_output_chars: usize,
}

impl Config {
    /// Load configuration.
    ///
    /// Tries `./.planrun.toml`, then the global config file, then defaults.
    pub fn load() -> anyhow::Result<Self> {
        let local_config = PathBuf::from(".planrun.toml");
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Some(global_config) = Self::global_config_path() {
            if global_config.exists() {
                return Self::load_from_file(&global_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the global config file.
    pub fn save(&self) -> anyhow::Result<PathBuf> {
        let path = Self::global_config_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        self.save_to_file(&path)?;
        Ok(path)
    }

    /// Save configuration to a specific file, creating parent directories.
    pub fn save_to_file(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;

        Ok(())
    }

    /// Get the config directory path.
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("planrun"))
    }

    /// Get the global config file path.
    pub fn global_config_path() -> Option<PathBuf> {
        Self::config_dir().map(|d| d.join("config.toml"))
    }

    /// Executor settings derived from the `[execution]` section.
    pub fn executor_config(&self) -> ExecutorConfig {
        let execution = &self.execution;
        let execution_options =
            CompletionOptions::new(execution.execution_temperature, execution.execution_max_tokens);
        ExecutorConfig {
            planning: CompletionOptions::new(
                execution.planning_temperature,
                execution.planning_max_tokens,
            ),
            execution: execution_options,
            recovery: execution_options,
            max_context_file_chars: execution.max_context_file_chars,
            max_dependency_output_chars: execution.max_dependency_output_chars,
        }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: "auto".to_string(),
            model: None,
            timeout_secs: 120,
            ollama: OllamaConfig::default(),
        }
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self { base_url: DEFAULT_OLLAMA_URL.to_string(), model: DEFAULT_OLLAMA_MODEL.to_string() }
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        let planning = CompletionOptions::planning();
        let execution = CompletionOptions::execution();
        let defaults = ExecutorConfig::default();
        Self {
            planning_temperature: planning.temperature,
            planning_max_tokens: planning.max_tokens,
            execution_temperature: execution.temperature,
            execution_max_tokens: execution.max_tokens,
            max_context_file_chars: defaults.max_context_file_chars,
            max_dependency_output_chars: defaults.max_dependency_output_chars,
        }
    }
}
