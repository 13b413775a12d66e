//! Generative completion backends.
//!
//! The workflow engine only ever talks to a [`CompletionProvider`]. Concrete
//! HTTP providers live behind the `ai` feature; tests and embedders can plug
//! in their own implementation.
//!
//! ## Providers
//!
//! - Claude (requires `ANTHROPIC_API_KEY`)
//! - Ollama (local LLM)

#[cfg(feature = "ai")]
mod claude;
#[cfg(feature = "ai")]
mod ollama;

#[cfg(feature = "ai")]
pub use claude::ClaudeProvider;
#[cfg(feature = "ai")]
pub use ollama::OllamaProvider;

use async_trait::async_trait;

/// Default Ollama API base URL.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Default Ollama model.
pub const DEFAULT_OLLAMA_MODEL: &str = "codellama:7b";

/// Sampling options for a single completion call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionOptions {
    /// Sampling temperature
    pub temperature: f32,

    /// Upper bound on generated tokens
    pub max_tokens: u32,
}

impl CompletionOptions {
    pub fn new(temperature: f32, max_tokens: u32) -> Self {
        Self { temperature, max_tokens }
    }

    /// Options for plan synthesis (structured output, low creativity).
    pub fn planning() -> Self {
        Self { temperature: 0.2, max_tokens: 4000 }
    }

    /// Options for task execution (moderate creativity, generous budget).
    pub fn execution() -> Self {
        Self { temperature: 0.3, max_tokens: 8000 }
    }

    /// Options for a recovery attempt.
    pub fn recovery() -> Self {
        Self::execution()
    }
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self::execution()
    }
}

/// Trait for generative text backends.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Complete a prompt.
    async fn complete(&self, prompt: &str, options: &CompletionOptions)
        -> Result<String, AIError>;

    /// Get the provider name.
    fn name(&self) -> &str;

    /// Check if the provider is available.
    async fn is_available(&self) -> bool;
}

/// AI error types.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AIError {
    #[error("Provider not available: {0}")]
    ProviderNotAvailable(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Rate limited, retry after {0}s")]
    RateLimited(u64),

    #[error("No response from AI")]
    NoResponse,
}

/// Provider chain with fallback support.
///
/// Tries providers in order and returns the first successful completion.
pub struct AIManager {
    providers: Vec<Box<dyn CompletionProvider>>,
}

impl AIManager {
    /// Create a manager over an explicit provider chain.
    pub fn with_providers(providers: Vec<Box<dyn CompletionProvider>>) -> Self {
        Self { providers }
    }

    /// Build the provider chain described by the configuration.
    ///
    /// `auto` tries Claude (if an API key is set) and then Ollama (if running).
    #[cfg(feature = "ai")]
    pub async fn from_config(config: &crate::core::AiConfig) -> Self {
        let mut providers: Vec<Box<dyn CompletionProvider>> = Vec::new();
        let provider = config.provider.to_ascii_lowercase();

        if provider == "auto" || provider == "claude" {
            match ClaudeProvider::new(config.timeout_secs) {
                Ok(claude) => {
                    let claude = match &config.model {
                        Some(model) => claude.with_model(model.clone()),
                        None => claude,
                    };
                    if claude.is_available().await {
                        providers.push(Box::new(claude));
                    }
                }
                Err(e) => tracing::debug!(error = %e, "Claude provider unavailable"),
            }
        }

        if provider == "auto" || provider == "ollama" {
            let ollama = OllamaProvider::new(config.timeout_secs)
                .with_base_url(config.ollama.base_url.clone())
                .with_model(config.ollama.model.clone());
            if provider == "ollama" || ollama.is_available().await {
                providers.push(Box::new(ollama));
            }
        }

        Self { providers }
    }

    /// Check if any AI provider is configured.
    pub fn has_providers(&self) -> bool {
        !self.providers.is_empty()
    }

    /// Get the active provider name.
    pub fn active_provider(&self) -> Option<&str> {
        self.providers.first().map(|p| p.name())
    }
}

#[async_trait]
impl CompletionProvider for AIManager {
    async fn complete(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<String, AIError> {
        let mut last_error = None;

        for provider in &self.providers {
            match provider.complete(prompt, options).await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    tracing::warn!(provider = provider.name(), error = %e, "Provider failed, trying next");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| AIError::ProviderNotAvailable("No AI provider available".to_string())))
    }

    fn name(&self) -> &str {
        self.active_provider().unwrap_or("none")
    }

    async fn is_available(&self) -> bool {
        for provider in &self.providers {
            if provider.is_available().await {
                return true;
            }
        }
        false
    }
}
