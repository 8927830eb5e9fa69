//! Backend selection.

use std::{env, fmt, str::FromStr, time::Duration};

use kgperturb_core::TextRewriter;
use tracing::{info, instrument};

use crate::{
    client::{OllamaClient, OpenAiCompatibleClient},
    errors::LlmError,
    rewriter::PromptRewriter,
};

/// Environment variable that overrides the configured provider.
pub const LLM_PROVIDER_ENV: &str = "KGPERTURB_LLM_PROVIDER";

/// Supported completion backends.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LlmProvider {
    /// Any server implementing the `/chat/completions` API.
    OpenAi,
    /// A local Ollama server.
    Ollama,
}

impl LlmProvider {
    /// Returns the canonical provider name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Ollama => "ollama",
        }
    }

    /// Returns the API root used when no base URL is configured.
    #[must_use]
    pub const fn default_base_url(self) -> &'static str {
        match self {
            Self::OpenAi => OpenAiCompatibleClient::DEFAULT_BASE_URL,
            Self::Ollama => OllamaClient::DEFAULT_BASE_URL,
        }
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LlmProvider {
    type Err = LlmError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "openai" | "openai-compatible" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            _ => Err(LlmError::UnknownProvider {
                name: raw.to_owned(),
            }),
        }
    }
}

/// Connection settings for a completion backend.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LlmSettings {
    /// Provider name, overridden by [`LLM_PROVIDER_ENV`] when set.
    pub provider: String,
    /// Model identifier passed to the backend.
    pub model: String,
    /// API root; the provider default applies when absent.
    pub base_url: Option<String>,
    /// Name of the environment variable holding the API key, if any.
    pub api_key_env: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Ollama.as_str().to_owned(),
            model: "llama3.1".to_owned(),
            base_url: None,
            api_key_env: None,
            timeout_secs: 60,
        }
    }
}

impl LlmSettings {
    /// Resolves the provider, letting [`LLM_PROVIDER_ENV`] take precedence.
    ///
    /// # Errors
    /// Returns [`LlmError::UnknownProvider`] for unrecognised names.
    pub fn resolve_provider(&self) -> Result<LlmProvider, LlmError> {
        self.resolve_provider_with(env::var(LLM_PROVIDER_ENV).ok())
    }

    pub(crate) fn resolve_provider_with(
        &self,
        env_override: Option<String>,
    ) -> Result<LlmProvider, LlmError> {
        env_override
            .filter(|name| !name.trim().is_empty())
            .as_deref()
            .unwrap_or(self.provider.as_str())
            .parse()
    }

    /// Returns the API root for `provider`.
    #[must_use]
    pub fn base_url_for(&self, provider: LlmProvider) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| provider.default_base_url())
    }

    /// Returns the per-request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn api_key(&self) -> Result<Option<String>, LlmError> {
        let Some(variable) = &self.api_key_env else {
            return Ok(None);
        };
        env::var(variable)
            .map(Some)
            .map_err(|_| LlmError::MissingApiKey {
                variable: variable.clone(),
            })
    }
}

/// Builds the text rewriter described by `settings`.
///
/// # Errors
/// Returns [`LlmError`] when the provider is unknown, the model is blank, or
/// the configured API key variable is unset.
#[instrument(
    name = "llm.build_rewriter",
    err,
    skip(settings),
    fields(provider = %settings.provider, model = %settings.model),
)]
pub fn build_rewriter(settings: &LlmSettings) -> Result<Box<dyn TextRewriter>, LlmError> {
    let provider = settings.resolve_provider()?;
    let base_url = settings.base_url_for(provider);
    let rewriter: Box<dyn TextRewriter> = match provider {
        LlmProvider::OpenAi => Box::new(PromptRewriter::new(OpenAiCompatibleClient::new(
            base_url,
            settings.model.clone(),
            settings.api_key()?,
            settings.timeout(),
        )?)),
        LlmProvider::Ollama => Box::new(PromptRewriter::new(OllamaClient::new(
            base_url,
            settings.model.clone(),
            settings.timeout(),
        )?)),
    };
    info!(provider = %provider, base_url, "text rewriter ready");
    Ok(rewriter)
}
