//! Blocking HTTP completion clients.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::instrument;
use ureq::Agent;

use crate::errors::LlmError;

/// Produces free-form text for a prompt.
///
/// Implementations block until the backend answers. `Ok(None)` means the
/// backend answered without usable text.
pub trait CompletionClient {
    /// Short backend name used in diagnostics.
    fn name(&self) -> &str;

    /// Requests a completion for `prompt` at the given sampling temperature.
    ///
    /// # Errors
    /// Returns [`LlmError`] when the request fails or the response cannot be
    /// decoded.
    fn complete(&self, prompt: &str, temperature: f32) -> Result<Option<String>, LlmError>;
}

fn agent(timeout: Duration) -> Agent {
    let config = Agent::config_builder()
        .timeout_global(Some(timeout))
        .build();
    Agent::new_with_config(config)
}

fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{path}", base_url.trim_end_matches('/'))
}

fn checked_model(model: String) -> Result<String, LlmError> {
    if model.trim().is_empty() {
        return Err(LlmError::MissingModel);
    }
    Ok(model)
}

fn non_blank(text: Option<String>) -> Option<String> {
    text.map(|text| text.trim().to_owned())
        .filter(|text| !text.is_empty())
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponse {
    #[serde(default)]
    pub(crate) choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatChoice {
    pub(crate) message: ChatReply,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatReply {
    #[serde(default)]
    pub(crate) content: Option<String>,
}

impl ChatResponse {
    pub(crate) fn into_text(self) -> Option<String> {
        non_blank(
            self.choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content),
        )
    }
}

/// Client for servers exposing the `/chat/completions` endpoint.
pub struct OpenAiCompatibleClient {
    agent: Agent,
    url: String,
    model: String,
    api_key: Option<String>,
}

impl OpenAiCompatibleClient {
    /// Default API root.
    pub const DEFAULT_BASE_URL: &'static str = "https://api.openai.com/v1";

    /// Creates a client posting to `{base_url}/chat/completions`.
    ///
    /// # Errors
    /// Returns [`LlmError::MissingModel`] when `model` is blank.
    pub fn new(
        base_url: &str,
        model: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        Ok(Self {
            agent: agent(timeout),
            url: endpoint(base_url, "chat/completions"),
            model: checked_model(model.into())?,
            api_key,
        })
    }

    /// Returns the completion endpoint.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the configured model name.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

impl CompletionClient for OpenAiCompatibleClient {
    fn name(&self) -> &str {
        "openai"
    }

    #[instrument(
        name = "llm.complete",
        err,
        skip(self, prompt),
        fields(backend = "openai", model = %self.model),
    )]
    fn complete(&self, prompt: &str, temperature: f32) -> Result<Option<String>, LlmError> {
        let body = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature,
        };
        let mut request = self.agent.post(self.url.as_str());
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }
        let mut response = request.send_json(&body).map_err(|source| LlmError::Http {
            url: self.url.clone(),
            source: Box::new(source),
        })?;
        let reply: ChatResponse =
            response
                .body_mut()
                .read_json()
                .map_err(|error| LlmError::MalformedResponse {
                    url: self.url.clone(),
                    message: error.to_string(),
                })?;
        Ok(reply.into_text())
    }
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GenerateResponse {
    #[serde(default)]
    pub(crate) response: Option<String>,
}

impl GenerateResponse {
    pub(crate) fn into_text(self) -> Option<String> {
        non_blank(self.response)
    }
}

/// Client for a local Ollama server's `/api/generate` endpoint.
pub struct OllamaClient {
    agent: Agent,
    url: String,
    model: String,
}

impl OllamaClient {
    /// Default server address.
    pub const DEFAULT_BASE_URL: &'static str = "http://localhost:11434";

    /// Creates a client posting non-streaming requests to
    /// `{base_url}/api/generate`.
    ///
    /// # Errors
    /// Returns [`LlmError::MissingModel`] when `model` is blank.
    pub fn new(
        base_url: &str,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        Ok(Self {
            agent: agent(timeout),
            url: endpoint(base_url, "api/generate"),
            model: checked_model(model.into())?,
        })
    }

    /// Returns the generation endpoint.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the configured model name.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

impl CompletionClient for OllamaClient {
    fn name(&self) -> &str {
        "ollama"
    }

    #[instrument(
        name = "llm.complete",
        err,
        skip(self, prompt),
        fields(backend = "ollama", model = %self.model),
    )]
    fn complete(&self, prompt: &str, temperature: f32) -> Result<Option<String>, LlmError> {
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions { temperature },
        };
        let mut response = self
            .agent
            .post(self.url.as_str())
            .send_json(&body)
            .map_err(|source| LlmError::Http {
                url: self.url.clone(),
                source: Box::new(source),
            })?;
        let reply: GenerateResponse =
            response
                .body_mut()
                .read_json()
                .map_err(|error| LlmError::MalformedResponse {
                    url: self.url.clone(),
                    message: error.to_string(),
                })?;
        Ok(reply.into_text())
    }
}
