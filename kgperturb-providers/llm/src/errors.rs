use thiserror::Error;

/// Errors raised while configuring or calling a model backend.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LlmError {
    #[error("unknown LLM provider `{name}` (expected `openai` or `ollama`)")]
    UnknownProvider { name: String },
    #[error("model name must not be empty")]
    MissingModel,
    #[error("environment variable `{variable}` holding the API key is not set")]
    MissingApiKey { variable: String },
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: Box<ureq::Error>,
    },
    #[error("response from {url} is malformed: {message}")]
    MalformedResponse { url: String, message: String },
}
