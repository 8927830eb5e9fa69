//! Model-backed text rewriters for the content perturbation passes.
//!
//! A [`CompletionClient`] turns a prompt into text over some model API.
//! [`PromptRewriter`] wraps any client and implements the core
//! [`kgperturb_core::TextRewriter`] capability with fixed prompt templates.
//! [`build_rewriter`] picks a client from [`LlmSettings`].

mod client;
mod errors;
mod prompts;
mod rewriter;
mod settings;

pub use client::{CompletionClient, OllamaClient, OpenAiCompatibleClient};
pub use errors::LlmError;
pub use prompts::{DESCRIPTION_TEMPERATURE, RENAME_TEMPERATURE};
pub use rewriter::PromptRewriter;
pub use settings::{LLM_PROVIDER_ENV, LlmProvider, LlmSettings, build_rewriter};
