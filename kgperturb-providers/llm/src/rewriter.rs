//! [`TextRewriter`] implementation over a [`CompletionClient`].

use kgperturb_core::{Entity, Relation, RewriteError, TextRewriter};
use tracing::debug;

use crate::{
    client::CompletionClient,
    errors::LlmError,
    prompts::{self, DESCRIPTION_TEMPERATURE, RENAME_TEMPERATURE},
};

/// Rewrites entity names, relation types and descriptions by prompting a
/// completion backend.
///
/// Items without the text a prompt needs (an entity without a name, a
/// relation with an empty type) are skipped without calling the backend.
///
/// # Examples
/// ```
/// use kgperturb_core::{Attributes, Entity, EntityId, TextRewriter};
/// use kgperturb_providers_llm::{CompletionClient, LlmError, PromptRewriter};
///
/// struct Shout;
///
/// impl CompletionClient for Shout {
///     fn name(&self) -> &str {
///         "shout"
///     }
///
///     fn complete(&self, _prompt: &str, _temperature: f32) -> Result<Option<String>, LlmError> {
///         Ok(Some("  ACME  ".to_owned()))
///     }
/// }
///
/// let mut attributes = Attributes::new();
/// attributes.insert("name".to_owned(), "Acme".into());
/// let entity = Entity::new(EntityId::Reassigned(4), attributes);
/// let rewriter = PromptRewriter::new(Shout);
/// assert_eq!(rewriter.rename_entity(&entity)?, Some("ACME".to_owned()));
/// # Ok::<(), kgperturb_core::RewriteError>(())
/// ```
pub struct PromptRewriter<C> {
    client: C,
}

impl<C: CompletionClient> PromptRewriter<C> {
    /// Wraps `client`.
    #[must_use]
    pub const fn new(client: C) -> Self {
        Self { client }
    }

    /// Returns the wrapped client.
    #[must_use]
    pub const fn client(&self) -> &C {
        &self.client
    }

    fn ask(&self, prompt: &str, temperature: f32) -> Result<Option<String>, RewriteError> {
        let reply = self
            .client
            .complete(prompt, temperature)
            .map_err(|error| self.backend_error(error))?;
        Ok(reply
            .map(|text| text.trim().to_owned())
            .filter(|text| !text.is_empty()))
    }

    fn backend_error(&self, error: LlmError) -> RewriteError {
        RewriteError::Backend {
            backend: self.client.name().to_owned(),
            source: Box::new(error),
        }
    }
}

impl<C: CompletionClient> TextRewriter for PromptRewriter<C> {
    fn name(&self) -> &str {
        self.client.name()
    }

    fn rename_entity(&self, entity: &Entity) -> Result<Option<String>, RewriteError> {
        let Some(name) = entity.name().filter(|name| !name.trim().is_empty()) else {
            debug!(entity = %entity.id(), "entity has no name; skipping rename");
            return Ok(None);
        };
        self.ask(&prompts::rename_entity(entity, name), RENAME_TEMPERATURE)
    }

    fn rename_relation(&self, relation: &Relation) -> Result<Option<String>, RewriteError> {
        let Some(label) = prompts::relation_label(relation) else {
            debug!(
                source = %relation.source(),
                target = %relation.target(),
                "relation has no type; skipping rename"
            );
            return Ok(None);
        };
        self.ask(&prompts::rename_relation(label), RENAME_TEMPERATURE)
    }

    fn synthesize_description(&self, entity: &Entity) -> Result<Option<String>, RewriteError> {
        let name = entity
            .name()
            .filter(|name| !name.is_empty())
            .map_or_else(|| entity.id().to_string(), str::to_owned);
        self.ask(
            &prompts::synthesize_description(entity, &name),
            DESCRIPTION_TEMPERATURE,
        )
    }
}
