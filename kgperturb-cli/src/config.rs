//! Configuration files accepted by the CLI.
//!
//! Two files drive a run: the perturbation configuration (seed, operator
//! counts and content-pass toggles) and an optional LLM configuration naming
//! the text-rewriting backend. Files ending in `.yaml` or `.yml` are read as
//! YAML and everything else as TOML. Unknown top-level keys are rejected in
//! both files.

use std::{
    ffi::OsStr,
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use kgperturb_core::{DescriptionPolicy, PerturbationPlan, PerturbatorBuilder};
use kgperturb_providers_llm::LlmSettings;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument};

/// Errors raised while loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read configuration `{path}`: {source}")]
    Read {
        /// Path of the configuration file.
        path: PathBuf,
        /// Underlying operating system error.
        #[source]
        source: std::io::Error,
    },
    /// The file does not match the expected schema.
    #[error("invalid configuration `{path}`: {source}")]
    Parse {
        /// Path of the configuration file.
        path: PathBuf,
        /// Deserialisation failure.
        #[source]
        source: Box<ParseError>,
    },
}

/// Deserialisation failure for one of the supported formats.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The document is not valid TOML for the schema.
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
    /// The document is not valid YAML for the schema.
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

/// Syntax of a configuration file.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ConfigFormat {
    /// TOML documents.
    #[default]
    Toml,
    /// YAML documents.
    Yaml,
}

impl ConfigFormat {
    /// Picks the format from the extension of `path`.
    ///
    /// # Examples
    /// ```
    /// use std::path::Path;
    /// use kgperturb_cli::config::ConfigFormat;
    ///
    /// assert_eq!(ConfigFormat::from_path(Path::new("configs/run.yml")), ConfigFormat::Yaml);
    /// assert_eq!(ConfigFormat::from_path(Path::new("run.toml")), ConfigFormat::Toml);
    /// ```
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(OsStr::to_str) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                Self::Yaml
            }
            _ => Self::Toml,
        }
    }

    /// Deserialises `raw` in this format.
    ///
    /// # Errors
    /// Returns [`ParseError`] when `raw` does not match the schema of `T`.
    pub fn parse<T>(self, raw: &str) -> Result<T, ParseError>
    where
        T: serde::de::DeserializeOwned,
    {
        match self {
            Self::Toml => Ok(toml::from_str(raw)?),
            Self::Yaml => Ok(serde_yaml::from_str(raw)?),
        }
    }
}

/// Operator counts, content toggles and seed for one perturbation run.
///
/// # Examples
/// ```
/// use kgperturb_cli::config::PerturbConfig;
///
/// let config: PerturbConfig = "seed = 7\nremove_entities = 2\n".parse()?;
/// assert_eq!(config.seed, Some(7));
/// assert_eq!(config.plan().remove_entities, 2);
/// assert!(!config.needs_rewriter());
/// # Ok::<(), toml::de::Error>(())
/// ```
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PerturbConfig {
    /// Seed for the structural operators; entropy is used when absent.
    pub seed: Option<u64>,
    /// Entities to remove.
    pub remove_entities: usize,
    /// Synthetic entities to add.
    pub add_entities: usize,
    /// Relations to remove.
    pub remove_edges: usize,
    /// Synthetic relations to add.
    pub add_edges: usize,
    /// Ask the backend for alternative entity names.
    pub llm_rename_entities: bool,
    /// Ask the backend for alternative relation types.
    pub llm_rename_relations: bool,
    /// Ask the backend to write entity descriptions.
    pub llm_perturb_entities: bool,
}

impl PerturbConfig {
    /// Loads the configuration stored at `path`.
    ///
    /// # Errors
    /// Returns [`ConfigError`] when the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        load_config(path)
    }

    /// Operator counts and content toggles as a core plan.
    #[must_use]
    pub const fn plan(&self) -> PerturbationPlan {
        PerturbationPlan {
            remove_entities: self.remove_entities,
            add_entities: self.add_entities,
            remove_edges: self.remove_edges,
            add_edges: self.add_edges,
            rename_entities: self.llm_rename_entities,
            rename_relations: self.llm_rename_relations,
            synthesize_descriptions: self.llm_perturb_entities,
        }
    }

    /// Returns whether any content pass needs a text rewriter.
    #[must_use]
    pub const fn needs_rewriter(&self) -> bool {
        self.llm_rename_entities || self.llm_rename_relations || self.llm_perturb_entities
    }

    /// Starts a builder carrying this configuration.
    #[must_use]
    pub fn builder(&self) -> PerturbatorBuilder {
        PerturbatorBuilder::new()
            .with_optional_seed(self.seed)
            .with_plan(self.plan())
    }
}

impl FromStr for PerturbConfig {
    type Err = toml::de::Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        toml::from_str(raw)
    }
}

/// Text-rewriting backend settings.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LlmConfig {
    /// Provider name (`openai` or `ollama`).
    pub provider: String,
    /// Model identifier.
    pub model: String,
    /// API root overriding the provider default.
    pub base_url: Option<String>,
    /// Environment variable holding the API key.
    pub api_key_env: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Write synthesized descriptions into `name`.
    pub update_name: bool,
    /// Write synthesized descriptions into `description`.
    pub update_description: bool,
    /// Provider arguments; set values take precedence over the top-level keys.
    pub args: LlmArgs,
}

/// Provider arguments nested under `args`.
///
/// Keys the backends do not use (for example cloud project settings) are
/// ignored.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct LlmArgs {
    /// Model identifier.
    #[serde(alias = "model_name")]
    pub model: Option<String>,
    /// API root overriding the provider default.
    pub base_url: Option<String>,
    /// Environment variable holding the API key.
    pub api_key_env: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: Option<u64>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        let settings = LlmSettings::default();
        let policy = DescriptionPolicy::default();
        Self {
            provider: settings.provider,
            model: settings.model,
            base_url: settings.base_url,
            api_key_env: settings.api_key_env,
            timeout_secs: settings.timeout_secs,
            update_name: policy.update_name,
            update_description: policy.update_description,
            args: LlmArgs::default(),
        }
    }
}

impl LlmConfig {
    /// Loads the configuration stored at `path`.
    ///
    /// # Errors
    /// Returns [`ConfigError`] when the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        load_config(path)
    }

    /// Loads `path` when given, otherwise returns the defaults.
    ///
    /// # Errors
    /// See [`LlmConfig::load`].
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        path.map_or_else(|| Ok(Self::default()), Self::load)
    }

    /// Connection settings for the backend factory.
    #[must_use]
    pub fn settings(&self) -> LlmSettings {
        let args = &self.args;
        LlmSettings {
            provider: self.provider.clone(),
            model: args.model.clone().unwrap_or_else(|| self.model.clone()),
            base_url: args.base_url.clone().or_else(|| self.base_url.clone()),
            api_key_env: args.api_key_env.clone().or_else(|| self.api_key_env.clone()),
            timeout_secs: args.timeout_secs.unwrap_or(self.timeout_secs),
        }
    }

    /// Where synthesized descriptions are written.
    #[must_use]
    pub const fn description_policy(&self) -> DescriptionPolicy {
        DescriptionPolicy {
            update_description: self.update_description,
            update_name: self.update_name,
        }
    }
}

impl FromStr for LlmConfig {
    type Err = toml::de::Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        toml::from_str(raw)
    }
}

#[instrument(
    name = "cli.load_config",
    err,
    fields(path = %path.display(), format = ?ConfigFormat::from_path(path)),
)]
fn load_config<T>(path: &Path) -> Result<T, ConfigError>
where
    T: serde::de::DeserializeOwned,
{
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let parsed = ConfigFormat::from_path(path)
        .parse(&raw)
        .map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source: Box::new(source),
        })?;
    debug!(bytes = raw.len(), "configuration loaded");
    Ok(parsed)
}
