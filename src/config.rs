use crate::error::{Error, Result};
use crate::fetch::RepoSource;
use crate::llm::DEFAULT_MODEL;
use crate::rules::RuleSet;
use crate::summary::{Budget, DEFAULT_CEILING, DEFAULT_WORKING};
use crate::token::TokenizerKind;
use std::path::PathBuf;

const DEFAULT_OUTPUT_DIR: &str = "output";

/// Configuration for the documentation pipeline.
///
/// Use [`Config::builder()`] to construct a new configuration.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct Config {
    /// Repository to document
    pub source: RepoSource,

    /// Directory receiving `docs/` and the metadata file
    pub output_dir: PathBuf,

    /// Token limits for payload selection
    pub budget: Budget,

    /// Tokenizer implementation to use
    pub tokenizer: TokenizerKind,

    /// Model name passed to the LLM backend
    pub model: String,

    /// Collection, filtering and prioritisation tables
    pub rules: RuleSet,

    /// Dry run mode (no LLM calls, no file writes)
    pub dry_run: bool,
}

impl Config {
    /// Creates a new configuration builder.
    ///
    /// # Examples
    ///
    /// ```
    /// use repodoc::{Config, RepoSource};
    ///
    /// let config = Config::builder()
    ///     .source(RepoSource::Local(".".into()))
    ///     .max_tokens(200_000)
    ///     .working_tokens(8_000)
    ///     .build()
    ///     .expect("valid configuration");
    /// ```
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A local source directory doesn't exist
    /// - Token limits are zero or the working budget exceeds the ceiling
    /// - The extension allow-list is empty
    /// - The model name is empty
    pub fn validate(&self) -> Result<()> {
        if let RepoSource::Local(path) = &self.source {
            if !path.is_dir() {
                return Err(Error::config(format!(
                    "Source directory does not exist: {}",
                    path.display()
                )));
            }
        }

        if self.budget.ceiling == 0 {
            return Err(Error::config("max_tokens must be greater than 0"));
        }

        if self.budget.working == 0 {
            return Err(Error::config("working_tokens must be greater than 0"));
        }

        if self.budget.working > self.budget.ceiling {
            return Err(Error::config(format!(
                "working_tokens ({}) must not exceed max_tokens ({})",
                self.budget.working, self.budget.ceiling
            )));
        }

        if self.rules.allowed_extensions.is_empty() {
            return Err(Error::config("at least one allowed extension is required"));
        }

        if self.model.trim().is_empty() {
            return Err(Error::config("model must not be empty"));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: RepoSource::Local(PathBuf::from(".")),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            budget: Budget::default(),
            tokenizer: TokenizerKind::default(),
            model: DEFAULT_MODEL.to_string(),
            rules: RuleSet::default(),
            dry_run: false,
        }
    }
}

/// Builder for creating a [`Config`].
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    source: Option<RepoSource>,
    output_dir: Option<PathBuf>,
    max_tokens: Option<usize>,
    working_tokens: Option<usize>,
    tokenizer: Option<TokenizerKind>,
    model: Option<String>,
    rules: Option<RuleSet>,
    dry_run: bool,
}

impl ConfigBuilder {
    /// Sets the repository to document.
    #[must_use]
    pub fn source(mut self, source: RepoSource) -> Self {
        self.source = Some(source);
        self
    }

    /// Sets the output directory.
    #[must_use]
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    /// Sets the token ceiling used for the full-content decision.
    #[must_use]
    pub fn max_tokens(mut self, tokens: usize) -> Self {
        self.max_tokens = Some(tokens);
        self
    }

    /// Sets the working budget the layer 1 summary must fit.
    ///
    /// When unset, the working budget is the default capped at the ceiling.
    #[must_use]
    pub fn working_tokens(mut self, tokens: usize) -> Self {
        self.working_tokens = Some(tokens);
        self
    }

    /// Sets both limits at once.
    #[must_use]
    pub fn budget(mut self, budget: Budget) -> Self {
        self.max_tokens = Some(budget.ceiling);
        self.working_tokens = Some(budget.working);
        self
    }

    /// Sets the tokenizer implementation.
    #[must_use]
    pub fn tokenizer(mut self, kind: TokenizerKind) -> Self {
        self.tokenizer = Some(kind);
        self
    }

    /// Sets the LLM model name.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Replaces the rule tables.
    #[must_use]
    pub fn rules(mut self, rules: RuleSet) -> Self {
        self.rules = Some(rules);
        self
    }

    /// Enables dry run mode.
    #[must_use]
    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails.
    pub fn build(self) -> Result<Config> {
        let ceiling = self.max_tokens.unwrap_or(DEFAULT_CEILING);
        let working = self
            .working_tokens
            .unwrap_or_else(|| DEFAULT_WORKING.min(ceiling));

        let config = Config {
            source: self
                .source
                .unwrap_or_else(|| RepoSource::Local(PathBuf::from("."))),
            output_dir: self
                .output_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            budget: Budget::new(ceiling, working),
            tokenizer: self.tokenizer.unwrap_or_default(),
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            rules: self.rules.unwrap_or_default(),
            dry_run: self.dry_run,
        };

        config.validate()?;
        Ok(config)
    }
}
