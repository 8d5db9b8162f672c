//! # repodoc
//!
//! Generates documentation pages for a code repository with an LLM, keeping
//! the prompt within a token budget.
//!
//! ## Features
//!
//! - Shallow clone of GitHub repositories, or documentation of a local tree
//! - Allow-listed collection with ignored directories pruned during traversal
//! - Removal of files that may carry secrets before anything is measured
//! - Three-layer payload selection: full content, prioritised summary, compact overview
//! - Five generated pages plus a JSON metadata file, written atomically
//!
//! ## Quick Start
//!
//! ```no_run
//! use repodoc::{Config, Pipeline, RepoSource};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = Config::builder()
//!     .source(RepoSource::parse("https://github.com/acme/shop")?)
//!     .output_dir("./output")
//!     .max_tokens(1_048_576)
//!     .build()?;
//!
//! Pipeline::new(config)?.run()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! The library follows a pipeline architecture:
//! 1. **Fetch**: Clones the repository or uses the local directory
//! 2. **Scanner**: Collects allow-listed files and their statistics
//! 3. **Filter**: Drops security-sensitive files
//! 4. **Summary**: Selects the largest payload that fits the budget
//! 5. **Docs**: Prompts the LLM once per page and writes the results

#![warn(
    missing_docs,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]
#![allow(clippy::module_name_repetitions)]

mod config;
mod docs;
mod error;
mod fetch;
mod file;
mod filter;
mod pipeline;
mod rules;
mod scanner;
mod stats;
mod summary;
mod template;
mod token;

pub mod extract;
pub mod llm;
pub mod prompt;

pub use config::{Config, ConfigBuilder};
pub use docs::{GeneratedDocs, GeneratedPage, FAILED_PAGE_PREFIX};
pub use error::{Error, Result};
pub use fetch::{Checkout, RepoSource};
pub use file::{FileContent, FileRecord, Language};
pub use filter::{Filtered, SensitiveFilter};
pub use llm::{GeminiClient, LlmClient};
pub use pipeline::{Pipeline, PipelineStats};
pub use rules::{Bucket, RuleSet, SensitiveMatch};
pub use scanner::{collect, Collection};
pub use stats::{LanguageStats, Stats};
pub use summary::{Budget, Layer, Payload, SummaryBuilder, DEFAULT_CEILING, DEFAULT_WORKING};
pub use template::TRUNCATION_MARKER;
pub use token::{estimate_files, TokenEstimator, TokenizerKind};

/// Runs the complete documentation pipeline with the given configuration.
///
/// This is the main entry point for the library.
///
/// # Errors
///
/// Returns an error if:
/// - Configuration is invalid
/// - `GOOGLE_API_KEY` is missing (unless dry run)
/// - The repository cannot be fetched
/// - No supported files are found, or all of them are sensitive
/// - Output files cannot be written
///
/// # Examples
///
/// ```no_run
/// use repodoc::{Config, RepoSource, run};
///
/// # fn main() -> anyhow::Result<()> {
/// let config = Config::builder()
///     .source(RepoSource::parse(".")?)
///     .dry_run(true)
///     .build()?;
///
/// run(config)?;
/// # Ok(())
/// # }
/// ```
pub fn run(config: Config) -> Result<PipelineStats> {
    Pipeline::new(config)?.run()
}
