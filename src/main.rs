use anyhow::Context;
use clap::Parser;
use repodoc::{Config, Pipeline, RepoSource, TokenizerKind, DEFAULT_CEILING};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "repodoc",
    version,
    author,
    about = "Generate documentation for a code repository with an LLM",
    long_about = "Generate documentation pages for a code repository with an LLM.\n\n\
    The repository is cloned (or read from a local directory), security-sensitive \
    files are removed, and the remaining content is sent as full text or as a \
    summary depending on the token budget. Five pages are written to <OUT>/docs \
    along with generation_metadata.json.\n\n\
    USAGE EXAMPLES:\n  \
      # Document a GitHub repository\n  \
      repodoc https://github.com/acme/shop\n\n  \
      # Document a local checkout into ./site\n  \
      repodoc ./shop --out ./site\n\n  \
      # Show which payload would be sent, without calling the model\n  \
      repodoc ./shop --dry-run --max-tokens 200000"
)]
struct Cli {
    /// GitHub URL (https://github.com/... or git@github.com:...) or local directory
    #[arg(value_name = "SOURCE")]
    source: String,

    /// Output directory for generated documentation
    #[arg(short, long, default_value = "output", value_name = "PATH")]
    out: PathBuf,

    /// Token ceiling; full content is sent while it fits 80% of this
    #[arg(long, default_value_t = DEFAULT_CEILING)]
    max_tokens: usize,

    /// Token budget the prioritised summary must fit (7500 unless --max-tokens is lower)
    #[arg(long)]
    working_tokens: Option<usize>,

    /// Tokenizer to use
    #[arg(long, value_enum, default_value = "cl100k")]
    tokenizer: CliTokenizer,

    /// Gemini model name
    #[arg(long, env = "REPODOC_MODEL", default_value = repodoc::llm::DEFAULT_MODEL)]
    model: String,

    /// Dry run (no LLM calls, no files written)
    #[arg(long)]
    dry_run: bool,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliTokenizer {
    #[value(name = "cl100k")]
    Cl100k,
    Simple,
    Enhanced,
}

impl From<CliTokenizer> for TokenizerKind {
    fn from(t: CliTokenizer) -> Self {
        match t {
            CliTokenizer::Cl100k => Self::Cl100k,
            CliTokenizer::Simple => Self::Simple,
            CliTokenizer::Enhanced => Self::Enhanced,
        }
    }
}

fn main() -> anyhow::Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    setup_tracing(cli.verbose)?;

    let source = RepoSource::parse(&cli.source).context("Invalid repository source")?;

    let mut builder = Config::builder()
        .source(source)
        .output_dir(cli.out)
        .max_tokens(cli.max_tokens);
    if let Some(working) = cli.working_tokens {
        builder = builder.working_tokens(working);
    }

    let config = builder
        .tokenizer(cli.tokenizer.into())
        .model(cli.model)
        .dry_run(cli.dry_run)
        .build()
        .context("Failed to build configuration")?;

    let stats = Pipeline::new(config)
        .context("Failed to create pipeline")?
        .run()
        .context("Pipeline execution failed")?;

    stats.print_summary();

    Ok(())
}

fn setup_tracing(verbosity: u8) -> anyhow::Result<()> {
    let filter = match verbosity {
        0 => EnvFilter::new("repodoc=info"),
        1 => EnvFilter::new("repodoc=debug"),
        _ => EnvFilter::new("repodoc=trace"),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_thread_ids(false))
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(())
}
