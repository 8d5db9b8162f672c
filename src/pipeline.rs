use crate::{
    config::Config,
    docs::{DocGenerator, GeneratedDocs},
    error::{Error, Result},
    fetch::Checkout,
    filter::SensitiveFilter,
    llm::{GeminiClient, LlmClient},
    scanner::{self, Collection},
    stats::Stats,
    summary::{Layer, Payload, SummaryBuilder},
    token::TokenEstimator,
};
use serde::Serialize;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tracing::{info, instrument, warn};

/// Statistics collected during pipeline execution.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineStats {
    /// Repository URL or local path
    pub repository: String,

    /// Files admitted by the collector
    pub collected_files: usize,

    /// Files removed by the sensitive filter
    pub excluded_files: usize,

    /// Lines across the collected files
    pub total_lines: usize,

    /// Number of distinct languages
    pub languages: usize,

    /// Selected payload layer
    pub layer: Layer,

    /// Summed estimate of the filtered files
    pub source_tokens: usize,

    /// Estimate of the payload sent to the model
    pub payload_tokens: usize,

    /// Documentation pages written
    pub pages_written: usize,

    /// Pages holding an error text instead of a completion
    pub failed_pages: usize,

    /// Output directory path
    pub output_directory: String,

    /// True if nothing was generated or written
    pub dry_run: bool,

    /// Total execution time
    pub duration: Duration,

    /// Time spent fetching and collecting
    pub collect_duration: Duration,

    /// Time spent filtering and building the payload
    pub summarize_duration: Duration,

    /// Time spent generating and writing pages
    pub generate_duration: Duration,
}

impl PipelineStats {
    /// Prints a human-readable summary to stdout.
    pub fn print_summary(&self) {
        println!("\n╔═══════════════════════════════════════════════════════╗");
        println!("║          Documentation Generation Summary             ║");
        println!("╠═══════════════════════════════════════════════════════╣");
        println!("║ Repository:                                           ║");
        println!("║   {}", self.repository);
        println!(
            "║ Files Collected:      {:>8}                        ║",
            self.collected_files
        );
        println!(
            "║   - Excluded:         {:>8}                        ║",
            self.excluded_files
        );
        println!(
            "║ Total Lines:          {:>8}                        ║",
            self.total_lines
        );
        println!(
            "║ Languages:            {:>8}                        ║",
            self.languages
        );
        println!("║                                                       ║");
        println!(
            "║ Payload Layer:        {:>8}                        ║",
            layer_label(self.layer)
        );
        println!(
            "║ Source Tokens:        {:>8}                        ║",
            self.source_tokens
        );
        println!(
            "║ Payload Tokens:       {:>8}                        ║",
            self.payload_tokens
        );
        println!("║                                                       ║");
        if self.dry_run {
            println!("║ ⚠ No pages generated (dry run mode)                   ║");
        } else {
            println!(
                "║ Pages Written:        {:>8}                        ║",
                self.pages_written
            );
            println!(
                "║   - Failed:           {:>8}                        ║",
                self.failed_pages
            );
            println!("║ Output Directory:                                     ║");
            println!("║   {}", self.output_directory);
        }
        println!("║                                                       ║");
        println!("║ Timing Breakdown:                                     ║");
        println!(
            "║   - Collecting:       {:>8.2}s                     ║",
            self.collect_duration.as_secs_f64()
        );
        println!(
            "║   - Summarizing:      {:>8.2}s                     ║",
            self.summarize_duration.as_secs_f64()
        );
        println!(
            "║   - Generating:       {:>8.2}s                     ║",
            self.generate_duration.as_secs_f64()
        );
        println!(
            "║   - Total:            {:>8.2}s                     ║",
            self.duration.as_secs_f64()
        );
        println!("╚═══════════════════════════════════════════════════════╝\n");
    }
}

const fn layer_label(layer: Layer) -> &'static str {
    match layer {
        Layer::Full => "full",
        Layer::Layer1 => "layer 1",
        Layer::Layer2 => "layer 2",
    }
}

/// Filtered files rendered into a payload.
struct Prepared {
    stats: Stats,
    collected_files: usize,
    total_lines: usize,
    payload: Payload,
}

/// Main pipeline orchestrator for documenting a repository.
pub struct Pipeline {
    config: Config,
    estimator: Arc<dyn TokenEstimator>,
}

impl Pipeline {
    /// Creates a new pipeline with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration validation fails.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let estimator = config.tokenizer.create();

        Ok(Self { config, estimator })
    }

    /// Executes the pipeline against the Gemini backend.
    ///
    /// The API key is read from the environment before anything is fetched.
    /// Dry runs need no key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is missing or any stage fails critically.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use repodoc::{Config, Pipeline, RepoSource};
    ///
    /// # fn main() -> anyhow::Result<()> {
    /// let config = Config::builder()
    ///     .source(RepoSource::parse("https://github.com/acme/shop")?)
    ///     .build()?;
    ///
    /// let stats = Pipeline::new(config)?.run()?;
    /// stats.print_summary();
    /// # Ok(())
    /// # }
    /// ```
    pub fn run(self) -> Result<PipelineStats> {
        if self.config.dry_run {
            return self.execute(None);
        }

        let client = GeminiClient::from_env(self.config.model.as_str())?;
        self.execute(Some(&client))
    }

    /// Executes the pipeline with a caller-supplied LLM backend.
    ///
    /// # Errors
    ///
    /// Returns an error if any stage fails critically.
    pub fn run_with(self, client: &dyn LlmClient) -> Result<PipelineStats> {
        self.execute(Some(client))
    }

    #[instrument(skip_all, fields(source = %self.config.source))]
    fn execute(self, client: Option<&dyn LlmClient>) -> Result<PipelineStats> {
        let start_time = Instant::now();
        info!("Starting documentation pipeline");

        // Stage 1: Fetch
        info!("Stage 1/3: Fetching and collecting repository...");
        let collect_start = Instant::now();
        let checkout = self.config.source.checkout()?;

        let result = self.process(&checkout, client, collect_start);
        checkout.cleanup();

        let mut stats = result?;
        stats.duration = start_time.elapsed();

        info!(
            "✓ Pipeline completed successfully in {:.2}s",
            stats.duration.as_secs_f64()
        );
        Ok(stats)
    }

    fn process(
        &self,
        checkout: &Checkout,
        client: Option<&dyn LlmClient>,
        collect_start: Instant,
    ) -> Result<PipelineStats> {
        let collection = scanner::collect(checkout.path(), &self.config.rules)?;
        let collect_duration = collect_start.elapsed();
        info!(
            "✓ Found {} files in {} languages",
            collection.stats.total_files,
            collection.stats.languages.len()
        );

        let summarize_start = Instant::now();
        let prepared = self.prepare(collection)?;
        let summarize_duration = summarize_start.elapsed();

        let repository = self.config.source.to_string();

        let generate_start = Instant::now();
        let generated = match client {
            Some(client) if !self.config.dry_run => {
                info!("Stage 3/3: Generating documentation...");
                let docs = DocGenerator::new(client, &self.config.output_dir).generate(
                    &prepared.payload,
                    &repository,
                    &prepared.stats,
                )?;
                self.log_generated(&docs);
                Some(docs)
            }
            _ => {
                warn!("Dry run mode enabled - skipping generation and file writes");
                self.print_dry_run_summary(&prepared);
                None
            }
        };
        let generate_duration = generate_start.elapsed();

        Ok(PipelineStats {
            repository,
            collected_files: prepared.collected_files,
            excluded_files: prepared.stats.excluded,
            total_lines: prepared.total_lines,
            languages: prepared.stats.languages.len(),
            layer: prepared.payload.layer,
            source_tokens: prepared.payload.source_tokens,
            payload_tokens: prepared.payload.tokens,
            pages_written: generated.as_ref().map_or(0, |d| d.pages.len()),
            failed_pages: generated.as_ref().map_or(0, GeneratedDocs::failed_count),
            output_directory: self.config.output_dir.display().to_string(),
            dry_run: generated.is_none(),
            duration: Duration::ZERO,
            collect_duration,
            summarize_duration,
            generate_duration,
        })
    }

    /// Filters a collection and renders the payload for it.
    fn prepare(&self, collection: Collection) -> Result<Prepared> {
        let rules = &self.config.rules;

        // Stage 2: Filter and summarize
        info!("Stage 2/3: Filtering and preparing content...");
        let filtered = SensitiveFilter::new(rules).filter(&collection.files);
        if filtered.files.is_empty() {
            return Err(Error::AllFiltered {
                skipped: filtered.skipped,
            });
        }

        let stats = collection.stats.after_filter(filtered.skipped);
        let builder = SummaryBuilder::new(rules, self.estimator.as_ref())?;
        let payload = builder.build(&filtered.files, &stats, self.config.budget)?;

        info!(
            "✓ Estimated {} tokens, sending {:?} payload of {} tokens",
            payload.source_tokens, payload.layer, payload.tokens
        );

        Ok(Prepared {
            collected_files: collection.stats.total_files,
            total_lines: collection.stats.total_lines,
            stats,
            payload,
        })
    }

    fn log_generated(&self, docs: &GeneratedDocs) {
        let failed = docs.failed_count();
        if failed > 0 {
            warn!(
                "  {} of {} page(s) hold an error instead of documentation",
                failed,
                docs.pages.len()
            );
        }

        info!("✓ Documentation written to {}", self.config.output_dir.display());
        for page in &docs.pages {
            info!("  {}: {}", page.kind, page.path.display());
        }
        info!("  metadata: {}", docs.metadata_path.display());
    }

    /// Prints a summary for dry run mode.
    fn print_dry_run_summary(&self, prepared: &Prepared) {
        println!("\n╔═══════════════════════════════════════════════════════╗");
        println!("║                 Dry Run Summary                       ║");
        println!("╠═══════════════════════════════════════════════════════╣");
        println!(
            "║ Files kept:           {:>8}                        ║",
            prepared.stats.total_files
        );
        println!(
            "║ Payload layer:        {:>8}                        ║",
            layer_label(prepared.payload.layer)
        );
        println!(
            "║ Payload tokens:       {:>8}                        ║",
            prepared.payload.tokens
        );
        println!(
            "║ Budget:       {:>8} / {:>8} tokens              ║",
            self.config.budget.ceiling, self.config.budget.working
        );
        println!("║                                                       ║");
        println!("║ ⚠ No LLM calls made, no files written (dry run mode)  ║");
        println!("╚═══════════════════════════════════════════════════════╝\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docs::tests::RecordingClient;
    use crate::fetch::RepoSource;
    use crate::summary::Budget;
    use assert_fs::prelude::*;
    use std::path::Path;

    fn create_test_config(root: &Path, out: &Path) -> Config {
        Config::builder()
            .source(RepoSource::Local(root.to_path_buf()))
            .output_dir(out)
            .build()
            .unwrap()
    }

    #[test]
    fn test_pipeline_basic_execution() {
        let repo = assert_fs::TempDir::new().unwrap();
        let out = assert_fs::TempDir::new().unwrap();
        repo.child("main.py").write_str("def foo(): pass").unwrap();
        repo.child("web/app.js").write_str("function start() {}").unwrap();

        let client = RecordingClient::default();
        let stats = Pipeline::new(create_test_config(repo.path(), out.path()))
            .unwrap()
            .run_with(&client)
            .unwrap();

        assert_eq!(stats.collected_files, 2);
        assert_eq!(stats.excluded_files, 0);
        assert_eq!(stats.layer, Layer::Full);
        assert_eq!(stats.pages_written, 5);
        assert_eq!(stats.failed_pages, 0);
        assert!(!stats.dry_run);

        assert!(out.child("docs/index.md").path().exists());
        assert!(out.child("generation_metadata.json").path().exists());
        assert!(repo.child("main.py").path().exists());

        let calls = client.calls.borrow();
        assert_eq!(calls.len(), 5);
        assert!(calls[0].1.contains("FILE: main.py"));
        assert!(calls[0].1.contains("def foo(): pass"));
    }

    #[test]
    fn test_stage_durations_partition_the_run() {
        let repo = assert_fs::TempDir::new().unwrap();
        for i in 0..20 {
            repo.child(format!("pkg/m{i}.py")).write_str("x = 1").unwrap();
        }

        let config = Config::builder()
            .source(RepoSource::Local(repo.path().to_path_buf()))
            .dry_run(true)
            .build()
            .unwrap();
        let stats = Pipeline::new(config).unwrap().run().unwrap();

        assert!(stats.collect_duration > Duration::ZERO);
        assert!(stats.summarize_duration > Duration::ZERO);
        assert!(
            stats.collect_duration + stats.summarize_duration + stats.generate_duration
                <= stats.duration
        );
    }

    #[test]
    fn test_pipeline_dry_run() {
        let repo = assert_fs::TempDir::new().unwrap();
        repo.child("main.py").write_str("def foo(): pass").unwrap();
        let out = repo.path().join("out");

        let config = Config::builder()
            .source(RepoSource::Local(repo.path().to_path_buf()))
            .output_dir(&out)
            .dry_run(true)
            .build()
            .unwrap();

        let client = RecordingClient::default();
        let stats = Pipeline::new(config).unwrap().run_with(&client).unwrap();

        assert!(stats.dry_run);
        assert_eq!(stats.pages_written, 0);
        assert!(client.calls.borrow().is_empty());
        assert!(!out.exists());
    }

    #[test]
    fn test_dry_run_needs_no_api_key() {
        let repo = assert_fs::TempDir::new().unwrap();
        repo.child("main.py").write_str("def foo(): pass").unwrap();

        let config = Config::builder()
            .source(RepoSource::Local(repo.path().to_path_buf()))
            .output_dir(repo.path().join("out"))
            .dry_run(true)
            .build()
            .unwrap();

        let stats = Pipeline::new(config).unwrap().run().unwrap();
        assert!(stats.dry_run);
    }

    #[test]
    fn test_sensitive_files_never_reach_the_model() {
        let repo = assert_fs::TempDir::new().unwrap();
        let out = assert_fs::TempDir::new().unwrap();
        repo.child("secrets/.env").write_str("API_KEY=123").unwrap();
        repo.child("app.py").write_str("def run(): pass").unwrap();

        let client = RecordingClient::default();
        let stats = Pipeline::new(create_test_config(repo.path(), out.path()))
            .unwrap()
            .run_with(&client)
            .unwrap();

        assert_eq!(stats.collected_files, 2);
        assert_eq!(stats.excluded_files, 1);

        let calls = client.calls.borrow();
        assert!(calls.iter().all(|(_, user)| !user.contains("API_KEY")));
        assert!(calls[0].1.contains("Total Files: 1 (Excluded 1 sensitive files)"));
    }

    #[test]
    fn test_all_filtered_is_fatal() {
        let repo = assert_fs::TempDir::new().unwrap();
        let out = assert_fs::TempDir::new().unwrap();
        repo.child("auth.py").write_str("x = 1").unwrap();
        repo.child("db.py").write_str("password = 'hunter2'").unwrap();

        let client = RecordingClient::default();
        let result = Pipeline::new(create_test_config(repo.path(), out.path()))
            .unwrap()
            .run_with(&client);

        assert!(matches!(result, Err(Error::AllFiltered { skipped: 2 })));
        assert!(client.calls.borrow().is_empty());
    }

    #[test]
    fn test_no_files_is_fatal() {
        let repo = assert_fs::TempDir::new().unwrap();
        let out = assert_fs::TempDir::new().unwrap();
        repo.child("notes.txt").write_str("hello").unwrap();

        let client = RecordingClient::default();
        let result = Pipeline::new(create_test_config(repo.path(), out.path()))
            .unwrap()
            .run_with(&client);

        assert!(matches!(result, Err(Error::NoFiles { .. })));
    }

    #[test]
    fn test_small_budget_degrades() {
        let repo = assert_fs::TempDir::new().unwrap();
        let out = assert_fs::TempDir::new().unwrap();
        let filler = "# filler line\n".repeat(200);
        for i in 0..50 {
            repo.child(format!("src/mod_{i}.py"))
                .write_str(&format!("def f_{i}():\n    return {i}\n{filler}"))
                .unwrap();
        }

        let config = Config::builder()
            .source(RepoSource::Local(repo.path().to_path_buf()))
            .output_dir(out.path())
            .budget(Budget::single(5_000))
            .build()
            .unwrap();

        let client = RecordingClient::default();
        let stats = Pipeline::new(config).unwrap().run_with(&client).unwrap();

        assert_eq!(stats.layer, Layer::Layer1);
        assert!(stats.payload_tokens <= 5_000);

        let metadata = std::fs::read_to_string(out.child("generation_metadata.json").path()).unwrap();
        assert!(metadata.contains("\"used_full_content\": false"));
    }

    #[test]
    fn test_missing_local_source_is_fetch_error() {
        let repo = assert_fs::TempDir::new().unwrap();
        let out = assert_fs::TempDir::new().unwrap();
        let config = create_test_config(repo.path(), out.path());
        let pipeline = Pipeline::new(config).unwrap();
        repo.close().unwrap();

        let client = RecordingClient::default();
        assert!(pipeline.run_with(&client).unwrap_err().is_fetch());
    }
}
