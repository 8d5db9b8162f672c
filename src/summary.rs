//! Budget-driven payload selection.
//!
//! The builder tries three renderings in order and stops at the first one
//! that fits:
//!
//! 1. **Full**: every file verbatim, when the summed file estimate is at most
//!    80% of the ceiling (the rest is left for the model's answer).
//! 2. **Layer 1**: important and database files in full, identifier synopses
//!    for the remaining source files, when it fits the working budget.
//! 3. **Layer 2**: totals plus excerpts of at most two entry-point files.
//!    Always accepted.

use crate::{
    error::Result,
    extract,
    file::{FileRecord, Language},
    rules::{Bucket, RuleSet},
    stats::{LanguageStats, Stats},
    template::TemplateEngine,
    token::{estimate_files, TokenEstimator},
};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

const IMPORTANT_LIMIT: usize = 5;
const DATABASE_LIMIT: usize = 3;
const CRITICAL_LIMIT: usize = 2;
const CRITICAL_EXCERPT_CHARS: usize = 1000;

/// Default token ceiling for the full-content payload.
pub const DEFAULT_CEILING: usize = 1_048_576;

/// Default working budget for the layer 1 summary.
pub const DEFAULT_WORKING: usize = 7_500;

/// Token limits for payload selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Budget {
    /// Full content is used while the file estimate is at most 80% of this
    pub ceiling: usize,

    /// Layer 1 is accepted while its rendering is at most this
    pub working: usize,
}

impl Budget {
    /// Creates a budget from a ceiling and a working limit.
    #[must_use]
    pub const fn new(ceiling: usize, working: usize) -> Self {
        Self { ceiling, working }
    }

    /// Uses one limit for both decisions.
    #[must_use]
    pub const fn single(limit: usize) -> Self {
        Self::new(limit, limit)
    }

    /// Returns true if `tokens` fits 80% of the ceiling.
    #[must_use]
    pub const fn admits_full(&self, tokens: usize) -> bool {
        (tokens as u128) * 5 <= (self.ceiling as u128) * 4
    }
}

impl Default for Budget {
    fn default() -> Self {
        Self::new(DEFAULT_CEILING, DEFAULT_WORKING)
    }
}

/// Which rendering was selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    /// All files verbatim
    Full,
    /// Prioritised summary
    Layer1,
    /// Compact overview
    Layer2,
}

/// The text handed to the prompt assembler.
#[derive(Debug, Clone)]
pub struct Payload {
    /// Selected rendering
    pub layer: Layer,

    /// Rendered text
    pub text: String,

    /// Estimated tokens of `text`
    pub tokens: usize,

    /// Summed estimate of the input files
    pub source_tokens: usize,
}

#[derive(Serialize)]
struct PreambleView<'a> {
    total_files: usize,
    excluded: usize,
    total_lines: usize,
    languages: Vec<&'static str>,
    breakdown: &'a BTreeMap<Language, LanguageStats>,
}

impl<'a> PreambleView<'a> {
    fn new(stats: &'a Stats) -> Self {
        Self {
            total_files: stats.total_files,
            excluded: stats.excluded,
            total_lines: stats.total_lines,
            languages: stats.language_names(),
            breakdown: &stats.languages,
        }
    }
}

#[derive(Serialize)]
struct FileView<'a> {
    path: &'a str,
    language: &'static str,
    lines: usize,
    size: usize,
    content: &'a str,
}

impl<'a> FileView<'a> {
    fn new(file: &'a FileRecord) -> Self {
        Self {
            path: &file.path,
            language: file.language.as_str(),
            lines: file.lines,
            size: file.size,
            content: file.content_str().unwrap_or_default(),
        }
    }
}

#[derive(Serialize)]
struct SynopsisView<'a> {
    path: &'a str,
    lines: usize,
    synopsis: String,
}

#[derive(Serialize)]
struct DirectoryView<'a> {
    name: &'a str,
    entries: Vec<SynopsisView<'a>>,
}

#[derive(Serialize)]
struct CriticalView<'a> {
    path: &'a str,
    language: &'static str,
    lines: usize,
    identifiers: String,
    content: &'a str,
}

#[derive(Serialize)]
struct FullContext<'a> {
    stats: PreambleView<'a>,
    files: Vec<FileView<'a>>,
}

#[derive(Serialize)]
struct Layer1Context<'a> {
    stats: PreambleView<'a>,
    important: Vec<FileView<'a>>,
    database: Vec<FileView<'a>>,
    directories: Vec<DirectoryView<'a>>,
}

#[derive(Serialize)]
struct Layer2Context<'a> {
    stats: PreambleView<'a>,
    critical: Vec<CriticalView<'a>>,
    excerpt_chars: usize,
}

/// Selects and renders the payload for a filtered file set.
pub struct SummaryBuilder<'a> {
    rules: &'a RuleSet,
    estimator: &'a dyn TokenEstimator,
    engine: TemplateEngine,
}

impl<'a> SummaryBuilder<'a> {
    /// Creates a builder.
    ///
    /// # Errors
    ///
    /// Returns an error if the built-in templates fail to register.
    pub fn new(rules: &'a RuleSet, estimator: &'a dyn TokenEstimator) -> Result<Self> {
        Ok(Self {
            rules,
            estimator,
            engine: TemplateEngine::new()?,
        })
    }

    /// Renders the largest payload that fits `budget`.
    ///
    /// Oversized input is never an error: it degrades to layer 1 and then
    /// layer 2.
    ///
    /// # Errors
    ///
    /// Returns an error only if a built-in template fails to render.
    pub fn build(&self, files: &[FileRecord], stats: &Stats, budget: Budget) -> Result<Payload> {
        let source_tokens = estimate_files(self.estimator, files);
        debug!("Estimated {} tokens across {} files", source_tokens, files.len());

        if budget.admits_full(source_tokens) {
            info!("Content fits the budget, sending full codebase");
            let text = self.render_full(files, stats)?;
            return Ok(self.payload(Layer::Full, text, source_tokens));
        }

        info!("Codebase too large, creating prioritised summary");
        let summary = self.payload(Layer::Layer1, self.render_layer1(files, stats)?, source_tokens);
        if summary.tokens <= budget.working {
            return Ok(summary);
        }

        info!(
            "Summary still too large ({} > {} tokens), falling back to compact overview",
            summary.tokens, budget.working
        );
        let text = self.render_layer2(files, stats)?;
        Ok(self.payload(Layer::Layer2, text, source_tokens))
    }

    fn payload(&self, layer: Layer, text: String, source_tokens: usize) -> Payload {
        Payload {
            layer,
            tokens: self.estimator.estimate(&text),
            text,
            source_tokens,
        }
    }

    fn render_full(&self, files: &[FileRecord], stats: &Stats) -> Result<String> {
        let ctx = FullContext {
            stats: PreambleView::new(stats),
            files: files.iter().map(FileView::new).collect(),
        };
        self.engine.render("full", &ctx)
    }

    fn render_layer1(&self, files: &[FileRecord], stats: &Stats) -> Result<String> {
        let mut important = Vec::new();
        let mut database = Vec::new();
        let mut directories: Vec<DirectoryView<'_>> = Vec::new();

        for file in files {
            match self.rules.bucket(&file.path) {
                Bucket::Important => {
                    if important.len() < IMPORTANT_LIMIT {
                        important.push(FileView::new(file));
                    }
                }
                Bucket::Database => {
                    if database.len() < DATABASE_LIMIT {
                        database.push(FileView::new(file));
                    }
                }
                Bucket::Regular => {
                    if !self.rules.is_summarizable(file.language) {
                        continue;
                    }
                    let entry = SynopsisView {
                        path: &file.path,
                        lines: file.lines,
                        synopsis: extract::describe(
                            file.language,
                            file.content_str().unwrap_or_default(),
                        ),
                    };
                    let dir = file.directory();
                    match directories.iter_mut().find(|d| d.name == dir) {
                        Some(view) => view.entries.push(entry),
                        None => directories.push(DirectoryView {
                            name: dir,
                            entries: vec![entry],
                        }),
                    }
                }
            }
        }

        let ctx = Layer1Context {
            stats: PreambleView::new(stats),
            important,
            database,
            directories,
        };
        self.engine.render("layer1", &ctx)
    }

    fn render_layer2(&self, files: &[FileRecord], stats: &Stats) -> Result<String> {
        let critical = files
            .iter()
            .filter(|f| self.rules.is_critical(f))
            .take(CRITICAL_LIMIT)
            .map(|f| {
                let content = f.content_str().unwrap_or_default();
                CriticalView {
                    path: &f.path,
                    language: f.language.as_str(),
                    lines: f.lines,
                    identifiers: extract::describe(f.language, content),
                    content,
                }
            })
            .collect();

        let ctx = Layer2Context {
            stats: PreambleView::new(stats),
            critical,
            excerpt_chars: CRITICAL_EXCERPT_CHARS,
        };
        self.engine.render("layer2", &ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::TRUNCATION_MARKER;
    use crate::token::TokenizerKind;

    fn py(path: &str, content: &str) -> FileRecord {
        FileRecord::new_text(path, Language::Python, content.to_string())
    }

    // 200 regular modules large enough to overflow a small budget, plus one
    // important and one database file.
    fn large_tree() -> Vec<FileRecord> {
        let filler = "# filler line\n".repeat(200);
        let mut files: Vec<FileRecord> = (0..200)
            .map(|i| py(&format!("src/mod_{i}.py"), &format!("def f_{i}():\n    return {i}\n{filler}")))
            .collect();
        files.push(py("main.py", "def run():\n    pass\n"));
        files.push(FileRecord::new_text(
            "db/schema.sql",
            Language::Sql,
            "create table users (id int);".to_string(),
        ));
        files
    }

    fn build(files: &[FileRecord], budget: Budget) -> Payload {
        let rules = RuleSet::default();
        let estimator = TokenizerKind::Simple.create();
        let builder = SummaryBuilder::new(&rules, estimator.as_ref()).unwrap();
        builder.build(files, &Stats::from_files(files), budget).unwrap()
    }

    #[test]
    fn test_budget_admits_full() {
        let budget = Budget::single(1000);
        assert!(budget.admits_full(800));
        assert!(!budget.admits_full(801));
        assert!(Budget::single(usize::MAX).admits_full(usize::MAX - 1));
    }

    #[test]
    fn test_full_content_round_trip() {
        let files = vec![py("main.py", "def foo(): pass")];
        let payload = build(&files, Budget::default());

        assert_eq!(payload.layer, Layer::Full);
        assert!(payload.text.contains("FILE: main.py"));
        assert!(payload.text.contains("LANGUAGE: python"));
        assert!(payload.text.contains("LINES: 1"));
        assert!(payload.text.contains("SIZE: 15 bytes"));
        assert!(payload.text.contains("\ndef foo(): pass\n"));
        assert!(payload.text.contains("Total Files: 1"));
        assert!(payload.text.contains("\"python\""));
    }

    #[test]
    fn test_full_content_keeps_markup_verbatim() {
        let content = "<div class=\"a\">&amp; {{ not_a_var }}</div>";
        let files = vec![FileRecord::new_text("index.html", Language::Html, content.to_string())];
        let payload = build(&files, Budget::default());

        assert!(payload.text.contains(content));
    }

    #[test]
    fn test_layer1_shape() {
        let files = large_tree();
        let payload = build(&files, Budget::single(10_000));

        assert_eq!(payload.layer, Layer::Layer1);
        assert!(payload.tokens <= 10_000);
        assert!(payload.source_tokens > 8_000);
        assert!(payload.text.contains("=== IMPORTANT FILES (FULL CONTENT) ==="));
        assert!(payload.text.contains("FILE: main.py (python)"));
        assert!(payload.text.contains("=== DATABASE FILES (FULL CONTENT) ==="));
        assert!(payload.text.contains("create table users (id int);"));
        assert!(payload.text.contains("DIRECTORY: src"));
        assert!(payload.text.contains("  - src/mod_7.py (202 lines): Functions: f_7"));
        assert!(!payload.text.contains("# filler line"));
        assert!(payload.text.contains("Total Files: 202"));
    }

    #[test]
    fn test_layer1_limits_and_omissions() {
        let mut files: Vec<FileRecord> = (0..8).map(|i| py(&format!("app_{i}.py"), "x = 1")).collect();
        files.extend((0..5).map(|i| {
            FileRecord::new_text(format!("q{i}.sql"), Language::Sql, format!("select {i};"))
        }));
        files.push(FileRecord::new_text(
            "docs/guide.md",
            Language::Markdown,
            "# Guide".to_string(),
        ));
        files.push(py("lib/util.py", &"# pad\n".repeat(2000)));

        let payload = build(&files, Budget::new(100, 100_000));

        assert_eq!(payload.layer, Layer::Layer1);
        assert_eq!(payload.text.matches("FILE: app_").count(), IMPORTANT_LIMIT);
        assert!(!payload.text.contains("app_5.py"));
        assert_eq!(payload.text.matches("FILE: q").count(), DATABASE_LIMIT);
        assert!(!payload.text.contains("q3.sql"));
        assert!(!payload.text.contains("docs/guide.md"));
        assert!(payload.text.contains("lib/util.py (2000 lines): No functions/classes found"));
        assert!(payload.text.contains("markdown"));
    }

    #[test]
    fn test_layer2_shape() {
        let files = large_tree();
        let payload = build(&files, Budget::single(1_000));

        assert_eq!(payload.layer, Layer::Layer2);
        assert!(!payload.text.is_empty());
        assert!(payload.text.contains("FILE: main.py (python, 2 lines)"));
        assert!(payload.text.contains("STRUCTURE: Functions: run"));
        assert!(!payload.text.contains("src/mod_"));
        assert!(!payload.text.contains("LANGUAGE BREAKDOWN"));
        assert!(payload.text.contains("Languages: python, sql"));
    }

    #[test]
    fn test_layer2_bounded_output() {
        let body = "def handler():\n    return 1\n".repeat(500);
        let mut files = vec![
            py("main.py", &body),
            py("app.py", &body),
            py("web/index.py", &body),
        ];
        files.extend((0..50).map(|i| py(&format!("pkg/m{i}.py"), &body)));

        let payload = build(&files, Budget::single(50));

        assert_eq!(payload.layer, Layer::Layer2);
        assert_eq!(payload.text.matches("EXCERPT:").count(), CRITICAL_LIMIT);
        assert_eq!(payload.text.matches(TRUNCATION_MARKER).count(), CRITICAL_LIMIT);
        assert!(!payload.text.contains("web/index.py"));

        for excerpt in payload.text.split("EXCERPT:\n").skip(1) {
            let (kept, _) = excerpt.split_once(TRUNCATION_MARKER).unwrap();
            assert!(kept.trim_end_matches('\n').chars().count() <= CRITICAL_EXCERPT_CHARS);
        }
    }

    #[test]
    fn test_layer2_without_critical_files() {
        let files: Vec<FileRecord> =
            (0..30).map(|i| py(&format!("pkg/m{i}.py"), &"x = 1\n".repeat(300))).collect();
        let payload = build(&files, Budget::single(10));

        assert_eq!(payload.layer, Layer::Layer2);
        assert!(payload.text.contains("Total Files: 30"));
        assert!(!payload.text.contains("CRITICAL FILES"));
    }

    #[test]
    fn test_budget_monotonic() {
        let files = large_tree();
        let rank = |layer: Layer| match layer {
            Layer::Full => 0,
            Layer::Layer1 => 1,
            Layer::Layer2 => 2,
        };

        let mut previous = 0;
        for limit in [10_000_000, 200_000, 100_000, 20_000, 10_000, 5_000, 2_000, 500, 1] {
            let current = rank(build(&files, Budget::single(limit)).layer);
            assert!(current >= previous, "layer went backwards at budget {limit}");
            previous = current;
        }
        assert_eq!(previous, 2);
    }

    #[test]
    fn test_payload_tokens_measure_rendered_text() {
        let files = large_tree();
        let estimator = TokenizerKind::Simple.create();

        for (limit, layer) in [
            (10_000_000, Layer::Full),
            (10_000, Layer::Layer1),
            (1_000, Layer::Layer2),
        ] {
            let payload = build(&files, Budget::single(limit));
            assert_eq!(payload.layer, layer);
            assert_eq!(payload.tokens, estimator.estimate(&payload.text));
            assert_eq!(payload.source_tokens, estimate_files(estimator.as_ref(), &files));
        }
    }

    #[test]
    fn test_unloaded_records_use_size_estimate() {
        let files = vec![FileRecord::new_unloaded("main.py", Language::Python, 10, 4_000)];

        // 1000 estimated tokens do not fit 80% of 1000
        let payload = build(&files, Budget::new(1_000, 100_000));
        assert_eq!(payload.source_tokens, 1_000);
        assert_eq!(payload.layer, Layer::Layer1);
    }
}
