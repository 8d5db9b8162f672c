use crate::{
    error::{Error, Result},
    llm::LlmClient,
    prompt::{DocKind, Prompt},
    stats::Stats,
    summary::{Layer, Payload},
};
use serde::Serialize;
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

const DOCS_DIR: &str = "docs";
const METADATA_FILE: &str = "generation_metadata.json";

/// Prefix of a page body written in place of a failed completion.
pub const FAILED_PAGE_PREFIX: &str = "Error generating response: ";

/// Metadata written next to the generated pages.
#[derive(Debug, Serialize)]
pub(crate) struct GenerationMetadata<'a> {
    /// Repository URL or local path
    repository: &'a str,

    /// Generation timestamp
    generation_time: String,

    /// Statistics after sensitive filtering
    stats: &'a Stats,

    /// Summed estimate of the filtered files
    token_count: usize,

    /// Estimate of the payload actually sent
    payload_tokens: usize,

    /// Selected payload layer
    layer: Layer,

    /// True when every file was sent verbatim
    used_full_content: bool,

    /// Page IDs in generation order
    generated_files: Vec<&'static str>,
}

/// One written page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedPage {
    /// Page kind
    pub kind: DocKind,

    /// Written file
    pub path: PathBuf,

    /// True when the LLM call failed and the page holds the error text
    pub failed: bool,
}

/// Everything the generator wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedDocs {
    /// Pages in generation order
    pub pages: Vec<GeneratedPage>,

    /// Path of `generation_metadata.json`
    pub metadata_path: PathBuf,
}

impl GeneratedDocs {
    /// Number of pages whose completion failed.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.pages.iter().filter(|p| p.failed).count()
    }
}

/// Runs the page prompts and writes the results.
pub(crate) struct DocGenerator<'a> {
    client: &'a dyn LlmClient,
    output_dir: PathBuf,
    docs_dir: PathBuf,
}

impl<'a> DocGenerator<'a> {
    /// Creates a generator writing below `output_dir`.
    pub(crate) fn new(client: &'a dyn LlmClient, output_dir: impl Into<PathBuf>) -> Self {
        let output_dir = output_dir.into();
        let docs_dir = output_dir.join(DOCS_DIR);
        Self {
            client,
            output_dir,
            docs_dir,
        }
    }

    /// Generates every page from `payload` and writes the metadata file.
    ///
    /// A failed completion does not abort the run: the page is written with
    /// the error text and marked as failed.
    ///
    /// # Errors
    ///
    /// Returns an error if the output directory or a file cannot be written.
    pub(crate) fn generate(
        &self,
        payload: &Payload,
        repository: &str,
        stats: &Stats,
    ) -> Result<GeneratedDocs> {
        fs::create_dir_all(&self.docs_dir).map_err(|e| Error::io(&self.docs_dir, e))?;

        info!(
            "Generating {} documentation pages in {}",
            DocKind::all().len(),
            self.docs_dir.display()
        );

        let mut pages = Vec::with_capacity(DocKind::all().len());
        for &kind in DocKind::all() {
            pages.push(self.generate_page(kind, payload)?);
        }

        let metadata = GenerationMetadata {
            repository,
            generation_time: chrono::Local::now().to_rfc3339(),
            stats,
            token_count: payload.source_tokens,
            payload_tokens: payload.tokens,
            layer: payload.layer,
            used_full_content: payload.layer == Layer::Full,
            generated_files: pages.iter().map(|p| p.kind.id()).collect(),
        };
        let metadata_path = self.write_metadata(&metadata)?;

        Ok(GeneratedDocs {
            pages,
            metadata_path,
        })
    }

    fn generate_page(&self, kind: DocKind, payload: &Payload) -> Result<GeneratedPage> {
        info!("Generating {}", kind.file_name());

        let prompt = Prompt::assemble(kind, &payload.text);
        let (body, failed) = match self.client.complete(prompt.system, &prompt.user) {
            Ok(text) => (text, false),
            Err(e) => {
                warn!("Generation of {} failed: {}", kind.file_name(), e);
                (format!("{FAILED_PAGE_PREFIX}{e}"), true)
            }
        };

        let path = self.docs_dir.join(kind.file_name());
        write_file_atomic(&path, &body)?;
        debug!("Wrote {} ({} bytes)", path.display(), body.len());

        Ok(GeneratedPage { kind, path, failed })
    }

    fn write_metadata(&self, metadata: &GenerationMetadata<'_>) -> Result<PathBuf> {
        let path = self.output_dir.join(METADATA_FILE);
        let json = serde_json::to_string_pretty(metadata)?;
        write_file_atomic(&path, &json)?;

        info!("Wrote metadata to {}", path.display());
        Ok(path)
    }
}

/// Writes a file through a synced temporary sibling and a rename.
fn write_file_atomic(path: &Path, content: &str) -> Result<()> {
    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);

    let written = fs::File::create(&temp_path).and_then(|mut temp_file| {
        temp_file.write_all(content.as_bytes())?;
        temp_file.sync_all()
    });

    if let Err(e) = written.and_then(|()| fs::rename(&temp_path, path)) {
        if let Err(cleanup) = fs::remove_file(&temp_path) {
            debug!("Could not remove {}: {}", temp_path.display(), cleanup);
        }
        return Err(Error::io(path, e));
    }

    Ok(())
}
