use crate::{
    error::{Error, Result},
    file::{extension_of, FileRecord, Language},
    rules::RuleSet,
    stats::Stats,
};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};
use walkdir::{DirEntry, WalkDir};

/// Files and statistics gathered from one tree.
#[derive(Debug, Clone)]
pub struct Collection {
    /// Collected records in traversal order
    pub files: Vec<FileRecord>,

    /// Aggregate statistics over `files`
    pub stats: Stats,
}

/// Walks a tree and collects the admitted files.
pub(crate) struct Scanner<'a> {
    root_dir: PathBuf,
    rules: &'a RuleSet,
}

impl<'a> Scanner<'a> {
    /// Creates a new scanner for the given root.
    pub(crate) fn new(root_dir: impl Into<PathBuf>, rules: &'a RuleSet) -> Self {
        Self {
            root_dir: root_dir.into(),
            rules,
        }
    }

    /// Scans the root directory and returns all admitted files.
    ///
    /// Directories whose name matches an ignore pattern are pruned before
    /// being descended into. Unreadable files are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoFiles`] if nothing was admitted.
    pub(crate) fn scan(&self) -> Result<Collection> {
        debug!("Starting scan of {}", self.root_dir.display());

        let mut files = Vec::new();
        let mut stats = Stats::default();
        let mut unreadable = 0usize;

        let walker = WalkDir::new(&self.root_dir)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !self.is_pruned(entry));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!("Walk error: {}", e);
                    unreadable += 1;
                    continue;
                }
            };

            if !Self::is_file_like(&entry) {
                continue;
            }

            let Some(ext) = extension_of(&entry.file_name().to_string_lossy()) else {
                continue;
            };
            if !self.rules.allows_extension(&ext) {
                continue;
            }

            match self.read_entry(&entry, &ext) {
                Ok(record) => {
                    stats.record(&record);
                    files.push(record);
                }
                Err(e) => {
                    debug!("Skipping unreadable file: {}", e);
                    unreadable += 1;
                }
            }
        }

        debug!(
            "Scan complete: {} files, {} lines, {} unreadable",
            stats.total_files, stats.total_lines, unreadable
        );

        if files.is_empty() {
            return Err(Error::no_files(&self.root_dir));
        }

        Ok(Collection { files, stats })
    }

    /// Returns true for directories that must not be descended into.
    fn is_pruned(&self, entry: &DirEntry) -> bool {
        entry.depth() > 0
            && entry.file_type().is_dir()
            && self.rules.ignores_dir(&entry.file_name().to_string_lossy())
    }

    /// Regular files and symlinks that do not resolve to a directory.
    ///
    /// A dangling link passes here and fails when read.
    fn is_file_like(entry: &DirEntry) -> bool {
        let file_type = entry.file_type();
        if file_type.is_symlink() {
            return !entry.path().is_dir();
        }
        file_type.is_file()
    }

    /// Reads one admitted file with lossy decoding.
    fn read_entry(&self, entry: &DirEntry, ext: &str) -> Result<FileRecord> {
        let path = entry.path();
        trace!("Processing file: {}", path.display());

        let bytes = std::fs::read(path).map_err(|e| Error::io(path, e))?;
        let content = String::from_utf8_lossy(&bytes).into_owned();

        Ok(FileRecord::new_text(
            self.relative_path(path),
            Language::from_extension(ext),
            content,
        ))
    }

    fn relative_path(&self, path: &Path) -> String {
        let relative = pathdiff::diff_paths(path, &self.root_dir)
            .unwrap_or_else(|| path.to_path_buf());

        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Collects the admitted files under `root`.
///
/// # Errors
///
/// Returns [`Error::NoFiles`] if nothing under `root` is admitted.
pub fn collect(root: impl AsRef<Path>, rules: &RuleSet) -> Result<Collection> {
    Scanner::new(root.as_ref(), rules).scan()
}
