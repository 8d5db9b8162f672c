use crate::file::{FileRecord, Language};
use serde::Serialize;
use std::collections::BTreeMap;

/// Per-language totals.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LanguageStats {
    /// Number of files
    pub files: usize,

    /// Sum of their line counts
    pub lines: usize,
}

/// Aggregate statistics of a collected tree.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct Stats {
    /// Number of files
    pub total_files: usize,

    /// Number of files removed by sensitive filtering
    pub excluded: usize,

    /// Total number of lines
    pub total_lines: usize,

    /// Breakdown by language
    pub languages: BTreeMap<Language, LanguageStats>,
}

impl Stats {
    /// Accounts for one more collected file.
    pub(crate) fn record(&mut self, file: &FileRecord) {
        self.total_files += 1;
        self.total_lines += file.lines;

        let entry = self.languages.entry(file.language).or_default();
        entry.files += 1;
        entry.lines += file.lines;
    }

    /// Builds stats from a set of records.
    #[must_use]
    pub fn from_files(files: &[FileRecord]) -> Self {
        let mut stats = Self::default();
        for file in files {
            stats.record(file);
        }
        stats
    }

    /// Derives the copy reported after sensitive filtering.
    ///
    /// Only `total_files` is adjusted; line totals and the language
    /// breakdown keep describing the collected tree.
    #[must_use]
    pub fn after_filter(&self, skipped: usize) -> Self {
        Self {
            total_files: self.total_files.saturating_sub(skipped),
            excluded: skipped,
            ..self.clone()
        }
    }

    /// Returns the language tags in breakdown order.
    #[must_use]
    pub fn language_names(&self) -> Vec<&'static str> {
        self.languages.keys().map(|l| l.as_str()).collect()
    }
}
