//! Sensitive content filtering.
//!
//! Removes files that may carry secrets before any payload is measured or
//! rendered. Matching is deliberately blunt: a file that merely mentions
//! "auth" is dropped along with real credential files.

use crate::{
    file::FileRecord,
    rules::{RuleSet, SensitiveMatch},
};
use tracing::{debug, info};

/// Result of sensitive filtering.
#[derive(Debug, Clone)]
pub struct Filtered {
    /// Files that passed, in input order
    pub files: Vec<FileRecord>,

    /// Number of files removed
    pub skipped: usize,
}

/// Filter removing security-sensitive files.
#[derive(Debug, Clone, Copy)]
pub struct SensitiveFilter<'a> {
    rules: &'a RuleSet,
}

impl<'a> SensitiveFilter<'a> {
    /// Creates a filter over the given rule tables.
    #[must_use]
    pub const fn new(rules: &'a RuleSet) -> Self {
        Self { rules }
    }

    /// Splits `files` into the kept copies and the number removed.
    #[must_use]
    pub fn filter(&self, files: &[FileRecord]) -> Filtered {
        let mut kept = Vec::with_capacity(files.len());
        let mut skipped = 0;

        for file in files {
            match self.rules.sensitive_match(file) {
                Some(SensitiveMatch::Path(pattern)) => {
                    debug!("Excluding {} (path matches '{}')", file.path, pattern);
                    skipped += 1;
                }
                Some(SensitiveMatch::Content(keyword)) => {
                    debug!("Excluding {} (content mentions '{}')", file.path, keyword);
                    skipped += 1;
                }
                None => kept.push(file.clone()),
            }
        }

        if skipped > 0 {
            info!("Excluded {} security-sensitive files", skipped);
        }

        Filtered {
            files: kept,
            skipped,
        }
    }
}
