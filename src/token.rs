use crate::file::{FileContent, FileRecord};
use once_cell::sync::Lazy;
use std::sync::Arc;
use tiktoken_rs::CoreBPE;
use tracing::warn;

const CHARS_PER_TOKEN: usize = 4;
const UNLOADED_BYTES_PER_TOKEN: usize = 4;

static CL100K: Lazy<Option<CoreBPE>> = Lazy::new(|| match tiktoken_rs::cl100k_base() {
    Ok(bpe) => Some(bpe),
    Err(e) => {
        warn!("cl100k_base vocabulary unavailable, estimating by characters: {}", e);
        None
    }
});

/// Tokenizer used to measure content against the budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenizerKind {
    /// BPE count with the `cl100k_base` vocabulary
    #[default]
    Cl100k,
    /// One token per four characters
    Simple,
    /// Blend of word, character and punctuation counts
    Enhanced,
}

impl TokenizerKind {
    /// Creates an estimator of this kind.
    #[must_use]
    pub fn create(self) -> Arc<dyn TokenEstimator> {
        match self {
            Self::Cl100k => Arc::new(Cl100kEstimator),
            Self::Simple => Arc::new(CharEstimator),
            Self::Enhanced => Arc::new(BlendEstimator),
        }
    }
}

/// Maps text to a token count.
///
/// Every `&str` is a valid input, so estimation cannot fail.
pub trait TokenEstimator: Send + Sync {
    /// Estimates the number of tokens in `text`.
    fn estimate(&self, text: &str) -> usize;
}

/// Sums the token estimates of a set of records.
///
/// Records whose content was not loaded count as `size / 4` tokens.
#[must_use]
pub fn estimate_files(estimator: &dyn TokenEstimator, files: &[FileRecord]) -> usize {
    files
        .iter()
        .map(|f| match &f.content {
            FileContent::Text(text) => estimator.estimate(text),
            FileContent::Unloaded { size } => size / UNLOADED_BYTES_PER_TOKEN,
        })
        .fold(0, usize::saturating_add)
}

/// Exact BPE count over the shared `cl100k_base` vocabulary.
///
/// Special-token text such as `<|endoftext|>` is encoded as ordinary text.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Cl100kEstimator;

impl TokenEstimator for Cl100kEstimator {
    fn estimate(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }

        match CL100K.as_ref() {
            Some(bpe) => bpe.encode_ordinary(text).len(),
            None => CharEstimator.estimate(text),
        }
    }
}

/// Character-count estimate, rounded up.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CharEstimator;

impl TokenEstimator for CharEstimator {
    fn estimate(&self, text: &str) -> usize {
        text.chars().count().div_ceil(CHARS_PER_TOKEN)
    }
}

/// Averages a word-based and a character-based estimate, then adds one
/// token per ten punctuation characters.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BlendEstimator;

impl TokenEstimator for BlendEstimator {
    fn estimate(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }

        let (mut words, mut chars, mut punctuation) = (0usize, 0usize, 0usize);
        let mut in_word = false;
        for c in text.chars() {
            chars += 1;
            if c.is_whitespace() {
                in_word = false;
                continue;
            }
            if !in_word {
                words += 1;
                in_word = true;
            }
            if !c.is_alphanumeric() {
                punctuation += 1;
            }
        }

        // words * 1.3 in integer arithmetic
        let by_words = words.saturating_mul(13) / 10;
        let by_chars = chars / CHARS_PER_TOKEN;

        (by_words.saturating_add(by_chars) / 2)
            .saturating_add(punctuation / 10)
            .max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::Language;

    #[test]
    fn test_cl100k_known_counts() {
        assert_eq!(Cl100kEstimator.estimate(""), 0);
        assert_eq!(Cl100kEstimator.estimate("hello world"), 2);
        assert_eq!(Cl100kEstimator.estimate("Hello, world!"), 4);
    }

    #[test]
    fn test_cl100k_special_token_text_is_ordinary() {
        let text = "before <|endoftext|> after";
        assert!(Cl100kEstimator.estimate(text) > 3);
    }

    #[test]
    fn test_cl100k_is_default() {
        assert_eq!(TokenizerKind::default(), TokenizerKind::Cl100k);
        assert_eq!(TokenizerKind::default().create().estimate("hello world"), 2);
    }

    #[test]
    fn test_cl100k_arbitrary_text() {
        let text = "fn a() {}\u{0}\u{fffd} weird \u{202e} input 日本語";
        let first = Cl100kEstimator.estimate(text);
        assert!(first > 0);
        assert_eq!(first, Cl100kEstimator.estimate(text));
    }

    #[test]
    fn test_char_estimator() {
        assert_eq!(CharEstimator.estimate(""), 0);
        assert_eq!(CharEstimator.estimate("test"), 1);
        assert_eq!(CharEstimator.estimate("hello world"), 3);
        // 4 chars, 12 bytes
        assert_eq!(CharEstimator.estimate("日本語だ"), 1);
        assert_eq!(CharEstimator.estimate(&"a".repeat(1_000_000)), 250_000);
    }

    #[test]
    fn test_blend_estimator() {
        assert_eq!(BlendEstimator.estimate(""), 0);
        // 3 words -> 3, 12 chars -> 3, 4 punctuation -> 0
        assert_eq!(BlendEstimator.estimate("fn main() {}"), 3);

        let code = r#"
            def main():
                print("Hello, world!")
        "#;
        let result = BlendEstimator.estimate(code);
        assert!(result > 5 && result < 30);
    }

    #[test]
    fn test_estimate_files_sums_records() {
        let files = vec![
            FileRecord::new_text("a.py", Language::Python, "a".repeat(40)),
            FileRecord::new_text("b.py", Language::Python, "b".repeat(8)),
        ];
        assert_eq!(estimate_files(&CharEstimator, &files), 12);
    }

    #[test]
    fn test_estimate_files_unloaded_fallback() {
        let files = vec![
            FileRecord::new_unloaded("dump.sql", Language::Sql, 100, 4000),
            FileRecord::new_text("a.py", Language::Python, "a".repeat(4)),
        ];
        assert_eq!(estimate_files(&CharEstimator, &files), 1001);
    }
}
