//! Best-effort identifier extraction for file synopses.

use crate::file::Language;
use once_cell::sync::Lazy;
use regex::Regex;

const MAX_FUNCTIONS: usize = 5;
const MAX_CLASSES: usize = 3;

/// Clause emitted when a supported file has no matches.
pub const NONE_FOUND: &str = "No functions/classes found";

/// Clause emitted for languages without an extraction rule.
pub const UNSUPPORTED: &str = "No structural extraction available";

static PY_FUNCTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"def (\w+)").expect("valid regex"));
static PY_CLASS: Lazy<Regex> = Lazy::new(|| Regex::new(r"class (\w+)").expect("valid regex"));

static JS_FUNCTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"function (\w+)|const (\w+)\s*=|(\w+):\s*function").expect("valid regex")
});
static JS_CLASS: Lazy<Regex> = Lazy::new(|| Regex::new(r"class (\w+)").expect("valid regex"));

static JAVA_METHOD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:public|private|protected)?\s*(?:static\s+)?(?:\w+\s+)+(\w+)\s*\(")
        .expect("valid regex")
});
static JAVA_CLASS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:public\s+)?class (\w+)").expect("valid regex"));

/// Identifiers found in a file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identifiers {
    /// Function or method names, at most five
    pub functions: Vec<String>,

    /// Class names, at most three
    pub classes: Vec<String>,
}

impl Identifiers {
    /// Renders the inline clause used in synopses.
    #[must_use]
    pub fn clause(&self) -> String {
        let mut parts = Vec::with_capacity(2);
        if !self.functions.is_empty() {
            parts.push(format!("Functions: {}", self.functions.join(", ")));
        }
        if !self.classes.is_empty() {
            parts.push(format!("Classes: {}", self.classes.join(", ")));
        }

        if parts.is_empty() {
            NONE_FOUND.to_string()
        } else {
            parts.join("; ")
        }
    }
}

/// Extraction strategy for one language family.
pub trait Extractor: Send + Sync {
    /// Scans `content` for identifiers. `None` means the language is unsupported.
    fn extract(&self, content: &str) -> Option<Identifiers>;
}

struct PythonExtractor;

impl Extractor for PythonExtractor {
    fn extract(&self, content: &str) -> Option<Identifiers> {
        Some(Identifiers {
            functions: first_groups(&PY_FUNCTION, content, MAX_FUNCTIONS),
            classes: first_groups(&PY_CLASS, content, MAX_CLASSES),
        })
    }
}

struct ScriptExtractor;

impl Extractor for ScriptExtractor {
    fn extract(&self, content: &str) -> Option<Identifiers> {
        Some(Identifiers {
            functions: first_groups(&JS_FUNCTION, content, MAX_FUNCTIONS),
            classes: first_groups(&JS_CLASS, content, MAX_CLASSES),
        })
    }
}

struct JavaExtractor;

impl Extractor for JavaExtractor {
    fn extract(&self, content: &str) -> Option<Identifiers> {
        Some(Identifiers {
            functions: first_groups(&JAVA_METHOD, content, MAX_FUNCTIONS),
            classes: first_groups(&JAVA_CLASS, content, MAX_CLASSES),
        })
    }
}

struct Unsupported;

impl Extractor for Unsupported {
    fn extract(&self, _content: &str) -> Option<Identifiers> {
        None
    }
}

/// Returns the extraction strategy for a language.
#[must_use]
pub fn extractor_for(language: Language) -> &'static dyn Extractor {
    match language {
        Language::Python => &PythonExtractor,
        Language::JavaScript | Language::TypeScript => &ScriptExtractor,
        Language::Java => &JavaExtractor,
        _ => &Unsupported,
    }
}

/// Extracts identifiers and renders the synopsis clause.
#[must_use]
pub fn describe(language: Language, content: &str) -> String {
    extractor_for(language)
        .extract(content)
        .map_or_else(|| UNSUPPORTED.to_string(), |ids| ids.clause())
}

// First non-empty capture group of each match, in source order.
fn first_groups(re: &Regex, content: &str, limit: usize) -> Vec<String> {
    re.captures_iter(content)
        .filter_map(|caps| {
            caps.iter()
                .skip(1)
                .flatten()
                .next()
                .map(|m| m.as_str().to_string())
        })
        .take(limit)
        .collect()
}
