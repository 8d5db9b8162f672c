//! Rule tables driving collection, filtering and prioritisation.
//!
//! Every rule is a plain list of lowercase strings matched by substring
//! (or suffix, for database extensions). The defaults reproduce the
//! built-in behaviour; callers may replace any table through
//! [`ConfigBuilder::rules`](crate::ConfigBuilder::rules).

use crate::file::{FileRecord, Language};

const ALLOWED_EXTENSIONS: &[&str] = &[
    "py", "js", "jsx", "ts", "tsx", "java", "jsp", "jspx", "html", "htm", "css", "scss", "sass",
    "json", "md", "sql", "xml", "yaml", "yml", "properties", "env",
];

const IGNORE_PATTERNS: &[&str] = &[
    "node_modules",
    "__pycache__",
    ".git",
    ".venv",
    "venv",
    "env",
    "dist",
    "build",
    ".next",
    ".nuxt",
    "coverage",
    "target",
    ".idea",
    ".vscode",
];

const SENSITIVE_PATH_PATTERNS: &[&str] = &[
    // environment and configuration files
    ".env", "config.json", "settings.json", "appsettings.json",
    // authentication
    "auth", "credentials", "secret", "password", "token",
    // virtual environments and dependencies
    "venv", "env", "node_modules", "__pycache__", "vendor",
    // build and cache
    "dist", "build", ".next", ".nuxt", "coverage", "target",
    // IDE
    ".idea", ".vscode", ".vs",
    // compiled
    ".pyc", ".class", ".jar", ".war",
    // keys and certificates
    ".pem", ".key", ".crt", ".cer", ".pfx", ".p12",
    // databases
    ".db", ".sqlite", ".sqlite3",
    // logs
    ".log", "logs/",
    // temporary
    "tmp/", "temp/", ".tmp", ".temp",
];

const SENSITIVE_KEYWORDS: &[&str] = &["password", "secret", "token", "key", "credential", "auth"];

const IMPORTANT_KEYWORDS: &[&str] = &[
    "home",
    "main",
    "index",
    "app",
    "config",
    "package.json",
    "readme",
];

const DATABASE_EXTENSIONS: &[&str] = &[".sql"];

const CRITICAL_STEMS: &[&str] = &["main", "index", "app"];

const CRITICAL_FILE_NAMES: &[&str] = &["package.json", "readme.md"];

const SUMMARIZABLE_LANGUAGES: &[Language] = &[
    Language::JavaScript,
    Language::TypeScript,
    Language::Python,
    Language::Java,
];

/// Priority bucket of a file in the summary layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    /// Entry points, configuration, manifests
    Important,
    /// Data-definition files
    Database,
    /// Everything else
    Regular,
}

/// Why a file was excluded by the sensitive content filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SensitiveMatch {
    /// Lowercased path contains the pattern
    Path(String),
    /// Lowercased content contains the keyword
    Content(String),
}

/// Ordered rule tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSet {
    /// Admitted extensions, lowercase, without the dot
    pub allowed_extensions: Vec<String>,

    /// Directory name substrings pruned during traversal
    pub ignore_patterns: Vec<String>,

    /// Path substrings marking a file as sensitive
    pub sensitive_path_patterns: Vec<String>,

    /// Content substrings marking a file as sensitive
    pub sensitive_keywords: Vec<String>,

    /// Path substrings marking a file as important
    pub important_keywords: Vec<String>,

    /// Path suffixes marking a file as a database definition
    pub database_extensions: Vec<String>,

    /// File stems (before the first dot) of critical entry points
    pub critical_stems: Vec<String>,

    /// Exact file names of critical files
    pub critical_file_names: Vec<String>,

    /// Languages that get an identifier synopsis in layer 1
    pub summarizable_languages: Vec<Language>,
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            allowed_extensions: owned(ALLOWED_EXTENSIONS),
            ignore_patterns: owned(IGNORE_PATTERNS),
            sensitive_path_patterns: owned(SENSITIVE_PATH_PATTERNS),
            sensitive_keywords: owned(SENSITIVE_KEYWORDS),
            important_keywords: owned(IMPORTANT_KEYWORDS),
            database_extensions: owned(DATABASE_EXTENSIONS),
            critical_stems: owned(CRITICAL_STEMS),
            critical_file_names: owned(CRITICAL_FILE_NAMES),
            summarizable_languages: SUMMARIZABLE_LANGUAGES.to_vec(),
        }
    }
}

impl RuleSet {
    /// Returns true if the lowercase extension is admitted.
    #[must_use]
    pub fn allows_extension(&self, ext: &str) -> bool {
        self.allowed_extensions.iter().any(|e| e == ext)
    }

    /// Returns true if a directory with this name must be pruned.
    #[must_use]
    pub fn ignores_dir(&self, name: &str) -> bool {
        self.ignore_patterns.iter().any(|p| name.contains(p.as_str()))
    }

    /// Returns the first sensitive rule the record matches, path rules first.
    #[must_use]
    pub fn sensitive_match(&self, file: &FileRecord) -> Option<SensitiveMatch> {
        let path = file.path.to_lowercase();
        if let Some(p) = self
            .sensitive_path_patterns
            .iter()
            .find(|p| path.contains(p.as_str()))
        {
            return Some(SensitiveMatch::Path(p.clone()));
        }

        let content = file.content_str()?.to_lowercase();
        self.sensitive_keywords
            .iter()
            .find(|k| content.contains(k.as_str()))
            .map(|k| SensitiveMatch::Content(k.clone()))
    }

    /// Classifies a path. Precedence: important, database, regular.
    #[must_use]
    pub fn bucket(&self, path: &str) -> Bucket {
        let path = path.to_lowercase();
        if self.important_keywords.iter().any(|k| path.contains(k.as_str())) {
            Bucket::Important
        } else if self.database_extensions.iter().any(|e| path.ends_with(e.as_str())) {
            Bucket::Database
        } else {
            Bucket::Regular
        }
    }

    /// Returns true if the file is a canonical entry point kept in layer 2.
    #[must_use]
    pub fn is_critical(&self, file: &FileRecord) -> bool {
        if self.bucket(&file.path) != Bucket::Important {
            return false;
        }
        let name = file.file_name().to_lowercase();
        let stem = name.split('.').next().unwrap_or_default();
        self.critical_file_names.iter().any(|n| *n == name)
            || (name.contains('.') && self.critical_stems.iter().any(|s| s == stem))
    }

    /// Returns true if layer 1 renders an identifier synopsis for the language.
    #[must_use]
    pub fn is_summarizable(&self, language: Language) -> bool {
        self.summarizable_languages.contains(&language)
    }
}
