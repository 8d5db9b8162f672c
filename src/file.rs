use serde::Serialize;
use std::fmt;

/// Language tag derived from a file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// `.py`
    Python,
    /// `.js`, `.jsx`
    JavaScript,
    /// `.ts`, `.tsx`
    TypeScript,
    /// `.java`
    Java,
    /// `.jsp`, `.jspx`
    Jsp,
    /// `.html`, `.htm`
    Html,
    /// `.css`, `.scss`, `.sass`
    Css,
    /// `.json`
    Json,
    /// `.md`
    Markdown,
    /// `.sql`
    Sql,
    /// `.xml`
    Xml,
    /// `.yaml`, `.yml`
    Yaml,
    /// `.properties`
    Properties,
    /// Allowed but unmapped extensions
    Text,
}

impl Language {
    /// Maps a lowercase extension (without the dot) to a language tag.
    #[must_use]
    pub fn from_extension(ext: &str) -> Self {
        match ext {
            "py" => Self::Python,
            "js" | "jsx" => Self::JavaScript,
            "ts" | "tsx" => Self::TypeScript,
            "java" => Self::Java,
            "jsp" | "jspx" => Self::Jsp,
            "html" | "htm" => Self::Html,
            "css" | "scss" | "sass" => Self::Css,
            "json" => Self::Json,
            "md" => Self::Markdown,
            "sql" => Self::Sql,
            "xml" => Self::Xml,
            "yaml" | "yml" => Self::Yaml,
            "properties" => Self::Properties,
            _ => Self::Text,
        }
    }

    /// Returns the stable lowercase tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::JavaScript => "javascript",
            Self::TypeScript => "typescript",
            Self::Java => "java",
            Self::Jsp => "jsp",
            Self::Html => "html",
            Self::Css => "css",
            Self::Json => "json",
            Self::Markdown => "markdown",
            Self::Sql => "sql",
            Self::Xml => "xml",
            Self::Yaml => "yaml",
            Self::Properties => "properties",
            Self::Text => "text",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Represents a collected file with its content and metadata.
#[derive(Debug, Clone)]
pub struct FileRecord {
    /// Relative path from the root directory, `/`-separated
    pub path: String,

    /// Language tag
    pub language: Language,

    /// File content
    pub content: FileContent,

    /// Number of lines
    pub lines: usize,

    /// Size of the content in bytes
    pub size: usize,
}

/// File content (loaded text or size only).
#[derive(Debug, Clone)]
pub enum FileContent {
    /// Decoded text
    Text(String),

    /// Content was not loaded, only its size is known
    Unloaded {
        /// Size in bytes
        size: usize,
    },
}

impl FileRecord {
    /// Creates a record from decoded text, deriving line count and size.
    #[must_use]
    pub fn new_text(path: impl Into<String>, language: Language, content: String) -> Self {
        let lines = content.lines().count();
        let size = content.len();
        Self {
            path: path.into(),
            language,
            content: FileContent::Text(content),
            lines,
            size,
        }
    }

    /// Creates a record whose content is known only by size.
    #[must_use]
    pub fn new_unloaded(
        path: impl Into<String>,
        language: Language,
        lines: usize,
        size: usize,
    ) -> Self {
        Self {
            path: path.into(),
            language,
            content: FileContent::Unloaded { size },
            lines,
            size,
        }
    }

    /// Returns the text content if it was loaded.
    #[must_use]
    pub fn content_str(&self) -> Option<&str> {
        match &self.content {
            FileContent::Text(s) => Some(s),
            FileContent::Unloaded { .. } => None,
        }
    }

    /// Returns true if the content is loaded.
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        matches!(self.content, FileContent::Text(_))
    }

    /// Returns the final path component.
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// Returns the parent directory, or `root` for top-level files.
    #[must_use]
    pub fn directory(&self) -> &str {
        match self.path.rsplit_once('/') {
            Some((dir, _)) if !dir.is_empty() => dir,
            _ => "root",
        }
    }
}

/// Returns the lowercase extension of a file name, without the dot.
///
/// Dot-files such as `.env` have their whole name after the dot as extension.
#[must_use]
pub fn extension_of(file_name: &str) -> Option<String> {
    let (_, ext) = file_name.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_record_text() {
        let record = FileRecord::new_text("src/main.py", Language::Python, "a\nb\nc".to_string());

        assert!(record.is_loaded());
        assert_eq!(record.content_str(), Some("a\nb\nc"));
        assert_eq!(record.lines, 3);
        assert_eq!(record.size, 5);
    }

    #[test]
    fn test_file_record_unloaded() {
        let record = FileRecord::new_unloaded("big.sql", Language::Sql, 10, 4096);

        assert!(!record.is_loaded());
        assert_eq!(record.content_str(), None);
        assert_eq!(record.size, 4096);
    }

    #[test]
    fn test_line_count_trailing_newline() {
        let record = FileRecord::new_text("a.py", Language::Python, "x = 1\n".to_string());
        assert_eq!(record.lines, 1);

        let empty = FileRecord::new_text("b.py", Language::Python, String::new());
        assert_eq!(empty.lines, 0);
    }

    #[test]
    fn test_file_name_and_directory() {
        let nested = FileRecord::new_text("src/api/app.js", Language::JavaScript, String::new());
        assert_eq!(nested.file_name(), "app.js");
        assert_eq!(nested.directory(), "src/api");

        let top = FileRecord::new_text("README.md", Language::Markdown, String::new());
        assert_eq!(top.file_name(), "README.md");
        assert_eq!(top.directory(), "root");
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("main.PY").as_deref(), Some("py"));
        assert_eq!(extension_of(".env").as_deref(), Some("env"));
        assert_eq!(extension_of("archive.tar.gz").as_deref(), Some("gz"));
        assert_eq!(extension_of("Makefile"), None);
        assert_eq!(extension_of("trailing."), None);
    }

    #[test]
    fn test_language_mapping() {
        let cases = [
            ("py", "python"),
            ("jsx", "javascript"),
            ("tsx", "typescript"),
            ("jspx", "jsp"),
            ("htm", "html"),
            ("sass", "css"),
            ("yml", "yaml"),
            ("properties", "properties"),
            ("env", "text"),
        ];

        for (ext, expected) in cases {
            assert_eq!(Language::from_extension(ext).as_str(), expected);
        }
    }

    #[test]
    fn test_language_serializes_lowercase() {
        let json = serde_json::to_string(&Language::JavaScript).unwrap();
        assert_eq!(json, "\"javascript\"");
    }
}
