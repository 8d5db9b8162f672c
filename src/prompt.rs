//! Prompt assembly for the documentation pages.
//!
//! Each page pairs a fixed system message with a fixed instruction block;
//! the payload is appended after a common separator.

use serde::Serialize;
use std::fmt;

const PAYLOAD_SEPARATOR: &str = "\n\nANALYZE THIS CODEBASE:\n\n";

/// Documentation page produced by one LLM call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocKind {
    /// Project overview and navigation
    Index,
    /// System design
    Architecture,
    /// Data model
    Database,
    /// Code structure
    Classes,
    /// Web interfaces and endpoints
    Web,
}

impl DocKind {
    /// Returns the ID string, also used as the output file stem.
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::Index => "index",
            Self::Architecture => "architecture",
            Self::Database => "database",
            Self::Classes => "classes",
            Self::Web => "web",
        }
    }

    /// Returns all pages in generation order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Index,
            Self::Architecture,
            Self::Database,
            Self::Classes,
            Self::Web,
        ]
    }

    /// Parse a page kind from its ID.
    #[must_use]
    pub fn from_id(id: &str) -> Option<Self> {
        Self::all().iter().copied().find(|k| k.id() == id)
    }

    /// Output file name of the page.
    #[must_use]
    pub fn file_name(self) -> String {
        format!("{}.md", self.id())
    }

    /// System message for the page.
    #[must_use]
    pub const fn system_message(self) -> &'static str {
        match self {
            Self::Index => {
                "You are a technical documentation expert specializing in project overviews and navigation."
            }
            Self::Architecture => {
                "You are a software architect specializing in system design documentation."
            }
            Self::Database => {
                "You are a database architect specializing in data model documentation."
            }
            Self::Classes => {
                "You are a code analyst specializing in class structure documentation."
            }
            Self::Web => "You are a web API analyst specializing in interface documentation.",
        }
    }

    /// Instruction block placed before the payload.
    #[must_use]
    pub const fn instructions(self) -> &'static str {
        match self {
            Self::Index => include_str!("../prompts/index.md"),
            Self::Architecture => include_str!("../prompts/architecture.md"),
            Self::Database => include_str!("../prompts/database.md"),
            Self::Classes => include_str!("../prompts/classes.md"),
            Self::Web => include_str!("../prompts/web.md"),
        }
    }
}

impl fmt::Display for DocKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// A system/user message pair ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    /// System message
    pub system: &'static str,

    /// Instructions followed by the payload
    pub user: String,
}

impl Prompt {
    /// Wraps `payload` into the prompt for `kind`.
    #[must_use]
    pub fn assemble(kind: DocKind, payload: &str) -> Self {
        let instructions = kind.instructions().trim_end();
        let mut user =
            String::with_capacity(instructions.len() + PAYLOAD_SEPARATOR.len() + payload.len());
        user.push_str(instructions);
        user.push_str(PAYLOAD_SEPARATOR);
        user.push_str(payload);

        Self {
            system: kind.system_message(),
            user,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_kinds_round_trip() {
        assert_eq!(DocKind::all().len(), 5);
        for kind in DocKind::all() {
            assert_eq!(DocKind::from_id(kind.id()), Some(*kind));
        }
        assert_eq!(DocKind::from_id("readme"), None);
    }

    #[test]
    fn test_file_names() {
        let names: Vec<_> = DocKind::all().iter().map(|k| k.file_name()).collect();
        assert_eq!(
            names,
            vec!["index.md", "architecture.md", "database.md", "classes.md", "web.md"]
        );
    }

    #[test]
    fn test_assemble_appends_payload() {
        let prompt = Prompt::assemble(DocKind::Database, "FILE: schema.sql");

        assert_eq!(prompt.system, DocKind::Database.system_message());
        assert!(prompt.user.starts_with("Write database.md"));
        assert!(prompt.user.ends_with("\n\nANALYZE THIS CODEBASE:\n\nFILE: schema.sql"));
    }

    #[test]
    fn test_payload_is_not_interpreted() {
        let payload = "{{ ctx.files }} {% raw %} %s {}";
        let prompt = Prompt::assemble(DocKind::Web, payload);
        assert!(prompt.user.ends_with(payload));
    }

    #[test]
    fn test_instructions_name_their_page() {
        for kind in DocKind::all() {
            assert!(kind.instructions().contains(&kind.file_name()));
        }
    }
}
