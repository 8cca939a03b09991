//! Source-document reading and line numbering.

use std::path::Path;

use crate::error::ExtractionError;

/// A source document split into lines, with 1-based numbering.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// Path the document was read from, as given.
    pub path: String,
    /// Document lines with line endings stripped.
    pub lines: Vec<String>,
}

impl SourceDocument {
    /// Reads a document from disk, normalizing CRLF and lone CR endings.
    pub fn read(path: impl AsRef<Path>) -> Result<Self, ExtractionError> {
        let path_str = path.as_ref().display().to_string();
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_text(path_str, &raw)
    }

    /// Builds a document from already-loaded text.
    pub fn from_text(path: impl Into<String>, text: &str) -> Result<Self, ExtractionError> {
        let path = path.into();
        if text.trim().is_empty() {
            return Err(ExtractionError::EmptyDocument(path));
        }

        let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
        let lines = normalized.lines().map(|l| l.to_string()).collect();

        Ok(Self { path, lines })
    }

    /// Number of lines in the document.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// The document rendered as "N: line" rows for extraction prompts.
    pub fn numbered_text(&self) -> String {
        self.lines
            .iter()
            .enumerate()
            .map(|(i, line)| format!("{}: {}", i + 1, line))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// The text of an inclusive 1-based line range, if it is in bounds.
    pub fn line_range(&self, start: usize, end: usize) -> Option<String> {
        if start < 1 || end < start || end > self.lines.len() {
            return None;
        }
        Some(self.lines[start - 1..end].join("\n"))
    }
}
