//! Retrieval document types
//!
//! A `Document` is the immutable unit of retrievable text. Retrieval and
//! re-ranking never mutate documents; they only pair them with scores.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Immutable unit of retrievable text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Document content
    pub content: String,
    /// Metadata; carries at least a `source` identifier
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Document {
    pub fn new(content: impl Into<String>, source: impl Into<String>) -> Self {
        let mut metadata = HashMap::new();
        metadata.insert("source".to_string(), source.into());
        Self {
            content: content.into(),
            metadata,
        }
    }

    /// Attach a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Source identifier, `"unknown"` when absent
    pub fn source(&self) -> &str {
        self.metadata
            .get("source")
            .map(String::as_str)
            .unwrap_or("unknown")
    }
}

/// A document paired with a relevance score (higher = more relevant)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredDocument {
    pub document: Document,
    pub score: f32,
}

impl ScoredDocument {
    pub fn new(document: Document, score: f32) -> Self {
        Self { document, score }
    }
}

/// Numbered citation derived from a ranked document list
///
/// `id` values form a contiguous 1-based sequence matching rank order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    /// 1-based rank position
    pub id: usize,
    /// Source identifier from document metadata
    pub source: String,
    /// Bounded, newline-collapsed excerpt of the document content
    pub excerpt: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_source() {
        let doc = Document::new("14-day return window", "returns-policy.md");
        assert_eq!(doc.source(), "returns-policy.md");

        let bare = Document {
            content: "text".to_string(),
            metadata: HashMap::new(),
        };
        assert_eq!(bare.source(), "unknown");
    }

    #[test]
    fn test_with_metadata() {
        let doc = Document::new("text", "a.md").with_metadata("category", "policy");
        assert_eq!(doc.metadata.get("category").unwrap(), "policy");
        assert_eq!(doc.source(), "a.md");
    }
}
