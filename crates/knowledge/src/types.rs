//! Core types for the medical knowledge base.

use serde::{Deserialize, Serialize};

/// Source label used when a record carries none.
pub const DEFAULT_SOURCE: &str = "unknown";

/// Domain label used when a record carries none.
pub const DEFAULT_DOMAIN: &str = "general";

/// A corpus record.
///
/// Immutable once indexed; `id` is unique within a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub text: String,
    pub source: String,
    pub domain: String,
}

impl Document {
    /// Create a document with default title, source and domain.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            text: text.into(),
            source: DEFAULT_SOURCE.to_string(),
            domain: DEFAULT_DOMAIN.to_string(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    /// Text that gets encoded and stored: `"<title>: <text>"` when titled.
    pub fn indexed_text(&self) -> String {
        let title = self.title.trim();
        if title.is_empty() {
            self.text.clone()
        } else {
            format!("{}: {}", title, self.text)
        }
    }

    /// Metadata stored next to the vector.
    pub fn metadata(&self) -> EntryMetadata {
        EntryMetadata::new(&self.source, &self.domain)
    }
}

/// Metadata attached to an index entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryMetadata {
    pub source: String,
    pub domain: String,
}

impl EntryMetadata {
    /// Build metadata, substituting defaults for blank values.
    pub fn new(source: &str, domain: &str) -> Self {
        Self {
            source: non_blank_or(source, DEFAULT_SOURCE),
            domain: non_blank_or(domain, DEFAULT_DOMAIN),
        }
    }

    /// Source label reported to callers.
    pub fn source_label(&self) -> &str {
        if self.source.trim().is_empty() {
            DEFAULT_SOURCE
        } else {
            &self.source
        }
    }
}

impl Default for EntryMetadata {
    fn default() -> Self {
        Self::new(DEFAULT_SOURCE, DEFAULT_DOMAIN)
    }
}

fn non_blank_or(value: &str, default: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        default.to_string()
    } else {
        trimmed.to_string()
    }
}

/// A stored vector with its text and metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub id: String,
    pub vector: Vec<f32>,
    pub text: String,
    pub metadata: EntryMetadata,
}

impl IndexEntry {
    /// Pair a document with its embedding.
    pub fn from_document(document: &Document, vector: Vec<f32>) -> Self {
        Self {
            id: document.id.clone(),
            vector,
            text: document.indexed_text(),
            metadata: document.metadata(),
        }
    }
}

/// One nearest-neighbour result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryHit {
    pub id: String,
    pub text: String,
    pub metadata: EntryMetadata,
    /// Distance under the collection metric; lower is closer
    pub distance: f32,
}

/// Ranked retrieval result as parallel sequences (rank 0 first).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Retrieval {
    pub texts: Vec<String>,
    pub metadatas: Vec<EntryMetadata>,
    pub distances: Vec<f32>,
}

impl Retrieval {
    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    /// Source labels in rank order.
    pub fn sources(&self) -> Vec<String> {
        self.metadatas
            .iter()
            .map(|m| m.source_label().to_string())
            .collect()
    }
}

impl From<Vec<QueryHit>> for Retrieval {
    fn from(hits: Vec<QueryHit>) -> Self {
        let mut retrieval = Retrieval {
            texts: Vec::with_capacity(hits.len()),
            metadatas: Vec::with_capacity(hits.len()),
            distances: Vec::with_capacity(hits.len()),
        };

        for hit in hits {
            retrieval.texts.push(hit.text);
            retrieval.metadatas.push(hit.metadata);
            retrieval.distances.push(hit.distance);
        }

        retrieval
    }
}

/// Statistics for an index build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildStats {
    /// Documents read from the corpus (0 when the build was skipped)
    pub documents: usize,

    /// Entries written to the index
    pub entries_added: usize,

    /// Entry count after the build
    pub total_entries: usize,

    /// True when the index was already populated and nothing was done
    pub skipped: bool,

    /// Duration in seconds
    pub duration_secs: f64,
}

/// Statistics for a collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    pub collection: String,
    pub entries: usize,
    pub metric: String,
    pub dimensions: usize,
    pub model: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indexed_text_with_title() {
        let doc = Document::new("id_0", "High blood sugar.").with_title("Diabetes");
        assert_eq!(doc.indexed_text(), "Diabetes: High blood sugar.");
    }

    #[test]
    fn test_indexed_text_without_title() {
        let doc = Document::new("id_0", "Fever is a symptom.");
        assert_eq!(doc.indexed_text(), "Fever is a symptom.");
    }

    #[test]
    fn test_metadata_defaults() {
        let meta = EntryMetadata::new("", "  ");
        assert_eq!(meta.source, "unknown");
        assert_eq!(meta.domain, "general");
    }

    #[test]
    fn test_retrieval_from_hits_keeps_order() {
        let hits = vec![
            QueryHit {
                id: "a".to_string(),
                text: "first".to_string(),
                metadata: EntryMetadata::new("PubMed", "diabetes"),
                distance: 0.1,
            },
            QueryHit {
                id: "b".to_string(),
                text: "second".to_string(),
                metadata: EntryMetadata {
                    source: String::new(),
                    domain: "general".to_string(),
                },
                distance: 0.4,
            },
        ];

        let retrieval = Retrieval::from(hits);
        assert_eq!(retrieval.len(), 2);
        assert_eq!(retrieval.texts, vec!["first", "second"]);
        assert_eq!(retrieval.sources(), vec!["PubMed", "unknown"]);
        assert_eq!(retrieval.distances, vec![0.1, 0.4]);
    }
}
