//! Chunk model shared by the chunking strategies and the retrieval façade.

use serde::{Deserialize, Serialize};

/// Provenance carried by every chunk.
///
/// `source` always holds the owning paper's sanitized title and is the join
/// key back into the paper registry. `summary` and `score` stay empty until
/// the summarization flow annotates a retrieved copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

/// A bounded text fragment derived from one paper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    pub metadata: ChunkMetadata,
}

impl Chunk {
    pub fn new(content: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: ChunkMetadata {
                source: source.into(),
                page: None,
                summary: None,
                score: None,
            },
        }
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.metadata.page = Some(page);
        self
    }
}
