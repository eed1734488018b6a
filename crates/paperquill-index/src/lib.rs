//! paperquill-index — The embedding-index seam.
//!
//! The retrieval core depends only on the narrow [`VectorIndex`] contract:
//! store chunks, return the k nearest to a query. Any k-NN text index
//! satisfies it; [`memory::MemoryIndex`] is the built-in brute-force
//! implementation backed by an HTTP [`Embedder`].

pub mod embedder;
pub mod memory;

use async_trait::async_trait;

use paperquill_common::Result;
use paperquill_ingestion::Chunk;

/// A retrieved chunk with its similarity score (higher is closer).
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// k-nearest-neighbour text index over chunks.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Append chunks to the index. Append-only; there is no removal.
    async fn insert(&self, chunks: Vec<Chunk>) -> Result<()>;

    /// Return up to `k` chunks ranked nearest-first.
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>>;
}

/// Produces vector embeddings for batches of texts.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

pub use embedder::EmbeddingClient;
pub use memory::MemoryIndex;
