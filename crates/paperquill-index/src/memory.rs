//! Brute-force in-memory vector index.
//!
//! Embeds chunk texts through the configured [`Embedder`], keeps the
//! normalized vectors in memory, and ranks by cosine similarity. Suitable
//! for the paper-collection scale this library targets; anything larger
//! should implement [`VectorIndex`] over a real vector store.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use paperquill_common::{PaperquillError, Result};
use paperquill_ingestion::Chunk;

use crate::{Embedder, ScoredChunk, VectorIndex};

struct IndexEntry {
    embedding: Vec<f32>,
    chunk: Chunk,
}

pub struct MemoryIndex {
    /// Fresh per index, so concurrently constructed indexes never collide.
    collection_id: Uuid,
    embedder: Arc<dyn Embedder>,
    entries: RwLock<Vec<IndexEntry>>,
}

impl MemoryIndex {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        let collection_id = Uuid::new_v4();
        info!(%collection_id, "initiating vector collection");
        Self {
            collection_id,
            embedder,
            entries: RwLock::new(Vec::new()),
        }
    }

    pub fn collection_id(&self) -> Uuid {
        self.collection_id
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn insert(&self, chunks: Vec<Chunk>) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }
        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let vecs = self.embedder.embed_batch(&texts).await?;
        if vecs.len() != chunks.len() {
            return Err(PaperquillError::Upstream(format!(
                "embedder returned {} vectors for {} chunks",
                vecs.len(),
                chunks.len()
            )));
        }

        let mut entries = self.entries.write().await;
        for (chunk, vec) in chunks.into_iter().zip(vecs) {
            entries.push(IndexEntry {
                embedding: l2_normalize(vec),
                chunk,
            });
        }
        debug!(collection = %self.collection_id, total = entries.len(), "chunks indexed");
        Ok(())
    }

    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        if k == 0 {
            return Ok(vec![]);
        }

        let query_vec = self
            .embedder
            .embed_batch(&[query.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| PaperquillError::Upstream("embedder returned no query vector".into()))?;
        let query_vec = l2_normalize(query_vec);

        let entries = self.entries.read().await;
        let mut scored: Vec<ScoredChunk> = entries
            .iter()
            .map(|entry| {
                if entry.embedding.len() != query_vec.len() {
                    return Err(PaperquillError::Upstream(format!(
                        "embedding dimension mismatch: {} vs {}",
                        entry.embedding.len(),
                        query_vec.len()
                    )));
                }
                Ok(ScoredChunk {
                    chunk: entry.chunk.clone(),
                    score: dot(&entry.embedding, &query_vec),
                })
            })
            .collect::<Result<_>>()?;

        // Nearest first.
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

fn l2_normalize(v: Vec<f32>) -> Vec<f32> {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-10);
    v.into_iter().map(|x| x / norm).collect()
}
