//! Paper source — the ingestion and retrieval façade over one embedding
//! index and one set of papers.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

use paperquill_common::{PaperquillError, Result};
use paperquill_index::VectorIndex;
use paperquill_ingestion::{Chunk, ChunkStrategy, Paper};

/// Per-paper outcomes of a batch ingestion run.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub added: Vec<String>,
    pub failed: Vec<(String, PaperquillError)>,
}

impl BatchOutcome {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Owns the title-keyed paper registry and the embedding index.
///
/// `add_paper` is the only way chunks enter the index, and the design is
/// append-only: there is no removal operation. The registry and the index
/// therefore always agree on which papers are searchable.
pub struct PaperSource {
    strategy: Arc<dyn ChunkStrategy>,
    index: Arc<dyn VectorIndex>,
    registry: RwLock<HashMap<String, Paper>>,
}

impl PaperSource {
    pub fn new(strategy: Arc<dyn ChunkStrategy>, index: Arc<dyn VectorIndex>) -> Self {
        Self {
            strategy,
            index,
            registry: RwLock::new(HashMap::new()),
        }
    }

    /// Chunk, filter, index, and register one paper.
    ///
    /// All-or-nothing: a fetch, chunking, or index failure leaves both the
    /// registry and the index untouched. A registered title is an error
    /// (never silently overwritten, unlike [`crate::PaperCollection`]).
    #[instrument(skip(self, paper), fields(title = %paper.title))]
    pub async fn add_paper(&self, paper: Paper) -> Result<()> {
        // Cheap rejection before the (possibly slow) download + chunking.
        if self.registry.read().await.contains_key(&paper.title) {
            return Err(PaperquillError::DuplicateTitle(paper.title.clone()));
        }

        let chunks = self.strategy.chunk(&paper).await?;

        // Registry and index must change together; single writer.
        let mut registry = self.registry.write().await;
        if registry.contains_key(&paper.title) {
            return Err(PaperquillError::DuplicateTitle(paper.title.clone()));
        }
        self.index.insert(chunks).await?;
        info!(title = %paper.title, "paper ingested");
        registry.insert(paper.title.clone(), paper);
        Ok(())
    }

    /// Ingest a batch, reporting per-paper outcomes. One paper's failure
    /// never aborts the rest of the batch.
    pub async fn add_papers(&self, papers: Vec<Paper>) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        for paper in papers {
            let title = paper.title.clone();
            match self.add_paper(paper).await {
                Ok(()) => outcome.added.push(title),
                Err(e) => {
                    warn!(title = %title, error = %e, "paper ingestion failed");
                    outcome.failed.push((title, e));
                }
            }
        }
        info!(
            added = outcome.added.len(),
            failed = outcome.failed.len(),
            "batch ingestion complete"
        );
        outcome
    }

    pub async fn get_paper(&self, title: &str) -> Result<Paper> {
        self.registry
            .read()
            .await
            .get(title)
            .cloned()
            .ok_or_else(|| PaperquillError::NotFound(title.to_string()))
    }

    /// Snapshot of the registry.
    pub async fn papers(&self) -> HashMap<String, Paper> {
        self.registry.read().await.clone()
    }

    pub async fn paper_count(&self) -> usize {
        self.registry.read().await.len()
    }

    /// Nearest-first similarity retrieval over all ingested chunks.
    ///
    /// When `num_retrieval` is omitted it defaults to the number of
    /// registered papers. That is an approximate heuristic, not "return
    /// everything": papers producing many chunks can crowd others out of a
    /// result capped at paper count. Returns fewer chunks than requested if
    /// the index holds fewer. Each returned chunk carries its similarity
    /// score in `metadata.score`.
    #[instrument(skip(self))]
    pub async fn retrieve(&self, query: &str, num_retrieval: Option<usize>) -> Result<Vec<Chunk>> {
        let k = match num_retrieval {
            Some(k) => k,
            None => self.registry.read().await.len(),
        };
        info!(query, k, "searching for related work");

        let hits = self.index.similarity_search(query, k).await?;
        info!(n = hits.len(), "sources found");

        Ok(hits
            .into_iter()
            .map(|scored| {
                let mut chunk = scored.chunk;
                chunk.metadata.score = Some(scored.score);
                chunk
            })
            .collect())
    }
}
