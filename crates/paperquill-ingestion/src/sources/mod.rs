//! Paper discovery clients.

pub mod arxiv;

use async_trait::async_trait;

use crate::paper::Paper;
use paperquill_common::Result;

/// Common interface for paper discovery collaborators: given a free-text
/// query, return `Paper`-shaped metadata records.
#[async_trait]
pub trait PaperDiscovery: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<Paper>>;
}
