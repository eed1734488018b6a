//! Plain paper registry, independent of any index.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{info, instrument};

use paperquill_common::{PaperquillError, Result};
use paperquill_ingestion::sources::PaperDiscovery;
use paperquill_ingestion::{ContentNaming, Paper};

use crate::source::PaperSource;

/// A mutable title-keyed registry of papers.
///
/// Unlike [`PaperSource`], adding a paper with an existing title silently
/// overwrites the previous entry; a collection is bookkeeping, not an index.
#[derive(Debug, Default)]
pub struct PaperCollection {
    papers: HashMap<String, Paper>,
}

impl PaperCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a paper, overwriting any previous entry with the same title.
    pub fn add(&mut self, paper: Paper) {
        self.papers.insert(paper.title.clone(), paper);
    }

    pub fn get(&self, title: &str) -> Result<&Paper> {
        self.papers
            .get(title)
            .ok_or_else(|| PaperquillError::NotFound(title.to_string()))
    }

    pub fn all(&self) -> &HashMap<String, Paper> {
        &self.papers
    }

    pub fn len(&self) -> usize {
        self.papers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.papers.is_empty()
    }

    /// Search a discovery collaborator and register everything it returns.
    /// With `download_to` set, each paper's content is fetched into that
    /// folder (named by title) as it is added; a failed download fails the
    /// whole call before the remaining papers are registered.
    #[instrument(skip(self, client))]
    pub async fn add_from_arxiv(
        &mut self,
        client: &dyn PaperDiscovery,
        query: &str,
        max_results: usize,
        download_to: Option<&Path>,
    ) -> Result<usize> {
        let papers = client.search(query, max_results).await?;
        let n = papers.len();
        for paper in papers {
            if let Some(folder) = download_to {
                paper.fetch_content(folder, ContentNaming::Title).await?;
            }
            self.add(paper);
        }
        info!(query, n, "papers registered from discovery");
        Ok(n)
    }

    /// Retrieve via `source` and map the distinct attributed titles back to
    /// papers in this collection. A retrieved title missing from the
    /// collection is a `NotFound` error.
    pub async fn papers_of_topic(
        &self,
        source: &PaperSource,
        query: &str,
        num_retrieval: usize,
    ) -> Result<HashMap<String, Paper>> {
        info!(query, "collecting papers for topic");
        let chunks = source.retrieve(query, Some(num_retrieval)).await?;

        let titles: HashSet<&str> = chunks.iter().map(|c| c.metadata.source.as_str()).collect();
        let mut found = HashMap::new();
        for title in titles {
            found.insert(title.to_string(), self.get(title)?.clone());
        }
        info!(n = found.len(), "papers found for topic");
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{abstract_indexed_source, paper};
    use async_trait::async_trait;

    #[test]
    fn add_overwrites_duplicate_titles() {
        let mut collection = PaperCollection::new();
        collection.add(paper("t", "first"));
        collection.add(paper("t", "second"));

        assert_eq!(collection.len(), 1);
        assert_eq!(collection.get("t").unwrap().summary, "second");
    }

    #[test]
    fn get_unknown_title_is_not_found() {
        let collection = PaperCollection::new();
        assert!(matches!(
            collection.get("missing"),
            Err(PaperquillError::NotFound(_))
        ));
    }

    struct CannedDiscovery(Vec<Paper>);

    #[async_trait]
    impl PaperDiscovery for CannedDiscovery {
        async fn search(&self, _query: &str, max_results: usize) -> Result<Vec<Paper>> {
            Ok(self.0.iter().take(max_results).cloned().collect())
        }
    }

    #[tokio::test]
    async fn add_from_arxiv_registers_discovered_papers() {
        let discovery = CannedDiscovery(vec![
            paper("discovered one", "aaa"),
            paper("discovered two", "bbb"),
        ]);

        let mut collection = PaperCollection::new();
        let n = collection
            .add_from_arxiv(&discovery, "anything", 10, None)
            .await
            .unwrap();

        assert_eq!(n, 2);
        assert!(collection.get("discovered one").is_ok());
        assert!(collection.get("discovered two").is_ok());
    }

    #[tokio::test]
    async fn papers_of_topic_maps_chunks_back_to_papers() {
        let source = abstract_indexed_source();
        let p1 = paper("topic paper", "neural retrieval for medicine");
        let p2 = paper("other paper", "completely unrelated zzzz qqqq");
        source.add_papers(vec![p1.clone(), p2.clone()]).await;

        let mut collection = PaperCollection::new();
        collection.add(p1);
        collection.add(p2);

        let found = collection
            .papers_of_topic(&source, "neural retrieval medicine", 1)
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert!(found.contains_key("topic paper"));
    }
}
