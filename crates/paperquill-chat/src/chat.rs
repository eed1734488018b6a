//! Chat orchestrator: retrieval → prompt assembly → agent call.

use futures_util::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use paperquill_common::config::ChatConfig;
use paperquill_common::{PaperquillError, Result};
use paperquill_ingestion::Chunk;
use paperquill_llm::{Agent, LlmBackend};

use crate::source::PaperSource;

pub struct PaperChat {
    source: Arc<PaperSource>,
    agent: Agent,
    max_context_chars: usize,
    summary_concurrency: usize,
}

impl PaperChat {
    pub fn new(source: Arc<PaperSource>, backend: Arc<dyn LlmBackend>) -> Self {
        Self::from_config(source, backend, &ChatConfig::default())
    }

    pub fn from_config(
        source: Arc<PaperSource>,
        backend: Arc<dyn LlmBackend>,
        cfg: &ChatConfig,
    ) -> Self {
        Self {
            source,
            agent: Agent::researcher(backend),
            max_context_chars: cfg.max_context_chars,
            summary_concurrency: cfg.summary_concurrency.max(1),
        }
    }

    /// Answer a query from retrieved paper content.
    ///
    /// Returns the agent's answer verbatim together with every retrieved
    /// chunk. The prompt itself is bounded by the configured character
    /// budget: trailing chunks that would overflow it are dropped from the
    /// prompt (with a warning), never from the returned sources.
    #[instrument(skip(self))]
    pub async fn answer(
        &self,
        query: &str,
        num_retrieval: Option<usize>,
    ) -> Result<(String, Vec<Chunk>)> {
        info!(query, "answering from paper context");
        let sources = self.source.retrieve(query, num_retrieval).await?;

        let prompt = self.build_prompt(query, &sources);
        let answer = self.agent.ask(&prompt).await?;
        debug!(n_sources = sources.len(), "answer assembled");
        Ok((answer, sources))
    }

    /// Retrieve sources for a query and summarize each in one sentence.
    ///
    /// Fails with `NoSources` before any LLM call when retrieval is empty.
    /// Per-chunk calls run concurrently (bounded), and the returned chunks
    /// keep retrieval order, annotated with `summary` and `score`.
    #[instrument(skip(self))]
    pub async fn summarize_sources(
        &self,
        query: &str,
        num_retrieval: Option<usize>,
    ) -> Result<Vec<Chunk>> {
        info!(query, "finding related works");
        let sources = self.source.retrieve(query, num_retrieval).await?;
        if sources.is_empty() {
            return Err(PaperquillError::NoSources);
        }

        let summarized: Vec<Chunk> = stream::iter(sources.into_iter().map(|mut chunk| {
            let agent = &self.agent;
            async move {
                let prompt = summary_prompt(query, &chunk.content);
                let summary = agent.ask(&prompt).await?;
                debug!(source = %chunk.metadata.source, "source summarized");
                chunk.metadata.summary = Some(summary);
                Ok::<Chunk, PaperquillError>(chunk)
            }
        }))
        .buffered(self.summary_concurrency)
        .try_collect()
        .await?;

        Ok(summarized)
    }

    fn build_prompt(&self, query: &str, sources: &[Chunk]) -> String {
        let mut prompt =
            format!("{query} with the following paper contents as context for your reference:\n");

        let mut included = 0;
        for chunk in sources {
            if prompt.len() + chunk.content.len() + 1 > self.max_context_chars {
                break;
            }
            prompt.push_str(&chunk.content);
            prompt.push('\n');
            included += 1;
        }
        if included < sources.len() {
            warn!(
                included,
                dropped = sources.len() - included,
                budget = self.max_context_chars,
                "context budget reached, trailing chunks left out of the prompt"
            );
        }
        prompt
    }
}

fn summary_prompt(query: &str, content: &str) -> String {
    format!(
        "Summarize the following paper contents with exactly ONE concise sentence for how it \
         relates to {query}, output it in the format of 'XXXXXXX (A Question/Method/Model/\
         Concept/Results/Conclusion etc.) was proposed/raised/mentioned/analyzed/found that \
         XXXXX': {content}\nPlease do not mention 'this paper' or 'figure' or 'table' in the \
         summary."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{abstract_indexed_source, paper, CountingBackend};

    #[tokio::test]
    async fn answer_returns_reply_and_sources() {
        let source = abstract_indexed_source();
        source
            .add_paper(paper("relevant", "sparse retrieval with embeddings"))
            .await
            .unwrap();

        let backend = CountingBackend::new("grounded answer");
        let chat = PaperChat::new(source, backend.clone());

        let (answer, sources) = chat
            .answer("sparse retrieval embeddings", None)
            .await
            .unwrap();
        assert_eq!(answer, "grounded answer");
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].metadata.source, "relevant");
        assert_eq!(backend.call_count(), 1);

        // The user prompt carries the query and the retrieved content.
        let requests = backend.requests.lock().unwrap();
        let user = &requests[0].messages[1].content;
        assert!(user.starts_with("sparse retrieval embeddings with the following paper contents"));
        assert!(user.contains("sparse retrieval with embeddings"));
    }

    #[tokio::test]
    async fn prompt_respects_context_budget_but_sources_are_complete() {
        let source = abstract_indexed_source();
        source
            .add_papers(vec![
                paper("one", &"a".repeat(300)),
                paper("two", &"b".repeat(300)),
                paper("three", &"c".repeat(300)),
            ])
            .await;

        let backend = CountingBackend::new("ok");
        let cfg = ChatConfig {
            max_context_chars: 450,
            summary_concurrency: 2,
        };
        let chat = PaperChat::from_config(source, backend.clone(), &cfg);

        let (_, sources) = chat.answer("aaaa bbbb cccc", Some(3)).await.unwrap();
        assert_eq!(sources.len(), 3, "returned sources must not be truncated");

        let requests = backend.requests.lock().unwrap();
        let prompt = &requests[0].messages[1].content;
        assert!(prompt.len() <= 450);
    }

    #[tokio::test]
    async fn summarize_sources_annotates_each_chunk() {
        let source = abstract_indexed_source();
        source
            .add_papers(vec![
                paper("first paper", "language models answer questions"),
                paper("second paper", "language models summarize documents"),
            ])
            .await;

        let backend =
            CountingBackend::new("A method was proposed that models answer questions.");
        let chat = PaperChat::new(source, backend.clone());

        let chunks = chat
            .summarize_sources("language models", Some(2))
            .await
            .unwrap();
        assert_eq!(chunks.len(), 2);
        for chunk in &chunks {
            assert!(chunk.metadata.summary.as_deref().unwrap().contains("was proposed"));
            assert!(chunk.metadata.score.is_some());
        }
        assert_eq!(backend.call_count(), 2, "one LLM call per retrieved chunk");

        // The per-chunk prompt is the fixed one-sentence template.
        let requests = backend.requests.lock().unwrap();
        let user = &requests[0].messages[1].content;
        assert!(user.contains("exactly ONE concise sentence"));
        assert!(user.contains("do not mention 'this paper'"));
    }

    #[tokio::test]
    async fn summarize_sources_with_empty_retrieval_never_calls_llm() {
        let source = abstract_indexed_source(); // nothing ingested
        let backend = CountingBackend::new("unused");
        let chat = PaperChat::new(source, backend.clone());

        let err = chat.summarize_sources("anything", None).await.unwrap_err();
        assert!(matches!(err, PaperquillError::NoSources));
        assert_eq!(backend.call_count(), 0);
    }
}
