//! Demo: discover papers on arXiv, index their abstracts, then answer a
//! question and summarize the sources.
//!
//! Needs a configured LLM + embedding backend (see paperquill.example.toml)
//! and the matching API key in the environment:
//!   cargo run --example paper_chat

use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use paperquill_chat::{PaperChat, PaperSource};
use paperquill_common::Config;
use paperquill_index::{EmbeddingClient, MemoryIndex};
use paperquill_ingestion::sources::arxiv::ArxivClient;
use paperquill_ingestion::sources::PaperDiscovery;
use paperquill_ingestion::SummaryStrategy;
use paperquill_llm::backend_from_config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cfg = Config::load().unwrap_or_default();
    let backend = backend_from_config(&cfg.llm)?;
    let embedder = Arc::new(EmbeddingClient::from_config(&cfg.embedding)?);

    let source = Arc::new(PaperSource::new(
        Arc::new(SummaryStrategy::from_config(&cfg.ingestion)),
        Arc::new(MemoryIndex::new(embedder)),
    ));

    let arxiv = ArxivClient::new();
    let papers = arxiv.search("retrieval augmented generation", 5).await?;
    let outcome = source.add_papers(papers).await;
    println!(
        "indexed {} papers ({} failed)",
        outcome.added.len(),
        outcome.failed.len()
    );

    let chat = PaperChat::from_config(source, backend, &cfg.chat);

    let query = "How is retrieval used to ground large language model answers?";
    let (answer, sources) = chat.answer(query, None).await?;
    println!("\n{answer}\n");

    println!("sources:");
    for chunk in chat.summarize_sources(query, Some(sources.len())).await? {
        println!(
            "- {}: {}",
            chunk.metadata.source,
            chunk.metadata.summary.as_deref().unwrap_or("(no summary)")
        );
    }

    Ok(())
}
