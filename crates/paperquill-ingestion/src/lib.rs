//! paperquill-ingestion — Paper metadata and chunk production.
//! - Paper model: sanitized titles, citations, idempotent content download
//! - Chunking strategies (full content with pages, abstract-only)
//! - Bibliography chunk filter
//! - PDF page-text extraction
//! - arXiv paper discovery client

pub mod chunker;
pub mod models;
pub mod paper;
pub mod pdf;
pub mod sources;

pub use chunker::{ChunkStrategy, FullContentStrategy, SummaryStrategy};
pub use models::{Chunk, ChunkMetadata};
pub use paper::{ContentNaming, Paper};
