//! paperquill-chat — Retrieval-augmented chat over a set of papers.
//!
//! [`PaperSource`] owns the paper registry and the embedding index and is the
//! only ingestion path; [`PaperCollection`] is a plain registry independent
//! of indexing; [`PaperChat`] assembles retrieval results into prompts for
//! the research agent.

pub mod chat;
pub mod collection;
pub mod source;

pub use chat::PaperChat;
pub use collection::PaperCollection;
pub use source::{BatchOutcome, PaperSource};
