//! Fixed-size sliding-window chunking and the bibliography filter.
//!
//! Two interchangeable strategies turn one paper into chunks:
//!   FullContentStrategy — downloads the PDF, windows each page's text
//!   SummaryStrategy     — windows the abstract only
//! Strategy selection is configuration, not inheritance.

use async_trait::async_trait;
use regex::Regex;
use std::path::PathBuf;
use std::sync::LazyLock;
use tracing::{debug, info};

use paperquill_common::config::IngestionConfig;
use paperquill_common::{PaperquillError, Result};

use crate::models::Chunk;
use crate::paper::{ContentNaming, Paper};
use crate::pdf::extract_page_texts;

/// Bibliography heuristic: an arXiv identifier (4 digits, dot, 4–5 digits).
static ARXIV_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\barXiv:\d{4}\.\d{4,5}\b").unwrap());

/// True if the text looks like it sits inside a reference section.
pub fn contains_arxiv_reference(text: &str) -> bool {
    ARXIV_REFERENCE.is_match(text)
}

/// Split `text` into character windows of `window` chars with `overlap`
/// chars shared between consecutive windows. The final partial window is
/// kept as-is; text no longer than the overlap yields exactly one chunk.
///
/// Window *i* spans `[i*(window-overlap), i*(window-overlap)+window)`,
/// clipped to the text length.
pub fn split_windows(text: &str, window: usize, overlap: usize) -> Vec<String> {
    assert!(overlap < window, "overlap must be smaller than the window");

    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let stride = window - overlap;

    let mut out = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + window).min(len);
        out.push(chars[start..end].iter().collect());
        if end == len {
            break;
        }
        start += stride;
    }
    out
}

/// Turns one paper into an ordered sequence of source-tagged chunks.
#[async_trait]
pub trait ChunkStrategy: Send + Sync {
    async fn chunk(&self, paper: &Paper) -> Result<Vec<Chunk>>;
}

/// Chunks the full downloaded document, page by page.
#[derive(Debug, Clone)]
pub struct FullContentStrategy {
    download_dir: PathBuf,
    window: usize,
    overlap: usize,
    ignore_references: bool,
}

impl FullContentStrategy {
    pub fn new(download_dir: impl Into<PathBuf>) -> Self {
        Self {
            download_dir: download_dir.into(),
            window: 500,
            overlap: 50,
            ignore_references: true,
        }
    }

    pub fn from_config(cfg: &IngestionConfig) -> Self {
        Self {
            download_dir: PathBuf::from(&cfg.download_dir),
            window: cfg.chunk_size,
            overlap: cfg.chunk_overlap,
            ignore_references: cfg.ignore_references,
        }
    }

    pub fn with_windowing(mut self, window: usize, overlap: usize) -> Self {
        self.window = window;
        self.overlap = overlap;
        self
    }

    pub fn with_reference_filter(mut self, enabled: bool) -> Self {
        self.ignore_references = enabled;
        self
    }
}

#[async_trait]
impl ChunkStrategy for FullContentStrategy {
    async fn chunk(&self, paper: &Paper) -> Result<Vec<Chunk>> {
        let pdf_path = paper
            .fetch_content(&self.download_dir, ContentNaming::UrlSuffix)
            .await?;

        debug!(title = %paper.title, path = %pdf_path.display(), "extracting text");
        let pages = tokio::task::spawn_blocking(move || extract_page_texts(&pdf_path))
            .await
            .map_err(|e| PaperquillError::Upstream(format!("PDF parse task failed: {e}")))??;

        let mut chunks = Vec::new();
        let mut dropped = 0usize;
        for (page, text) in &pages {
            if text.trim().is_empty() {
                continue;
            }
            for content in split_windows(text, self.window, self.overlap) {
                if self.ignore_references && contains_arxiv_reference(&content) {
                    dropped += 1;
                    continue;
                }
                chunks.push(Chunk::new(content, paper.title.as_str()).with_page(*page));
            }
        }

        info!(
            title = %paper.title,
            n_chunks = chunks.len(),
            dropped_references = dropped,
            "paper content chunked"
        );
        Ok(chunks)
    }
}

/// Chunks the abstract only; no download, no pagination, no filtering.
#[derive(Debug, Clone)]
pub struct SummaryStrategy {
    window: usize,
}

impl SummaryStrategy {
    pub fn new() -> Self {
        Self { window: 2000 }
    }

    pub fn from_config(cfg: &IngestionConfig) -> Self {
        Self {
            window: cfg.summary_chunk_size,
        }
    }

    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }
}

impl Default for SummaryStrategy {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChunkStrategy for SummaryStrategy {
    async fn chunk(&self, paper: &Paper) -> Result<Vec<Chunk>> {
        let chunks: Vec<Chunk> = split_windows(&paper.summary, self.window, 0)
            .into_iter()
            .map(|content| Chunk::new(content, paper.title.as_str()))
            .collect();

        debug!(title = %paper.title, n_chunks = chunks.len(), "abstract chunked");
        Ok(chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::write_test_pdf;

    fn window_count(len: usize, window: usize, overlap: usize) -> usize {
        if len > overlap {
            (len - overlap).div_ceil(window - overlap)
        } else {
            1
        }
    }

    #[test]
    fn window_count_matches_closed_form() {
        let cases = [
            (0usize, 500usize, 50usize),
            (1, 500, 50),
            (50, 500, 50),
            (499, 500, 50),
            (500, 500, 50),
            (501, 500, 50),
            (1350, 500, 50),
            (2000, 2000, 0),
            (2001, 2000, 0),
            (4500, 2000, 0),
        ];
        for (len, window, overlap) in cases {
            let text: String = "x".repeat(len);
            let chunks = split_windows(&text, window, overlap);
            assert_eq!(
                chunks.len(),
                window_count(len, window, overlap),
                "len={len} window={window} overlap={overlap}"
            );
        }
    }

    #[test]
    fn windows_reconstruct_the_original_text() {
        let text: String = (0..1237).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let (window, overlap) = (100, 17);
        let chunks = split_windows(&text, window, overlap);

        let stride = window - overlap;
        let mut rebuilt = String::new();
        for chunk in &chunks[..chunks.len() - 1] {
            rebuilt.extend(chunk.chars().take(stride));
        }
        rebuilt.push_str(chunks.last().unwrap());
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn consecutive_windows_share_the_overlap() {
        let text = "abcdefghij";
        let chunks = split_windows(text, 4, 2);
        assert_eq!(chunks, vec!["abcd", "cdef", "efgh", "ghij"]);
    }

    #[test]
    fn empty_text_yields_one_empty_chunk() {
        assert_eq!(split_windows("", 500, 50), vec![String::new()]);
    }

    #[test]
    fn windowing_is_character_based_not_byte_based() {
        // Multibyte characters must not be split mid-codepoint.
        let text = "αβγδε".repeat(30);
        let chunks = split_windows(&text, 40, 10);
        let total: usize = text.chars().count();
        assert_eq!(chunks.len(), window_count(total, 40, 10));
        assert!(chunks.iter().all(|c| c.chars().count() <= 40));
    }

    #[test]
    fn reference_filter_matches_arxiv_identifiers() {
        assert!(contains_arxiv_reference(
            "[3] X. Li et al. Sparks of LLMs. arXiv:2309.00240, 2023."
        ));
        assert!(contains_arxiv_reference("arXiv:2309.0024"));
    }

    #[test]
    fn reference_filter_rejects_malformed_identifiers() {
        assert!(!contains_arxiv_reference("arXiv:23.456"));
        assert!(!contains_arxiv_reference("arXiv:230900240"));
        assert!(!contains_arxiv_reference("an ordinary sentence about arXiv"));
    }

    fn paper_with_url(url: &str, summary: &str) -> Paper {
        Paper::new(
            "Windowed Retrieval",
            summary,
            url,
            vec!["A. Author".to_string()],
            None,
        )
    }

    #[tokio::test]
    async fn summary_strategy_tags_source_without_pages() {
        let paper = paper_with_url("https://example.org/p.pdf", &"s".repeat(4500));
        let chunks = SummaryStrategy::new().chunk(&paper).await.unwrap();

        assert_eq!(chunks.len(), 3); // 2000 + 2000 + 500, no overlap
        for chunk in &chunks {
            assert_eq!(chunk.metadata.source, "Windowed Retrieval");
            assert_eq!(chunk.metadata.page, None);
        }
    }

    #[tokio::test]
    async fn full_content_strategy_chunks_pages_and_filters_references() {
        let dir = tempfile::tempdir().unwrap();
        let paper = paper_with_url("https://example.org/windowed.pdf", "");

        // Pre-seed the download target so no network request happens.
        write_test_pdf(
            &dir.path().join("windowed.pdf"),
            &[
                "Transformers dominate sequence modeling benchmarks today",
                "References 1. Attention Is All You Need arXiv:1706.03762 2017",
            ],
        );

        let strategy = FullContentStrategy::new(dir.path());
        let chunks = strategy.chunk(&paper).await.unwrap();

        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert_eq!(chunk.metadata.source, "Windowed Retrieval");
            assert!(chunk.metadata.page.is_some());
            assert!(!contains_arxiv_reference(&chunk.content));
        }
        // Page 2 was entirely bibliography, so only page 1 survives.
        assert!(chunks.iter().all(|c| c.metadata.page == Some(1)));
    }

    #[tokio::test]
    async fn full_content_strategy_keeps_references_when_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let paper = paper_with_url("https://example.org/unfiltered.pdf", "");
        write_test_pdf(
            &dir.path().join("unfiltered.pdf"),
            &["Cited as arXiv:2309.00240 in later work"],
        );

        let strategy = FullContentStrategy::new(dir.path()).with_reference_filter(false);
        let chunks = strategy.chunk(&paper).await.unwrap();
        assert!(chunks.iter().any(|c| contains_arxiv_reference(&c.content)));
    }
}
