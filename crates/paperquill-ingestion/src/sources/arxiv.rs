//! arXiv API client.
//!
//! Uses the arXiv Atom query endpoint:
//!   http://export.arxiv.org/api/query?search_query=all:{q}&start=0&max_results={n}
//!
//! The feed is parsed with a quick-xml event loop; each `<entry>` becomes a
//! `Paper` with the PDF link as its URL.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::{debug, instrument, warn};

use super::PaperDiscovery;
use crate::paper::Paper;
use paperquill_common::{PaperquillError, Result};

const ARXIV_QUERY_URL: &str = "http://export.arxiv.org/api/query";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortBy {
    Relevance,
    SubmittedDate,
    LastUpdatedDate,
}

impl SortBy {
    fn as_str(&self) -> &'static str {
        match self {
            SortBy::Relevance       => "relevance",
            SortBy::SubmittedDate   => "submittedDate",
            SortBy::LastUpdatedDate => "lastUpdatedDate",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Ascending  => "ascending",
            SortOrder::Descending => "descending",
        }
    }
}

pub struct ArxivClient {
    client: reqwest::Client,
    sort_by: SortBy,
    sort_order: SortOrder,
}

impl ArxivClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .user_agent("Paperquill/0.1 (research)")
                .build()
                .expect("reqwest client with static configuration"),
            sort_by: SortBy::Relevance,
            sort_order: SortOrder::Descending,
        }
    }

    pub fn with_sort(mut self, sort_by: SortBy, sort_order: SortOrder) -> Self {
        self.sort_by = sort_by;
        self.sort_order = sort_order;
        self
    }
}

impl Default for ArxivClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaperDiscovery for ArxivClient {
    #[instrument(skip(self))]
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<Paper>> {
        let params = [
            ("search_query", format!("all:{query}")),
            ("start", "0".to_string()),
            ("max_results", max_results.to_string()),
            ("sortBy", self.sort_by.as_str().to_string()),
            ("sortOrder", self.sort_order.as_str().to_string()),
        ];

        let xml = self
            .client
            .get(ARXIV_QUERY_URL)
            .query(&params)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| PaperquillError::Upstream(format!("arXiv query failed: {e}")))?
            .text()
            .await?;

        let papers = parse_atom_feed(&xml)?;
        debug!(n = papers.len(), "arXiv search complete");
        Ok(papers)
    }
}

/// Parse an arXiv Atom feed into `Paper`s.
/// Handles the `<feed><entry>` structure; entries without a title are skipped.
fn parse_atom_feed(xml: &str) -> Result<Vec<Paper>> {
    let mut papers = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    struct EntryDraft {
        title: String,
        summary: String,
        pdf_url: Option<String>,
        abs_url: String,
        authors: Vec<String>,
        published: Option<NaiveDate>,
    }

    let mut current: Option<EntryDraft> = None;
    let mut in_title = false;
    let mut in_summary = false;
    let mut in_published = false;
    let mut in_author_name = false;
    let mut in_id = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"entry" => {
                    current = Some(EntryDraft {
                        title: String::new(),
                        summary: String::new(),
                        pdf_url: None,
                        abs_url: String::new(),
                        authors: vec![],
                        published: None,
                    });
                }
                b"title"     => in_title = current.is_some(),
                b"summary"   => in_summary = true,
                b"published" => in_published = true,
                b"name"      => in_author_name = true,
                b"id"        => in_id = current.is_some(),
                _ => {}
            },
            Ok(Event::Empty(ref e)) if e.name().as_ref() == b"link" => {
                if let Some(ref mut entry) = current {
                    let mut href = None;
                    let mut is_pdf = false;
                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"href" => {
                                href = attr.unescape_value().ok().map(|v| v.to_string());
                            }
                            b"type" if attr.value.as_ref() == b"application/pdf" => {
                                is_pdf = true;
                            }
                            _ => {}
                        }
                    }
                    if is_pdf {
                        // The API's PDF links omit the extension.
                        entry.pdf_url = href.map(|h| format!("{h}.pdf"));
                    }
                }
            }
            Ok(Event::Text(ref e)) => {
                let text = e.unescape().unwrap_or_default().to_string();
                if let Some(ref mut entry) = current {
                    if in_title     { entry.title.push_str(&text); }
                    if in_summary   { entry.summary.push_str(&text); }
                    if in_id        { entry.abs_url.push_str(&text); }
                    if in_author_name { entry.authors.push(text.clone()); }
                    if in_published {
                        entry.published = DateTime::parse_from_rfc3339(&text)
                            .ok()
                            .map(|dt| dt.date_naive());
                    }
                }
            }
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"title"     => in_title = false,
                b"summary"   => in_summary = false,
                b"published" => in_published = false,
                b"name"      => in_author_name = false,
                b"id"        => in_id = false,
                b"entry" => {
                    if let Some(entry) = current.take() {
                        if entry.title.is_empty() {
                            warn!("skipping arXiv entry with empty title");
                        } else {
                            let url = entry.pdf_url.unwrap_or(entry.abs_url);
                            papers.push(Paper::new(
                                &entry.title,
                                entry.summary,
                                url,
                                entry.authors,
                                entry.published,
                            ));
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                warn!("Atom parse error: {}", e);
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(papers)
}
