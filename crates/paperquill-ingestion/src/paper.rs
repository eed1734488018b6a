//! Paper metadata: sanitized titles, citation formats, content download.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use paperquill_common::{PaperquillError, Result};

/// How the local filename for downloaded content is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentNaming {
    /// Last path segment of the URL.
    UrlSuffix,
    /// The paper's sanitized title.
    Title,
}

/// Immutable metadata for one paper.
///
/// The title is sanitized at construction and never changes afterwards; it
/// doubles as the display key and the registry key, so it must be unique
/// within a registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paper {
    pub title: String,
    pub summary: String,
    pub url: String,
    pub authors: Vec<String>,
    pub publish_date: Option<NaiveDate>,
}

impl Paper {
    pub fn new(
        title: impl AsRef<str>,
        summary: impl Into<String>,
        url: impl Into<String>,
        authors: Vec<String>,
        publish_date: Option<NaiveDate>,
    ) -> Self {
        Self {
            title: sanitize_title(title.as_ref()),
            summary: summary.into(),
            url: url.into(),
            authors,
            publish_date,
        }
    }

    fn year(&self) -> Result<i32> {
        self.publish_date
            .map(|d| d.year())
            .ok_or(PaperquillError::MissingAttribute("publish_date"))
    }

    fn first_author(&self) -> Result<&str> {
        self.authors
            .first()
            .map(String::as_str)
            .ok_or(PaperquillError::MissingAttribute("authors"))
    }

    /// `"{authors}, {year}. {title}. {url}"`.
    pub fn arxiv_citation(&self) -> Result<String> {
        self.first_author()?;
        let year = self.year()?;
        Ok(format!(
            "{}, {}. {}. {}",
            self.authors.join(", "),
            year,
            self.title,
            self.url
        ))
    }

    /// `"{first author} et al. ({year})"`.
    pub fn apa_citation(&self) -> Result<String> {
        let first = self.first_author()?;
        let year = self.year()?;
        Ok(format!("{first} et al. ({year})"))
    }

    /// BibTeX `@misc` entry. The abstract page is cited, not the PDF.
    pub fn latex_citation(&self) -> Result<String> {
        self.first_author()?;
        let year = self.year()?;
        Ok(format!(
            "@misc{{{key},\n  title={{{title}}},\n  author={{{authors}}},\n  url={{{url}}},\n  date={{{year}}},\n}}\n",
            key = latex_citation_key(&self.title),
            title = self.title,
            authors = self.authors.join(" and "),
            url = self.url.replace("/pdf/", "/abs/"),
            year = year,
        ))
    }

    /// Download the paper's content into `folder`, creating it if needed.
    ///
    /// Idempotent: if the computed path already exists the download is
    /// skipped and the existing path returned. A failed download is a hard
    /// error; the function never returns a path that does not exist.
    pub async fn fetch_content(&self, folder: &Path, naming: ContentNaming) -> Result<PathBuf> {
        let file_name = match naming {
            ContentNaming::Title => self.title.clone(),
            ContentNaming::UrlSuffix => url_file_name(&self.url)?,
        };

        tokio::fs::create_dir_all(folder)
            .await
            .map_err(|e| PaperquillError::Fetch {
                url: self.url.clone(),
                reason: format!("cannot create {}: {e}", folder.display()),
            })?;

        let file_path = folder.join(file_name);
        if tokio::fs::try_exists(&file_path).await.unwrap_or(false) {
            debug!(path = %file_path.display(), "content already downloaded");
            return Ok(file_path);
        }

        download_url(&self.url, &file_path).await?;
        Ok(file_path)
    }
}

/// Replace filesystem-hostile characters with `_` and remove newline
/// continuations (the literal `"\n "` sequence, not all whitespace).
///
/// Idempotent; the exact rule is load-bearing for citation keys and
/// registry lookups.
pub fn sanitize_title(title: &str) -> String {
    let mut out: String = title
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c => c,
        })
        .collect();
    // Removal can expose a new `"\n "` pair, so run to fixpoint.
    while out.contains("\n ") {
        out = out.replace("\n ", "");
    }
    out
}

fn latex_citation_key(title: &str) -> String {
    title.replace(' ', "_").replace('\'', "").replace(',', "_")
}

fn url_file_name(url: &str) -> Result<String> {
    let name = match url::Url::parse(url) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .map(str::to_string),
        Err(_) => url.rsplit('/').next().map(str::to_string),
    };
    name.filter(|n| !n.is_empty())
        .ok_or_else(|| PaperquillError::Fetch {
            url: url.to_string(),
            reason: "URL has no usable file name".to_string(),
        })
}

/// Download `url` into `file_path`. One request, 60 s timeout.
async fn download_url(url: &str, file_path: &Path) -> Result<()> {
    info!(url, path = %file_path.display(), "downloading content");

    let fetch_err = |reason: String| PaperquillError::Fetch {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(60))
        .user_agent("Paperquill/0.1 (research)")
        .build()
        .map_err(|e| fetch_err(e.to_string()))?;

    let resp = client
        .get(url)
        .send()
        .await
        .map_err(|e| fetch_err(e.to_string()))?;
    if !resp.status().is_success() {
        return Err(fetch_err(format!("HTTP {}", resp.status())));
    }

    let bytes = resp.bytes().await.map_err(|e| fetch_err(e.to_string()))?;
    tokio::fs::write(file_path, &bytes)
        .await
        .map_err(|e| fetch_err(format!("write failed: {e}")))?;

    info!(path = %file_path.display(), n_bytes = bytes.len(), "content downloaded");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_paper() -> Paper {
        Paper::new(
            "Attention Is All You Need",
            "We propose the Transformer.",
            "https://arxiv.org/pdf/1706.03762",
            vec!["Ashish Vaswani".to_string(), "Noam Shazeer".to_string()],
            NaiveDate::from_ymd_opt(2017, 6, 12),
        )
    }

    #[test]
    fn sanitize_replaces_forbidden_characters() {
        let s = sanitize_title(r#"a/b\c:d*e?f"g<h>i|j"#);
        assert_eq!(s, "a_b_c_d_e_f_g_h_i_j");
        for c in ['/', '\\', ':', '*', '?', '"', '<', '>', '|'] {
            assert!(!s.contains(c));
        }
    }

    #[test]
    fn sanitize_removes_newline_continuations_only() {
        // "\n " disappears, a bare newline and ordinary spaces survive
        assert_eq!(sanitize_title("Large\n Language Models"), "LargeLanguage Models");
        assert_eq!(sanitize_title("line1\nline2"), "line1\nline2");
    }

    #[test]
    fn sanitize_is_idempotent() {
        // Includes the case where one removal pass exposes a new "\n " pair.
        for t in ["plain", "a/b:c", "x\n y", "\n\n  tricky", "nested\n \n  deep"] {
            let once = sanitize_title(t);
            assert_eq!(sanitize_title(&once), once, "not idempotent for {t:?}");
            assert!(!once.contains("\n "));
        }
    }

    #[test]
    fn arxiv_citation_format() {
        let c = test_paper().arxiv_citation().unwrap();
        assert_eq!(
            c,
            "Ashish Vaswani, Noam Shazeer, 2017. Attention Is All You Need. https://arxiv.org/pdf/1706.03762"
        );
    }

    #[test]
    fn apa_citation_format() {
        let c = test_paper().apa_citation().unwrap();
        assert_eq!(c, "Ashish Vaswani et al. (2017)");
    }

    #[test]
    fn latex_citation_uses_abs_url_and_escaped_key() {
        let c = test_paper().latex_citation().unwrap();
        assert!(c.starts_with("@misc{Attention_Is_All_You_Need,"));
        assert!(c.contains("author={Ashish Vaswani and Noam Shazeer}"));
        assert!(c.contains("url={https://arxiv.org/abs/1706.03762}"));
        assert!(c.contains("date={2017}"));
    }

    #[test]
    fn citations_require_authors_and_year() {
        let no_authors = Paper::new("t", "", "u", vec![], NaiveDate::from_ymd_opt(2020, 1, 1));
        assert!(matches!(
            no_authors.apa_citation(),
            Err(PaperquillError::MissingAttribute("authors"))
        ));

        let no_date = Paper::new("t", "", "u", vec!["A".to_string()], None);
        assert!(matches!(
            no_date.arxiv_citation(),
            Err(PaperquillError::MissingAttribute("publish_date"))
        ));
        assert!(matches!(
            no_date.latex_citation(),
            Err(PaperquillError::MissingAttribute("publish_date"))
        ));
    }

    #[test]
    fn url_file_name_takes_last_segment() {
        assert_eq!(
            url_file_name("https://arxiv.org/pdf/2309.00240.pdf").unwrap(),
            "2309.00240.pdf"
        );
        assert!(matches!(
            url_file_name("https://arxiv.org/"),
            Err(PaperquillError::Fetch { .. })
        ));
    }

    #[tokio::test]
    async fn fetch_content_is_idempotent_for_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        let paper = test_paper();

        // Pre-seed the file the paper would download to; no network happens.
        let expected = dir.path().join("1706.03762");
        tokio::fs::write(&expected, b"%PDF-1.5").await.unwrap();

        let path = paper
            .fetch_content(dir.path(), ContentNaming::UrlSuffix)
            .await
            .unwrap();
        assert_eq!(path, expected);
    }

    #[tokio::test]
    async fn fetch_content_failure_is_an_error_not_a_path() {
        let dir = tempfile::tempdir().unwrap();
        let paper = Paper::new(
            "unreachable",
            "",
            "http://127.0.0.1:9/nothing.pdf",
            vec![],
            None,
        );
        let err = paper
            .fetch_content(dir.path(), ContentNaming::UrlSuffix)
            .await
            .unwrap_err();
        assert!(matches!(err, PaperquillError::Fetch { .. }));
        assert!(!dir.path().join("nothing.pdf").exists());
    }
}
