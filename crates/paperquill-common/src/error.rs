use thiserror::Error;

#[derive(Debug, Error)]
pub enum PaperquillError {
    /// A citation was requested from a paper that lacks the needed metadata.
    #[error("missing attribute `{0}` required for citation")]
    MissingAttribute(&'static str),

    #[error("a paper titled \"{0}\" is already registered")]
    DuplicateTitle(String),

    #[error("no paper titled \"{0}\"")]
    NotFound(String),

    #[error("no sources found")]
    NoSources,

    #[error("content fetch failed for {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// Embedding index or LLM transport failure.
    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("PDF parse error: {0}")]
    Pdf(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, PaperquillError>;
