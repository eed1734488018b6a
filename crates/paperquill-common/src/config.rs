//! Configuration loading for Paperquill.
//! Reads paperquill.toml from the current directory or the path in the
//! PAPERQUILL_CONFIG env var. API keys are never stored in the file; each
//! section names the environment variable that holds its key.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{PaperquillError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub ingestion: IngestionConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "openai" | "openai_compatible" | "ollama"
    #[serde(default = "default_llm_backend")]
    pub backend: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    /// Required for the compat/ollama backends.
    pub base_url: Option<String>,
    #[serde(default = "default_key_env")]
    pub api_key_env: String,
}

fn default_llm_backend() -> String { "openai".to_string() }
fn default_llm_model()   -> String { "gpt-4o-mini".to_string() }
fn default_key_env()     -> String { "OPENAI_API_KEY".to_string() }

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            backend: default_llm_backend(),
            model: default_llm_model(),
            base_url: None,
            api_key_env: default_key_env(),
        }
    }
}

impl LlmConfig {
    /// Resolve the API key from the configured environment variable.
    pub fn api_key(&self) -> Result<SecretString> {
        resolve_key(&self.api_key_env)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// "openai" | "openai_compatible" | "ollama"
    #[serde(default = "default_llm_backend")]
    pub backend: String,
    #[serde(default = "default_embed_model")]
    pub model: String,
    pub base_url: Option<String>,
    #[serde(default = "default_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_embed_model() -> String { "text-embedding-3-small".to_string() }
fn default_batch_size()  -> usize  { 32 }

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: default_llm_backend(),
            model: default_embed_model(),
            base_url: None,
            api_key_env: default_key_env(),
            batch_size: default_batch_size(),
        }
    }
}

impl EmbeddingConfig {
    pub fn api_key(&self) -> Result<SecretString> {
        resolve_key(&self.api_key_env)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionConfig {
    /// Window size (chars) for full-content chunking.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Overlap (chars) between consecutive full-content windows.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    /// Window size (chars) for abstract-only chunking (no overlap).
    #[serde(default = "default_summary_chunk_size")]
    pub summary_chunk_size: usize,
    /// Drop chunks that look like bibliography entries.
    #[serde(default = "bool_true")]
    pub ignore_references: bool,
    #[serde(default = "default_download_dir")]
    pub download_dir: String,
}

fn default_chunk_size()         -> usize  { 500 }
fn default_chunk_overlap()      -> usize  { 50 }
fn default_summary_chunk_size() -> usize  { 2000 }
fn bool_true()                  -> bool   { true }
fn default_download_dir()       -> String { "downloads".to_string() }

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            summary_chunk_size: default_summary_chunk_size(),
            ignore_references: true,
            download_dir: default_download_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Character budget for the assembled context prompt.
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,
    /// Concurrent per-chunk LLM calls during summarization.
    #[serde(default = "default_summary_concurrency")]
    pub summary_concurrency: usize,
}

fn default_max_context_chars()   -> usize { 48_000 }
fn default_summary_concurrency() -> usize { 4 }

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_context_chars: default_max_context_chars(),
            summary_concurrency: default_summary_concurrency(),
        }
    }
}

fn resolve_key(env_var: &str) -> Result<SecretString> {
    // .env is honoured so keys stay out of shell history and config files.
    dotenvy::dotenv().ok();
    std::env::var(env_var)
        .map(SecretString::from)
        .map_err(|_| PaperquillError::Config(format!("environment variable {env_var} is not set")))
}

impl Config {
    /// Load configuration from paperquill.toml.
    /// Checks PAPERQUILL_CONFIG env var first, then the current directory.
    pub fn load() -> Result<Self> {
        let path = std::env::var("PAPERQUILL_CONFIG")
            .unwrap_or_else(|_| "paperquill.toml".to_string());

        if !Path::new(&path).exists() {
            return Err(PaperquillError::Config(format!(
                "config file not found: {path}\n\
                 Copy paperquill.example.toml to paperquill.toml and edit it."
            )));
        }

        let content = std::fs::read_to_string(&path)
            .map_err(|e| PaperquillError::Config(format!("failed to read {path}: {e}")))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| PaperquillError::Config(format!("failed to parse {path}: {e}")))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg.llm.backend, "openai");
        assert_eq!(cfg.ingestion.chunk_size, 500);
        assert_eq!(cfg.ingestion.chunk_overlap, 50);
        assert_eq!(cfg.ingestion.summary_chunk_size, 2000);
        assert!(cfg.ingestion.ignore_references);
        assert_eq!(cfg.chat.summary_concurrency, 4);
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            [llm]
            backend = "ollama"
            model = "llama3:8b"
            base_url = "http://localhost:11434"

            [ingestion]
            chunk_size = 800
            "#,
        )
        .unwrap();
        assert_eq!(cfg.llm.backend, "ollama");
        assert_eq!(cfg.llm.base_url.as_deref(), Some("http://localhost:11434"));
        assert_eq!(cfg.ingestion.chunk_size, 800);
        assert_eq!(cfg.ingestion.chunk_overlap, 50);
        assert_eq!(cfg.embedding.model, "text-embedding-3-small");
    }

    #[test]
    fn missing_key_env_is_a_config_error() {
        let llm = LlmConfig {
            api_key_env: "PAPERQUILL_TEST_NO_SUCH_VAR".to_string(),
            ..Default::default()
        };
        match llm.api_key() {
            Err(PaperquillError::Config(msg)) => {
                assert!(msg.contains("PAPERQUILL_TEST_NO_SUCH_VAR"));
            }
            other => panic!("expected Config error, got {other:?}"),
        }
    }
}
