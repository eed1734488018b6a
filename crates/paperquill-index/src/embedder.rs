//! Embedding client — calls the configured embedding backend to produce
//! vectors for chunk texts.
//!
//! Backends:
//!   OpenAi           — text-embedding-3-small / text-embedding-3-large
//!   OpenAiCompatible — any /v1/embeddings endpoint (LMStudio, vLLM, Groq, …)
//!   Ollama           — /api/embeddings, one request per text

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, instrument};

use paperquill_common::config::EmbeddingConfig;
use paperquill_common::{PaperquillError, Result};

use crate::Embedder;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingBackend {
    OpenAi,
    OpenAiCompatible,
    Ollama,
}

impl EmbeddingBackend {
    fn from_name(name: &str) -> Result<Self> {
        match name {
            "openai"            => Ok(EmbeddingBackend::OpenAi),
            "openai_compatible" => Ok(EmbeddingBackend::OpenAiCompatible),
            "ollama"            => Ok(EmbeddingBackend::Ollama),
            other => Err(PaperquillError::Config(format!(
                "unknown embedding backend \"{other}\""
            ))),
        }
    }
}

pub struct EmbeddingClient {
    backend: EmbeddingBackend,
    model: String,
    base_url: Option<String>,
    api_key: Option<SecretString>,
    batch_size: usize,
    client: reqwest::Client,
}

impl EmbeddingClient {
    /// Build a client from configuration. The API key is resolved from the
    /// configured environment variable; local backends don't need one.
    pub fn from_config(cfg: &EmbeddingConfig) -> Result<Self> {
        let backend = EmbeddingBackend::from_name(&cfg.backend)?;
        let api_key = match backend {
            EmbeddingBackend::OpenAi => Some(cfg.api_key()?),
            _ => cfg.api_key().ok(),
        };
        Ok(Self {
            backend,
            model: cfg.model.clone(),
            base_url: cfg.base_url.clone(),
            api_key,
            batch_size: cfg.batch_size.max(1),
            client: reqwest::Client::new(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn embed_openai(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let key = self
            .api_key
            .as_ref()
            .ok_or_else(|| PaperquillError::Config("OpenAI embedding needs an API key".into()))?;
        let body = serde_json::json!({
            "model": &self.model,
            "input": texts,
        });
        let resp: serde_json::Value = self
            .client
            .post("https://api.openai.com/v1/embeddings")
            .bearer_auth(key.expose_secret())
            .json(&body)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| PaperquillError::Upstream(format!("embedding request failed: {e}")))?
            .json()
            .await?;
        parse_openai_embeddings(&resp, texts.len())
    }

    async fn embed_compat(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let base = self
            .base_url
            .as_deref()
            .unwrap_or("http://localhost:11434")
            .trim_end_matches('/');
        let url = format!("{base}/v1/embeddings");
        let body = serde_json::json!({
            "model": &self.model,
            "input": texts,
        });
        let mut req = self.client.post(&url).json(&body);
        if let Some(ref key) = self.api_key {
            req = req.bearer_auth(key.expose_secret());
        }
        let resp: serde_json::Value = req
            .send()
            .await?
            .error_for_status()
            .map_err(|e| PaperquillError::Upstream(format!("embedding request failed: {e}")))?
            .json()
            .await?;
        parse_openai_embeddings(&resp, texts.len())
    }

    async fn embed_ollama(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let base = self
            .base_url
            .as_deref()
            .unwrap_or("http://localhost:11434")
            .trim_end_matches('/');
        let url = format!("{base}/api/embeddings");
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            let body = serde_json::json!({"model": &self.model, "prompt": text});
            let resp: serde_json::Value = self
                .client
                .post(&url)
                .json(&body)
                .send()
                .await?
                .error_for_status()
                .map_err(|e| PaperquillError::Upstream(format!("embedding request failed: {e}")))?
                .json()
                .await?;
            let vec: Vec<f32> = serde_json::from_value(resp["embedding"].clone())?;
            out.push(vec);
        }
        Ok(out)
    }
}

#[async_trait]
impl Embedder for EmbeddingClient {
    #[instrument(skip(self, texts), fields(n = texts.len(), backend = ?self.backend))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let vecs = match self.backend {
                EmbeddingBackend::OpenAi           => self.embed_openai(batch).await?,
                EmbeddingBackend::OpenAiCompatible => self.embed_compat(batch).await?,
                EmbeddingBackend::Ollama           => self.embed_ollama(batch).await?,
            };
            out.extend(vecs);
        }
        debug!(n = out.len(), "texts embedded");
        Ok(out)
    }
}

fn parse_openai_embeddings(resp: &serde_json::Value, expected: usize) -> Result<Vec<Vec<f32>>> {
    let data = resp["data"]
        .as_array()
        .ok_or_else(|| PaperquillError::Upstream("embedding response has no data array".into()))?;
    let vecs: Vec<Vec<f32>> = data
        .iter()
        .map(|item| serde_json::from_value(item["embedding"].clone()).unwrap_or_default())
        .collect();
    if vecs.len() != expected {
        return Err(PaperquillError::Upstream(format!(
            "embedding count mismatch: asked for {expected}, got {}",
            vecs.len()
        )));
    }
    Ok(vecs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_names_resolve() {
        assert_eq!(
            EmbeddingBackend::from_name("openai").unwrap(),
            EmbeddingBackend::OpenAi
        );
        assert_eq!(
            EmbeddingBackend::from_name("ollama").unwrap(),
            EmbeddingBackend::Ollama
        );
        assert!(matches!(
            EmbeddingBackend::from_name("chroma"),
            Err(PaperquillError::Config(_))
        ));
    }

    #[test]
    fn parse_openai_embeddings_shape() {
        let resp = serde_json::json!({
            "data": [
                {"embedding": [0.1, 0.2]},
                {"embedding": [0.3, 0.4]},
            ]
        });
        let vecs = parse_openai_embeddings(&resp, 2).unwrap();
        assert_eq!(vecs, vec![vec![0.1, 0.2], vec![0.3, 0.4]]);
    }

    #[test]
    fn parse_openai_embeddings_count_mismatch() {
        let resp = serde_json::json!({"data": [{"embedding": [0.1]}]});
        assert!(matches!(
            parse_openai_embeddings(&resp, 2),
            Err(PaperquillError::Upstream(_))
        ));
    }
}
