//! LLM backend trait and concrete implementations.
//!
//! Backends:
//!   OpenAiBackend           — OpenAI chat completions API
//!   OpenAiCompatibleBackend — any OpenAI-compatible endpoint (LMStudio,
//!                             TogetherAI, Groq, OpenRouter, vLLM, …)
//!   OllamaBackend           — local Ollama (OpenAI-compatible chat route)
//!
//! Failures are typed and propagate; there is no retry and no silent
//! fallback between backends.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use paperquill_common::config::LlmConfig;
use paperquill_common::{PaperquillError, Result};

// ── Error ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("API error [{status}]: {message}")]
    ApiError { status: u16, message: String },
}

impl From<LlmError> for PaperquillError {
    fn from(e: LlmError) -> Self {
        PaperquillError::Upstream(e.to_string())
    }
}

// ── Request / Response ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String, // "system" | "user" | "assistant"
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    pub messages: Vec<Message>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub content: String,
    pub model: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

// ── Trait ─────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait LlmBackend: Send + Sync {
    async fn complete(&self, req: LlmRequest) -> std::result::Result<LlmResponse, LlmError>;
    fn model_id(&self) -> &str;
    fn is_local(&self) -> bool;
    fn max_context_tokens(&self) -> usize;
    fn max_output_tokens(&self) -> usize;
}

/// Build the backend selected by `[llm]` configuration.
pub fn backend_from_config(cfg: &LlmConfig) -> Result<Arc<dyn LlmBackend>> {
    match cfg.backend.as_str() {
        "openai" => Ok(Arc::new(OpenAiBackend::new(cfg.api_key()?, &cfg.model))),
        "openai_compatible" => {
            let base_url = cfg.base_url.clone().ok_or_else(|| {
                PaperquillError::Config("openai_compatible backend needs base_url".into())
            })?;
            Ok(Arc::new(OpenAiCompatibleBackend::new(
                base_url,
                &cfg.model,
                cfg.api_key().ok(),
            )))
        }
        "ollama" => {
            let base_url = cfg
                .base_url
                .clone()
                .unwrap_or_else(|| "http://localhost:11434".to_string());
            Ok(Arc::new(OllamaBackend::new(base_url, &cfg.model)))
        }
        other => Err(PaperquillError::Config(format!(
            "unknown llm backend \"{other}\""
        ))),
    }
}

// ── Helpers: OpenAI-style responses ──────────────────────────────────────────

fn parse_openai_response(json: &serde_json::Value, fallback_model: &str) -> LlmResponse {
    LlmResponse {
        content: json["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or("")
            .to_string(),
        model: json["model"]
            .as_str()
            .unwrap_or(fallback_model)
            .to_string(),
        prompt_tokens:     json["usage"]["prompt_tokens"].as_u64().unwrap_or(0) as u32,
        completion_tokens: json["usage"]["completion_tokens"].as_u64().unwrap_or(0) as u32,
    }
}

async fn check_response_status(
    resp: reqwest::Response,
) -> std::result::Result<serde_json::Value, LlmError> {
    let status = resp.status().as_u16();
    let body: serde_json::Value = resp.json().await?;
    if status >= 400 {
        let msg = body["error"]["message"]
            .as_str()
            .or_else(|| body["message"].as_str())
            .unwrap_or("unknown API error")
            .to_string();
        return Err(LlmError::ApiError { status, message: msg });
    }
    Ok(body)
}

// ── 1. OpenAI ─────────────────────────────────────────────────────────────────

pub struct OpenAiBackend {
    pub model: String,
    api_key: SecretString,
    client: reqwest::Client,
}

impl OpenAiBackend {
    pub fn new(api_key: SecretString, model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            api_key,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl LlmBackend for OpenAiBackend {
    async fn complete(&self, req: LlmRequest) -> std::result::Result<LlmResponse, LlmError> {
        let body = serde_json::json!({
            "model":       req.model.as_deref().unwrap_or(&self.model),
            "messages":    req.messages,
            "max_tokens":  req.max_tokens.unwrap_or(4096),
            "temperature": req.temperature.unwrap_or(0.1),
        });
        let resp = self.client
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await?;
        let json = check_response_status(resp).await?;
        Ok(parse_openai_response(&json, &self.model))
    }

    fn model_id(&self) -> &str { &self.model }
    fn is_local(&self) -> bool { false }
    fn max_context_tokens(&self) -> usize { 128_000 }
    fn max_output_tokens(&self) -> usize { 16_384 }
}

// ── 2. OpenAI-compatible (LMStudio, TogetherAI, Groq, OpenRouter, vLLM, …) ───

pub struct OpenAiCompatibleBackend {
    pub base_url: String,
    pub model: String,
    api_key: Option<SecretString>,
    client: reqwest::Client,
}

impl OpenAiCompatibleBackend {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<SecretString>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            api_key,
            client: reqwest::Client::new(),
        }
    }

    fn auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(k) => req.bearer_auth(k.expose_secret()),
            None    => req,
        }
    }
}

#[async_trait]
impl LlmBackend for OpenAiCompatibleBackend {
    async fn complete(&self, req: LlmRequest) -> std::result::Result<LlmResponse, LlmError> {
        let url = format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'));
        let body = serde_json::json!({
            "model":       req.model.as_deref().unwrap_or(&self.model),
            "messages":    req.messages,
            "max_tokens":  req.max_tokens.unwrap_or(4096),
            "temperature": req.temperature.unwrap_or(0.1),
        });
        let resp = self.auth(self.client.post(&url)).json(&body).send().await?;
        let json = check_response_status(resp).await?;
        Ok(parse_openai_response(&json, &self.model))
    }

    fn model_id(&self) -> &str { &self.model }
    fn is_local(&self) -> bool { false }
    fn max_context_tokens(&self) -> usize { 128_000 }
    fn max_output_tokens(&self) -> usize { 8_192 }
}

// ── 3. Ollama (local) ─────────────────────────────────────────────────────────

pub struct OllamaBackend {
    pub base_url: String,
    pub model: String,
    client: reqwest::Client,
}

impl OllamaBackend {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), model: model.into(), client: reqwest::Client::new() }
    }
}

#[async_trait]
impl LlmBackend for OllamaBackend {
    async fn complete(&self, req: LlmRequest) -> std::result::Result<LlmResponse, LlmError> {
        let url = format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'));
        let body = serde_json::json!({
            "model":       req.model.as_deref().unwrap_or(&self.model),
            "messages":    req.messages,
            "max_tokens":  req.max_tokens.unwrap_or(4096),
            "temperature": req.temperature.unwrap_or(0.1),
        });
        let resp = self.client.post(&url).json(&body).send().await?;
        let json = check_response_status(resp).await?;
        Ok(parse_openai_response(&json, &self.model))
    }

    fn model_id(&self) -> &str { &self.model }
    fn is_local(&self) -> bool { true }
    fn max_context_tokens(&self) -> usize { 32_768 }
    fn max_output_tokens(&self) -> usize { 8_192 }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
