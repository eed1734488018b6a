//! Fixed-persona agent over a chat backend.
//!
//! An agent is a system prompt plus a backend handle; `ask` is one
//! request/response round trip with no conversation state.

use std::sync::Arc;
use tracing::debug;

use crate::backend::{LlmBackend, LlmError, LlmRequest, Message};

/// Persona used for answering and summarizing paper content.
const RESEARCHER_ROLE: &str =
    "You are a professional researcher with a PhD whose expertise is reading and \
     summarizing scientific papers. When you are given a query together with paper \
     contents as context, you always return a detailed answer grounded in that context.";

pub struct Agent {
    role: String,
    backend: Arc<dyn LlmBackend>,
}

impl Agent {
    pub fn new(backend: Arc<dyn LlmBackend>, role: impl Into<String>) -> Self {
        Self { role: role.into(), backend }
    }

    /// The researcher persona used by the chat orchestrator.
    pub fn researcher(backend: Arc<dyn LlmBackend>) -> Self {
        Self::new(backend, RESEARCHER_ROLE)
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    /// One request/response exchange. Transport and API failures propagate.
    pub async fn ask(&self, user_query: &str) -> Result<String, LlmError> {
        debug!(model = self.backend.model_id(), n_chars = user_query.len(), "sending request");
        let req = LlmRequest {
            messages: vec![Message::system(&self.role), Message::user(user_query)],
            model: None,
            max_tokens: None,
            temperature: None,
        };
        let resp = self.backend.complete(req).await?;
        debug!(n_chars = resp.content.len(), "response received");
        Ok(resp.content)
    }
}
