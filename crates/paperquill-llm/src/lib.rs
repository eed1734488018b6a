//! paperquill-llm — Chat-completion backend abstraction and the
//! fixed-persona research agent.

pub mod agent;
pub mod backend;

pub use agent::Agent;
pub use backend::{backend_from_config, LlmBackend, LlmError, LlmRequest, LlmResponse, Message};
