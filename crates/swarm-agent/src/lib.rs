//! Model gateway for mcp-swarm.
//!
//! Agents talk to a language model through the [`ModelGateway`] trait. Two
//! backends ship with the crate: a deterministic [`MockModel`] and an
//! OpenAI-compatible [`LmStudioModel`] that falls back to the mock when the
//! local server cannot be reached.

/// Backend implementations.
pub mod backends;
/// Model selection and connection settings.
pub mod config;
/// The gateway trait and its reply types.
pub mod llm;

pub use backends::lm_studio::LmStudioModel;
pub use backends::mock::MockModel;
pub use config::{ModelConfig, ModelProvider};
pub use llm::{create_model, ModelGateway, ModelReply, Usage};
