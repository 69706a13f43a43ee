use crate::backends::lm_studio::LmStudioModel;
use crate::backends::mock::MockModel;
use crate::config::{ModelConfig, ModelProvider};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use swarm_core::{ChatMessage, SwarmResult};
use tracing::info;

/// Token accounting for one invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Total tokens reported by the backend, or an estimate.
    pub tokens: u64,
}

/// Text returned by a model plus its token usage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelReply {
    /// The generated text.
    pub content: String,
    /// Token usage for this invocation.
    pub usage: Usage,
}

impl ModelReply {
    /// Build a reply whose token count is estimated from the text length.
    pub fn estimated(content: impl Into<String>) -> Self {
        let content = content.into();
        let tokens = estimate_tokens(&content);
        Self {
            content,
            usage: Usage { tokens },
        }
    }
}

/// Rough token estimate: one token per four bytes, rounded up.
pub fn estimate_tokens(text: &str) -> u64 {
    text.len().div_ceil(4) as u64
}

/// Trait for model backends.
///
/// The engine treats a gateway as a black box: an ordered list of messages
/// goes in, text plus a token count comes out. Implementations must be safe
/// to share between concurrently running agents.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Short backend name used in logs.
    fn name(&self) -> &str;

    /// Run one completion. `agent_label` identifies the calling agent.
    async fn invoke(
        &self,
        messages: &[ChatMessage],
        agent_label: Option<&str>,
    ) -> SwarmResult<ModelReply>;
}

/// Build the gateway selected by `config`.
pub fn create_model(config: &ModelConfig) -> Arc<dyn ModelGateway> {
    match config.provider {
        ModelProvider::LmStudio => {
            info!(url = %config.base_url(), "Using LM Studio model");
            Arc::new(LmStudioModel::new(config.clone()))
        }
        ModelProvider::Mock => {
            info!("Using mock model (set USE_LM_STUDIO=true or LM_STUDIO_URL to use LM Studio)");
            Arc::new(MockModel::new())
        }
    }
}
