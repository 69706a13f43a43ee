use super::mock::MockModel;
use super::preview;
use crate::config::ModelConfig;
use crate::llm::{estimate_tokens, ModelGateway, ModelReply, Usage};
use async_trait::async_trait;
use std::time::Duration;
use swarm_core::{ChatMessage, SwarmError, SwarmResult};
use tracing::{error, info, warn};

const NO_RESPONSE: &str = "No response generated";

/// LM Studio backend.
///
/// Talks to the OpenAI-compatible `/chat/completions` endpoint of a local
/// LM Studio server. When `fallback_to_mock` is set, transport and API
/// failures are answered by [`MockModel`] instead of surfacing as errors.
pub struct LmStudioModel {
    config: ModelConfig,
    http: reqwest::Client,
    fallback: Option<MockModel>,
}

impl LmStudioModel {
    /// Create a backend for the given configuration.
    pub fn new(config: ModelConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        let fallback = config.fallback_to_mock.then(MockModel::new);
        Self {
            config,
            http,
            fallback,
        }
    }

    fn build_body(&self, messages: &[ChatMessage]) -> serde_json::Value {
        serde_json::json!({
            "model": self.config.model_id,
            "messages": messages,
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
            "stream": false,
        })
    }

    async fn request(&self, messages: &[ChatMessage]) -> SwarmResult<ModelReply> {
        let url = format!("{}/chat/completions", self.config.base_url());

        let mut request = self
            .http
            .post(&url)
            .header("Content-Type", "application/json");
        if let Some(key) = &self.config.api_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }

        let resp = request
            .json(&self.build_body(messages))
            .send()
            .await
            .map_err(|e| SwarmError::Http(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(SwarmError::Http(format!(
                "LM Studio API error {status}: {body}"
            )));
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| SwarmError::Http(e.to_string()))?;
        Ok(parse_chat_completion(&body))
    }
}

#[async_trait]
impl ModelGateway for LmStudioModel {
    fn name(&self) -> &str {
        "lm_studio"
    }

    async fn invoke(
        &self,
        messages: &[ChatMessage],
        agent_label: Option<&str>,
    ) -> SwarmResult<ModelReply> {
        let agent = agent_label.unwrap_or("agent");
        let prompt = messages.last().map(|m| m.content.as_str()).unwrap_or_default();
        info!(agent, prompt = preview(prompt, 100), "LM Studio processing");

        match self.request(messages).await {
            Ok(reply) => {
                info!(
                    agent,
                    chars = reply.content.len(),
                    preview = preview(&reply.content, 100),
                    "LM Studio response"
                );
                Ok(reply)
            }
            Err(e) => match &self.fallback {
                Some(mock) => {
                    warn!(agent, error = %e, "LM Studio failed, falling back to mock response");
                    mock.invoke(messages, agent_label).await
                }
                None => {
                    error!(agent, error = %e, "LM Studio failed");
                    Err(e)
                }
            },
        }
    }
}

/// Extract the reply text and token usage from a chat completion body.
///
/// Missing content becomes a placeholder; missing usage is estimated from
/// the content length.
pub fn parse_chat_completion(body: &serde_json::Value) -> ModelReply {
    let content = body["choices"][0]["message"]["content"]
        .as_str()
        .filter(|c| !c.is_empty())
        .unwrap_or(NO_RESPONSE)
        .to_string();
    let tokens = body["usage"]["total_tokens"]
        .as_u64()
        .filter(|t| *t > 0)
        .unwrap_or_else(|| estimate_tokens(&content));
    ModelReply {
        content,
        usage: Usage { tokens },
    }
}
