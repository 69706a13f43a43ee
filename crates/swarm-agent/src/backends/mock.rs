use super::preview;
use crate::llm::{ModelGateway, ModelReply};
use async_trait::async_trait;
use swarm_core::{ChatMessage, SwarmResult};
use tracing::info;

/// Deterministic stand-in for a real model.
///
/// Replies depend only on the last message and the agent label, so pipelines
/// running against it are reproducible.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockModel;

impl MockModel {
    /// A mock with no state.
    pub fn new() -> Self {
        Self
    }

    /// Produce the canned reply text for a prompt.
    pub fn respond(&self, prompt: &str, agent_label: Option<&str>) -> SwarmResult<String> {
        let text = match agent_label {
            Some("market_researcher") => serde_json::to_string_pretty(&serde_json::json!({
                "competitors": ["CrewAI", "AutoGen", "LangGraph", "SmolAgents"],
                "market_size": "$2.3B AI agents market",
                "trends": ["Multi-agent systems", "MCP protocols", "GPU acceleration"],
                "opportunities": [
                    "Free tier dominance",
                    "Cursor IDE integration",
                    "Local-first architecture"
                ]
            }))?,
            Some("product_strategist") => product_strategy(prompt),
            Some("system_architect") => system_architecture(prompt),
            _ => format!(
                "Task \"{prompt}\" completed successfully. This is a mock response - in production this would use a real LLM."
            ),
        };
        Ok(text)
    }
}

#[async_trait]
impl ModelGateway for MockModel {
    fn name(&self) -> &str {
        "mock"
    }

    async fn invoke(
        &self,
        messages: &[ChatMessage],
        agent_label: Option<&str>,
    ) -> SwarmResult<ModelReply> {
        let prompt = messages.last().map(|m| m.content.as_str()).unwrap_or_default();
        info!(
            agent = agent_label.unwrap_or("unknown agent"),
            prompt = preview(prompt, 100),
            "Mock model processing"
        );

        let reply = ModelReply::estimated(self.respond(prompt, agent_label)?);
        info!(
            chars = reply.content.len(),
            tokens = reply.usage.tokens,
            "Mock model response"
        );
        Ok(reply)
    }
}

fn product_strategy(prompt: &str) -> String {
    format!(
        "## Product Strategy for \"{prompt}\"

### MVP Features
- Real-time agent collaboration
- Plugin marketplace with 50+ MCP servers
- Auto-deployment to Fly.io
- GPU acceleration via LM Studio
- Self-evolving critic/evolver agents

### Monetization Model
- **Free Tier**: Basic agent usage, limited MCP servers
- **Pro Tier**: $29/mo - Unlimited agents, full MCP access, priority support
- **Enterprise Tier**: $99/mo - Custom agents, white-label, SLA guarantees

### Target Market
- **Primary**: AI developers and researchers
- **Secondary**: DevOps teams, product managers, technical founders

### Go-to-Market Strategy
1. **Launch**: Open source release
2. **Growth**: Community-driven plugin ecosystem
3. **Scale**: Enterprise features and support"
    )
}

fn system_architecture(prompt: &str) -> String {
    format!(
        "## System Architecture for \"{prompt}\"

### Frontend Layer
- **Live UI Dashboard**: WebSocket progress feed
- **Agent Debugger**: Real-time execution monitoring

### Agent Layer
- **11 Specialized Agents**: Market research, product strategy, architecture, etc.
- **MCP Protocol**: GitHub, terminal and filesystem servers
- **Orchestration Engine**: Batched agent queue with per-agent timeouts

### Backend Layer
- **Sandbox Environment**: Persistent workspace for generated artifacts
- **Model Integration**: LM Studio with GPU acceleration

### Infrastructure
- **Fly.io Free Tier**: Global deployment with zero cost
- **File System**: Versioned outputs under the sandbox root

### Security & Performance
- **Local-First**: No API keys, runs entirely offline
- **Sandbox Isolation**: Agents only write inside the sandbox"
    )
}
