use crate::sandbox::Explorer;
use crate::types::{AgentOutput, SharedState};
use async_trait::async_trait;
use std::sync::Arc;
use swarm_agent::ModelGateway;
use swarm_core::SwarmResult;

/// Description used for agents that do not provide one.
pub const DEFAULT_DESCRIPTION: &str = "Processing task";

/// Collaborators handed to an agent invocation.
#[derive(Clone)]
pub struct AgentContext {
    /// Sandbox for artifacts.
    pub explorer: Arc<dyn Explorer>,
    /// Model the agent may invoke.
    pub model: Arc<dyn ModelGateway>,
}

impl AgentContext {
    /// Context sharing the collaborators of `state`.
    pub fn from_state(state: &SharedState) -> Self {
        Self {
            explorer: state.explorer.clone(),
            model: state.model.clone(),
        }
    }
}

/// A named unit of work with one async entry point.
///
/// `run` receives a read-only view of the pipeline state and returns the
/// partial results to merge. Returning `Err` marks the agent as failed
/// without affecting its siblings.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Unique identifier within a registry.
    fn name(&self) -> &str;

    /// Human label shown on the dashboard.
    fn description(&self) -> &str {
        DEFAULT_DESCRIPTION
    }

    async fn run(&self, state: &SharedState, ctx: &AgentContext) -> SwarmResult<AgentOutput>;
}
