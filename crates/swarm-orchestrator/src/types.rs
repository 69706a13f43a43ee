use crate::sandbox::Explorer;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use swarm_agent::ModelGateway;
use uuid::Uuid;

/// Agent name → produced text.
pub type AgentResults = BTreeMap<String, String>;

/// Phase of a run before any agent has completed.
pub const INITIAL_PHASE: &str = "start";

/// Lifecycle of one agent within a run: `idle → running → {completed | error}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    /// Not started.
    #[default]
    Idle,
    /// In progress.
    Running,
    /// Finished successfully.
    Completed,
    /// Failed or timed out.
    Error,
}

impl AgentStatus {
    /// `true` for `completed` and `error`.
    pub fn is_terminal(self) -> bool {
        matches!(self, AgentStatus::Completed | AgentStatus::Error)
    }

    /// Whether moving from `self` to `next` is a legal step.
    pub fn can_transition_to(self, next: AgentStatus) -> bool {
        matches!(
            (self, next),
            (AgentStatus::Idle, AgentStatus::Running)
                | (AgentStatus::Running, AgentStatus::Completed)
                | (AgentStatus::Running, AgentStatus::Error)
        )
    }
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentStatus::Idle => write!(f, "idle"),
            AgentStatus::Running => write!(f, "running"),
            AgentStatus::Completed => write!(f, "completed"),
            AgentStatus::Error => write!(f, "error"),
        }
    }
}

/// Status of a whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// No run yet.
    #[default]
    Idle,
    /// A run is in progress.
    Running,
    /// The last run finished.
    Completed,
    /// The last run failed at the run level.
    Error,
}

/// Dashboard view of one agent in the current run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSlot {
    /// Agent name.
    pub name: String,
    /// Current status.
    pub status: AgentStatus,
    /// Percentage in `0..=100`.
    pub progress: u8,
    /// What the agent is doing.
    pub description: String,
    /// Failure message, once failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Wall-clock seconds, set once the agent completes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
}

impl AgentSlot {
    /// An idle slot.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: AgentStatus::Idle,
            progress: 0,
            description: description.into(),
            error: None,
            duration: None,
        }
    }

    /// Move to `running` with progress 10. Returns `false` if the slot has
    /// already left `idle`.
    pub fn start(&mut self) -> bool {
        if !self.status.can_transition_to(AgentStatus::Running) {
            return false;
        }
        self.status = AgentStatus::Running;
        self.progress = 10;
        true
    }

    /// Record a progress sample. Ignored unless the slot is `running`.
    pub fn set_progress(&mut self, progress: u8) -> bool {
        if self.status != AgentStatus::Running {
            return false;
        }
        self.progress = progress.min(100);
        true
    }

    /// Move to `completed` with progress 100.
    pub fn complete(&mut self, duration_secs: u64) -> bool {
        if !self.status.can_transition_to(AgentStatus::Completed) {
            return false;
        }
        self.status = AgentStatus::Completed;
        self.progress = 100;
        self.duration = Some(duration_secs);
        true
    }

    /// Move to `error` with progress 0.
    pub fn fail(&mut self, message: impl Into<String>) -> bool {
        if !self.status.can_transition_to(AgentStatus::Error) {
            return false;
        }
        self.status = AgentStatus::Error;
        self.progress = 0;
        self.error = Some(message.into());
        true
    }
}

/// The dashboard-facing record of a run, served by `GET /status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRecord {
    /// Run id; absent before any run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    /// Task text.
    pub task: String,
    /// Run status.
    pub status: RunStatus,
    /// One slot per discovered agent, in discovery order.
    pub agents: Vec<AgentSlot>,
    /// Results by agent name.
    pub results: AgentResults,
    /// When the run began.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// When the run settled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Failure message, once failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionRecord {
    /// The record reported before any run has started.
    pub fn idle() -> Self {
        Self {
            id: None,
            task: String::new(),
            status: RunStatus::Idle,
            agents: Vec::new(),
            results: AgentResults::new(),
            started_at: None,
            finished_at: None,
            error: None,
        }
    }

    /// A freshly started run with no agents discovered yet.
    pub fn running(id: Uuid, task: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            task: task.into(),
            status: RunStatus::Running,
            started_at: Some(Utc::now()),
            ..Self::idle()
        }
    }

    /// True while the run is running.
    pub fn is_running(&self) -> bool {
        self.status == RunStatus::Running
    }
}

impl Default for ExecutionRecord {
    fn default() -> Self {
        Self::idle()
    }
}

/// The partial result returned by one agent invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentOutput {
    /// Results by agent name.
    pub results: AgentResults,
}

impl AgentOutput {
    /// An output carrying a single `name → content` entry.
    pub fn single(name: impl Into<String>, content: impl Into<String>) -> Self {
        let mut results = AgentResults::new();
        results.insert(name.into(), content.into());
        Self { results }
    }
}

/// State threaded through a pipeline run.
///
/// Agents only ever see an immutable snapshot; the queue is the single
/// writer of `phase` and `results`.
#[derive(Clone)]
pub struct SharedState {
    /// Task text.
    pub task: String,
    /// Name of the most recently completed agent.
    pub phase: String,
    /// Results by agent name.
    pub results: AgentResults,
    /// Sandbox agents write to.
    pub explorer: Arc<dyn Explorer>,
    /// Model agents invoke.
    pub model: Arc<dyn ModelGateway>,
}

impl SharedState {
    /// Initial state for `task`, in the start phase.
    pub fn new(
        task: impl Into<String>,
        explorer: Arc<dyn Explorer>,
        model: Arc<dyn ModelGateway>,
    ) -> Self {
        Self {
            task: task.into(),
            phase: INITIAL_PHASE.to_string(),
            results: AgentResults::new(),
            explorer,
            model,
        }
    }

    /// Shallow-merge an agent's output and advance the phase to `agent`.
    pub fn merge(&mut self, agent: &str, output: AgentOutput) {
        self.results.extend(output.results);
        self.phase = agent.to_string();
    }
}

impl std::fmt::Debug for SharedState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedState")
            .field("task", &self.task)
            .field("phase", &self.phase)
            .field("results", &self.results.keys().collect::<Vec<_>>())
            .field("model", &self.model.name())
            .finish_non_exhaustive()
    }
}
