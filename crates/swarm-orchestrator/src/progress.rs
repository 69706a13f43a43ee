//! Progress events and the observers that receive them.
//!
//! Events serialize as `{"event": "<kebab-name>", "data": {...}}` with
//! camelCase payload keys, the format the dashboard consumes over `/ws`.

use crate::types::{AgentResults, AgentStatus, RunStatus};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// An event on the progress channel, serialized as `{"event", "data"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ProgressEvent {
    /// `execution-start`
    ExecutionStart(ExecutionStart),
    /// `agent-update`
    AgentUpdate(AgentUpdate),
    /// `log`
    Log(LogEntry),
    /// `execution-update`
    ExecutionUpdate(ExecutionUpdate),
    /// `execution-complete`
    ExecutionComplete(ExecutionComplete),
    /// `execution-error`
    ExecutionError(ExecutionError),
}

impl ProgressEvent {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            ProgressEvent::ExecutionStart(_) => "execution-start",
            ProgressEvent::AgentUpdate(_) => "agent-update",
            ProgressEvent::Log(_) => "log",
            ProgressEvent::ExecutionUpdate(_) => "execution-update",
            ProgressEvent::ExecutionComplete(_) => "execution-complete",
            ProgressEvent::ExecutionError(_) => "execution-error",
        }
    }

    /// A log event not tied to an agent.
    pub fn log(level: LogLevel, kind: LogKind, message: impl Into<String>) -> Self {
        ProgressEvent::Log(LogEntry {
            level,
            message: message.into(),
            timestamp: Utc::now(),
            kind,
            agent: None,
        })
    }

    /// A log event about `agent`.
    pub fn agent_log(
        level: LogLevel,
        kind: LogKind,
        agent: &str,
        message: impl Into<String>,
    ) -> Self {
        ProgressEvent::Log(LogEntry {
            level,
            message: message.into(),
            timestamp: Utc::now(),
            kind,
            agent: Some(agent.to_string()),
        })
    }
}

/// A run was registered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionStart {
    /// Run id.
    pub run_id: Uuid,
    /// Task text.
    pub task: String,
    /// When the event was emitted.
    pub timestamp: DateTime<Utc>,
}

/// Status or progress change of one agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentUpdate {
    /// Agent name.
    pub agent: String,
    /// Current agent status.
    pub status: AgentStatus,
    /// Progress in percent.
    pub progress: u8,
    /// Estimated time left for the run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eta: Option<String>,
    /// Seconds, on completion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    /// Failure message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AgentUpdate {
    /// An update with no optional fields set.
    pub fn new(agent: &str, status: AgentStatus, progress: u8) -> Self {
        Self {
            agent: agent.to_string(),
            status,
            progress,
            eta: None,
            duration: None,
            error: None,
        }
    }
}

/// Severity of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Informational.
    Info,
    /// Something finished well.
    Success,
    /// Degraded but continuing.
    Warning,
    /// A failure.
    Error,
}

/// The `type` field of a log event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    /// Pipeline lifecycle.
    System,
    /// An agent was loaded.
    AgentLoad,
    /// An agent started.
    AgentStart,
    /// An agent finished.
    AgentComplete,
    /// An agent failed.
    AgentError,
    /// The run finished.
    Completion,
    /// A run-level or load failure.
    Error,
}

/// A dashboard log line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// Severity.
    pub level: LogLevel,
    /// Human readable text.
    pub message: String,
    /// When the event was emitted.
    pub timestamp: DateTime<Utc>,
    /// Category, serialized as `type`.
    #[serde(rename = "type")]
    pub kind: LogKind,
    /// Agent the entry is about.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
}

/// Run-level progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionUpdate {
    /// Run status.
    pub status: RunStatus,
    /// What the run is doing.
    pub current_phase: String,
    /// Overall percentage of settled agents.
    pub progress: u8,
    /// Agents that completed successfully.
    pub completed_agents: usize,
    /// Agents in the run.
    pub total_agents: usize,
    /// Up-front duration estimate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_duration: Option<String>,
    /// When the event was emitted.
    pub timestamp: DateTime<Utc>,
}

/// A run finished.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionComplete {
    /// Run id.
    pub run_id: Uuid,
    /// Final results by agent.
    pub results: AgentResults,
    /// Seconds.
    pub duration: u64,
    /// When the event was emitted.
    pub timestamp: DateTime<Utc>,
}

/// A run failed at the run level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionError {
    /// Run id.
    pub run_id: Uuid,
    /// Failure message.
    pub error: String,
    /// When the event was emitted.
    pub timestamp: DateTime<Utc>,
}

/// Receiver of progress events.
///
/// Emission is best-effort: observers must not block and must tolerate
/// having no downstream subscriber.
pub trait ProgressObserver: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {
    fn emit(&self, _event: ProgressEvent) {}
}

/// Fans events out to every subscriber of a tokio broadcast channel.
#[derive(Debug, Clone)]
pub struct BroadcastObserver {
    tx: broadcast::Sender<ProgressEvent>,
}

impl BroadcastObserver {
    /// A channel buffering `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Receive every event emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.tx.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for BroadcastObserver {
    fn default() -> Self {
        Self::new(256)
    }
}

impl ProgressObserver for BroadcastObserver {
    fn emit(&self, event: ProgressEvent) {
        // No receivers is fine.
        let _ = self.tx.send(event);
    }
}

/// Writes events to the `tracing` subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl ProgressObserver for TracingObserver {
    fn emit(&self, event: ProgressEvent) {
        match &event {
            ProgressEvent::Log(entry) => {
                let agent = entry.agent.as_deref().unwrap_or("-");
                match entry.level {
                    LogLevel::Error => error!(agent, kind = ?entry.kind, "{}", entry.message),
                    LogLevel::Warning => warn!(agent, kind = ?entry.kind, "{}", entry.message),
                    LogLevel::Info | LogLevel::Success => {
                        info!(agent, kind = ?entry.kind, "{}", entry.message);
                    }
                }
            }
            ProgressEvent::AgentUpdate(update) => debug!(
                agent = %update.agent,
                status = %update.status,
                progress = update.progress,
                "agent-update"
            ),
            ProgressEvent::ExecutionError(e) => error!(run_id = %e.run_id, error = %e.error, "execution-error"),
            other => info!(event = other.name(), "Progress event"),
        }
    }
}

/// Forwards each event to several observers in order.
#[derive(Clone, Default)]
pub struct FanoutObserver {
    observers: Vec<Arc<dyn ProgressObserver>>,
}

impl FanoutObserver {
    /// An empty instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Also forward to `observer`.
    pub fn with(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observers.push(observer);
        self
    }
}

impl ProgressObserver for FanoutObserver {
    fn emit(&self, event: ProgressEvent) {
        if let Some((last, rest)) = self.observers.split_last() {
            for observer in rest {
                observer.emit(event.clone());
            }
            last.emit(event);
        }
    }
}

/// Keeps every event in memory, for inspection after a run.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingObserver {
    /// An empty instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Events recorded so far, in order.
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().clone()
    }

    /// Names of the recorded events, in emission order.
    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(ProgressEvent::name).collect()
    }

    /// All `agent-update` payloads.
    pub fn agent_updates(&self) -> Vec<AgentUpdate> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                ProgressEvent::AgentUpdate(u) => Some(u.clone()),
                _ => None,
            })
            .collect()
    }
}

impl ProgressObserver for RecordingObserver {
    fn emit(&self, event: ProgressEvent) {
        self.events.lock().push(event);
    }
}
