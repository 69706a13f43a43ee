use thiserror::Error;

/// A convenience `Result` alias using [`SwarmError`].
pub type SwarmResult<T> = Result<T, SwarmError>;

/// Top-level error type for mcp-swarm.
///
/// Agent-level variants ([`SwarmError::Agent`], [`SwarmError::Timeout`]) are
/// contained by the scheduler and never abort a run; the rest surface to the
/// caller of the failing operation.
#[derive(Error, Debug)]
pub enum SwarmError {
    /// An agent's `run` failed.
    #[error("Agent error: {0}")]
    Agent(String),

    /// An agent did not settle before its deadline.
    #[error("Agent {agent} timeout after {secs}s")]
    Timeout {
        /// Name of the agent that timed out.
        agent: String,
        /// The deadline, in whole seconds.
        secs: u64,
    },

    /// An agent definition could not be loaded.
    #[error("Failed to load agent {source_id}: {reason}")]
    Load {
        /// File stem or other identifier of the definition.
        source_id: String,
        /// Why loading failed.
        reason: String,
    },

    /// A run was requested while another one is still running.
    #[error("Task already running")]
    ConcurrentRun,

    /// A queue drain was requested while the same queue is already draining.
    #[error("Agent queue is already processing")]
    QueueBusy,

    /// An outbound HTTP request failed (e.g. model API call).
    #[error("HTTP error: {0}")]
    Http(String),

    /// Invalid configuration.
    #[error("Config error: {0}")]
    Config(String),

    /// A sandbox path was rejected or a sandbox operation failed.
    #[error("Sandbox error: {0}")]
    Sandbox(String),

    /// Run-level orchestration failure.
    #[error("Orchestrator error: {0}")]
    Orchestrator(String),

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SwarmError {
    /// Returns true for errors that are contained at agent granularity.
    pub fn is_agent_failure(&self) -> bool {
        matches!(self, SwarmError::Agent(_) | SwarmError::Timeout { .. })
    }
}
