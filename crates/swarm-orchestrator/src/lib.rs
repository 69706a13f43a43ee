//! Agent execution engine for mcp-swarm.
//!
//! Discovers agents, drains them through a bounded-concurrency queue with
//! per-agent timeouts, merges their results into a shared state and streams
//! progress events to an observer.
//!
//! # Main types
//!
//! - [`Pipeline`]: Drives a run: collaborators, discovery, queue, events.
//! - [`AgentQueue`]: Batched scheduler with timeouts and progress sampling.
//! - [`AgentRegistry`]: Ordered agent set from built-ins, code, or manifests.
//! - [`ExecutionStore`]: In-memory execution records, one running at a time.
//! - [`ProgressObserver`]: Receiver of dashboard events.

/// The agent trait and invocation context.
pub mod agent;
/// Pipeline driver.
pub mod engine;
/// MCP server list kept in the sandbox.
pub mod mcp;
/// Execution record store.
pub mod monitor;
/// Built-in agent definitions.
pub mod profiles;
/// Progress events and observers.
pub mod progress;
/// Data-driven prompt agents.
pub mod prompt_agent;
/// Agent discovery and registration.
pub mod registry;
/// Filesystem sandbox exposed to agents.
pub mod sandbox;
/// Batched agent queue.
pub mod task_queue;
/// Shared state and execution record types.
pub mod types;

pub use agent::{Agent, AgentContext};
pub use engine::{AgentSource, Pipeline, PipelineConfig};
pub use mcp::McpServer;
pub use monitor::ExecutionStore;
pub use profiles::builtin_specs;
pub use progress::{
    BroadcastObserver, FanoutObserver, NoopObserver, ProgressEvent, ProgressObserver,
    RecordingObserver, TracingObserver,
};
pub use prompt_agent::{OutputFormat, PromptAgent, PromptAgentSpec};
pub use registry::{AgentRegistry, Discovery};
pub use sandbox::{Explorer, FsExplorer};
pub use task_queue::{AgentQueue, DrainReport, QueueConfig, QueueEntry};
pub use types::{
    AgentOutput, AgentResults, AgentSlot, AgentStatus, ExecutionRecord, RunStatus, SharedState,
};
