use crate::mcp;
use crate::monitor::ExecutionStore;
use crate::progress::{
    ExecutionComplete, ExecutionError, ExecutionStart, ExecutionUpdate, LogKind, LogLevel,
    NoopObserver, ProgressEvent, ProgressObserver,
};
use crate::registry::{AgentRegistry, Discovery};
use crate::sandbox::{Explorer, FsExplorer};
use crate::task_queue::{AgentQueue, DrainReport, QueueConfig};
use crate::types::{AgentSlot, ExecutionRecord, RunStatus, SharedState};
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use swarm_agent::{create_model, ModelConfig, ModelGateway};
use swarm_core::{SwarmError, SwarmResult};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Rough per-agent duration used for the up-front estimate.
const ESTIMATED_SECS_PER_AGENT: u64 = 45;

/// Where a run gets its agents from.
#[derive(Clone, Default)]
pub enum AgentSource {
    /// The built-in agent table.
    #[default]
    Builtin,
    /// Manifests discovered from a directory on every run.
    Directory(PathBuf),
    /// A fixed, programmatically built registry.
    Registry(AgentRegistry),
}

impl std::fmt::Debug for AgentSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentSource::Builtin => write!(f, "Builtin"),
            AgentSource::Directory(dir) => f.debug_tuple("Directory").field(dir).finish(),
            AgentSource::Registry(registry) => f.debug_tuple("Registry").field(registry).finish(),
        }
    }
}

/// Settings for a [`Pipeline`].
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Root for artifacts and the MCP server list.
    pub sandbox_dir: PathBuf,
    /// Where agents come from.
    pub agents: AgentSource,
    /// Batching and timeout settings.
    pub queue: QueueConfig,
    /// Model used when none is injected.
    pub model: ModelConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sandbox_dir: PathBuf::from("sandbox"),
            agents: AgentSource::Builtin,
            queue: QueueConfig::default(),
            model: ModelConfig::default(),
        }
    }
}

/// Drives one run end to end: collaborators, discovery, queue, events.
///
/// A pipeline owns the [`ExecutionStore`] and may be shared behind an `Arc`
/// between the HTTP layer and background runs.
pub struct Pipeline {
    config: PipelineConfig,
    store: Arc<ExecutionStore>,
    observer: Arc<dyn ProgressObserver>,
    model: Option<Arc<dyn ModelGateway>>,
    explorer: Option<Arc<dyn Explorer>>,
}

impl Pipeline {
    /// A pipeline with a fresh store and no observer.
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            store: Arc::new(ExecutionStore::new()),
            observer: Arc::new(NoopObserver),
            model: None,
            explorer: None,
        }
    }

    /// Use `model` instead of the one described by the model config.
    pub fn with_model(mut self, model: Arc<dyn ModelGateway>) -> Self {
        self.model = Some(model);
        self
    }

    /// Use `explorer` instead of a sandbox rooted at `sandbox_dir`.
    pub fn with_explorer(mut self, explorer: Arc<dyn Explorer>) -> Self {
        self.explorer = Some(explorer);
        self
    }

    /// Run exactly the agents of `registry`.
    pub fn with_agents(mut self, registry: AgentRegistry) -> Self {
        self.config.agents = AgentSource::Registry(registry);
        self
    }

    /// Send progress events to `observer`.
    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Settings this pipeline was built with.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The execution records of this pipeline.
    pub fn store(&self) -> &Arc<ExecutionStore> {
        &self.store
    }

    /// The latest execution record, or an idle one before any run.
    pub async fn status(&self) -> ExecutionRecord {
        self.store.current().await
    }

    /// Register a new run for `task` and announce it.
    ///
    /// Fails with [`SwarmError::ConcurrentRun`] while another run is active.
    pub async fn begin(&self, task: &str) -> SwarmResult<Uuid> {
        let task = task.trim();
        if task.is_empty() {
            return Err(SwarmError::Orchestrator("Task is required".into()));
        }
        let run_id = self.store.begin(task).await?;
        info!(%run_id, task, "Execution started");
        self.observer.emit(ProgressEvent::ExecutionStart(ExecutionStart {
            run_id,
            task: task.to_string(),
            timestamp: Utc::now(),
        }));
        Ok(run_id)
    }

    /// Execute a run registered with [`Pipeline::begin`] and return its final state.
    ///
    /// Agent failures do not fail the run; only run-level problems such as
    /// an empty agent set do, in which case the record is marked `error`.
    pub async fn execute(&self, run_id: Uuid) -> SwarmResult<SharedState> {
        let started = Instant::now();
        let record = self
            .store
            .get(run_id)
            .await
            .ok_or_else(|| SwarmError::Orchestrator(format!("unknown run {run_id}")))?;

        match self.drive(run_id, &record.task).await {
            Ok(report) => {
                let duration = started.elapsed().as_secs_f64().round() as u64;
                let outputs = report.state.results.len();
                self.store.complete(run_id, report.state.results.clone()).await;
                self.observer.emit(ProgressEvent::ExecutionComplete(ExecutionComplete {
                    run_id,
                    results: report.state.results.clone(),
                    duration,
                    timestamp: Utc::now(),
                }));
                self.observer.emit(ProgressEvent::log(
                    LogLevel::Success,
                    LogKind::Completion,
                    format!("Pipeline completed in {duration}s with {outputs} outputs generated"),
                ));
                info!(%run_id, outputs, failed = report.failed, duration_s = duration, "Pipeline completed");
                Ok(report.state)
            }
            Err(e) => {
                let message = e.to_string();
                self.store.fail(run_id, message.clone()).await;
                self.observer.emit(ProgressEvent::ExecutionError(ExecutionError {
                    run_id,
                    error: message.clone(),
                    timestamp: Utc::now(),
                }));
                self.observer.emit(ProgressEvent::log(
                    LogLevel::Error,
                    LogKind::Error,
                    format!("Pipeline failed: {message}"),
                ));
                error!(%run_id, error = %message, "Pipeline failed");
                Err(e)
            }
        }
    }

    /// [`Pipeline::begin`] followed by [`Pipeline::execute`].
    pub async fn run_pipeline_with_updates(&self, task: &str) -> SwarmResult<SharedState> {
        let run_id = self.begin(task).await?;
        self.execute(run_id).await
    }

    /// Resolve the agent set the next run would use.
    pub async fn discover(&self) -> SwarmResult<Discovery> {
        match &self.config.agents {
            AgentSource::Builtin => Ok(Discovery {
                registry: AgentRegistry::builtin(),
                failures: Vec::new(),
            }),
            AgentSource::Directory(dir) => AgentRegistry::discover(dir).await,
            AgentSource::Registry(registry) => Ok(Discovery {
                registry: registry.clone(),
                failures: Vec::new(),
            }),
        }
    }

    fn resolve_model(&self) -> Arc<dyn ModelGateway> {
        self.model
            .clone()
            .unwrap_or_else(|| create_model(&self.config.model))
    }

    fn resolve_explorer(&self) -> Arc<dyn Explorer> {
        self.explorer
            .clone()
            .unwrap_or_else(|| Arc::new(FsExplorer::new(&self.config.sandbox_dir)))
    }

    fn system_log(&self, message: impl Into<String>) {
        self.observer
            .emit(ProgressEvent::log(LogLevel::Info, LogKind::System, message));
    }

    async fn drive(&self, run_id: Uuid, task: &str) -> SwarmResult<DrainReport> {
        self.system_log(format!("Starting MCP Swarm pipeline for task: \"{task}\""));

        match mcp::load_or_init(&self.config.sandbox_dir).await {
            Ok(servers) => {
                let enabled = servers.iter().filter(|s| s.enabled).count();
                self.system_log(format!("Loaded {enabled} MCP servers"));
            }
            Err(e) => {
                warn!(error = %e, "MCP server list unavailable");
                self.observer.emit(ProgressEvent::log(
                    LogLevel::Warning,
                    LogKind::System,
                    format!("MCP server list unavailable: {e}"),
                ));
            }
        }

        let model = self.resolve_model();
        let explorer = self.resolve_explorer();
        info!(model = model.name(), "Collaborators resolved");

        let Discovery { registry, failures } = self.discover().await?;
        self.system_log(format!(
            "Loading {} specialized agents...",
            registry.len() + failures.len()
        ));
        for agent in registry.agents() {
            self.observer.emit(ProgressEvent::agent_log(
                LogLevel::Info,
                LogKind::AgentLoad,
                agent.name(),
                format!("Loaded {}: {}", agent.name(), agent.description()),
            ));
        }
        for failure in &failures {
            self.observer.emit(ProgressEvent::log(
                LogLevel::Error,
                LogKind::Error,
                failure.to_string(),
            ));
        }

        if registry.is_empty() {
            return Err(SwarmError::Orchestrator("no agents discovered".into()));
        }

        let slots = registry
            .agents()
            .iter()
            .map(|a| AgentSlot::new(a.name(), a.description()))
            .collect();
        self.store.init_slots(run_id, slots).await;

        let total = registry.len();
        let estimated = total as u64 * ESTIMATED_SECS_PER_AGENT;
        let batch = self.config.queue.batch_size().min(total);
        self.observer.emit(ProgressEvent::ExecutionUpdate(ExecutionUpdate {
            status: RunStatus::Running,
            current_phase: "Agent Processing".into(),
            progress: 0,
            completed_agents: 0,
            total_agents: total,
            estimated_duration: Some(format!("{estimated}s")),
            timestamp: Utc::now(),
        }));
        self.system_log(format!(
            "Starting {total} agents in queued batches ({batch} at a time). Estimated duration: {estimated}s"
        ));

        let queue = AgentQueue::new(self.config.queue.clone(), self.store.clone(), run_id)
            .with_observer(self.observer.clone());
        for (index, agent) in registry.agents().iter().enumerate() {
            queue.add(agent.clone(), index);
        }

        let state = SharedState::new(task, explorer, model);
        queue.process(state).await
    }
}
