use crate::agent::{Agent, AgentContext};
use crate::monitor::ExecutionStore;
use crate::progress::{
    AgentUpdate, ExecutionUpdate, LogKind, LogLevel, NoopObserver, ProgressEvent,
    ProgressObserver,
};
use crate::types::{AgentSlot, AgentStatus, RunStatus, SharedState};
use chrono::Utc;
use futures_util::future::join_all;
use futures_util::FutureExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use swarm_core::{SwarmError, SwarmResult};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{error, info};
use uuid::Uuid;

/// Scheduling parameters for an [`AgentQueue`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Agents started together per batch.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Per-agent deadline in milliseconds.
    #[serde(default = "default_agent_timeout_ms")]
    pub agent_timeout_ms: u64,
    /// How often running agents report estimated progress.
    #[serde(default = "default_progress_interval_ms")]
    pub progress_interval_ms: u64,
    /// Elapsed time at which the progress estimate reaches its cap.
    #[serde(default = "default_progress_horizon_ms")]
    pub progress_horizon_ms: u64,
}

fn default_concurrency() -> usize {
    2
}

fn default_agent_timeout_ms() -> u64 {
    60_000
}

fn default_progress_interval_ms() -> u64 {
    2_000
}

fn default_progress_horizon_ms() -> u64 {
    45_000
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            agent_timeout_ms: default_agent_timeout_ms(),
            progress_interval_ms: default_progress_interval_ms(),
            progress_horizon_ms: default_progress_horizon_ms(),
        }
    }
}

impl QueueConfig {
    /// Batch size, never below one.
    pub fn batch_size(&self) -> usize {
        self.concurrency.max(1)
    }

    /// Deadline for a single agent run.
    pub fn agent_timeout(&self) -> Duration {
        Duration::from_millis(self.agent_timeout_ms)
    }

    /// The agent deadline in whole seconds, rounded up.
    pub fn agent_timeout_secs(&self) -> u64 {
        self.agent_timeout_ms.div_ceil(1_000)
    }

    /// Period between progress samples, never zero.
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms.max(1))
    }

    /// Elapsed time at which the progress estimate is capped.
    pub fn progress_horizon(&self) -> Duration {
        Duration::from_millis(self.progress_horizon_ms)
    }
}

/// An agent waiting in the queue, tagged with its slot index in the
/// execution record.
#[derive(Clone)]
pub struct QueueEntry {
    /// The agent to run.
    pub agent: Arc<dyn Agent>,
    /// Slot index in the run's execution record.
    pub index: usize,
}

/// Outcome of draining a queue.
#[derive(Debug)]
pub struct DrainReport {
    /// Final state after every successful merge.
    pub state: SharedState,
    /// Agents that returned results.
    pub completed: usize,
    /// Agents that failed or timed out.
    pub failed: usize,
    /// Agent names per batch, in execution order.
    pub batches: Vec<Vec<String>>,
    /// Wall time of the drain.
    pub duration: Duration,
}

/// Running estimate for an agent that has been busy for `elapsed`:
/// `min(90, 10 + elapsed / horizon * 80)`, rounded.
pub fn estimate_progress(elapsed: Duration, horizon: Duration) -> u8 {
    if horizon.is_zero() {
        return 90;
    }
    let ratio = elapsed.as_secs_f64() / horizon.as_secs_f64();
    (10.0 + ratio * 80.0).min(90.0).round() as u8
}

/// Rough time remaining for the run, rendered as `"< 1s"`, `"Ns"` or `"Nm"`.
///
/// Assumes every remaining agent takes as long as `elapsed` spread over the
/// agents completed so far, discounting the other slots of the current batch.
pub fn estimate_eta(elapsed: Duration, completed: usize, total: usize, concurrency: usize) -> String {
    let avg_ms = elapsed.as_millis() as f64 / completed.max(1) as f64;
    let remaining = total as i64 - completed as i64 - (concurrency as i64 - 1);
    let remaining_ms = remaining as f64 * avg_ms;

    if remaining_ms < 1_000.0 {
        "< 1s".to_string()
    } else if remaining_ms < 60_000.0 {
        format!("{}s", (remaining_ms / 1_000.0).round() as u64)
    } else {
        format!("{}m", (remaining_ms / 60_000.0).round() as u64)
    }
}

/// Counters and the live state shared by the agents of one drain.
struct Drain {
    state: SharedState,
    completed: usize,
    failed: usize,
    settled: usize,
    total: usize,
}

/// Releases the processing flag when a drain ends, including by unwinding.
struct ProcessingGuard<'a>(&'a AtomicBool);

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Runs agents in fixed-size batches with a per-agent timeout.
///
/// Every agent of a batch starts together and the next batch is formed only
/// after all of them settle. Agents of one batch see the same snapshot of
/// the shared state; results are merged as each agent finishes.
pub struct AgentQueue {
    entries: Mutex<VecDeque<QueueEntry>>,
    config: QueueConfig,
    store: Arc<ExecutionStore>,
    run_id: Uuid,
    observer: Arc<dyn ProgressObserver>,
    processing: AtomicBool,
}

impl AgentQueue {
    /// A queue whose slot updates go to run `run_id` in `store`.
    pub fn new(config: QueueConfig, store: Arc<ExecutionStore>, run_id: Uuid) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            config,
            store,
            run_id,
            observer: Arc::new(NoopObserver),
            processing: AtomicBool::new(false),
        }
    }

    /// Send progress events to `observer` instead of discarding them.
    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Enqueue `agent` for slot `index`.
    pub fn add(&self, agent: Arc<dyn Agent>, index: usize) {
        self.entries.lock().push_back(QueueEntry { agent, index });
    }

    /// Number of agents still waiting.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// True when no agent is waiting.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// True while a drain is in progress.
    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::Acquire)
    }

    /// Drain the queue, starting from `state`.
    ///
    /// Agent failures and timeouts are recorded on their slots and never
    /// fail the drain. A second call while a drain is in progress returns
    /// [`SwarmError::QueueBusy`].
    pub async fn process(&self, state: SharedState) -> SwarmResult<DrainReport> {
        if self
            .processing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(SwarmError::QueueBusy);
        }
        let _guard = ProcessingGuard(&self.processing);

        let started = Instant::now();
        let drain = Mutex::new(Drain {
            state,
            completed: 0,
            failed: 0,
            settled: 0,
            total: self.len(),
        });
        let mut batches = Vec::new();

        loop {
            let batch: Vec<QueueEntry> = {
                let mut entries = self.entries.lock();
                let take = entries.len().min(self.config.batch_size());
                entries.drain(..take).collect()
            };
            if batch.is_empty() {
                break;
            }

            let names: Vec<String> = batch.iter().map(|e| e.agent.name().to_string()).collect();
            info!(batch = batches.len() + 1, agents = ?names, "Starting batch");
            batches.push(names);

            let snapshot = Arc::new(drain.lock().state.clone());
            join_all(
                batch
                    .into_iter()
                    .map(|entry| self.run_entry(entry, snapshot.clone(), &drain)),
            )
            .await;
        }

        let drain = drain.into_inner();
        let duration = started.elapsed();
        info!(
            completed = drain.completed,
            failed = drain.failed,
            duration_ms = duration.as_millis() as u64,
            "Agent queue drained"
        );

        Ok(DrainReport {
            state: drain.state,
            completed: drain.completed,
            failed: drain.failed,
            batches,
            duration,
        })
    }

    /// Run one agent under supervision: timeout, progress sampling, and
    /// merge or failure bookkeeping once it settles.
    async fn run_entry(&self, entry: QueueEntry, snapshot: Arc<SharedState>, drain: &Mutex<Drain>) {
        let QueueEntry { agent, index } = entry;
        let name = agent.name().to_string();
        let started = Instant::now();

        info!(agent = %name, task = %snapshot.task, "Running agent");
        self.observer.emit(ProgressEvent::agent_log(
            LogLevel::Info,
            LogKind::AgentStart,
            &name,
            format!("Starting {name}: {}", agent.description()),
        ));
        self.store.update_slot(self.run_id, index, AgentSlot::start).await;
        let mut update = AgentUpdate::new(&name, AgentStatus::Running, 10);
        update.eta = Some(self.eta(started, drain));
        self.observer.emit(ProgressEvent::AgentUpdate(update));

        let ctx = AgentContext::from_state(&snapshot);
        // A panicking agent settles as a failure like any other error.
        let run = AssertUnwindSafe(agent.run(&snapshot, &ctx))
            .catch_unwind()
            .map(|result| result.unwrap_or_else(|_| Err(SwarmError::Agent("agent panicked".into()))));
        tokio::pin!(run);
        let deadline = tokio::time::sleep(self.config.agent_timeout());
        tokio::pin!(deadline);
        let interval = self.config.progress_interval();
        let mut ticker = tokio::time::interval_at(started + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // Leaving the loop drops `run`, cancelling a timed-out agent.
        let outcome = loop {
            tokio::select! {
                biased;
                result = &mut run => break result,
                _ = &mut deadline => {
                    break Err(SwarmError::Timeout {
                        agent: name.clone(),
                        secs: self.config.agent_timeout_secs(),
                    });
                }
                _ = ticker.tick() => {
                    let progress = estimate_progress(started.elapsed(), self.config.progress_horizon());
                    if self
                        .store
                        .update_slot(self.run_id, index, |slot| slot.set_progress(progress))
                        .await
                    {
                        let mut update = AgentUpdate::new(&name, AgentStatus::Running, progress);
                        update.eta = Some(self.eta(started, drain));
                        self.observer.emit(ProgressEvent::AgentUpdate(update));
                    }
                }
            }
        };

        let elapsed = started.elapsed();
        match outcome {
            Ok(output) => {
                let outputs = output.results.len();
                let secs = elapsed.as_secs_f64().round() as u64;
                drain.lock().state.merge(&name, output);
                self.store
                    .update_slot(self.run_id, index, |slot| slot.complete(secs))
                    .await;

                let mut update = AgentUpdate::new(&name, AgentStatus::Completed, 100);
                update.duration = Some(secs);
                self.observer.emit(ProgressEvent::AgentUpdate(update));
                self.observer.emit(ProgressEvent::agent_log(
                    LogLevel::Success,
                    LogKind::AgentComplete,
                    &name,
                    format!("{name} completed in {secs}s - generated {outputs} outputs"),
                ));
                info!(agent = %name, outputs, duration_s = secs, "Agent completed");
                self.settle(&name, drain, true);
            }
            Err(e) => {
                let message = e.to_string();
                self.store
                    .update_slot(self.run_id, index, |slot| slot.fail(message.clone()))
                    .await;

                let mut update = AgentUpdate::new(&name, AgentStatus::Error, 0);
                update.error = Some(message.clone());
                self.observer.emit(ProgressEvent::AgentUpdate(update));
                self.observer.emit(ProgressEvent::agent_log(
                    LogLevel::Error,
                    LogKind::AgentError,
                    &name,
                    format!("{name} failed: {message}"),
                ));
                error!(agent = %name, error = %message, "Agent failed");
                self.settle(&name, drain, false);
            }
        }
    }

    /// Count a settled agent and publish the overall progress.
    fn settle(&self, name: &str, drain: &Mutex<Drain>, success: bool) {
        let update = {
            let mut drain = drain.lock();
            drain.settled += 1;
            if success {
                drain.completed += 1;
            } else {
                drain.failed += 1;
            }
            let progress = if drain.total == 0 {
                100
            } else {
                ((drain.settled as f64 / drain.total as f64) * 100.0).round() as u8
            };
            ExecutionUpdate {
                status: RunStatus::Running,
                current_phase: format!("Processing: {name}"),
                progress,
                completed_agents: drain.completed,
                total_agents: drain.total,
                estimated_duration: None,
                timestamp: Utc::now(),
            }
        };
        self.observer.emit(ProgressEvent::ExecutionUpdate(update));
    }

    fn eta(&self, started: Instant, drain: &Mutex<Drain>) -> String {
        let (completed, total) = {
            let drain = drain.lock();
            (drain.completed, drain.total)
        };
        estimate_eta(started.elapsed(), completed, total, self.config.batch_size())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::progress::RecordingObserver;
    use crate::sandbox::FsExplorer;
    use crate::types::AgentOutput;
    use async_trait::async_trait;
    use swarm_agent::MockModel;

    enum Behavior {
        Succeed(Duration),
        Fail,
        Hang,
        Panic,
    }

    struct ScriptedAgent {
        name: &'static str,
        behavior: Behavior,
    }

    #[async_trait]
    impl Agent for ScriptedAgent {
        fn name(&self) -> &str {
            self.name
        }

        async fn run(&self, state: &SharedState, _ctx: &AgentContext) -> SwarmResult<AgentOutput> {
            match self.behavior {
                Behavior::Succeed(delay) => {
                    tokio::time::sleep(delay).await;
                    let seen = state.results.keys().cloned().collect::<Vec<_>>().join(",");
                    Ok(AgentOutput::single(self.name, format!("{} saw [{seen}]", self.name)))
                }
                Behavior::Fail => Err(SwarmError::Agent(format!("{} exploded", self.name))),
                Behavior::Hang => {
                    std::future::pending::<()>().await;
                    unreachable!()
                }
                Behavior::Panic => {
                    let empty: Vec<String> = Vec::new();
                    Ok(AgentOutput::single(self.name, empty[3].clone()))
                }
            }
        }
    }

    fn scripted(name: &'static str, behavior: Behavior) -> Arc<dyn Agent> {
        Arc::new(ScriptedAgent { name, behavior })
    }

    fn state(dir: &std::path::Path) -> SharedState {
        SharedState::new(
            "scenario",
            Arc::new(FsExplorer::new(dir)),
            Arc::new(MockModel::new()),
        )
    }

    async fn queue_with(
        agents: Vec<Arc<dyn Agent>>,
        config: QueueConfig,
    ) -> (AgentQueue, Arc<ExecutionStore>, Arc<RecordingObserver>) {
        let store = Arc::new(ExecutionStore::new());
        let run_id = store.begin("scenario").await.unwrap();
        store
            .init_slots(
                run_id,
                agents
                    .iter()
                    .map(|a| AgentSlot::new(a.name(), a.description()))
                    .collect(),
            )
            .await;

        let observer = Arc::new(RecordingObserver::new());
        let queue = AgentQueue::new(config, store.clone(), run_id).with_observer(observer.clone());
        for (index, agent) in agents.into_iter().enumerate() {
            queue.add(agent, index);
        }
        (queue, store, observer)
    }

    #[test]
    fn test_estimate_progress() {
        let horizon = Duration::from_secs(45);
        assert_eq!(estimate_progress(Duration::ZERO, horizon), 10);
        assert_eq!(estimate_progress(Duration::from_secs(2), horizon), 14);
        assert_eq!(estimate_progress(Duration::from_secs(45), horizon), 90);
        assert_eq!(estimate_progress(Duration::from_secs(600), horizon), 90);
        assert_eq!(estimate_progress(Duration::from_secs(1), Duration::ZERO), 90);
    }

    #[test]
    fn test_estimate_eta() {
        assert_eq!(estimate_eta(Duration::from_millis(500), 0, 2, 2), "< 1s");
        assert_eq!(estimate_eta(Duration::from_secs(10), 0, 11, 2), "2m");
        assert_eq!(estimate_eta(Duration::from_secs(4), 2, 11, 2), "16s");
        // More slots than remaining agents.
        assert_eq!(estimate_eta(Duration::from_secs(30), 10, 11, 2), "< 1s");
    }

    #[test]
    fn test_config_defaults() {
        let config: QueueConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, QueueConfig::default());
        assert_eq!(config.batch_size(), 2);
        assert_eq!(config.agent_timeout(), Duration::from_secs(60));
        assert_eq!(QueueConfig { concurrency: 0, ..config }.batch_size(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mixed_outcomes_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let (queue, store, observer) = queue_with(
            vec![
                scripted("a", Behavior::Succeed(Duration::from_secs(1))),
                scripted("b", Behavior::Fail),
                scripted("c", Behavior::Succeed(Duration::from_secs(1))),
                scripted("d", Behavior::Hang),
            ],
            QueueConfig::default(),
        )
        .await;

        let report = queue.process(state(dir.path())).await.unwrap();

        assert_eq!(
            report.state.results.keys().collect::<Vec<_>>(),
            vec!["a", "c"]
        );
        assert_eq!(report.state.phase, "c");
        assert_eq!((report.completed, report.failed), (2, 2));
        assert_eq!(report.batches, vec![vec!["a", "b"], vec!["c", "d"]]);
        assert!(queue.is_empty());

        // `c` ran after `a` merged, so it saw `a`'s result.
        assert_eq!(report.state.results["c"], "c saw [a]");

        let record = store.current().await;
        let statuses: Vec<AgentStatus> = record.agents.iter().map(|s| s.status).collect();
        assert_eq!(
            statuses,
            vec![
                AgentStatus::Completed,
                AgentStatus::Error,
                AgentStatus::Completed,
                AgentStatus::Error
            ]
        );
        assert_eq!(
            record.agents[3].error.as_deref(),
            Some("Agent d timeout after 60s")
        );
        assert_eq!(record.agents[1].progress, 0);
        assert_eq!(record.agents[0].progress, 100);

        let updates = observer.agent_updates();
        let d_error = updates
            .iter()
            .find(|u| u.agent == "d" && u.status == AgentStatus::Error)
            .unwrap();
        assert_eq!(d_error.error.as_deref(), Some("Agent d timeout after 60s"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_barrier() {
        let dir = tempfile::tempdir().unwrap();
        let (queue, _store, observer) = queue_with(
            vec![
                scripted("fast", Behavior::Succeed(Duration::from_millis(10))),
                scripted("slow", Behavior::Succeed(Duration::from_secs(5))),
                scripted("next", Behavior::Succeed(Duration::from_millis(10))),
            ],
            QueueConfig::default(),
        )
        .await;

        let report = queue.process(state(dir.path())).await.unwrap();
        assert_eq!(report.batches.len(), 2);

        let updates = observer.agent_updates();
        let position = |agent: &str, status: AgentStatus| {
            updates
                .iter()
                .position(|u| u.agent == agent && u.status == status)
                .unwrap()
        };
        let next_started = position("next", AgentStatus::Running);
        assert!(position("fast", AgentStatus::Completed) < next_started);
        assert!(position("slow", AgentStatus::Completed) < next_started);

        // Agents of one batch share a snapshot: `slow` never sees `fast`.
        assert_eq!(report.state.results["slow"], "slow saw []");
        assert_eq!(report.state.results["next"], "next saw [fast,slow]");
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_samples_stop_on_settle() {
        let dir = tempfile::tempdir().unwrap();
        let (queue, _store, observer) = queue_with(
            vec![scripted("worker", Behavior::Succeed(Duration::from_secs(7)))],
            QueueConfig::default(),
        )
        .await;

        queue.process(state(dir.path())).await.unwrap();

        let updates = observer.agent_updates();
        let progress: Vec<u8> = updates.iter().map(|u| u.progress).collect();
        // start, samples at 2s/4s/6s, completion
        assert_eq!(progress, vec![10, 14, 17, 21, 100]);
        assert!(updates.iter().all(|u| u.eta.is_some() || u.status != AgentStatus::Running));
        assert_eq!(updates.last().unwrap().status, AgentStatus::Completed);
        assert_eq!(updates.last().unwrap().duration, Some(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_execution_updates_count_settled_agents() {
        let dir = tempfile::tempdir().unwrap();
        let (queue, _store, observer) = queue_with(
            vec![
                scripted("ok", Behavior::Succeed(Duration::from_millis(1))),
                scripted("bad", Behavior::Fail),
            ],
            QueueConfig::default(),
        )
        .await;

        queue.process(state(dir.path())).await.unwrap();

        let updates: Vec<ExecutionUpdate> = observer
            .events()
            .into_iter()
            .filter_map(|e| match e {
                ProgressEvent::ExecutionUpdate(u) => Some(u),
                _ => None,
            })
            .collect();
        assert_eq!(updates.len(), 2);
        let last = updates.last().unwrap();
        assert_eq!(last.progress, 100);
        assert_eq!(last.completed_agents, 1);
        assert_eq!(last.total_agents, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reentrant_drain_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (queue, _store, _observer) = queue_with(
            vec![scripted("slow", Behavior::Succeed(Duration::from_secs(3)))],
            QueueConfig::default(),
        )
        .await;

        let (first, second) = tokio::join!(
            queue.process(state(dir.path())),
            queue.process(state(dir.path()))
        );
        let (done, busy) = match (first, second) {
            (Ok(report), Err(e)) | (Err(e), Ok(report)) => (report, e),
            other => panic!("expected exactly one drain to be refused, got {other:?}"),
        };
        assert_eq!(done.completed, 1);
        assert!(matches!(busy, SwarmError::QueueBusy));

        // The flag is released once the drain finishes.
        assert!(!queue.is_processing());
        let empty = queue.process(state(dir.path())).await.unwrap();
        assert!(empty.batches.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let config = QueueConfig {
            agent_timeout_ms: 5_000,
            ..QueueConfig::default()
        };
        let (queue, store, _observer) = queue_with(
            vec![scripted("sleepy", Behavior::Succeed(Duration::from_secs(6)))],
            config,
        )
        .await;

        let report = queue.process(state(dir.path())).await.unwrap();
        assert!(report.state.results.is_empty());
        assert_eq!(report.state.phase, "start");
        assert_eq!(
            store.current().await.agents[0].error.as_deref(),
            Some("Agent sleepy timeout after 5s")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_sub_second_timeout_rounds_up() {
        let dir = tempfile::tempdir().unwrap();
        let config = QueueConfig {
            agent_timeout_ms: 500,
            ..QueueConfig::default()
        };
        assert_eq!(config.agent_timeout_secs(), 1);
        let (queue, store, _observer) =
            queue_with(vec![scripted("stuck", Behavior::Hang)], config).await;

        queue.process(state(dir.path())).await.unwrap();
        assert_eq!(
            store.current().await.agents[0].error.as_deref(),
            Some("Agent stuck timeout after 1s")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_agent_is_contained() {
        let dir = tempfile::tempdir().unwrap();
        let (queue, store, observer) = queue_with(
            vec![
                scripted("broken", Behavior::Panic),
                scripted("sibling", Behavior::Succeed(Duration::from_millis(10))),
                scripted("later", Behavior::Succeed(Duration::from_millis(10))),
            ],
            QueueConfig::default(),
        )
        .await;

        let report = queue.process(state(dir.path())).await.unwrap();
        assert_eq!((report.completed, report.failed), (2, 1));
        assert_eq!(
            report.state.results.keys().collect::<Vec<_>>(),
            vec!["later", "sibling"]
        );
        assert!(!queue.is_processing());

        let record = store.current().await;
        assert_eq!(record.agents[0].status, AgentStatus::Error);
        assert_eq!(record.agents[0].error.as_deref(), Some("Agent error: agent panicked"));
        assert!(observer
            .agent_updates()
            .iter()
            .any(|u| u.agent == "broken" && u.status == AgentStatus::Error));
    }
}
