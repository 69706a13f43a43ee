use crate::types::{AgentResults, AgentSlot, AgentStatus, ExecutionRecord, RunStatus};
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use swarm_core::{SwarmError, SwarmResult};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Runs kept in memory; older finished records are dropped on `begin`.
pub const MAX_RETAINED_RUNS: usize = 16;

/// In-memory record of recent pipeline runs, keyed by run id.
///
/// At most one run is `running` at a time; [`ExecutionStore::begin`] is the
/// single place where that is checked and enforced.
#[derive(Default)]
pub struct ExecutionStore {
    inner: RwLock<StoreInner>,
}

#[derive(Default)]
struct StoreInner {
    runs: HashMap<Uuid, ExecutionRecord>,
    /// Run ids, oldest first.
    order: VecDeque<Uuid>,
    latest: Option<Uuid>,
}

impl StoreInner {
    fn latest(&self) -> Option<&ExecutionRecord> {
        self.latest.and_then(|id| self.runs.get(&id))
    }
}

impl ExecutionStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new running record, or fail with
    /// [`SwarmError::ConcurrentRun`] when one is already running.
    pub async fn begin(&self, task: &str) -> SwarmResult<Uuid> {
        let mut inner = self.inner.write().await;
        if inner.latest().is_some_and(ExecutionRecord::is_running) {
            return Err(SwarmError::ConcurrentRun);
        }
        let id = Uuid::new_v4();
        inner.runs.insert(id, ExecutionRecord::running(id, task));
        inner.order.push_back(id);
        inner.latest = Some(id);
        // Only the latest run can be running, so evicted runs are finished.
        while inner.order.len() > MAX_RETAINED_RUNS {
            if let Some(old) = inner.order.pop_front() {
                inner.runs.remove(&old);
            }
        }
        Ok(id)
    }

    /// The most recent record, or an idle one before any run.
    pub async fn current(&self) -> ExecutionRecord {
        let inner = self.inner.read().await;
        inner.latest().cloned().unwrap_or_default()
    }

    /// The record of run `id`, if it is still retained.
    pub async fn get(&self, id: Uuid) -> Option<ExecutionRecord> {
        self.inner.read().await.runs.get(&id).cloned()
    }

    /// True while the latest run is running.
    pub async fn is_running(&self) -> bool {
        let inner = self.inner.read().await;
        inner.latest().is_some_and(ExecutionRecord::is_running)
    }

    /// Apply `f` to the record of `id`. Returns `None` for unknown runs.
    pub async fn update<R>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut ExecutionRecord) -> R,
    ) -> Option<R> {
        let mut inner = self.inner.write().await;
        inner.runs.get_mut(&id).map(f)
    }

    /// Apply `f` to slot `index` of run `id`. Returns `false` when either is
    /// missing or `f` rejects the change.
    pub async fn update_slot(
        &self,
        id: Uuid,
        index: usize,
        f: impl FnOnce(&mut AgentSlot) -> bool,
    ) -> bool {
        self.update(id, |record| record.agents.get_mut(index).is_some_and(f))
            .await
            .unwrap_or(false)
    }

    /// Replace the slots of a run, one per discovered agent.
    pub async fn init_slots(&self, id: Uuid, slots: Vec<AgentSlot>) -> bool {
        self.update(id, |record| record.agents = slots).await.is_some()
    }

    /// Mark a run completed with its final results.
    pub async fn complete(&self, id: Uuid, results: AgentResults) -> bool {
        self.update(id, |record| {
            record.status = RunStatus::Completed;
            record.results = results;
            record.finished_at = Some(Utc::now());
        })
        .await
        .is_some()
    }

    /// Mark a run failed at the run level. Slots still running fail with it.
    pub async fn fail(&self, id: Uuid, error: impl Into<String>) -> bool {
        let error = error.into();
        self.update(id, |record| {
            for slot in &mut record.agents {
                if slot.status == AgentStatus::Running {
                    slot.fail(error.clone());
                }
            }
            record.status = RunStatus::Error;
            record.error = Some(error);
            record.finished_at = Some(Utc::now());
        })
        .await
        .is_some()
    }

    /// Number of retained runs.
    pub async fn run_count(&self) -> usize {
        self.inner.read().await.runs.len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_idle_before_any_run() {
        let store = ExecutionStore::new();
        let record = store.current().await;
        assert_eq!(record.status, RunStatus::Idle);
        assert!(!store.is_running().await);
    }

    #[tokio::test]
    async fn test_second_begin_rejected_while_running() {
        let store = ExecutionStore::new();
        let id = store.begin("first").await.unwrap();
        assert!(matches!(store.begin("second").await, Err(SwarmError::ConcurrentRun)));

        store.complete(id, AgentResults::new()).await;
        let next = store.begin("second").await.unwrap();
        assert_ne!(id, next);
        assert_eq!(store.current().await.task, "second");
        assert_eq!(store.get(id).await.unwrap().status, RunStatus::Completed);
        assert_eq!(store.run_count().await, 2);
    }

    #[tokio::test]
    async fn test_begin_allowed_after_failure() {
        let store = ExecutionStore::new();
        let id = store.begin("doomed").await.unwrap();
        store.fail(id, "no agents discovered").await;

        let record = store.current().await;
        assert_eq!(record.status, RunStatus::Error);
        assert_eq!(record.error.as_deref(), Some("no agents discovered"));
        assert!(record.finished_at.is_some());
        assert!(store.begin("retry").await.is_ok());
    }

    #[tokio::test]
    async fn test_slot_updates() {
        let store = ExecutionStore::new();
        let id = store.begin("t").await.unwrap();
        store
            .init_slots(id, vec![AgentSlot::new("a", "A"), AgentSlot::new("b", "B")])
            .await;

        assert!(store.update_slot(id, 1, AgentSlot::start).await);
        assert!(!store.update_slot(id, 1, AgentSlot::start).await);
        assert!(!store.update_slot(id, 7, AgentSlot::start).await);
        assert!(!store.update_slot(Uuid::new_v4(), 0, AgentSlot::start).await);

        let record = store.current().await;
        assert_eq!(record.agents[0].status, AgentStatus::Idle);
        assert_eq!(record.agents[1].status, AgentStatus::Running);
    }

    #[tokio::test]
    async fn test_fail_settles_running_slots() {
        let store = ExecutionStore::new();
        let id = store.begin("t").await.unwrap();
        store
            .init_slots(id, vec![AgentSlot::new("a", "A"), AgentSlot::new("b", "B")])
            .await;
        store.update_slot(id, 0, AgentSlot::start).await;

        store.fail(id, "run aborted").await;
        let record = store.current().await;
        assert_eq!(record.agents[0].status, AgentStatus::Error);
        assert_eq!(record.agents[0].error.as_deref(), Some("run aborted"));
        assert_eq!(record.agents[1].status, AgentStatus::Idle);
    }

    #[tokio::test]
    async fn test_old_runs_are_pruned() {
        let store = ExecutionStore::new();
        let first = store.begin("run 0").await.unwrap();
        store.complete(first, AgentResults::new()).await;
        for i in 1..=MAX_RETAINED_RUNS {
            let id = store.begin(&format!("run {i}")).await.unwrap();
            store.complete(id, AgentResults::new()).await;
        }

        assert_eq!(store.run_count().await, MAX_RETAINED_RUNS);
        assert!(store.get(first).await.is_none());
        assert_eq!(store.current().await.task, format!("run {MAX_RETAINED_RUNS}"));
    }
}
