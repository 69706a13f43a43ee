use crate::agent::Agent;
use crate::profiles::builtin_specs;
use crate::prompt_agent::PromptAgent;
use std::path::Path;
use std::sync::Arc;
use swarm_core::{SwarmError, SwarmResult};
use tracing::{info, warn};

/// Reserved identifier of the placeholder definition that is never run.
pub const TEMPLATE_ID: &str = "template";

/// File extension of agent manifests.
pub const MANIFEST_EXTENSION: &str = "toml";

/// Ordered set of agents available to a run.
#[derive(Clone, Default)]
pub struct AgentRegistry {
    agents: Vec<Arc<dyn Agent>>,
}

/// Result of scanning a manifest directory.
#[derive(Debug)]
pub struct Discovery {
    /// Agents that loaded.
    pub registry: AgentRegistry,
    /// Definitions that were skipped, one [`SwarmError::Load`] each.
    pub failures: Vec<SwarmError>,
}

impl AgentRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in agents, in alphabetical order.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for spec in builtin_specs() {
            let name = spec.name.clone();
            match PromptAgent::new(spec).and_then(|agent| registry.register(Arc::new(agent))) {
                Ok(()) => {}
                Err(e) => warn!(agent = %name, error = %e, "Skipping built-in agent"),
            }
        }
        registry
    }

    /// Append an agent. Duplicate names and the template name are refused.
    pub fn register(&mut self, agent: Arc<dyn Agent>) -> SwarmResult<()> {
        let name = agent.name();
        if name == TEMPLATE_ID {
            return Err(SwarmError::Load {
                source_id: name.to_string(),
                reason: "template definitions are not runnable".into(),
            });
        }
        if self.get(name).is_some() {
            return Err(SwarmError::Load {
                source_id: name.to_string(),
                reason: format!("duplicate agent name '{name}'"),
            });
        }
        self.agents.push(agent);
        Ok(())
    }

    /// Load every `*.toml` manifest in `dir`, in file-name order.
    ///
    /// The `template` manifest is skipped. Manifests that fail to parse are
    /// reported in [`Discovery::failures`] and do not abort the scan.
    pub async fn discover(dir: &Path) -> SwarmResult<Discovery> {
        let mut entries = tokio::fs::read_dir(dir).await.map_err(|e| {
            SwarmError::Orchestrator(format!(
                "cannot read agents directory {}: {e}",
                dir.display()
            ))
        })?;

        let mut manifests = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_manifest = path
                .extension()
                .is_some_and(|ext| ext == MANIFEST_EXTENSION);
            if is_manifest && entry.file_type().await?.is_file() {
                manifests.push(path);
            }
        }
        manifests.sort();

        let mut registry = Self::new();
        let mut failures = Vec::new();
        for path in manifests {
            let source_id = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            if source_id == TEMPLATE_ID {
                continue;
            }

            let loaded = match tokio::fs::read_to_string(&path).await {
                Ok(raw) => PromptAgent::from_toml(&raw),
                Err(e) => Err(e.into()),
            };
            let outcome = loaded.and_then(|agent| {
                if agent.name() == TEMPLATE_ID {
                    return Ok(None);
                }
                registry.register(Arc::new(agent)).map(Some)
            });

            match outcome {
                Ok(Some(())) => info!(source = %source_id, "Loaded agent manifest"),
                Ok(None) => {}
                Err(e) => {
                    let reason = match e {
                        SwarmError::Load { reason, .. } => reason,
                        other => other.to_string(),
                    };
                    let failure = SwarmError::Load { source_id, reason };
                    warn!(error = %failure, "Skipping agent definition");
                    failures.push(failure);
                }
            }
        }

        Ok(Discovery { registry, failures })
    }

    /// Look up an agent by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Agent>> {
        self.agents.iter().find(|a| a.name() == name)
    }

    /// Agents in run order.
    pub fn agents(&self) -> &[Arc<dyn Agent>] {
        &self.agents
    }

    /// Agent names in run order.
    pub fn names(&self) -> Vec<&str> {
        self.agents.iter().map(|a| a.name()).collect()
    }

    /// Number of agents.
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// True when no agent is registered.
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

impl std::fmt::Debug for AgentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
