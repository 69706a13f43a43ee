use crate::agent::{Agent, AgentContext, DEFAULT_DESCRIPTION};
use crate::types::{AgentOutput, SharedState};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use swarm_core::{ChatMessage, SwarmError, SwarmResult};
use tracing::info;

/// How the model reply is written to the output files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// The reply text as-is.
    #[default]
    Raw,
    /// Pretty JSON `{agent, task, results, timestamp}`.
    JsonEnvelope,
}

/// Declarative definition of an agent that sends one prompt and writes the
/// reply to fixed paths. This is the shape of an agent manifest file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptAgentSpec {
    /// Unique agent name.
    pub name: String,
    /// Label shown in the execution record.
    #[serde(default)]
    pub description: Option<String>,
    /// Prompt sent for ordinary tasks.
    pub prompt: String,
    /// Used instead of `prompt` when the task mentions a focus keyword.
    /// `{task}` is replaced with the task text.
    #[serde(default)]
    pub focused_prompt: Option<String>,
    /// Task keywords that select the focused prompt.
    #[serde(default)]
    pub focus_keywords: Vec<String>,
    /// Sandbox paths the reply is written to.
    #[serde(default)]
    pub outputs: Vec<String>,
    /// Output paths used for focused tasks.
    #[serde(default)]
    pub focused_outputs: Vec<String>,
    /// How the reply is written.
    #[serde(default)]
    pub format: OutputFormat,
}

impl PromptAgentSpec {
    /// A raw-format spec with no outputs.
    pub fn new(name: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            prompt: prompt.into(),
            focused_prompt: None,
            focus_keywords: Vec::new(),
            outputs: Vec::new(),
            focused_outputs: Vec::new(),
            format: OutputFormat::Raw,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the output paths.
    pub fn with_outputs(mut self, outputs: &[&str]) -> Self {
        self.outputs = outputs.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Use `prompt` when the task mentions any of `keywords`.
    pub fn with_focus(mut self, keywords: &[&str], prompt: impl Into<String>) -> Self {
        self.focus_keywords = keywords.iter().map(|s| s.to_string()).collect();
        self.focused_prompt = Some(prompt.into());
        self
    }

    /// Set the output paths for focused tasks.
    pub fn with_focused_outputs(mut self, outputs: &[&str]) -> Self {
        self.focused_outputs = outputs.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Set the output format.
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }
}

/// [`Agent`] driven by a [`PromptAgentSpec`].
#[derive(Debug, Clone)]
pub struct PromptAgent {
    spec: PromptAgentSpec,
}

impl PromptAgent {
    /// Validate a spec. Name and prompt must be non-blank.
    pub fn new(spec: PromptAgentSpec) -> SwarmResult<Self> {
        if spec.name.trim().is_empty() {
            return Err(SwarmError::Config("agent name must not be empty".into()));
        }
        if spec.prompt.trim().is_empty() {
            return Err(SwarmError::Config(format!(
                "agent '{}' has an empty prompt",
                spec.name
            )));
        }
        Ok(Self { spec })
    }

    /// Parse and validate a TOML manifest.
    pub fn from_toml(raw: &str) -> SwarmResult<Self> {
        let spec: PromptAgentSpec =
            toml::from_str(raw).map_err(|e| SwarmError::Config(e.to_string()))?;
        Self::new(spec)
    }

    /// The definition of this agent.
    pub fn spec(&self) -> &PromptAgentSpec {
        &self.spec
    }

    /// Whether `task` mentions any focus keyword (case-insensitive).
    pub fn is_focused(&self, task: &str) -> bool {
        if self.spec.focused_prompt.is_none() {
            return false;
        }
        let task = task.to_lowercase();
        self.spec
            .focus_keywords
            .iter()
            .any(|k| !k.is_empty() && task.contains(&k.to_lowercase()))
    }

    /// The prompt sent to the model for `task`.
    pub fn prompt_for(&self, task: &str) -> String {
        match &self.spec.focused_prompt {
            Some(focused) if self.is_focused(task) => focused.replace("{task}", task),
            _ => self.spec.prompt.clone(),
        }
    }

    /// Output paths for `task`.
    pub fn outputs_for(&self, task: &str) -> &[String] {
        if self.is_focused(task) && !self.spec.focused_outputs.is_empty() {
            &self.spec.focused_outputs
        } else {
            &self.spec.outputs
        }
    }

    fn render(&self, task: &str, reply: &str) -> SwarmResult<String> {
        match self.spec.format {
            OutputFormat::Raw => Ok(reply.to_string()),
            OutputFormat::JsonEnvelope => Ok(serde_json::to_string_pretty(&serde_json::json!({
                "agent": self.spec.name,
                "task": task,
                "results": reply,
                "timestamp": Utc::now().to_rfc3339(),
            }))?),
        }
    }
}

#[async_trait]
impl Agent for PromptAgent {
    fn name(&self) -> &str {
        &self.spec.name
    }

    fn description(&self) -> &str {
        self.spec.description.as_deref().unwrap_or(DEFAULT_DESCRIPTION)
    }

    async fn run(&self, state: &SharedState, ctx: &AgentContext) -> SwarmResult<AgentOutput> {
        let prompt = self.prompt_for(&state.task);
        let reply = ctx
            .model
            .invoke(&[ChatMessage::user(prompt)], Some(&self.spec.name))
            .await?;

        let outputs = self.outputs_for(&state.task);
        if !outputs.is_empty() {
            let body = self.render(&state.task, &reply.content)?;
            for path in outputs {
                ctx.explorer.write_file(path, &body).await?;
                info!(agent = %self.spec.name, path = %path, "Wrote agent output");
            }
        }

        Ok(AgentOutput::single(&self.spec.name, reply.content))
    }
}
