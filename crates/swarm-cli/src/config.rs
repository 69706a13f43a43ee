use serde::Deserialize;
use std::path::{Path, PathBuf};
use swarm_agent::ModelConfig;
use swarm_orchestrator::{AgentSource, PipelineConfig, QueueConfig};

/// Config file read when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "mcp-swarm.toml";

/// Contents of `mcp-swarm.toml`. Every field has a default.
#[derive(Debug, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_sandbox_dir")]
    pub sandbox_dir: PathBuf,
    /// Manifest directory; the built-in agents are used when absent.
    #[serde(default)]
    pub agents_dir: Option<PathBuf>,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub security: SecurityConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct SecurityConfig {
    #[serde(default)]
    pub api_keys: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            sandbox_dir: default_sandbox_dir(),
            agents_dir: None,
            model: ModelConfig::default(),
            queue: QueueConfig::default(),
            server: ServerConfig::default(),
            security: SecurityConfig::default(),
        }
    }
}

fn default_sandbox_dir() -> PathBuf {
    PathBuf::from("./sandbox")
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    3002
}

impl AppConfig {
    /// Load `path`, or [`DEFAULT_CONFIG_FILE`] if it exists, or defaults.
    ///
    /// An explicitly named file must exist.
    pub async fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Self::parse(&text).map_err(|e| {
                anyhow::anyhow!("Failed to parse config file '{}': {e}", path.display())
            }),
            Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(anyhow::anyhow!(
                "Failed to read config file '{}': {e}",
                path.display()
            )),
        }
    }

    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Pipeline settings, with LM Studio environment variables applied.
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            sandbox_dir: self.sandbox_dir.clone(),
            agents: match &self.agents_dir {
                Some(dir) => AgentSource::Directory(dir.clone()),
                None => AgentSource::Builtin,
            },
            queue: self.queue.clone(),
            model: self.model.clone().with_env_overrides(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use swarm_agent::ModelProvider;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = AppConfig::parse("").unwrap();
        assert_eq!(config.sandbox_dir, PathBuf::from("./sandbox"));
        assert!(config.agents_dir.is_none());
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3002);
        assert_eq!(config.queue, QueueConfig::default());
        assert!(config.security.api_keys.is_empty());
    }

    #[test]
    fn test_full_config() {
        let config = AppConfig::parse(
            r#"
            sandbox_dir = "/tmp/swarm"
            agents_dir = "agents"

            [model]
            provider = "lm_studio"
            model_id = "qwen"

            [queue]
            concurrency = 4
            agent_timeout_ms = 1000

            [server]
            port = 8080

            [security]
            api_keys = ["k1"]
            "#,
        )
        .unwrap();
        assert_eq!(config.model.provider, ModelProvider::LmStudio);
        assert_eq!(config.model.model_id, "qwen");
        assert_eq!(config.queue.concurrency, 4);
        assert_eq!(config.queue.agent_timeout_ms, 1000);
        assert_eq!(config.queue.progress_interval_ms, 2000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.security.api_keys, vec!["k1"]);

        let pipeline = config.pipeline_config();
        assert!(matches!(pipeline.agents, AgentSource::Directory(ref d) if d == Path::new("agents")));
        assert_eq!(pipeline.sandbox_dir, PathBuf::from("/tmp/swarm"));
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(AppConfig::parse("[server]\nport = \"high\"").is_err());
    }

    #[tokio::test]
    async fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[server]\nport = 9000\n").unwrap();
        let config = AppConfig::load(Some(&path)).await.unwrap();
        assert_eq!(config.server.port, 9000);

        let missing = dir.path().join("missing.toml");
        assert!(AppConfig::load(Some(&missing)).await.is_err());
    }
}
