use serde::{Deserialize, Serialize};
use std::path::Path;
use swarm_core::SwarmResult;
use tracing::{info, warn};

/// File name of the MCP server list inside the sandbox.
pub const MCP_CONFIG_FILE: &str = "mcp-config.json";

/// One entry of the MCP server list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpServer {
    /// Display name.
    pub name: String,
    /// Server endpoint.
    pub url: String,
    /// Auth scheme or token reference.
    pub auth: String,
    /// Whether runs may use this server.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// What the server provides.
    #[serde(default)]
    pub description: String,
}

fn default_enabled() -> bool {
    true
}

impl McpServer {
    fn new(name: &str, url: &str, auth: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            auth: auth.to_string(),
            enabled: true,
            description: description.to_string(),
        }
    }
}

/// The server list written when the sandbox has none.
pub fn default_servers() -> Vec<McpServer> {
    vec![
        McpServer::new(
            "GitHub MCP",
            "https://api.github.com/openapi.json",
            "oauth",
            "Repo ops, PRs, issues",
        ),
        McpServer::new("Terminal MCP", "local", "none", "Shell access"),
        McpServer::new("Filesystem MCP", "local", "none", "File read/write"),
    ]
}

/// Read `<sandbox>/mcp-config.json`, seeding it with [`default_servers`]
/// when it is missing or unreadable.
pub async fn load_or_init(sandbox: &Path) -> SwarmResult<Vec<McpServer>> {
    let path = sandbox.join(MCP_CONFIG_FILE);

    match tokio::fs::read_to_string(&path).await {
        Ok(raw) => match serde_json::from_str::<Vec<McpServer>>(&raw) {
            Ok(servers) => {
                info!(count = servers.len(), path = %path.display(), "Loaded MCP server list");
                return Ok(servers);
            }
            Err(e) => warn!(error = %e, path = %path.display(), "Invalid MCP server list, reseeding"),
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(error = %e, path = %path.display(), "Unreadable MCP server list, reseeding"),
    }

    let servers = default_servers();
    tokio::fs::create_dir_all(sandbox).await?;
    tokio::fs::write(&path, serde_json::to_string_pretty(&servers)?).await?;
    info!(count = servers.len(), path = %path.display(), "Seeded default MCP server list");
    Ok(servers)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_seeds_missing_config() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = dir.path().join("sandbox");

        let servers = load_or_init(&sandbox).await.unwrap();
        assert_eq!(servers, default_servers());

        let raw = std::fs::read_to_string(sandbox.join(MCP_CONFIG_FILE)).unwrap();
        let on_disk: Vec<McpServer> = serde_json::from_str(&raw).unwrap();
        assert_eq!(on_disk.len(), 3);
        assert_eq!(on_disk[0].name, "GitHub MCP");
    }

    #[tokio::test]
    async fn test_keeps_existing_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(MCP_CONFIG_FILE),
            r#"[{"name":"Custom","url":"local","auth":"none"}]"#,
        )
        .unwrap();

        let servers = load_or_init(dir.path()).await.unwrap();
        assert_eq!(servers.len(), 1);
        assert_eq!(servers[0].name, "Custom");
        assert!(servers[0].enabled);
    }

    #[tokio::test]
    async fn test_reseeds_corrupt_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(MCP_CONFIG_FILE), "not json").unwrap();

        let servers = load_or_init(dir.path()).await.unwrap();
        assert_eq!(servers, default_servers());
    }
}
