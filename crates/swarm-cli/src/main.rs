//! `mcp-swarm`: serve the agent swarm over HTTP or run one task from the shell.

mod config;

use clap::{Parser, Subcommand};
use config::AppConfig;
use std::path::PathBuf;
use std::sync::Arc;
use swarm_gateway::{start_run, AuthConfig, GatewayServer};
use swarm_orchestrator::{
    BroadcastObserver, FanoutObserver, Pipeline, ProgressObserver, TracingObserver,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mcp-swarm", about = "MCP Swarm: multi-agent task pipeline")]
struct Cli {
    /// Path to config file (defaults to ./mcp-swarm.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP/WebSocket gateway
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
        /// Start a run for this task as soon as the server is up
        #[arg(long)]
        task: Option<String>,
    },
    /// Run one task to completion and print the results as JSON
    Run {
        /// Task description
        #[arg(required = true, num_args = 1..)]
        task: Vec<String>,
    },
    /// List the agents a run would use
    Agents,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref()).await?;

    match cli.command {
        Commands::Serve { host, port, task } => {
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);

            let events = BroadcastObserver::default();
            let observer: Arc<dyn ProgressObserver> = Arc::new(
                FanoutObserver::new()
                    .with(Arc::new(events.clone()))
                    .with(Arc::new(TracingObserver)),
            );
            let pipeline = Arc::new(Pipeline::new(config.pipeline_config()).with_observer(observer));

            let auth_config = AuthConfig::new(config.security.api_keys.clone());
            if auth_config.is_enabled() {
                info!(keys = config.security.api_keys.len(), "API key auth enabled");
            }
            let app = GatewayServer::build(pipeline.clone(), &events, auth_config);

            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            info!(
                sandbox = %config.sandbox_dir.display(),
                provider = ?pipeline.config().model.provider,
                "MCP Swarm gateway listening on {addr}"
            );

            if let Some(task) = task {
                let run_id = start_run(&pipeline, &task).await?;
                info!(%run_id, task = %task, "Initial task started");
            }

            axum::serve(listener, app).await?;
        }
        Commands::Run { task } => {
            let task = task.join(" ");
            let pipeline =
                Pipeline::new(config.pipeline_config()).with_observer(Arc::new(TracingObserver));
            let state = pipeline.run_pipeline_with_updates(&task).await?;
            println!("{}", serde_json::to_string_pretty(&state.results)?);
        }
        Commands::Agents => {
            let pipeline = Pipeline::new(config.pipeline_config());
            let discovery = pipeline.discover().await?;
            if discovery.registry.is_empty() {
                println!("No agents discovered.");
            } else {
                println!("Agents:");
                for agent in discovery.registry.agents() {
                    println!("  {}: {}", agent.name(), agent.description());
                }
                println!("\nTotal: {} agent(s)", discovery.registry.len());
            }
            for failure in &discovery.failures {
                println!("  ! {failure}");
            }
        }
    }

    Ok(())
}
