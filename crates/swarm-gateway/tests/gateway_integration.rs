#![allow(clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use swarm_agent::MockModel;
use swarm_core::SwarmResult;
use swarm_gateway::{AuthConfig, GatewayServer};
use swarm_orchestrator::{
    Agent, AgentContext, AgentOutput, AgentRegistry, BroadcastObserver, Pipeline, PipelineConfig,
    SharedState,
};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Agent that takes a moment, so a run stays active across two requests.
struct Slow {
    name: &'static str,
    delay: Duration,
}

#[async_trait]
impl Agent for Slow {
    fn name(&self) -> &str {
        self.name
    }

    async fn run(&self, state: &SharedState, _ctx: &AgentContext) -> SwarmResult<AgentOutput> {
        tokio::time::sleep(self.delay).await;
        Ok(AgentOutput::single(self.name, format!("{} finished {}", self.name, state.task)))
    }
}

/// Helper: build a test server on a random port, returning the address.
async fn start_test_server(auth: AuthConfig, delay: Duration) -> (String, tempfile::TempDir) {
    let tmp = tempfile::tempdir().unwrap();
    let mut registry = AgentRegistry::new();
    registry.register(Arc::new(Slow { name: "first", delay })).unwrap();
    registry.register(Arc::new(Slow { name: "second", delay })).unwrap();

    let events = BroadcastObserver::default();
    let pipeline = Arc::new(
        Pipeline::new(PipelineConfig {
            sandbox_dir: tmp.path().to_path_buf(),
            ..PipelineConfig::default()
        })
        .with_model(Arc::new(MockModel::new()))
        .with_agents(registry)
        .with_observer(Arc::new(events.clone())),
    );
    let app = GatewayServer::build(pipeline, &events, auth);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let addr_str = format!("127.0.0.1:{}", addr.port());

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Small yield to let the server task start
    tokio::time::sleep(Duration::from_millis(50)).await;

    (addr_str, tmp)
}

async fn post_task(addr: &str, body: &str) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("http://{addr}/run-task"))
        .header("content-type", "application/json")
        .body(body.to_string())
        .send()
        .await
        .unwrap()
}

async fn wait_until_idle(addr: &str) -> serde_json::Value {
    for _ in 0..300 {
        let record: serde_json::Value = reqwest::get(format!("http://{addr}/status"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        if record["status"] != "running" {
            return record;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("run did not finish");
}

/// Read text frames until one carries `event`.
async fn next_event(ws: &mut WsStream, event: &str) -> serde_json::Value {
    let deadline = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(msg) = ws.next().await {
            let msg = msg.unwrap();
            if !msg.is_text() {
                continue;
            }
            let value: serde_json::Value = serde_json::from_str(&msg.into_text().unwrap()).unwrap();
            if value["event"] == event {
                return value;
            }
        }
        panic!("socket closed before {event}");
    });
    deadline.await.unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let (addr, _tmp) = start_test_server(AuthConfig::default(), Duration::ZERO).await;
    let resp = reqwest::get(format!("http://{addr}/health")).await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "mcp-swarm");
}

#[tokio::test]
async fn test_run_task_validation() {
    let (addr, _tmp) = start_test_server(AuthConfig::default(), Duration::ZERO).await;

    let resp = post_task(&addr, "not json").await;
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Invalid JSON body");

    let resp = post_task(&addr, r#"{"task":""}"#).await;
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Task is required");

    let record: serde_json::Value = reqwest::get(format!("http://{addr}/api/status"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(record["status"], "idle");
}

#[tokio::test]
async fn test_second_task_conflicts_until_first_finishes() {
    let (addr, _tmp) = start_test_server(AuthConfig::default(), Duration::from_millis(300)).await;

    let resp = post_task(&addr, r#"{"task":"first run"}"#).await;
    assert_eq!(resp.status(), 202);
    let accepted: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(accepted["message"], "Task started");
    assert_eq!(accepted["task"], "first run");

    let resp = post_task(&addr, r#"{"task":"second run"}"#).await;
    assert_eq!(resp.status(), 409);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Task already running");

    let record = wait_until_idle(&addr).await;
    assert_eq!(record["status"], "completed");
    assert_eq!(record["task"], "first run");
    assert_eq!(record["id"], accepted["runId"]);
    assert_eq!(record["results"]["first"], "first finished first run");
    assert_eq!(record["agents"].as_array().unwrap().len(), 2);

    let resp = post_task(&addr, r#"{"task":"second run"}"#).await;
    assert_eq!(resp.status(), 202);
    wait_until_idle(&addr).await;
}

#[tokio::test]
async fn test_websocket_status_and_run() {
    let (addr, _tmp) = start_test_server(AuthConfig::default(), Duration::from_millis(20)).await;
    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws"))
        .await
        .unwrap();

    let status = next_event(&mut ws, "status").await;
    assert_eq!(status["data"]["status"], "idle");

    ws.send(Message::Text(r#"{"type":"run-task","task":"via socket"}"#.into()))
        .await
        .unwrap();
    let accepted = next_event(&mut ws, "task-accepted").await;
    assert_eq!(accepted["data"]["task"], "via socket");

    let complete = next_event(&mut ws, "execution-complete").await;
    assert_eq!(complete["data"]["runId"], accepted["data"]["runId"]);
    assert_eq!(complete["data"]["results"]["second"], "second finished via socket");

    ws.send(Message::Text(r#"{"type":"run-task","task":"  "}"#.into()))
        .await
        .unwrap();
    let rejected = next_event(&mut ws, "task-rejected").await;
    assert_eq!(rejected["data"]["error"], "Task is required");
}

#[tokio::test]
async fn test_api_key_required_when_configured() {
    let auth = AuthConfig::new(vec!["secret".to_string()]);
    let (addr, _tmp) = start_test_server(auth, Duration::ZERO).await;
    let client = reqwest::Client::new();

    let resp = client.get(format!("http://{addr}/status")).send().await.unwrap();
    assert_eq!(resp.status(), 401);

    let resp = client
        .get(format!("http://{addr}/status"))
        .header("authorization", "Bearer wrong")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let resp = client
        .get(format!("http://{addr}/status"))
        .header("authorization", "Bearer secret")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = client
        .get(format!("http://{addr}/api/status?api_key=secret"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // The health probe stays open.
    let resp = client.get(format!("http://{addr}/health")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
}
