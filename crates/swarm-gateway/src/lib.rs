//! HTTP and WebSocket gateway for mcp-swarm.
//!
//! Exposes `POST /run-task` and `GET /status` (also under `/api`), a
//! `/health` probe, and a `/ws` endpoint that streams pipeline progress
//! events to dashboards.

/// Request handlers for the JSON API.
pub mod api;
/// WebSocket connection registry.
pub mod connection;
/// API-key authentication.
pub mod middleware;
/// Router assembly and the WebSocket loop.
pub mod server;

pub use api::{start_run, ApiError};
pub use middleware::AuthConfig;
pub use server::{AppState, GatewayServer};
