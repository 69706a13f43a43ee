//! Core types and error definitions for mcp-swarm.
//!
//! This crate provides the foundational types shared across all swarm crates:
//! the unified error enum and the chat message shape exchanged with model
//! backends.
//!
//! # Main types
//!
//! - [`SwarmError`]: Unified error enum for all swarm subsystems.
//! - [`SwarmResult`]: Convenience alias for `Result<T, SwarmError>`.
//! - [`Role`]: Chat message role (system, user, assistant).
//! - [`ChatMessage`]: A single `{role, content}` pair sent to a model.

/// Unified error type.
pub mod error;
/// Chat message types.
pub mod message;

pub use error::{SwarmError, SwarmResult};
pub use message::{ChatMessage, Role};
