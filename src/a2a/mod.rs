//! A2A (Agent-to-Agent) protocol layer.
//!
//! - Agent Card discovery (`.well-known/agent.json`)
//! - JSON-RPC 2.0 task API (`createTask`, `sendTaskMessage`, `getTask`, `listTasks`)
//! - HTTP agent server (axum) and client (reqwest)
//! - Orchestrator that routes work to registered peers

pub mod types;
pub mod agent_card;
pub mod store;
pub mod handler;
pub mod server;
pub mod client;
pub mod orchestrator;
