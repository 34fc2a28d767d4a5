//! a2a-mesh: agents that talk to each other over a small JSON-RPC task protocol.
//!
//! - [`a2a`]: envelope, task store, dispatcher, HTTP server and client, orchestrator
//! - [`agents`]: the calculator and translator agents plus the serve-time builder
//! - [`config`] / [`logging`]: layered configuration and tracing set-up

pub mod a2a;
pub mod agents;
pub mod config;
pub mod logging;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests;
