//! Cross-module scenarios against live agents on ephemeral ports.


use crate::a2a::handler::{AgentHandler, AgentRuntime};
use crate::a2a::server::serve;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Bind `127.0.0.1:0`, build the agent with its real URL and serve it in the
/// background. Returns the URL.
async fn spawn_agent(make: impl FnOnce(String) -> Arc<dyn AgentHandler>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let url = format!("http://{}", listener.local_addr().expect("local addr"));
    let runtime = AgentRuntime::new(make(url.clone()));
    tokio::spawn(serve(listener, runtime));
    url
}
