//! Agent HTTP server powered by axum.
//!
//! Serves:
//! - `POST /`                        JSON-RPC 2.0 endpoint
//! - `GET  /health`                  Liveness check
//! - `GET  /.well-known/agent.json`  Agent Card discovery

use crate::a2a::agent_card::AgentCard;
use crate::a2a::handler::AgentRuntime;
use crate::a2a::store::panic_message;
use crate::a2a::types::*;
use anyhow::Context;
use axum::{
    Router,
    body::{Body, Bytes},
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;

/// Body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub agent: String,
}

/// Build the axum router for one agent.
pub fn build_router(runtime: AgentRuntime) -> Router {
    Router::new()
        .route("/", post(handle_jsonrpc))
        .route("/health", get(health_check))
        .route("/.well-known/agent.json", get(get_agent_card))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(CorsLayer::permissive())
        .with_state(runtime)
}

/// Listener parameters for one agent process.
#[derive(Debug, Clone)]
pub struct ServeParams {
    pub bind: String,
    pub port: u16,
}

/// Bind and serve until Ctrl-C.
pub async fn start_server(runtime: AgentRuntime, params: &ServeParams) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", params.bind, params.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", params.bind, params.port))?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    let name = runtime.name();
    tracing::info!("{} starting on http://{}", name, addr);
    tracing::info!("   JSON-RPC:   http://{}/", addr);
    tracing::info!("   Health:     http://{}/health", addr);
    tracing::info!("   Agent Card: http://{}/.well-known/agent.json", addr);

    axum::serve(listener, build_router(runtime))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Agent server failed")?;

    tracing::info!("{} stopped", name);
    Ok(())
}

/// Serve on an already-bound listener (ephemeral ports in tests, embedding).
pub async fn serve(listener: TcpListener, runtime: AgentRuntime) -> anyhow::Result<()> {
    axum::serve(listener, build_router(runtime))
        .await
        .context("Agent server failed")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

/// POST /: JSON-RPC 2.0 endpoint.
async fn handle_jsonrpc(
    State(runtime): State<AgentRuntime>,
    body: Bytes,
) -> (StatusCode, Json<JsonRpcResponse>) {
    let req = match decode_request(&body) {
        Ok(req) => req,
        Err(e) => {
            tracing::warn!("A2A: rejected request body: {}", e);
            return (
                StatusCode::BAD_REQUEST,
                Json(JsonRpcResponse::error(e.id(), e.to_rpc_error())),
            );
        }
    };

    if req.jsonrpc != JSONRPC_VERSION {
        return (
            StatusCode::OK,
            Json(JsonRpcResponse::error(
                req.id,
                JsonRpcError::invalid_request("Invalid JSON-RPC version, expected 2.0"),
            )),
        );
    }

    let response = runtime.dispatch(req).await;
    (StatusCode::OK, Json(response))
}

/// GET /health: liveness only, never a readiness signal.
async fn health_check(State(runtime): State<AgentRuntime>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "healthy".to_string(),
        agent: runtime.name(),
    })
}

/// GET /.well-known/agent.json: Agent Card discovery.
async fn get_agent_card(State(runtime): State<AgentRuntime>) -> Json<AgentCard> {
    Json(runtime.card())
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response<Body> {
    let detail = panic_message(err.as_ref());
    tracing::error!("A2A: handler panicked: {}", detail);

    let envelope = JsonRpcResponse::error(RequestId::Null, JsonRpcError::internal(detail));
    (StatusCode::INTERNAL_SERVER_ERROR, Json(envelope)).into_response()
}
