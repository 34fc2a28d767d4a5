//! A2A client: one JSON-RPC round trip per call, plus typed task helpers.
//!
//! Network failures (refused connection, timeout, non-2xx status) all map to
//! [`ClientError::Transport`]; an `error` in the response envelope maps to
//! [`ClientError::Protocol`]. Callers can tell "peer unreachable" from
//! "peer rejected the call".

use crate::a2a::agent_card::AgentCard;
use crate::a2a::handler::{CreateTaskParams, GetTaskParams, SendTaskMessageParams, TaskList};
use crate::a2a::server::HealthStatus;
use crate::a2a::types::*;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Reply used when a task holds no agent message.
pub const NO_AGENT_RESPONSE: &str = "No response from agent";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("RPC Error {code}: {message}")]
    Protocol {
        code: i64,
        message: String,
        data: Option<Value>,
    },
    #[error("Malformed response: {0}")]
    Decode(String),
}

impl ClientError {
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    pub fn code(&self) -> Option<i64> {
        match self {
            Self::Protocol { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<JsonRpcError> for ClientError {
    fn from(e: JsonRpcError) -> Self {
        Self::Protocol {
            code: e.code,
            message: e.message,
            data: e.data,
        }
    }
}

/// Client bound to one agent endpoint.
#[derive(Debug)]
pub struct A2aClient {
    http: reqwest::Client,
    agent_url: String,
    next_id: AtomicI64,
}

impl A2aClient {
    /// Build a client with its own HTTP connection pool.
    pub fn new(agent_url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_http(http, agent_url))
    }

    /// Build a client over a shared HTTP pool (timeout comes from `http`).
    pub fn with_http(http: reqwest::Client, agent_url: impl Into<String>) -> Self {
        Self {
            http,
            agent_url: agent_url.into().trim_end_matches('/').to_string(),
            next_id: AtomicI64::new(0),
        }
    }

    pub fn agent_url(&self) -> &str {
        &self.agent_url
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Perform one envelope round trip and return the `result` value.
    pub async fn call(&self, method: &str, params: Option<JsonMap>) -> Result<Value, ClientError> {
        let request = JsonRpcRequest::new(method, params, self.next_id());
        tracing::debug!("A2A client: {} → {} (id {})", method, self.agent_url, request.id);

        let body = self
            .http
            .post(&self.agent_url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        let response: JsonRpcResponse =
            serde_json::from_slice(&body).map_err(|e| ClientError::Decode(e.to_string()))?;

        if response.id != request.id {
            return Err(ClientError::Decode(format!(
                "response id {} does not match request id {}",
                response.id, request.id
            )));
        }

        Ok(response.into_result()?)
    }

    async fn call_typed<P: Serialize, T: DeserializeOwned>(
        &self,
        method: &str,
        params: Option<&P>,
    ) -> Result<T, ClientError> {
        let params = match params {
            Some(p) => match serde_json::to_value(p) {
                Ok(Value::Object(map)) => Some(map),
                Ok(other) => {
                    return Err(ClientError::Decode(format!(
                        "params for {} must be an object, got {}",
                        method, other
                    )));
                }
                Err(e) => return Err(ClientError::Decode(e.to_string())),
            },
            None => None,
        };
        let result = self.call(method, params).await?;
        serde_json::from_value(result).map_err(|e| ClientError::Decode(e.to_string()))
    }

    pub async fn get_agent_card(&self) -> Result<AgentCard, ClientError> {
        self.call_typed::<(), _>("getAgentCard", None).await
    }

    pub async fn create_task(
        &self,
        task_id: Option<String>,
        metadata: Option<JsonMap>,
    ) -> Result<Task, ClientError> {
        let params = CreateTaskParams { task_id, metadata };
        self.call_typed("createTask", Some(&params)).await
    }

    pub async fn send_message(
        &self,
        task_id: &str,
        content: &str,
        role: MessageRole,
        metadata: Option<JsonMap>,
    ) -> Result<Task, ClientError> {
        let params = SendTaskMessageParams {
            task_id: task_id.to_string(),
            content: content.to_string(),
            role,
            metadata,
        };
        self.call_typed("sendTaskMessage", Some(&params)).await
    }

    pub async fn get_task(&self, task_id: &str) -> Result<Task, ClientError> {
        let params = GetTaskParams {
            task_id: task_id.to_string(),
        };
        self.call_typed("getTask", Some(&params)).await
    }

    pub async fn list_tasks(&self) -> Result<Vec<Task>, ClientError> {
        let list: TaskList = self.call_typed::<(), _>("listTasks", None).await?;
        Ok(list.tasks)
    }

    /// Send `message` (creating a task unless `task_id` is given) and return
    /// the agent's latest reply.
    pub async fn chat(&self, message: &str, task_id: Option<&str>) -> Result<String, ClientError> {
        let task_id = match task_id {
            Some(id) => id.to_string(),
            None => self.create_task(None, None).await?.task_id,
        };
        let task = self
            .send_message(&task_id, message, MessageRole::User, None)
            .await?;
        Ok(task
            .last_agent_response()
            .unwrap_or(NO_AGENT_RESPONSE)
            .to_string())
    }

    /// `GET /health` on the agent.
    pub async fn health_check(&self) -> Result<HealthStatus, ClientError> {
        let health = self
            .http
            .get(format!("{}/health", self.agent_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(health)
    }
}
