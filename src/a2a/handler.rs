//! JSON-RPC 2.0 dispatcher for the A2A task protocol.
//!
//! Standard methods, matched by name:
//! - `getAgentCard`    → the agent's capability card
//! - `createTask`      → new `pending` task
//! - `sendTaskMessage` → append a message and run the domain handler
//! - `getTask`         → one task by id
//! - `listTasks`       → every task of this agent
//!
//! Anything else is offered to the agent's extension list before
//! falling back to `method_not_found`.

use crate::a2a::agent_card::AgentCard;
use crate::a2a::store::{StoreError, TaskStore};
use crate::a2a::types::*;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Capability interface implemented by every agent variant.
#[async_trait]
pub trait AgentHandler: Send + Sync + 'static {
    /// The agent's capability card. Built on demand, never stored.
    fn card(&self) -> AgentCard;

    /// Produce the reply to an inbound message, or fail.
    async fn handle(&self, task_id: &str, message: &TaskMessage) -> anyhow::Result<String>;

    /// Agent-specific JSON-RPC methods served next to the standard set.
    fn extension_methods(&self) -> &'static [&'static str] {
        &[]
    }

    async fn call_extension(&self, method: &str, _params: JsonMap) -> Result<Value, JsonRpcError> {
        Err(JsonRpcError::method_not_found(method))
    }
}

/// The fixed method set every agent serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardMethod {
    GetAgentCard,
    CreateTask,
    SendTaskMessage,
    GetTask,
    ListTasks,
}

impl StandardMethod {
    pub const ALL: [StandardMethod; 5] = [
        Self::GetAgentCard,
        Self::CreateTask,
        Self::SendTaskMessage,
        Self::GetTask,
        Self::ListTasks,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::GetAgentCard => "getAgentCard",
            Self::CreateTask => "createTask",
            Self::SendTaskMessage => "sendTaskMessage",
            Self::GetTask => "getTask",
            Self::ListTasks => "listTasks",
        }
    }

    pub fn parse(method: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == method)
    }
}

// ─── Method params ───────────────────────────────────────────

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CreateTaskParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<JsonMap>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SendTaskMessageParams {
    pub task_id: String,
    pub content: String,
    #[serde(default)]
    pub role: MessageRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<JsonMap>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GetTaskParams {
    pub task_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TaskList {
    pub tasks: Vec<Task>,
}

impl From<StoreError> for JsonRpcError {
    fn from(e: StoreError) -> Self {
        JsonRpcError::internal(e)
    }
}

/// Decode method params, reporting failures as `invalid_params`.
pub fn parse_params<T: DeserializeOwned>(params: JsonMap) -> Result<T, JsonRpcError> {
    serde_json::from_value(Value::Object(params)).map_err(JsonRpcError::invalid_params)
}

/// Encode a method result, reporting failures as `internal_error`.
pub fn to_result<T: Serialize>(value: &T) -> Result<Value, JsonRpcError> {
    serde_json::to_value(value).map_err(JsonRpcError::internal)
}

// ─── Runtime ─────────────────────────────────────────────────

/// One agent's runtime: its capability handler plus its task store.
#[derive(Clone)]
pub struct AgentRuntime {
    agent: Arc<dyn AgentHandler>,
    store: TaskStore,
}

impl AgentRuntime {
    pub fn new(agent: Arc<dyn AgentHandler>) -> Self {
        Self {
            agent,
            store: TaskStore::new(),
        }
    }

    pub fn card(&self) -> AgentCard {
        self.agent.card()
    }

    pub fn name(&self) -> String {
        self.agent.card().name
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    /// Dispatch a decoded request. Never fails: every outcome is an envelope
    /// echoing the request id.
    pub async fn dispatch(&self, req: JsonRpcRequest) -> JsonRpcResponse {
        let JsonRpcRequest {
            method, params, id, ..
        } = req;
        let params = params.unwrap_or_default();

        tracing::debug!("A2A: dispatching {} (id {})", method, id);

        let outcome = match StandardMethod::parse(&method) {
            Some(standard) => self.call_standard(standard, params).await,
            None if self.agent.extension_methods().contains(&method.as_str()) => {
                self.agent.call_extension(&method, params).await
            }
            None => Err(JsonRpcError::method_not_found(&method)),
        };

        match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => {
                tracing::debug!("A2A: {} failed: {} ({})", method, error.message, error.code);
                JsonRpcResponse::error(id, error)
            }
        }
    }

    async fn call_standard(
        &self,
        method: StandardMethod,
        params: JsonMap,
    ) -> Result<Value, JsonRpcError> {
        match method {
            StandardMethod::GetAgentCard => to_result(&self.agent.card()),
            StandardMethod::CreateTask => self.handle_create_task(params).await,
            StandardMethod::SendTaskMessage => self.handle_send_task_message(params).await,
            StandardMethod::GetTask => self.handle_get_task(params).await,
            StandardMethod::ListTasks => {
                let tasks = self.store.list().await;
                to_result(&TaskList { tasks })
            }
        }
    }

    async fn handle_create_task(&self, params: JsonMap) -> Result<Value, JsonRpcError> {
        let p: CreateTaskParams = parse_params(params)?;
        let task = self
            .store
            .create(p.task_id, p.metadata.unwrap_or_default())
            .await?;
        tracing::info!("A2A: Created task {}", task.task_id);
        to_result(&task)
    }

    async fn handle_send_task_message(&self, params: JsonMap) -> Result<Value, JsonRpcError> {
        let p: SendTaskMessageParams = parse_params(params)?;
        let message = TaskMessage::new(p.role, p.content).with_metadata(p.metadata.unwrap_or_default());
        let task = self
            .store
            .append_and_process(&p.task_id, message, Arc::clone(&self.agent))
            .await?;
        to_result(&task)
    }

    async fn handle_get_task(&self, params: JsonMap) -> Result<Value, JsonRpcError> {
        let p: GetTaskParams = parse_params(params)?;
        let task = self.store.get(&p.task_id).await?;
        to_result(&task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::a2a::agent_card::Skill;
    use serde_json::json;

    struct UpperAgent;

    #[async_trait]
    impl AgentHandler for UpperAgent {
        fn card(&self) -> AgentCard {
            AgentCard::new(
                "UpperAgent",
                "Shouts back",
                "http://localhost:9",
                vec![Skill::text("shout", "Uppercase text")],
            )
        }

        async fn handle(&self, _task_id: &str, message: &TaskMessage) -> anyhow::Result<String> {
            if message.content.is_empty() {
                anyhow::bail!("nothing to shout");
            }
            Ok(message.content.to_uppercase())
        }

        fn extension_methods(&self) -> &'static [&'static str] {
            &["ping"]
        }

        async fn call_extension(&self, method: &str, _params: JsonMap) -> Result<Value, JsonRpcError> {
            match method {
                "ping" => Ok(json!("pong")),
                other => Err(JsonRpcError::method_not_found(other)),
            }
        }
    }

    fn runtime() -> AgentRuntime {
        AgentRuntime::new(Arc::new(UpperAgent))
    }

    fn request(method: &str, params: Value, id: i64) -> JsonRpcRequest {
        let params = match params {
            Value::Object(map) => Some(map),
            _ => None,
        };
        JsonRpcRequest::new(method, params, id)
    }

    async fn create(rt: &AgentRuntime) -> String {
        let resp = rt.dispatch(request("createTask", json!({}), 1)).await;
        resp.result()
            .and_then(|r| r.get("task_id"))
            .and_then(|v| v.as_str())
            .expect("task id")
            .to_string()
    }

    #[test]
    fn test_standard_method_names() {
        for method in StandardMethod::ALL {
            assert_eq!(StandardMethod::parse(method.as_str()), Some(method));
        }
        assert_eq!(StandardMethod::parse("gettask"), None);
    }

    #[tokio::test]
    async fn test_get_agent_card() {
        let resp = runtime().dispatch(request("getAgentCard", Value::Null, 1)).await;
        let card: AgentCard =
            serde_json::from_value(resp.result().cloned().expect("result")).expect("card");
        assert_eq!(card.name, "UpperAgent");
    }

    #[tokio::test]
    async fn test_create_task_with_metadata() {
        let resp = runtime()
            .dispatch(request(
                "createTask",
                json!({"task_id": "t-42", "metadata": {"source": "test"}}),
                5,
            ))
            .await;
        assert_eq!(resp.id, RequestId::Number(5));
        let task: Task =
            serde_json::from_value(resp.result().cloned().expect("result")).expect("task");
        assert_eq!(task.task_id, "t-42");
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(task.messages.is_empty());
        assert_eq!(task.metadata.get("source"), Some(&json!("test")));
    }

    #[tokio::test]
    async fn test_send_task_message_completes() {
        let rt = runtime();
        let task_id = create(&rt).await;

        let resp = rt
            .dispatch(request(
                "sendTaskMessage",
                json!({"task_id": task_id, "content": "hello"}),
                2,
            ))
            .await;
        let task: Task =
            serde_json::from_value(resp.result().cloned().expect("result")).expect("task");
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.messages.len(), 2);
        assert_eq!(task.messages[0].role, MessageRole::User);
        assert_eq!(task.last_agent_response(), Some("HELLO"));
    }

    #[tokio::test]
    async fn test_send_task_message_domain_failure_is_stored() {
        let rt = runtime();
        let task_id = create(&rt).await;

        let resp = rt
            .dispatch(request(
                "sendTaskMessage",
                json!({"task_id": task_id, "content": "", "role": "user"}),
                3,
            ))
            .await;
        assert!(resp.error_object().is_none());
        let task: Task =
            serde_json::from_value(resp.result().cloned().expect("result")).expect("task");
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.messages[1].role, MessageRole::System);
    }

    #[tokio::test]
    async fn test_send_to_unknown_task_is_internal_error() {
        let rt = runtime();
        let resp = rt
            .dispatch(request(
                "sendTaskMessage",
                json!({"task_id": "ghost", "content": "hi"}),
                3,
            ))
            .await;
        let err = resp.error_object().expect("error");
        assert_eq!(err.code, error_codes::INTERNAL_ERROR);
        assert_eq!(err.data, Some(json!("Task 'ghost' not found")));
        assert_eq!(resp.id, RequestId::Number(3));
        assert!(rt.store().is_empty().await);
    }

    #[tokio::test]
    async fn test_missing_params_are_invalid_params() {
        let resp = runtime()
            .dispatch(request("sendTaskMessage", json!({"task_id": "x"}), 9))
            .await;
        assert_eq!(
            resp.error_object().expect("error").code,
            error_codes::INVALID_PARAMS
        );
    }

    #[tokio::test]
    async fn test_get_task_and_list_tasks() {
        let rt = runtime();
        let first = create(&rt).await;
        let _second = create(&rt).await;

        let resp = rt.dispatch(request("getTask", json!({"task_id": first}), 3)).await;
        assert_eq!(
            resp.result().and_then(|r| r.get("task_id")),
            Some(&json!(first))
        );

        let resp = rt.dispatch(request("listTasks", Value::Null, 4)).await;
        let list: TaskList =
            serde_json::from_value(resp.result().cloned().expect("result")).expect("list");
        assert_eq!(list.tasks.len(), 2);
        assert_eq!(list.tasks[0].task_id, first);

        let resp = rt.dispatch(request("getTask", json!({"task_id": "nope"}), 5)).await;
        assert_eq!(
            resp.error_object().expect("error").code,
            error_codes::INTERNAL_ERROR
        );
    }

    #[tokio::test]
    async fn test_unknown_method_keeps_id() {
        let req = JsonRpcRequest::new("tasks/cancel", None, "req-1");
        let resp = runtime().dispatch(req).await;
        let err = resp.error_object().expect("error");
        assert_eq!(err.code, error_codes::METHOD_NOT_FOUND);
        assert_eq!(resp.id, RequestId::String("req-1".to_string()));
    }

    #[tokio::test]
    async fn test_null_id_is_still_answered() {
        let req = JsonRpcRequest::new("listTasks", None, RequestId::Null);
        let resp = runtime().dispatch(req).await;
        assert_eq!(resp.id, RequestId::Null);
        assert!(resp.result().is_some());
    }

    #[tokio::test]
    async fn test_extension_method_dispatch() {
        let resp = runtime().dispatch(request("ping", Value::Null, 1)).await;
        assert_eq!(resp.result(), Some(&json!("pong")));
    }
}
