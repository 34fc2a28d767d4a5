//! In-memory task store and the task lifecycle.
//!
//! Each task sits behind its own mutex: messages to the same task are
//! serialized while different tasks are processed in parallel. The outer
//! lock only guards the id → task map and the insertion order.

use crate::a2a::handler::AgentHandler;
use crate::a2a::types::*;
use futures::FutureExt;
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Task '{0}' not found")]
    NotFound(String),
    #[error("Task '{0}' already exists")]
    AlreadyExists(String),
    #[error("Processing of task '{task_id}' aborted: {reason}")]
    Aborted { task_id: String, reason: String },
}

type TaskSlot = Arc<Mutex<Task>>;

#[derive(Default)]
struct Slots {
    by_id: HashMap<String, TaskSlot>,
    order: Vec<String>,
}

/// Shared, cloneable handle to an agent's tasks. Lifetime = process lifetime.
#[derive(Clone, Default)]
pub struct TaskStore {
    inner: Arc<RwLock<Slots>>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a `pending` task. A missing id is replaced by a random UUIDv4.
    pub async fn create(
        &self,
        task_id: Option<String>,
        metadata: JsonMap,
    ) -> Result<Task, StoreError> {
        let task_id = task_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let task = Task::new(task_id.clone(), metadata);

        let mut slots = self.inner.write().await;
        if slots.by_id.contains_key(&task_id) {
            return Err(StoreError::AlreadyExists(task_id));
        }
        slots
            .by_id
            .insert(task_id.clone(), Arc::new(Mutex::new(task.clone())));
        slots.order.push(task_id);

        Ok(task)
    }

    async fn slot(&self, task_id: &str) -> Result<TaskSlot, StoreError> {
        self.inner
            .read()
            .await
            .by_id
            .get(task_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(task_id.to_string()))
    }

    pub async fn get(&self, task_id: &str) -> Result<Task, StoreError> {
        let slot = self.slot(task_id).await?;
        let task = slot.lock().await.clone();
        Ok(task)
    }

    /// All tasks in creation order.
    pub async fn list(&self) -> Vec<Task> {
        let slots: Vec<TaskSlot> = {
            let guard = self.inner.read().await;
            guard
                .order
                .iter()
                .filter_map(|id| guard.by_id.get(id).cloned())
                .collect()
        };

        let mut tasks = Vec::with_capacity(slots.len());
        for slot in slots {
            tasks.push(slot.lock().await.clone());
        }
        tasks
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.order.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Append an inbound message and run the agent's domain handler on it.
    ///
    /// The task moves to `in_progress`, then to `completed` (agent reply
    /// appended) or `failed` (system message appended). Settled tasks accept
    /// further messages and go through the same transition again.
    ///
    /// A panicking handler fails the task like an error does. Processing runs
    /// on its own tokio task so a dropped request cannot leave the task
    /// half-processed; `Aborted` is only returned if that task is cancelled.
    pub async fn append_and_process(
        &self,
        task_id: &str,
        message: TaskMessage,
        agent: Arc<dyn AgentHandler>,
    ) -> Result<Task, StoreError> {
        let slot = self.slot(task_id).await?;
        let id = task_id.to_string();

        tokio::spawn(async move {
            let mut task = slot.lock().await;
            task.add_message(message.clone());
            task.status = TaskStatus::InProgress;

            let outcome = AssertUnwindSafe(agent.handle(&id, &message))
                .catch_unwind()
                .await;
            match outcome {
                Ok(Ok(reply)) => {
                    task.add_message(TaskMessage::agent(reply));
                    task.status = TaskStatus::Completed;
                    tracing::info!("A2A: Task {} completed", id);
                }
                Ok(Err(e)) => {
                    task.add_message(TaskMessage::system(format!(
                        "Error processing task: {e:#}"
                    )));
                    task.status = TaskStatus::Failed;
                    tracing::warn!("A2A: Task {} failed: {:#}", id, e);
                }
                Err(panic) => {
                    let detail = panic_message(panic.as_ref());
                    task.add_message(TaskMessage::system(format!(
                        "Error processing task: {detail}"
                    )));
                    task.status = TaskStatus::Failed;
                    tracing::error!("A2A: Task {} handler panicked: {}", id, detail);
                }
            }

            task.clone()
        })
        .await
        .map_err(|e| StoreError::Aborted {
            task_id: task_id.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Text carried by a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::a2a::agent_card::AgentCard;
    use async_trait::async_trait;

    /// Echoes the message back, failing on the word "boom".
    struct EchoAgent;

    #[async_trait]
    impl AgentHandler for EchoAgent {
        fn card(&self) -> AgentCard {
            AgentCard::new("EchoAgent", "echo", "http://localhost:0", vec![])
        }

        async fn handle(&self, _task_id: &str, message: &TaskMessage) -> anyhow::Result<String> {
            if message.content == "boom" {
                anyhow::bail!("exploded on purpose");
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            Ok(format!("echo: {}", message.content))
        }
    }

    fn echo() -> Arc<dyn AgentHandler> {
        Arc::new(EchoAgent)
    }

    #[tokio::test]
    async fn test_create_is_pending_and_empty() {
        let store = TaskStore::new();
        let task = store.create(None, JsonMap::new()).await.expect("create");
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(task.messages.is_empty());
        assert_eq!(task.created_at, task.updated_at);
        assert!(Uuid::parse_str(&task.task_id).is_ok());
    }

    #[tokio::test]
    async fn test_create_with_explicit_id_rejects_duplicate() {
        let store = TaskStore::new();
        store
            .create(Some("fixed".to_string()), JsonMap::new())
            .await
            .expect("first");
        let err = store
            .create(Some("fixed".to_string()), JsonMap::new())
            .await
            .expect_err("duplicate");
        assert!(matches!(err, StoreError::AlreadyExists(id) if id == "fixed"));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_successful_message_completes_task() {
        let store = TaskStore::new();
        let created = store.create(None, JsonMap::new()).await.expect("create");

        let task = store
            .append_and_process(&created.task_id, TaskMessage::user("hi"), echo())
            .await
            .expect("process");

        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.messages.len(), 2);
        assert_eq!(task.messages[0].role, MessageRole::User);
        assert_eq!(task.last_agent_response(), Some("echo: hi"));
        assert!(task.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn test_handler_failure_marks_task_failed() {
        let store = TaskStore::new();
        let created = store.create(None, JsonMap::new()).await.expect("create");

        let task = store
            .append_and_process(&created.task_id, TaskMessage::user("boom"), echo())
            .await
            .expect("failure is captured, not returned");

        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.messages.len(), 2);
        let last = &task.messages[1];
        assert_eq!(last.role, MessageRole::System);
        assert!(last.content.contains("exploded on purpose"));
        assert_eq!(task.last_agent_response(), None);
    }

    struct PanickingAgent;

    #[async_trait]
    impl AgentHandler for PanickingAgent {
        fn card(&self) -> AgentCard {
            AgentCard::new("PanickingAgent", "panics", "http://localhost:0", vec![])
        }

        #[allow(clippy::panic)]
        async fn handle(&self, _task_id: &str, _message: &TaskMessage) -> anyhow::Result<String> {
            panic!("handler blew up");
        }
    }

    #[tokio::test]
    async fn test_handler_panic_marks_task_failed() {
        let store = TaskStore::new();
        let created = store.create(None, JsonMap::new()).await.expect("create");

        let task = store
            .append_and_process(&created.task_id, TaskMessage::user("hi"), Arc::new(PanickingAgent))
            .await
            .expect("panic is captured, not returned");
        assert_eq!(task.status, TaskStatus::Failed);

        let stored = store.get(&created.task_id).await.expect("get");
        assert_eq!(stored.status, TaskStatus::Failed);
        assert_eq!(stored.messages.len(), 2);
        assert_eq!(stored.messages[1].role, MessageRole::System);
        assert_eq!(stored.messages[1].content, "Error processing task: handler blew up");

        // The slot lock was released, so the task keeps working.
        let task = store
            .append_and_process(&created.task_id, TaskMessage::user("again"), echo())
            .await
            .expect("send");
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.messages.len(), 4);
    }

    #[test]
    fn test_panic_message_reads_payload() {
        assert_eq!(panic_message(&"static text"), "static text");
        assert_eq!(panic_message(&String::from("owned text")), "owned text");
        assert_eq!(panic_message(&42_u8), "unknown panic");
    }

    #[tokio::test]
    async fn test_settled_task_accepts_more_messages() {
        let store = TaskStore::new();
        let created = store.create(None, JsonMap::new()).await.expect("create");
        store
            .append_and_process(&created.task_id, TaskMessage::user("boom"), echo())
            .await
            .expect("first");
        let task = store
            .append_and_process(&created.task_id, TaskMessage::user("again"), echo())
            .await
            .expect("second");

        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.messages.len(), 4);
    }

    #[tokio::test]
    async fn test_unknown_task_is_not_found_and_store_untouched() {
        let store = TaskStore::new();
        let err = store
            .append_and_process("missing", TaskMessage::user("hi"), echo())
            .await
            .expect_err("unknown");
        assert!(matches!(err, StoreError::NotFound(_)));
        assert!(store.is_empty().await);
        assert!(matches!(
            store.get("missing").await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_preserves_creation_order() {
        let store = TaskStore::new();
        for id in ["c", "a", "b"] {
            store
                .create(Some(id.to_string()), JsonMap::new())
                .await
                .expect("create");
        }
        let ids: Vec<String> = store.list().await.into_iter().map(|t| t.task_id).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[tokio::test]
    async fn test_concurrent_messages_to_same_task_are_serialized() {
        let store = TaskStore::new();
        let created = store.create(None, JsonMap::new()).await.expect("create");

        let sends = (0..8).map(|i| {
            let store = store.clone();
            let id = created.task_id.clone();
            async move {
                store
                    .append_and_process(&id, TaskMessage::user(format!("m{i}")), echo())
                    .await
            }
        });
        for result in futures::future::join_all(sends).await {
            result.expect("send");
        }

        let task = store.get(&created.task_id).await.expect("get");
        assert_eq!(task.messages.len(), 16);
        // Every inbound message is immediately followed by its own reply.
        for pair in task.messages.chunks(2) {
            assert_eq!(pair[0].role, MessageRole::User);
            assert_eq!(pair[1].content, format!("echo: {}", pair[0].content));
        }
    }
}
