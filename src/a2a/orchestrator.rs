//! Orchestrator: a registry of peer agents plus keyword routing and delegation.
//!
//! ```text
//! caller ──sendTaskMessage──▶ Orchestrator ──route()──┬─▶ CalculatorAgent (createTask + sendTaskMessage)
//!                                                     └─▶ TranslatorAgent (createTask + sendTaskMessage)
//! ```
//!
//! Routing is a static keyword table. Every keyword set is tested on its own,
//! so one message may fan out to several peers; replies are joined in table
//! order. The table deliberately ignores the skills advertised in peer cards.

use crate::a2a::agent_card::{AgentCard, Skill};
use crate::a2a::client::{A2aClient, ClientError};
use crate::a2a::handler::{AgentHandler, parse_params, to_result};
use crate::a2a::types::*;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

pub const ORCHESTRATOR_AGENT: &str = "OrchestratorAgent";
pub const CALCULATOR_AGENT: &str = "CalculatorAgent";
pub const TRANSLATOR_AGENT: &str = "TranslatorAgent";

pub const DEFAULT_DELEGATION_TIMEOUT: Duration = Duration::from_secs(5);

pub const NO_AGENTS_REGISTERED: &str = "No agents are currently registered. \
     Register peers with the orchestrator's registerAgent method.";

const DISCOVERY_PHRASES: [&str; 3] = ["list agents", "discover agents", "what agents"];

/// One row of the routing table: keywords → target agent name.
#[derive(Debug, Clone, Copy)]
pub struct Route {
    pub agent: &'static str,
    /// Prefix of this agent's section in the aggregated reply.
    pub label: &'static str,
    pub keywords: &'static [&'static str],
}

impl Route {
    pub fn matches(&self, content: &str) -> bool {
        self.keywords.iter().any(|k| content.contains(k))
    }
}

pub const ROUTES: [Route; 2] = [
    Route {
        agent: CALCULATOR_AGENT,
        label: "Calculator",
        keywords: &["calculate", "solve", "+", "-", "*", "/", "=", "equation"],
    },
    Route {
        agent: TRANSLATOR_AGENT,
        label: "Translator",
        keywords: &["translate", "spanish", "french", "german"],
    },
];

// ─── Registry ────────────────────────────────────────────────

/// Cards of registered peers keyed by name, in first-registration order.
/// Re-registering a name replaces its card in place.
#[derive(Clone, Default)]
pub struct AgentRegistry {
    cards: Arc<RwLock<Vec<AgentCard>>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a card. Returns `true` when a card was replaced.
    pub async fn insert(&self, card: AgentCard) -> bool {
        let mut cards = self.cards.write().await;
        match cards.iter_mut().find(|c| c.name == card.name) {
            Some(existing) => {
                *existing = card;
                true
            }
            None => {
                cards.push(card);
                false
            }
        }
    }

    pub async fn get(&self, name: &str) -> Option<AgentCard> {
        self.cards
            .read()
            .await
            .iter()
            .find(|c| c.name == name)
            .cloned()
    }

    /// Consistent copy of every registered card.
    pub async fn snapshot(&self) -> Vec<AgentCard> {
        self.cards.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.cards.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.cards.read().await.is_empty()
    }
}

// ─── Orchestrator ────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RegisterAgentParams {
    url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterAgentResult {
    pub registered: bool,
    pub agent: Option<String>,
}

pub struct Orchestrator {
    url: String,
    registry: AgentRegistry,
    http: reqwest::Client,
}

impl Orchestrator {
    /// `url` is advertised in this orchestrator's card; `delegation_timeout`
    /// bounds every outbound call to a peer.
    pub fn new(url: impl Into<String>, delegation_timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(delegation_timeout)
            .build()?;
        Ok(Self {
            url: url.into(),
            registry: AgentRegistry::new(),
            http,
        })
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    fn client(&self, url: &str) -> A2aClient {
        A2aClient::with_http(self.http.clone(), url)
    }

    /// Fetch the peer's card and store it under its name.
    pub async fn register_peer(&self, peer_url: &str) -> Result<AgentCard, ClientError> {
        let card = self.client(peer_url).get_agent_card().await?;
        let replaced = self.registry.insert(card.clone()).await;
        tracing::info!(
            "Registered agent: {} at {}{}",
            card.name,
            card.url,
            if replaced { " (replaced)" } else { "" }
        );
        Ok(card)
    }

    /// Registration never fails loudly: peers come and go.
    pub async fn register(&self, peer_url: &str) -> bool {
        match self.register_peer(peer_url).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("Error registering agent at {}: {}", peer_url, e);
                false
            }
        }
    }

    /// Answer discovery requests or route `content` to matching peers.
    pub async fn route(&self, content: &str) -> String {
        let content = content.trim().to_lowercase();
        let agents = self.registry.snapshot().await;

        if DISCOVERY_PHRASES.iter().any(|p| content.contains(p)) {
            return describe_agents(&agents);
        }

        let targets: Vec<(&Route, &AgentCard)> = ROUTES
            .iter()
            .filter(|route| route.matches(&content))
            .filter_map(|route| {
                agents
                    .iter()
                    .find(|card| card.name == route.agent)
                    .map(|card| (route, card))
            })
            .collect();

        if targets.is_empty() {
            let names: Vec<&str> = agents.iter().map(|c| c.name.as_str()).collect();
            return format!(
                "I'm not sure which agent can handle this task. Available agents: {}",
                names.join(", ")
            );
        }

        let content = content.as_str();
        let replies = futures::future::join_all(targets.into_iter().map(|(route, card)| async move {
            format!("{}: {}", route.label, self.delegate(card, content).await)
        }))
        .await;

        replies.join("\n\n")
    }

    /// Run `content` as a fresh task on `target` and return its reply.
    /// Failures come back as text prefixed with the target's name.
    pub async fn delegate(&self, target: &AgentCard, content: &str) -> String {
        tracing::debug!("Delegating to {} at {}", target.name, target.url);
        match self.client(&target.url).chat(content, None).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!("Delegation to {} failed: {}", target.name, e);
                format!("Error delegating to {}: {}", target.name, e)
            }
        }
    }
}

fn describe_agents(agents: &[AgentCard]) -> String {
    if agents.is_empty() {
        return NO_AGENTS_REGISTERED.to_string();
    }

    let mut out = format!("I have access to {} agent(s):\n\n", agents.len());
    for card in agents {
        out.push_str(&format!("**{}**\n", card.name));
        out.push_str(&format!("  Description: {}\n", card.description));
        out.push_str("  Skills:\n");
        for skill in &card.skills {
            out.push_str(&format!("    - {}: {}\n", skill.name, skill.description));
        }
        out.push('\n');
    }
    out
}

#[async_trait]
impl AgentHandler for Orchestrator {
    fn card(&self) -> AgentCard {
        AgentCard::new(
            ORCHESTRATOR_AGENT,
            "An orchestrator that coordinates tasks across multiple specialized agents",
            self.url.clone(),
            vec![
                Skill::text("orchestrate", "Coordinate tasks across multiple agents").with_parameter(
                    "task",
                    json!({
                        "type": "string",
                        "description": "Complex task that may require multiple agents"
                    }),
                ),
                Skill::text("discover_agents", "Discover and list available agents"),
            ],
        )
        .with_metadata("version", json!("1.0.0"))
        .with_metadata("type", json!("orchestrator"))
    }

    async fn handle(&self, _task_id: &str, message: &TaskMessage) -> anyhow::Result<String> {
        Ok(self.route(&message.content).await)
    }

    fn extension_methods(&self) -> &'static [&'static str] {
        &["registerAgent", "listAgents"]
    }

    async fn call_extension(&self, method: &str, params: JsonMap) -> Result<Value, JsonRpcError> {
        match method {
            "registerAgent" => {
                let p: RegisterAgentParams = parse_params(params)?;
                let result = match self.register_peer(&p.url).await {
                    Ok(card) => RegisterAgentResult {
                        registered: true,
                        agent: Some(card.name),
                    },
                    Err(e) => {
                        tracing::warn!("Error registering agent at {}: {}", p.url, e);
                        RegisterAgentResult {
                            registered: false,
                            agent: None,
                        }
                    }
                };
                to_result(&result)
            }
            "listAgents" => Ok(json!({ "agents": self.registry.snapshot().await })),
            other => Err(JsonRpcError::method_not_found(other)),
        }
    }
}
