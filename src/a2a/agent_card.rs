//! Agent Card: the self-describing metadata every agent exposes through
//! `getAgentCard` and `.well-known/agent.json`.

use crate::a2a::types::JsonMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Interaction modes an agent or skill can support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionMode {
    Text,
    Form,
    Audio,
    Video,
    File,
}

fn text_only() -> Vec<InteractionMode> {
    vec![InteractionMode::Text]
}

fn default_card_version() -> String {
    "1.0".to_string()
}

/// A skill an agent can perform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skill {
    pub name: String,
    pub description: String,
    /// Parameter name → schema-like description.
    #[serde(default)]
    pub parameters: JsonMap,
    #[serde(default = "text_only")]
    pub interaction_modes: Vec<InteractionMode>,
}

impl Skill {
    /// A text-mode skill with no parameters.
    pub fn text(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: JsonMap::new(),
            interaction_modes: text_only(),
        }
    }

    pub fn with_parameter(mut self, name: impl Into<String>, schema: Value) -> Self {
        self.parameters.insert(name.into(), schema);
        self
    }
}

/// Capability card describing an agent and how to reach it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentCard {
    pub name: String,
    pub description: String,
    /// JSON-RPC endpoint of the agent.
    pub url: String,
    #[serde(default = "default_card_version")]
    pub version: String,
    #[serde(default)]
    pub skills: Vec<Skill>,
    #[serde(default = "text_only")]
    pub supported_interaction_modes: Vec<InteractionMode>,
    #[serde(default)]
    pub metadata: JsonMap,
}

impl AgentCard {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        url: impl Into<String>,
        skills: Vec<Skill>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            url: url.into(),
            version: default_card_version(),
            skills,
            supported_interaction_modes: text_only(),
            metadata: JsonMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn has_skill(&self, name: &str) -> bool {
        self.skills.iter().any(|s| s.name == name)
    }
}
