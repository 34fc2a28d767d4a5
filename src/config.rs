//! Layered configuration.
//!
//! Compiled-in defaults, then `~/.a2a-mesh/config.toml` (or `--config`), then
//! `A2A_MESH__*` environment variables, e.g. `A2A_MESH__CLIENT__TIMEOUT_SECS=3`.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_PREFIX: &str = "A2A_MESH";
const CONFIG_FILE: &str = "config.toml";

/// `~/.a2a-mesh`
pub fn a2a_mesh_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".a2a-mesh")
}

pub fn default_config_path() -> PathBuf {
    a2a_mesh_home().join(CONFIG_FILE)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
    pub json: bool,
    /// Daily rolling log files are written here when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            directory: None,
        }
    }
}

/// Where one agent listens and how it advertises itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub bind: String,
    pub port: u16,
    /// URL placed in the agent card.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_url: Option<String>,
}

impl EndpointConfig {
    pub fn on_port(port: u16) -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port,
            public_url: None,
        }
    }

    /// The advertised URL. Unspecified bind addresses advertise `localhost`.
    pub fn card_url(&self) -> String {
        if let Some(url) = &self.public_url {
            return url.clone();
        }
        let host = match self.bind.as_str() {
            "0.0.0.0" | "::" | "[::]" | "" => "localhost",
            other => other,
        };
        format!("http://{}:{}", host, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentsConfig {
    pub calculator: EndpointConfig,
    pub translator: EndpointConfig,
    pub orchestrator: EndpointConfig,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            calculator: EndpointConfig::on_port(5001),
            translator: EndpointConfig::on_port(5002),
            orchestrator: EndpointConfig::on_port(5003),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self { timeout_secs: 10 }
    }
}

impl ClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub delegation_timeout_secs: u64,
    /// Peer URLs registered when the orchestrator starts.
    pub peers: Vec<String>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        let agents = AgentsConfig::default();
        Self {
            delegation_timeout_secs: 5,
            peers: vec![agents.calculator.card_url(), agents.translator.card_url()],
        }
    }
}

impl OrchestratorConfig {
    pub fn delegation_timeout(&self) -> Duration {
        Duration::from_secs(self.delegation_timeout_secs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub agents: AgentsConfig,
    pub client: ClientConfig,
    pub orchestrator: OrchestratorConfig,
}

impl Config {
    /// Load from `path` (the default location when `None`) plus the environment.
    ///
    /// An explicitly named file must exist; the default one is optional.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        Self::load_from(path, None)
    }

    fn load_from(
        path: Option<&Path>,
        env: Option<config::Map<String, String>>,
    ) -> anyhow::Result<Self> {
        let (file, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (default_config_path(), false),
        };

        let defaults = config::Config::try_from(&Config::default())
            .context("Failed to serialize default configuration")?;

        let settings = config::Config::builder()
            .add_source(defaults)
            .add_source(
                config::File::from(file.as_path())
                    .format(config::FileFormat::Toml)
                    .required(required),
            )
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("orchestrator.peers")
                    .source(env),
            )
            .build()
            .with_context(|| format!("Failed to load configuration from {}", file.display()))?;

        let cfg: Config = settings
            .try_deserialize()
            .context("Invalid configuration")?;
        tracing::debug!("Loaded configuration (file: {})", file.display());
        Ok(cfg)
    }

    /// The effective configuration as TOML.
    pub fn to_toml(&self) -> anyhow::Result<String> {
        toml::to_string_pretty(self).context("Failed to render configuration as TOML")
    }
}
