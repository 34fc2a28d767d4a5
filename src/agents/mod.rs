//! Built-in agents served by `a2a-mesh serve`.

pub mod arith;
pub mod calculator;
pub mod translator;

pub use calculator::CalculatorAgent;
pub use translator::TranslatorAgent;

use crate::a2a::handler::AgentHandler;
use crate::a2a::orchestrator::Orchestrator;
use crate::config::{Config, EndpointConfig};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum AgentKind {
    Calculator,
    Translator,
    Orchestrator,
}

impl AgentKind {
    pub fn endpoint(self, cfg: &Config) -> &EndpointConfig {
        match self {
            AgentKind::Calculator => &cfg.agents.calculator,
            AgentKind::Translator => &cfg.agents.translator,
            AgentKind::Orchestrator => &cfg.agents.orchestrator,
        }
    }
}

/// Construct the agent advertised at `url`. An orchestrator registers
/// `peers` before it is returned; unreachable peers are logged and skipped.
pub async fn build_agent(
    kind: AgentKind,
    url: String,
    cfg: &Config,
    peers: &[String],
) -> anyhow::Result<Arc<dyn AgentHandler>> {
    Ok(match kind {
        AgentKind::Calculator => Arc::new(CalculatorAgent::new(url)),
        AgentKind::Translator => Arc::new(TranslatorAgent::new(url)),
        AgentKind::Orchestrator => {
            let orchestrator = Orchestrator::new(url, cfg.orchestrator.delegation_timeout())?;
            for peer in peers {
                orchestrator.register(peer).await;
            }
            tracing::info!(
                "Orchestrator ready with {} registered agent(s)",
                orchestrator.registry().len().await
            );
            Arc::new(orchestrator)
        }
    })
}
