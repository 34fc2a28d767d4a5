//! a2a-mesh - run and talk to A2A agents
//!
//! ## Commands
//!
//! - `serve`: run one agent (calculator, translator or orchestrator)
//! - `card`, `health`, `tasks`, `task`, `chat`: client calls against an agent
//! - `register`: register a peer with an orchestrator
//! - `config`: print the effective configuration

use a2a_mesh::a2a::client::A2aClient;
use a2a_mesh::a2a::handler::AgentRuntime;
use a2a_mesh::a2a::server::{ServeParams, start_server};
use a2a_mesh::a2a::types::JsonMap;
use a2a_mesh::agents::{AgentKind, build_agent};
use a2a_mesh::config::{Config, EndpointConfig};
use a2a_mesh::logging::init_tracing;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "a2a-mesh")]
#[command(version = a2a_mesh::VERSION)]
#[command(about = "Agent-to-agent task protocol: agents, client and orchestrator", long_about = None)]
struct Cli {
    /// Configuration file (default: ~/.a2a-mesh/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one agent until Ctrl-C
    Serve {
        #[arg(value_enum)]
        agent: AgentKind,

        /// Address to bind (overrides the config)
        #[arg(long)]
        bind: Option<String>,

        /// Port to listen on (overrides the config)
        #[arg(short, long)]
        port: Option<u16>,

        /// URL advertised in the agent card
        #[arg(long)]
        public_url: Option<String>,

        /// Peer URL to register (orchestrator only, repeatable; replaces configured peers)
        #[arg(long = "peer")]
        peers: Vec<String>,
    },

    /// Fetch an agent's card
    Card {
        /// Agent URL (default: the configured orchestrator)
        #[arg(short, long)]
        url: Option<String>,
    },

    /// Check an agent's liveness
    Health {
        #[arg(short, long)]
        url: Option<String>,
    },

    /// List an agent's tasks
    Tasks {
        #[arg(short, long)]
        url: Option<String>,
    },

    /// Show one task
    Task {
        #[arg(short, long)]
        url: Option<String>,

        /// Task id
        #[arg(long)]
        id: String,
    },

    /// Send a message and print the agent's reply
    Chat {
        #[arg(short, long)]
        url: Option<String>,

        /// Continue an existing task instead of creating one
        #[arg(long)]
        task_id: Option<String>,

        /// Message text
        message: String,
    },

    /// Register a peer agent with an orchestrator
    Register {
        /// Orchestrator URL
        #[arg(short, long)]
        url: Option<String>,

        /// Peer agent URL
        peer: String,
    },

    /// Print the effective configuration as TOML
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut cfg = Config::load(cli.config.as_deref())?;
    if cli.json {
        cfg.logging.json = true;
    }
    let _log_guard = init_tracing(&cfg.logging, cli.verbose);

    match cli.command {
        Commands::Serve {
            agent,
            bind,
            port,
            public_url,
            peers,
        } => cmd_serve(&cfg, agent, bind, port, public_url, peers).await,
        Commands::Card { url } => {
            let client = client_for(&cfg, url)?;
            print_json(&client.get_agent_card().await?)
        }
        Commands::Health { url } => {
            let client = client_for(&cfg, url)?;
            print_json(&client.health_check().await?)
        }
        Commands::Tasks { url } => {
            let client = client_for(&cfg, url)?;
            print_json(&client.list_tasks().await?)
        }
        Commands::Task { url, id } => {
            let client = client_for(&cfg, url)?;
            print_json(&client.get_task(&id).await?)
        }
        Commands::Chat {
            url,
            task_id,
            message,
        } => {
            let client = client_for(&cfg, url)?;
            let reply = client.chat(&message, task_id.as_deref()).await?;
            println!("{}", reply);
            Ok(())
        }
        Commands::Register { url, peer } => {
            let client = client_for(&cfg, url)?;
            let mut params = JsonMap::new();
            params.insert("url".to_string(), Value::String(peer));
            print_json(&client.call("registerAgent", Some(params)).await?)
        }
        Commands::Config => {
            print!("{}", cfg.to_toml()?);
            Ok(())
        }
    }
}

async fn cmd_serve(
    cfg: &Config,
    kind: AgentKind,
    bind: Option<String>,
    port: Option<u16>,
    public_url: Option<String>,
    peers: Vec<String>,
) -> Result<()> {
    let configured = kind.endpoint(cfg);
    let endpoint = EndpointConfig {
        bind: bind.unwrap_or_else(|| configured.bind.clone()),
        port: port.unwrap_or(configured.port),
        public_url: public_url.or_else(|| configured.public_url.clone()),
    };
    let peers = if peers.is_empty() {
        cfg.orchestrator.peers.clone()
    } else {
        peers
    };

    let agent = build_agent(kind, endpoint.card_url(), cfg, &peers)
        .await
        .context("Failed to build agent")?;
    let params = ServeParams {
        bind: endpoint.bind,
        port: endpoint.port,
    };
    start_server(AgentRuntime::new(agent), &params).await
}

fn client_for(cfg: &Config, url: Option<String>) -> Result<A2aClient> {
    let url = url.unwrap_or_else(|| cfg.agents.orchestrator.card_url());
    A2aClient::new(url, cfg.client.timeout()).context("Failed to build HTTP client")
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
