//! Fanout orchestrator server.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use fanout_core::OrchestrationRequest;
use fanout_server::http::{create_router, responses::OrchestrateResponse};
use fanout_server::{AgentRunner, AppState, ClaudeRunner, ConfigArgs, Orchestrator};

/// Run one prompt across N isolated agents.
#[derive(Parser, Debug)]
#[command(name = "fanout", version, about = "Run one prompt across N isolated agents")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the orchestration API
    Serve {
        /// HTTP server address
        #[arg(long, env = "FANOUT_BIND_ADDR", default_value = "0.0.0.0:8080")]
        bind_addr: String,

        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Run a single orchestration and print the report as JSON
    Run {
        /// Task for every agent
        #[arg(long)]
        prompt: String,

        /// Number of agents
        #[arg(long, default_value = "1")]
        agents: i64,

        #[command(flatten)]
        config: ConfigArgs,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so `run` can print the report on stdout
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("fanout=info".parse()?))
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve { bind_addr, config } => serve(config.into_config(bind_addr)?).await,
        Command::Run {
            prompt,
            agents,
            config,
        } => {
            let request = OrchestrationRequest::new(&prompt, agents)?;
            run_once(config.into_config(String::new())?, request).await
        }
    }
}

async fn serve(config: fanout_server::Config) -> Result<(), Box<dyn std::error::Error>> {
    let config = Arc::new(config);
    let runner = Arc::new(ClaudeRunner::new(config.claude.clone()));
    if let Err(e) = runner.ensure_ready() {
        warn!(error = %e, "Agent runner not ready; orchestration requests will fail");
    }

    let shutdown = CancellationToken::new();
    let state = AppState::with_shutdown(config.clone(), runner, shutdown.clone());
    let router = create_router(state);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!(
        bind_addr = %config.bind_addr,
        workspace = %config.workspace_root.display(),
        max_concurrent_agents = config.max_concurrent_agents,
        agent_timeout_secs = config.agent_timeout.as_secs(),
        "Fanout orchestrator listening"
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for shutdown signal");
                return;
            }
            info!("Shutting down, cancelling in-flight runs");
            shutdown.cancel();
        })
        .await?;

    info!("Fanout orchestrator stopped");
    Ok(())
}

async fn run_once(
    config: fanout_server::Config,
    request: OrchestrationRequest,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Arc::new(config);
    let runner = Arc::new(ClaudeRunner::new(config.claude.clone()));
    let orchestrator = Orchestrator::new(config, runner);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping agents");
            on_interrupt.cancel();
        }
    });

    let report = orchestrator.orchestrate(&request, cancel).await?;
    println!(
        "{}",
        serde_json::to_string_pretty(&OrchestrateResponse::from(report))?
    );
    Ok(())
}
