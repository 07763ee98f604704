//! # Main Entry Point
//!
//! Loads the configuration, installs logging and serves the `AIProjectHelper` gRPC service:
//! - Domain: Configuration
//! - Infrastructure: LLM client, executors
//! - Application: Agent, Fetcher, Workspaces, Logging
//! - Interface: gRPC service

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tonic::transport::Server;

use project_helper::application::logging;
use project_helper::domain::config::AppConfig;
use project_helper::infrastructure::llm::Client as LlmClient;
use project_helper::interface::grpc::HelperService;
use project_helper::interface::proto::ai_project_helper_server::AiProjectHelperServer;
use project_helper::strings::logs;

#[derive(Debug, Parser)]
#[command(name = "project-helper", version, about = "LLM plan execution service")]
struct Args {
    /// Path to the YAML configuration file
    #[arg(long, env = "PROJECT_HELPER_CONFIG", default_value = "data/config.yaml")]
    config: PathBuf,

    /// Overrides `server.listen_addr`
    #[arg(long)]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 1. Load Configuration
    let mut config = AppConfig::load(&args.config)?;
    if let Some(listen) = args.listen {
        config.server.listen_addr = listen;
    }

    // 2. Logging Setup
    let _guard = logging::init(&config.logging).context("Failed to initialize logging")?;
    tracing::info!("{}", logs::SERVER_STARTING);

    // 3. Infrastructure
    let llm = Arc::new(LlmClient::new(config.llm.clone()));

    // 4. Service
    let addr: SocketAddr = config
        .server
        .listen_addr
        .parse()
        .with_context(|| format!("Invalid listen address '{}'", config.server.listen_addr))?;
    let keepalive = Duration::from_secs(config.server.keepalive_secs);
    let keepalive_timeout = Duration::from_secs(config.server.keepalive_timeout_secs);
    let service = HelperService::new(config, llm);

    tracing::info!("Listening on {}", addr);
    Server::builder()
        .http2_keepalive_interval(Some(keepalive))
        .http2_keepalive_timeout(Some(keepalive_timeout))
        .add_service(AiProjectHelperServer::new(service))
        .serve_with_shutdown(addr, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for ctrl-c: {}", e);
            }
            tracing::info!("{}", logs::SHUTDOWN);
        })
        .await
        .context("gRPC server failed")?;

    Ok(())
}
