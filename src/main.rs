mod auth;
mod capabilities;
mod cli;
mod client;
mod config;
mod error;
mod http_router;
mod lifecycle;
mod logging;
mod mcp;

use auth::AuthGate;
use capabilities::CapabilityRegistry;
use clap::Parser;
use cli::{Args, ServerMode};
use client::{NextcloudClient, RemoteClient};
use config::Config;
use lifecycle::ClientLifecycle;
use mcp::NextcloudMcpService;
use rmcp::{ServiceExt, transport::stdio};
use std::error::Error;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let mode = args.mode()?;

    logging::init("info").map_err(|e| e as Box<dyn Error>)?;

    let config = Config::load(args.config.as_deref())
        .inspect_err(|e| error!("failed to load configuration: {e}"))?;
    debug!(?config, "configuration loaded");

    let gate = AuthGate::new(config.bearer_token.clone());
    let lifecycle = ClientLifecycle::new(move || {
        Ok(Arc::new(NextcloudClient::new(&config)?) as Arc<dyn RemoteClient>)
    });

    let result = run(mode, &lifecycle, gate).await;
    if let Err(e) = &result {
        error!("server stopped with an error: {e}");
    }

    lifecycle.shutdown().await;
    result
}

async fn run(
    mode: ServerMode,
    lifecycle: &ClientLifecycle,
    gate: AuthGate,
) -> Result<(), Box<dyn Error>> {
    let client = lifecycle.start().await?;
    let registry = Arc::new(CapabilityRegistry::new(client));

    match mode {
        ServerMode::Stdio => {
            info!("starting MCP server on stdio");
            let service = NextcloudMcpService::new(registry).serve(stdio()).await?;

            // Wait for either service completion or Ctrl-C
            tokio::select! {
                result = service.waiting() => {
                    let reason = result?;
                    info!(?reason, "stdio session ended");
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("received Ctrl-C, shutting down");
                }
            }
        }
        ServerMode::Http { addr } => {
            if !gate.is_enabled() {
                warn!("no bearer token configured, /mcp accepts unauthenticated calls");
            }

            let router = http_router::build_router(registry, gate);
            let listener = tokio::net::TcpListener::bind(addr).await?;

            info!("HTTP MCP server listening on http://{addr}/mcp");
            info!("Tools documentation available at http://{addr}/tools");

            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    tokio::signal::ctrl_c().await.ok();
                    info!("received Ctrl-C, shutting down");
                })
                .await?;
        }
    }

    Ok(())
}
