//! SSR Gateway
//!
//! A server-side-rendering front door built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                  ┌────────────────────────────────────────────────────┐
//!                  │                    SSR GATEWAY                      │
//!                  │                                                     │
//!  Client Request  │  ┌──────────┐   ┌──────────┐   ┌───────────────┐   │
//!  ────────────────┼─▶│ compress │──▶│  nonce   │──▶│ static assets │───┼─▶ Served
//!                  │  └──────────┘   │  issuer  │   │ (hit → done)  │   │   (no CSP)
//!                  │                 └──────────┘   └──────┬────────┘   │
//!                  │                                  miss │            │
//!                  │                                       ▼            │
//!                  │  ┌──────────┐   ┌──────────┐   ┌───────────────┐   │
//!                  │  │ security │──▶│   rate   │──▶│    render     │   │
//!                  │  │ headers  │   │  limiter │   │  dispatcher   │───┼─▶ render
//!                  │  └──────────┘   └────┬─────┘   └──────┬────────┘   │   sidecar
//!                  │                 over │ limit          │            │
//!                  │                      ▼                ▼            │
//!  Client Response │                 429 + headers   placeholder →      │
//!  ◀───────────────┼─────────────────────────────────nonce, send        │
//!                  │                                                     │
//!                  │  ┌─────────────────────────────────────────────┐   │
//!                  │  │            Cross-Cutting Concerns            │   │
//!                  │  │  config · observability · lifecycle · HSTS   │   │
//!                  │  └─────────────────────────────────────────────┘   │
//!                  └────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ssr_gateway::config::resolve_config;
use ssr_gateway::http::HttpServer;
use ssr_gateway::lifecycle::Shutdown;
use ssr_gateway::render::HttpRenderEngine;

#[derive(Debug, Parser)]
#[command(name = "ssr-gateway", about = "SSR front door for the browser app")]
struct Args {
    /// Path to a TOML configuration file. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ssr_gateway=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("ssr-gateway v0.1.0 starting");

    let args = Args::parse();
    let config = resolve_config(args.config.as_deref())?;

    tracing::info!(
        bind_address = %config.listener.bind_address(),
        asset_root = %config.assets.root.display(),
        render_upstream = %config.render.upstream,
        rate_limit = config.rate_limit.max_requests,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => ssr_gateway::observability::metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let engine = Arc::new(HttpRenderEngine::new(&config.render.upstream)?);

    let listener = TcpListener::bind(config.listener.bind_address()).await?;
    let local_addr = listener.local_addr()?;
    tracing::info!(address = %local_addr, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, engine);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
