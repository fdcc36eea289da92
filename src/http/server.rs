//! HTTP server setup and pipeline wiring.
//!
//! # Responsibilities
//! - Build the Axum router with the pipeline stages in their fixed order
//! - Wire ambient middleware (tracing, request ID, timeout)
//! - Bind the server to a listener and serve until shutdown
//!
//! # Stage order
//! Request-side, outermost first: trace → request-id → timeout → HSTS →
//! compression → nonce issue → static assets → security headers → rate
//! limit → render dispatch. A static hit short-circuits before the header
//! composer and the limiter, so static responses carry no CSP and consume
//! no quota; a rate-limit rejection passes back out through the header
//! composer and does.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{middleware, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    compression::{predicate::SizeAbove, CompressionLayer},
    services::ServeDir,
    timeout::TimeoutLayer,
    trace::TraceLayer,
    CompressionLevel,
};

use crate::config::{CompressionConfig, GatewayConfig};
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::render::{render_document, RenderEngine};
use crate::security::headers::{hsts_layer, security_headers, SecurityHeaders};
use crate::security::nonce::issue_nonce;
use crate::security::rate_limit::{rate_limit_middleware, RateLimiter};

/// Application state injected into handlers and stateful middleware.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub security: Arc<SecurityHeaders>,
    pub engine: Arc<dyn RenderEngine>,
    pub static_files: ServeDir,
    pub rate_limiter: Arc<RateLimiter>,
}

/// HTTP server for the SSR gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
    rate_limiter: Arc<RateLimiter>,
}

impl HttpServer {
    /// Create a new server. The render capability is constructed by the
    /// caller and passed in; nothing in the pipeline reaches for it
    /// ambiently.
    pub fn new(config: GatewayConfig, engine: Arc<dyn RenderEngine>) -> Self {
        let rate_limiter = Arc::new(RateLimiter::new(&config.rate_limit));
        let static_files =
            ServeDir::new(&config.assets.root).append_index_html_on_directories(false);

        let state = AppState {
            config: Arc::new(config.clone()),
            security: Arc::new(SecurityHeaders::new()),
            engine,
            static_files,
            rate_limiter: rate_limiter.clone(),
        };

        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            rate_limiter,
        }
    }

    /// Build the Axum router. Layers apply bottom-up: the last one added is
    /// the outermost, so the list below reads inside-out.
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        Router::new()
            .fallback(render_document)
            .layer(middleware::from_fn_with_state(
                state.clone(),
                rate_limit_middleware,
            ))
            .layer(middleware::from_fn_with_state(
                state.clone(),
                security_headers,
            ))
            .layer(middleware::from_fn_with_state(
                state.clone(),
                crate::assets::serve_assets,
            ))
            .layer(middleware::from_fn(issue_nonce))
            .layer(compression_layer(&config.compression))
            .layer(hsts_layer())
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.timeouts.request_secs,
            )))
            .layer(propagate_request_id_layer())
            .layer(set_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Run the server until the shutdown channel fires or Ctrl-C arrives.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        if self.config.rate_limit.enabled {
            self.rate_limiter.spawn_sweeper(
                Duration::from_secs(self.config.rate_limit.sweep_interval_secs),
                shutdown.resubscribe(),
            );
        }

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

/// Body compression above the configured threshold.
fn compression_layer(config: &CompressionConfig) -> CompressionLayer<SizeAbove> {
    CompressionLayer::new()
        .gzip(true)
        .deflate(true)
        .quality(CompressionLevel::Precise(config.level))
        .compress_when(SizeAbove::new(config.min_size))
}

/// Wait for Ctrl-C or an explicit shutdown trigger.
async fn shutdown_signal(mut shutdown: broadcast::Receiver<()>) {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
        _ = shutdown.recv() => {
            tracing::info!("Shutdown triggered");
        }
    }
}
