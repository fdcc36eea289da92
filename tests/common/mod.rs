//! Shared utilities for gateway integration tests.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use ssr_gateway::config::GatewayConfig;
use ssr_gateway::http::HttpServer;
use ssr_gateway::lifecycle::Shutdown;
use ssr_gateway::render::{RenderEngine, RenderError, RenderRequest};

/// Base document the stub renderer returns: two nonce placeholders, one on
/// a script and one on a style, exactly like the built shell.
pub const DOCUMENT: &str = concat!(
    "<html><head>",
    "<script nonce=\"randomNonceGoesHere\">bootstrap()</script>",
    "<style nonce=\"randomNonceGoesHere\">body{}</style>",
    "</head><body>app shell</body></html>"
);

/// Renderer returning a fixed document.
pub struct StubRenderer(pub String);

#[async_trait]
impl RenderEngine for StubRenderer {
    async fn render(&self, _request: RenderRequest) -> Result<String, RenderError> {
        Ok(self.0.clone())
    }
}

/// Renderer that always fails, for the error path.
#[allow(dead_code)]
pub struct FailingRenderer;

#[async_trait]
impl RenderEngine for FailingRenderer {
    async fn render(&self, _request: RenderRequest) -> Result<String, RenderError> {
        Err(RenderError::Transport("render sidecar offline".into()))
    }
}

/// Renderer that remembers the last request it was handed.
#[allow(dead_code)]
#[derive(Default)]
pub struct RecordingRenderer {
    pub last: Mutex<Option<RenderRequest>>,
}

#[async_trait]
impl RenderEngine for RecordingRenderer {
    async fn render(&self, request: RenderRequest) -> Result<String, RenderError> {
        *self.last.lock().await = Some(request);
        Ok(DOCUMENT.to_string())
    }
}

/// A running gateway on an ephemeral port. Shuts down on drop.
pub struct TestGateway {
    pub addr: SocketAddr,
    shutdown: Shutdown,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Defaults suitable for tests: metrics exporter off, everything else as
/// shipped.
pub fn test_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.observability.metrics_enabled = false;
    config
}

/// Start a gateway with the given config and engine.
pub async fn start_gateway(config: GatewayConfig, engine: Arc<dyn RenderEngine>) -> TestGateway {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();
    let server = HttpServer::new(config, engine);
    tokio::spawn(async move {
        let _ = server.run(listener, receiver).await;
    });

    TestGateway { addr, shutdown }
}

/// Fresh non-pooled client so requests cannot ride a stale connection.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Write a small built-bundle fixture under `root`.
#[allow(dead_code)]
pub fn write_bundle(root: &Path) {
    std::fs::write(root.join("app.3f2a.js"), "console.log('bundle')").unwrap();
    std::fs::write(root.join("styles.9c1d.css"), "body{margin:0}").unwrap();
    std::fs::write(
        root.join("index.csr.html"),
        "<html><head></head><body>shell</body></html>",
    )
    .unwrap();
}

/// Pull the nonce value out of a Content-Security-Policy header.
#[allow(dead_code)]
pub fn extract_nonce(csp: &str) -> String {
    let start = csp.find("'nonce-").expect("policy has a nonce source") + "'nonce-".len();
    let len = csp[start..].find('\'').expect("nonce source is terminated");
    csp[start..start + len].to_string()
}
