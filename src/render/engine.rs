//! The external render capability seam.
//!
//! The pipeline never renders HTML itself; it calls an opaque capability
//! that turns a URL into a markup string. The trait keeps the dispatcher
//! testable with stub engines, and the production implementation speaks
//! JSON-over-HTTP to a render sidecar.

use std::path::PathBuf;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode, Uri};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use serde::Serialize;
use thiserror::Error;

/// Largest markup payload accepted from the renderer.
const MAX_MARKUP_BYTES: usize = 32 * 1024 * 1024;

/// Everything the renderer needs for one document.
#[derive(Debug, Clone, Serialize)]
pub struct RenderRequest {
    /// The application's server bootstrap entry.
    pub bootstrap: String,
    /// Path to the base HTML document (the shell carrying the nonce
    /// placeholder).
    pub document: PathBuf,
    /// Fully-qualified URL being rendered, reconstructed from the incoming
    /// request.
    pub url: String,
    /// Asset root, handed to the renderer as its public path.
    pub public_path: PathBuf,
    /// Base href injected via the renderer's provider override.
    pub base_href: String,
}

/// Errors from the render capability.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The sidecar answered with a non-success status.
    #[error("render upstream returned {0}")]
    UpstreamStatus(StatusCode),

    /// The sidecar could not be reached or the exchange broke mid-flight.
    #[error("render transport error: {0}")]
    Transport(String),

    /// The sidecar answered but the markup could not be read.
    #[error("render response unreadable: {0}")]
    Body(String),
}

/// The render capability. Implementations must be safe to share across
/// concurrent requests; the gateway holds one instance for its lifetime and
/// never constructs engines ambiently.
#[async_trait]
pub trait RenderEngine: Send + Sync {
    /// Render the document for `request`, returning the full markup string.
    ///
    /// No retries: a failed render is surfaced, not masked, because a
    /// second attempt within the same request risks a nonce/header
    /// mismatch.
    async fn render(&self, request: RenderRequest) -> Result<String, RenderError>;
}

/// Production engine: POSTs the render request as JSON to a sidecar and
/// reads back the markup.
///
/// Dropping the request future drops the upstream call with it, so a client
/// that disconnects mid-render does not pin per-request state.
pub struct HttpRenderEngine {
    client: Client<HttpConnector, Body>,
    upstream: Uri,
}

impl HttpRenderEngine {
    pub fn new(upstream: &str) -> Result<Self, RenderError> {
        let upstream = upstream
            .parse::<Uri>()
            .map_err(|e| RenderError::Transport(format!("invalid upstream {upstream:?}: {e}")))?;
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Ok(Self { client, upstream })
    }
}

#[async_trait]
impl RenderEngine for HttpRenderEngine {
    async fn render(&self, request: RenderRequest) -> Result<String, RenderError> {
        let payload =
            serde_json::to_vec(&request).map_err(|e| RenderError::Body(e.to_string()))?;

        let req = Request::builder()
            .method(Method::POST)
            .uri(self.upstream.clone())
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(payload))
            .map_err(|e| RenderError::Transport(e.to_string()))?;

        let response = self
            .client
            .request(req)
            .await
            .map_err(|e| RenderError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RenderError::UpstreamStatus(status));
        }

        let bytes = axum::body::to_bytes(Body::new(response.into_body()), MAX_MARKUP_BYTES)
            .await
            .map_err(|e| RenderError::Body(e.to_string()))?;

        String::from_utf8(bytes.to_vec()).map_err(|e| RenderError::Body(e.to_string()))
    }
}
