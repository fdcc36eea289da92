//! Gateway error definitions.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::render::RenderError;

/// Errors that abort a request inside the pipeline.
///
/// Every variant maps to the same generic 500 on the wire; the detail goes
/// to the log, never to the client. Rate-limit rejections and static-file
/// misses are not errors and never appear here.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The OS entropy source could not produce nonce bytes. Fatal to the
    /// request; there is no weaker fallback.
    #[error("entropy source failure: {0}")]
    Entropy(#[from] rand::Error),

    /// The external render capability failed. Propagated as-is; the client
    /// must never see partial or unsubstituted markup.
    #[error("render failed: {0}")]
    Render(#[from] RenderError),
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "Request aborted");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
    }
}
