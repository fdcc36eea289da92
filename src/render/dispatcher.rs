//! Terminal render dispatch.
//!
//! Any request the static stage did not satisfy ends up here. The dispatcher
//! reconstructs the full URL, invokes the render capability, and performs
//! the single nonce-substitution pass over the returned markup before the
//! response leaves the process.

use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{header, Method, Request, StatusCode},
    response::{Html, IntoResponse, Response},
    Extension,
};

use crate::http::error::GatewayError;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::render::engine::RenderRequest;
use crate::security::nonce::CspNonce;

/// Literal token the base document carries wherever a nonce-bearing
/// attribute is required. Build-time contract with the document template.
pub const NONCE_PLACEHOLDER: &str = "randomNonceGoesHere";

/// Router fallback: render the application for this URL.
///
/// Only GET and HEAD reach the renderer; anything else on an unmatched path
/// is a plain 404. The substitution reuses the nonce already issued for this
/// request — minting a fresh value here would contradict the CSP header
/// already composed around the issued one, and the browser would refuse the
/// page's scripts.
pub async fn render_document(
    State(state): State<AppState>,
    Extension(nonce): Extension<CspNonce>,
    request: Request<Body>,
) -> Result<Response, GatewayError> {
    let start = Instant::now();

    if request.method() != Method::GET && request.method() != Method::HEAD {
        return Ok((StatusCode::NOT_FOUND, "Not Found").into_response());
    }

    let Some(full_url) = reconstruct_url(&request) else {
        return Ok((StatusCode::BAD_REQUEST, "Missing Host header").into_response());
    };

    let render_request = RenderRequest {
        bootstrap: state.config.render.bootstrap.clone(),
        document: state.config.assets.document.clone(),
        url: full_url.clone(),
        public_path: state.config.assets.root.clone(),
        base_href: "/".to_string(),
    };

    tracing::debug!(url = %full_url, "Dispatching render");

    let markup = match state.engine.render(render_request).await {
        Ok(markup) => markup,
        Err(e) => {
            metrics::record_render("failure", start);
            return Err(GatewayError::Render(e));
        }
    };

    let document = substitute_nonce(&markup, &nonce);
    metrics::record_render("success", start);

    Ok(Html(document).into_response())
}

/// Replace every literal placeholder occurrence with the request's nonce.
/// Exactly one pass; the document is never cached, so the substituted nonce
/// can never leak into another request.
pub fn substitute_nonce(markup: &str, nonce: &CspNonce) -> String {
    markup.replace(NONCE_PLACEHOLDER, nonce.as_str())
}

/// Rebuild the fully-qualified URL the client asked for: forwarded protocol
/// when a proxy supplied one, then authority, then the original path and
/// query.
fn reconstruct_url(request: &Request<Body>) -> Option<String> {
    let protocol = request
        .headers()
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");

    let host = request
        .uri()
        .authority()
        .map(|a| a.as_str())
        .or_else(|| {
            request
                .headers()
                .get(header::HOST)
                .and_then(|v| v.to_str().ok())
        })?;

    let path_and_query = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    Some(format!("{protocol}://{host}{path_and_query}"))
}
