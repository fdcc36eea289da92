//! Static asset serving with the gateway's caching policy.
//!
//! A middleware in front of `ServeDir`: it decides whether the request maps
//! to a real file under the asset root, answers conditional requests from
//! the stat alone, and otherwise lets `ServeDir` stream the file while this
//! layer overrides the caching headers. A miss is not an error; control
//! passes to the render dispatcher.

use std::path::{Path, PathBuf};

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Method, Request, StatusCode, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tower::ServiceExt;

use crate::assets::etag::{matches_if_none_match, weak_etag};
use crate::http::server::AppState;

/// Mount alias the browser bundle may use for hashed assets; retried with
/// the prefix stripped when the literal path misses.
const ASSETS_ALIAS: &str = "/assets";

/// One year, for content-hashed bundle files.
const IMMUTABLE_CACHE: HeaderValue = HeaderValue::from_static("public, max-age=31536000");

/// HTML shells must always be revalidated so updated asset references and
/// nonces are picked up.
const HTML_CACHE: HeaderValue = HeaderValue::from_static("no-cache, no-store, must-revalidate");

/// A request path that resolved to a real file.
struct StaticHit {
    meta: std::fs::Metadata,
    /// URI path `ServeDir` should see (alias prefix already stripped).
    serve_path: String,
}

/// Cache directive for a resolved file path.
fn cache_policy(serve_path: &str) -> HeaderValue {
    if serve_path.ends_with(".html") {
        HTML_CACHE
    } else {
        IMMUTABLE_CACHE
    }
}

/// Map a URI path onto the asset root, refusing anything that could step
/// outside it. Returns `None` for the bare root; directory indexes are not
/// served, so `/` always falls through to rendering.
fn sanitize(root: &Path, uri_path: &str) -> Option<PathBuf> {
    let mut path = root.to_path_buf();
    for component in uri_path.split('/') {
        if component.is_empty() {
            continue;
        }
        if component == "." || component == ".." || component.contains('\\') {
            return None;
        }
        path.push(component);
    }
    (path != root).then_some(path)
}

async fn stat(root: &Path, uri_path: &str) -> Option<StaticHit> {
    let fs_path = sanitize(root, uri_path)?;
    let meta = tokio::fs::metadata(&fs_path).await.ok()?;
    meta.is_file().then(|| StaticHit {
        meta,
        serve_path: uri_path.to_string(),
    })
}

/// Resolve the request path, first literally, then with the `/assets` alias
/// stripped.
async fn lookup(root: &Path, uri_path: &str) -> Option<StaticHit> {
    if let Some(hit) = stat(root, uri_path).await {
        return Some(hit);
    }
    let stripped = uri_path.strip_prefix(ASSETS_ALIAS)?;
    if !stripped.starts_with('/') {
        return None;
    }
    stat(root, stripped).await
}

/// Middleware: serve a file under the asset root, or pass control on.
pub async fn serve_assets(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    if request.method() != Method::GET && request.method() != Method::HEAD {
        return next.run(request).await;
    }

    let uri_path = request.uri().path().to_owned();
    let Some(hit) = lookup(&state.config.assets.root, &uri_path).await else {
        return next.run(request).await;
    };

    let etag = weak_etag(&hit.meta);
    let cache = cache_policy(&hit.serve_path);

    let Ok(etag_value) = HeaderValue::from_str(&etag) else {
        return next.run(request).await;
    };

    if matches_if_none_match(request.headers(), &etag) {
        let mut response = StatusCode::NOT_MODIFIED.into_response();
        response.headers_mut().insert(header::ETAG, etag_value);
        response.headers_mut().insert(header::CACHE_CONTROL, cache);
        return response;
    }

    if hit.serve_path != uri_path {
        if let Ok(rewritten) = hit.serve_path.parse::<Uri>() {
            *request.uri_mut() = rewritten;
        }
    }

    let mut response = match state.static_files.clone().oneshot(request).await {
        Ok(response) => response.map(Body::new),
        Err(infallible) => match infallible {},
    };

    if response.status().is_success() || response.status().is_redirection() {
        response.headers_mut().insert(header::CACHE_CONTROL, cache);
        response.headers_mut().insert(header::ETAG, etag_value);
    }
    response
}
