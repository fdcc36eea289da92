//! Per-request CSP nonce issuance.
//!
//! Every request entering the pipeline receives one fresh random token. The
//! token is a security boundary: the content-security policy admits inline
//! scripts and styles only when they carry it, so it must come from the OS
//! CSPRNG. A predictable generator here is a correctness bug, not a style
//! choice.

use std::sync::Arc;

use axum::{
    body::Body,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use rand::{rngs::OsRng, RngCore};

use crate::http::error::GatewayError;

/// Random bytes backing each nonce; 64 hex characters once encoded.
pub const NONCE_BYTES: usize = 32;

/// A single request's CSP nonce.
///
/// Cheap to clone; lives in request extensions from pipeline entry until the
/// response completes, and is never persisted or reused. The exact value
/// must appear both in the `Content-Security-Policy` header and in the
/// substituted document body — the two are compared by browsers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CspNonce(Arc<str>);

impl CspNonce {
    /// Issue a fresh nonce from the OS entropy source.
    ///
    /// The only failure mode is the entropy source itself failing, which is
    /// fatal to the request. Callers must propagate it rather than fall back
    /// to a weaker generator.
    pub fn issue() -> Result<Self, rand::Error> {
        let mut bytes = [0u8; NONCE_BYTES];
        OsRng.try_fill_bytes(&mut bytes)?;
        Ok(Self(hex::encode(bytes).into()))
    }

    /// The hex-encoded nonce value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CspNonce {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Middleware: attach a fresh nonce to the request before any downstream
/// stage reads it.
pub async fn issue_nonce(mut request: Request<Body>, next: Next) -> Response {
    let nonce = match CspNonce::issue() {
        Ok(nonce) => nonce,
        Err(e) => return GatewayError::Entropy(e).into_response(),
    };
    request.extensions_mut().insert(nonce);
    next.run(request).await
}
