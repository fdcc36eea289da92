//! Security header composition.
//!
//! # Responsibilities
//! - Build the per-request Content-Security-Policy around the issued nonce
//! - Emit the fixed hardening header set on every rendered response
//! - Provide the Strict-Transport-Security layer applied to all responses
//!
//! # Design Decisions
//! - The policy's non-nonce parts are assembled once at startup; only the
//!   nonce is interpolated per request. A process-wide cached header value
//!   would be incorrect because the nonce changes every request.
//! - Header composition touches response headers only, never the body.

use axum::{
    body::Body,
    extract::State,
    http::{
        header::{self, HeaderMap, HeaderName, HeaderValue},
        Request,
    },
    middleware::Next,
    response::Response,
    Extension,
};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::http::server::AppState;
use crate::security::nonce::CspNonce;

/// One CSP source token. `Nonce` marks where the per-request value goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// A literal source expression, quoted where CSP requires it.
    Token(&'static str),
    /// Placeholder for the request nonce, rendered as `'nonce-<value>'`.
    Nonce,
}

/// A single CSP directive: its name plus an ordered source list.
#[derive(Debug, Clone)]
struct Directive {
    name: &'static str,
    sources: &'static [Source],
}

/// The content-security policy served with rendered documents.
///
/// Directive values follow the deployment contract: `'self'`-restricted
/// defaults, `'strict-dynamic'` script loading gated on the request nonce,
/// and framing disabled outright.
#[derive(Debug, Clone)]
pub struct SecurityPolicy {
    directives: Vec<Directive>,
}

impl SecurityPolicy {
    /// The gateway's policy: explicit directives for the app's needs plus
    /// the conventional hardening baseline (`base-uri`, `form-action`,
    /// `object-src`, `script-src-attr`, `upgrade-insecure-requests`).
    pub fn hardened() -> Self {
        use Source::{Nonce, Token};
        const SELF: Source = Token("'self'");

        let directives = vec![
            Directive { name: "default-src", sources: &[SELF] },
            Directive { name: "base-uri", sources: &[SELF] },
            Directive { name: "connect-src", sources: &[SELF] },
            Directive { name: "font-src", sources: &[SELF, Token("data:")] },
            Directive { name: "form-action", sources: &[SELF] },
            Directive { name: "frame-ancestors", sources: &[Token("'none'")] },
            Directive { name: "img-src", sources: &[SELF, Token("data:"), Token("blob:")] },
            Directive { name: "object-src", sources: &[Token("'none'")] },
            Directive { name: "script-src", sources: &[SELF, Token("'strict-dynamic'"), Nonce] },
            Directive { name: "script-src-attr", sources: &[Token("'none'")] },
            Directive { name: "style-src", sources: &[SELF, Nonce] },
            Directive { name: "upgrade-insecure-requests", sources: &[] },
        ];

        Self { directives }
    }

    /// Render the header value with `nonce` interpolated into `script-src`
    /// and `style-src`. Called once per request.
    pub fn render(&self, nonce: &CspNonce) -> String {
        let mut out = String::with_capacity(512);
        for (i, directive) in self.directives.iter().enumerate() {
            if i > 0 {
                out.push_str("; ");
            }
            out.push_str(directive.name);
            for source in directive.sources {
                out.push(' ');
                match source {
                    Source::Token(token) => out.push_str(token),
                    Source::Nonce => {
                        out.push_str("'nonce-");
                        out.push_str(nonce.as_str());
                        out.push('\'');
                    }
                }
            }
        }
        out
    }
}

/// Precomputed security headers plus the policy template.
///
/// Everything except the CSP is nonce-independent and built once here; the
/// CSP is rendered fresh per request.
pub struct SecurityHeaders {
    policy: SecurityPolicy,
    fixed: Vec<(HeaderName, HeaderValue)>,
}

impl SecurityHeaders {
    pub fn new() -> Self {
        let fixed = vec![
            (header::REFERRER_POLICY, HeaderValue::from_static("no-referrer")),
            (header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY")),
            (header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff")),
            (header::X_DNS_PREFETCH_CONTROL, HeaderValue::from_static("off")),
            (header::X_XSS_PROTECTION, HeaderValue::from_static("0")),
            (
                HeaderName::from_static("x-download-options"),
                HeaderValue::from_static("noopen"),
            ),
            (
                HeaderName::from_static("x-permitted-cross-domain-policies"),
                HeaderValue::from_static("none"),
            ),
            (
                HeaderName::from_static("origin-agent-cluster"),
                HeaderValue::from_static("?1"),
            ),
            (
                HeaderName::from_static("cross-origin-opener-policy"),
                HeaderValue::from_static("same-origin"),
            ),
            (
                HeaderName::from_static("cross-origin-resource-policy"),
                HeaderValue::from_static("same-origin"),
            ),
        ];

        Self {
            policy: SecurityPolicy::hardened(),
            fixed,
        }
    }

    /// Write the full header set, including the nonce-bearing CSP, into
    /// `headers`. Overwrites anything a later stage may have set.
    pub fn apply(&self, nonce: &CspNonce, headers: &mut HeaderMap) {
        for (name, value) in &self.fixed {
            headers.insert(name.clone(), value.clone());
        }
        let policy = self.policy.render(nonce);
        headers.insert(
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_str(&policy).expect("policy header is always ASCII"),
        );
    }
}

impl Default for SecurityHeaders {
    fn default() -> Self {
        Self::new()
    }
}

/// Middleware: compose security headers onto every response that reaches the
/// render path. Runs per request because the CSP embeds the nonce; rejection
/// responses from inner stages pass back through here and get the same set.
pub async fn security_headers(
    State(state): State<AppState>,
    Extension(nonce): Extension<CspNonce>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    state.security.apply(&nonce, response.headers_mut());
    response
}

/// `Strict-Transport-Security` for every response regardless of route: one
/// year max-age, subdomains included, preload eligible.
pub fn hsts_layer() -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::overriding(
        header::STRICT_TRANSPORT_SECURITY,
        HeaderValue::from_static("max-age=31536000; includeSubDomains; preload"),
    )
}
