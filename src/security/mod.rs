//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → nonce.rs (issue per-request CSP nonce into extensions)
//!     → headers.rs (compose CSP + fixed hardening headers on the response)
//!     → rate_limit.rs (per-IP windowed ceiling)
//!     → Pass to render dispatch
//! ```
//!
//! # Design Decisions
//! - The nonce is issued once at pipeline entry; header composition and body
//!   substitution both read that single value so they can never disagree
//! - Fail closed: entropy failure aborts the request instead of degrading
//! - Rejection is control flow, not an error: deterministic body and headers

pub mod headers;
pub mod nonce;
pub mod rate_limit;

pub use headers::{hsts_layer, security_headers, SecurityHeaders, SecurityPolicy};
pub use nonce::{issue_nonce, CspNonce};
pub use rate_limit::{rate_limit_middleware, RateLimiter, REJECTION_BODY};
