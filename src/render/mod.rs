//! Server-side rendering subsystem.
//!
//! # Data Flow
//! ```text
//! Unmatched request
//!     → dispatcher.rs (reconstruct URL, invoke capability)
//!     → engine.rs (RenderEngine trait; HTTP sidecar in production)
//!     → dispatcher.rs (placeholder → nonce substitution)
//!     → Send to client
//! ```
//!
//! # Design Decisions
//! - The render capability is a trait object constructed in `main` and
//!   passed through state; nothing here reaches for an ambient singleton
//! - Render failures propagate; there is no fallback to an unrendered shell
//!   because a silently broken page leaves no diagnostic trail
//! - Substitution happens after rendering and before the response is built,
//!   using the nonce already present in the response headers

pub mod dispatcher;
pub mod engine;

pub use dispatcher::{render_document, substitute_nonce, NONCE_PLACEHOLDER};
pub use engine::{HttpRenderEngine, RenderEngine, RenderError, RenderRequest};
