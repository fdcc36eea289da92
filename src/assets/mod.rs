//! Static asset subsystem.
//!
//! # Data Flow
//! ```text
//! GET/HEAD request
//!     → serve.rs (resolve path under the asset root, /assets alias)
//!     → etag.rs (weak tag from stat; If-None-Match → 304)
//!     → ServeDir (stream body, MIME, ranges)
//!     → serve.rs (override Cache-Control per file kind)
//! Miss → pass to render dispatch
//! ```
//!
//! # Design Decisions
//! - Hashed bundle files get a one-year lifetime; HTML shells are always
//!   revalidated so fresh asset references and nonces are picked up
//! - Path resolution refuses traversal outright; a refused path is a miss
//! - Misses are control flow, never errors

pub mod etag;
pub mod serve;

pub use serve::serve_assets;
