//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     Load config → Validate → Construct engine + server → Bind listener
//!
//! Shutdown (shutdown.rs):
//!     Ctrl-C or trigger → Stop accepting → Drain in-flight requests → Exit
//! ```
//!
//! # Design Decisions
//! - One broadcast channel fans the shutdown signal out to the server and
//!   the rate-limit sweeper
//! - In-flight renders drain through Axum's graceful shutdown

pub mod shutdown;

pub use shutdown::Shutdown;
