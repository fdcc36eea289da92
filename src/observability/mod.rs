//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events (structured, request-id correlated)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - The request ID issued at the edge flows through all log events
//! - Metrics are cheap (atomic increments) and always on; the exporter
//!   endpoint is the only optional piece

pub mod metrics;
