//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize, defaults when absent)
//!     → environment overlay (PORT)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal (or absent) configs
//! - Validation separates syntactic (serde) from semantic checks
//! - The environment wins over the file for the listening port

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, resolve_config, ConfigError};
pub use schema::GatewayConfig;
pub use schema::{
    AssetConfig, CompressionConfig, ListenerConfig, ObservabilityConfig, RateLimitConfig,
    RenderConfig, TimeoutConfig,
};
