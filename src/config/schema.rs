//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files, and
//! every field has a default so a minimal (or absent) config file works.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration for the SSR gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind host and port).
    pub listener: ListenerConfig,

    /// Built browser bundle locations.
    pub assets: AssetConfig,

    /// External render capability settings.
    pub render: RenderConfig,

    /// Response compression settings.
    pub compression: CompressionConfig,

    /// Per-client rate limiting.
    pub rate_limit: RateLimitConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
///
/// The port is split out from the host so the `PORT` environment variable
/// can override it without string surgery on a combined address.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Host to bind (e.g., "0.0.0.0").
    pub host: String,

    /// Port to listen on. Overridden by the `PORT` environment variable.
    pub port: u16,
}

impl ListenerConfig {
    /// Full bind address in "host:port" form.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

/// Locations of the pre-built browser bundle.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Directory containing the built browser assets.
    pub root: PathBuf,

    /// Base HTML document handed to the renderer (the CSR shell containing
    /// the nonce placeholder).
    pub document: PathBuf,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("dist/browser"),
            document: PathBuf::from("dist/browser/index.csr.html"),
        }
    }
}

/// External render capability settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Endpoint of the render sidecar.
    pub upstream: String,

    /// Bootstrap entry identifier passed through to the renderer.
    pub bootstrap: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            upstream: "http://127.0.0.1:4000/render".to_string(),
            bootstrap: "./main.server".to_string(),
        }
    }
}

/// Response compression settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CompressionConfig {
    /// Compression level (0-9).
    pub level: i32,

    /// Minimum body size in bytes before compression kicks in.
    pub min_size: u16,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            level: 6,
            min_size: 1024,
        }
    }
}

/// Per-client rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Window length in seconds.
    pub window_secs: u64,

    /// Maximum requests per client per window.
    pub max_requests: u32,

    /// How often expired windows are swept out, in seconds.
    pub sweep_interval_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_secs: 15 * 60,
            max_requests: 100,
            sweep_interval_secs: 60,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
