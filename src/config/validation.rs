//! Semantic configuration checks.
//!
//! Serde handles the syntactic layer; these checks catch values that parse
//! fine but cannot work at runtime.

use thiserror::Error;
use url::Url;

use crate::config::schema::GatewayConfig;

/// A single semantic problem found in an otherwise well-formed config.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Compression level outside what the codecs accept.
    #[error("compression level {0} out of range (0-9)")]
    CompressionLevel(i32),

    /// Sweeping or windowing cannot run on a zero-length window.
    #[error("rate limit window must be at least one second")]
    RateLimitWindow,

    /// A ceiling of zero would reject every request.
    #[error("rate limit ceiling must be nonzero")]
    RateLimitCeiling,

    /// The render sidecar endpoint must be an absolute URL.
    #[error("render upstream is not a valid URL: {0}")]
    RenderUpstream(String),

    /// An empty asset root would resolve against the working directory.
    #[error("asset root must not be empty")]
    AssetRoot,
}

/// Validate a parsed configuration, collecting every problem rather than
/// stopping at the first.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if !(0..=9).contains(&config.compression.level) {
        errors.push(ValidationError::CompressionLevel(config.compression.level));
    }

    if config.rate_limit.enabled {
        if config.rate_limit.window_secs == 0 {
            errors.push(ValidationError::RateLimitWindow);
        }
        if config.rate_limit.max_requests == 0 {
            errors.push(ValidationError::RateLimitCeiling);
        }
    }

    if Url::parse(&config.render.upstream).is_err() {
        errors.push(ValidationError::RenderUpstream(
            config.render.upstream.clone(),
        ));
    }

    if config.assets.root.as_os_str().is_empty() {
        errors.push(ValidationError::AssetRoot);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
