//! SSR gateway library.

pub mod assets;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod render;
pub mod security;

pub use config::GatewayConfig;
pub use http::{GatewayError, HttpServer};
pub use lifecycle::Shutdown;
pub use render::{HttpRenderEngine, RenderEngine, RenderError, RenderRequest};
