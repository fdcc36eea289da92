//! HTTP pipeline subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, stage ordering)
//!     → request.rs (request ID at the edge)
//!     → [security / assets / render stages]
//!     → error.rs (failures collapse to a generic 500)
//!     → Send to client
//! ```

pub mod error;
pub mod request;
pub mod server;

pub use error::GatewayError;
pub use request::{propagate_request_id_layer, set_request_id_layer, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
