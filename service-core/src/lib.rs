//! service-core: Shared infrastructure for commerce services.
pub mod config;
pub mod error;
pub mod observability;
pub mod response;

pub use axum;
pub use serde;
pub use serde_json;
pub use tracing;
pub use validator;
