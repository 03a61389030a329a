//! HTTP API layer for agora.
//!
//! This crate provides the REST API and real-time streaming:
//!
//! - **Endpoints**: posts, comments, reactions, groups, notifications,
//!   reports, users, and admin tooling under `/api`
//! - **Extractors**: multipart form parsing
//! - **Streaming**: WebSocket pub/sub for notifications and comment updates
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;
pub mod streaming;

pub use endpoints::router;
pub use middleware::AppState;
pub use streaming::{StreamingState, streaming_handler};
