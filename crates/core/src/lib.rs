//! Core business logic for agora.
//!
//! Services own the rules of the social backend: reaction bookkeeping,
//! comment threads, notification fan-out, posts with media, groups,
//! moderation reports, and admin tooling. Each service wraps the
//! repositories it needs and is cheap to clone into request handlers.

pub mod services;

pub use services::*;
