//! HTTP middleware stack.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, one transaction per request)
//! 2. `TraceLayer` (request span with status, latency, and user id)
//! 3. Auth extractor on each protected handler ([`auth::RequireSubject`])

pub mod auth;

pub use auth::{Claims, RequireSubject};
