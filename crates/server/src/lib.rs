//! Residence Hub server library.
//!
//! This crate provides the JSON API as a library, allowing it to be tested
//! and reused.
//!
//! # Layers
//!
//! - [`routes`] - axum handlers, thin wrappers over the services
//! - [`services`] - business rules, each gated by the access policy
//! - [`db`] - store ports with `PostgreSQL` and in-memory adapters
//!
//! Authorization decisions themselves live in `residence_hub_core::access`
//! and never touch I/O.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

pub use error::AppError;
pub use routes::app;
pub use state::AppState;
