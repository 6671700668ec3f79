//! Residence Hub Core - Shared types and access decisions.
//!
//! This crate provides the pure parts of Residence Hub used by:
//! - `server` - The JSON API
//! - `cli` - Command-line tools for migrations and user management
//!
//! # Architecture
//!
//! The core crate contains only types and decision functions - no I/O, no
//! database access, no HTTP. Everything a decision needs is loaded by the
//! caller first.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, roles, statuses, emails and pagination
//! - [`models`] - Users, residences, memberships and residence-scoped resources
//! - [`access`] - The access policy table, `can_access` and list scopes
//! - [`timeline`] - Inferred status history of issue reports

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod access;
pub mod models;
pub mod timeline;
pub mod types;

pub use types::*;
