//! Core types for Residence Hub.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod pagination;
pub mod role;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use pagination::{PageError, PageMeta, PageRequest, Paginated, matches_search};
pub use role::Role;
pub use status::*;
