//! Middleware components
//!
//! This module contains middleware for:
//! - Authentication (JWT validation into an `Actor`)

pub mod auth;

pub use auth::{auth_middleware, AuthError, Claims};
