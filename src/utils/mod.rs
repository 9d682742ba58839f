//! Utility modules

pub mod error;

pub use error::{AppError, ErrorResponse};
