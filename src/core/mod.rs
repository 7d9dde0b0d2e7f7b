//! Core utilities, configuration, and common functionality

pub mod auth;
pub mod config;
pub mod error;
pub mod logging;

// Re-exports for convenience
pub use auth::{Authorizer, UNAUTHORIZED_NOTICE};
pub use error::AppError;
pub use logging::{init_logger, log_startup_configuration};
