//! Telegram bot handler tree configuration
//!
//! This module provides the main dispatcher schema for the Telegram bot.
//! The entry points take plain chat and user ids so integration tests can
//! drive them with a recording transport.

mod commands;
mod schema;
mod types;

pub use commands::{handle_cancel, handle_start, handle_text, WELCOME_TEXT};
pub use schema::schema;
pub use types::{HandlerDeps, HandlerError};
