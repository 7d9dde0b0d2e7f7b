//! Doralink - Telegram bot that turns links into delivered media
//!
//! Authorized users send links; each link is downloaded through yt-dlp or a
//! plain HTTP request and uploaded back to the chat with a live status message.
//!
//! # Module Structure
//!
//! - `core`: Configuration, errors, logging and authorization
//! - `download`: Link classification, retrievers, progress and transfer sessions
//! - `telegram`: Bot setup, transport, cancel confirmation and handlers

pub mod cli;
pub mod core;
pub mod download;
pub mod telegram;

// Re-export commonly used types for convenience
pub use self::core::{config, AppError, Authorizer};
pub use download::{classify, ChatWorkers, PipelineContext, RetrievalPlan, Retrievers, SessionOutcome};
pub use telegram::{create_bot, schema, HandlerDeps};
