//! Telegram bot integration and handlers

pub mod bot;
pub mod cancel;
pub mod handlers;
pub mod transport;

/// Bot type used across the crate
pub type Bot = teloxide::Bot;

// Re-exports for convenience
pub use bot::{create_bot, setup_bot_commands, Command};
pub use cancel::{CancellationGate, GateOutcome};
pub use handlers::{schema, HandlerDeps, HandlerError};
pub use transport::{ChatTransport, MessageHandle, TelegramTransport};
