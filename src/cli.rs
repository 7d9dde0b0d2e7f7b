use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "doralink")]
#[command(author, version, about = "Telegram bot that downloads linked media and uploads it back to the chat", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run the bot in long polling mode
    Run,

    /// Show how a link would be handled, without downloading it
    Info {
        /// Link to inspect
        url: String,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
