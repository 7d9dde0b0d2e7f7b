use anyhow::Result;
use dotenvy::dotenv;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::update_listeners::Polling;

use doralink::cli::{Cli, Commands};
use doralink::core::{config, init_logger, log_startup_configuration, Authorizer};
use doralink::download::{classify, PipelineContext, Retrievers};
use doralink::telegram::{create_bot, schema, setup_bot_commands, HandlerDeps, TelegramTransport};

/// Main entry point for the Telegram bot
///
/// Parses CLI arguments and dispatches to appropriate subcommand.
///
/// # Errors
/// Returns an error if initialization fails (logging, download folder, bot creation).
#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Log panics in spawned link batches instead of losing them
    std::panic::set_hook(Box::new(|panic_info| {
        log::error!("Panic caught: {:?}", panic_info);
        if let Some(location) = panic_info.location() {
            log::error!("Panic at {}:{}:{}", location.file(), location.line(), location.column());
        }
    }));

    // Load environment variables from .env if present
    let _ = dotenv();

    // Initialize logger (console + file)
    init_logger(&config::LOG_FILE_PATH)?;

    match cli.command {
        Some(Commands::Info { url }) => run_cli_info(url).await,
        Some(Commands::Run) | None => run_bot().await,
    }
}

/// Prints how a link is classified and what it resolves to.
async fn run_cli_info(url: String) -> Result<()> {
    let plan = classify(&url);
    println!("Link: {}", plan.link());
    println!("Retrieval: {}", plan.kind());

    let retrievers = Retrievers::default_backends()?;
    let retriever = retrievers.for_plan(&plan);
    let resolved = retriever
        .resolve(&plan)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to resolve {}: {}", url, e))?;

    println!("Title: {}", resolved.title.as_deref().unwrap_or("unknown"));
    println!("Media URL: {}", resolved.media_url);
    if let Some(ext) = &resolved.extension {
        println!("Extension: {}", ext);
    }
    Ok(())
}

async fn run_bot() -> Result<()> {
    log::info!("🚀 Starting doralink");
    log_startup_configuration();

    tokio::fs::create_dir_all(config::DOWNLOAD_FOLDER.as_str())
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create download folder {}: {}", config::DOWNLOAD_FOLDER.as_str(), e))?;

    let authorizer = Authorizer::from_config();

    let bot = create_bot()?;
    if let Err(e) = setup_bot_commands(&bot).await {
        log::warn!("Failed to register bot commands: {}", e);
    }

    let transport = Arc::new(TelegramTransport::new(bot.clone()));
    let retrievers = Retrievers::default_backends()?;
    let pipeline = Arc::new(PipelineContext::from_config(transport, retrievers));
    let handler_deps = HandlerDeps::new(Arc::new(authorizer), pipeline);

    // Create the dispatcher handler tree using the modular schema
    let handler = schema(handler_deps);

    log::info!("📡 Starting bot in long polling mode");
    let listener = Polling::builder(bot.clone()).drop_pending_updates().build();

    Dispatcher::builder(bot, handler)
        .enable_ctrlc_handler()
        .build()
        .dispatch_with_listener(
            listener,
            LoggingErrorHandler::with_custom_text("An error from the update listener"),
        )
        .await;

    log::info!("Dispatcher shutdown gracefully");
    Ok(())
}
