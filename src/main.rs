use clap::{Parser, Subcommand};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use allbot::application::errors::{BotError, ConfigError};
use allbot::application::messaging::{MessageDispatcher, MessageParser, Router};
use allbot::application::services::BlacklistService;
use allbot::domain::entities::User;
use allbot::domain::traits::{Bot, Store, UserDirectory};
use allbot::infrastructure::adapters::console::ConsoleAdapter;
use allbot::infrastructure::adapters::groupme::GroupMeAdapter;
use allbot::infrastructure::config::{BrainBackend, BrainConfig, Credentials, Settings};
use allbot::infrastructure::storage::BrainStore;

#[derive(Parser)]
#[command(name = "allbot")]
#[command(about = "GroupMe bot that mentions everyone", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Settings file path
    #[arg(short, long, default_value = "allbot.yaml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot
    Run {
        /// Read messages from stdin instead of polling GroupMe
        #[arg(long)]
        console: bool,
    },
    /// Show version
    Version,
    /// Write the default settings file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { console } => run_bot(&cli.config, console),
        Commands::Version => {
            println!("allbot v{}", env!("CARGO_PKG_VERSION"));
            ExitCode::SUCCESS
        }
        Commands::InitConfig { force } => init_config(&cli.config, force),
    }
}

fn run_bot(config_path: &str, console: bool) -> ExitCode {
    // Credentials first: nothing else starts without them
    let credentials = match Credentials::from_env() {
        Ok(credentials) => credentials,
        Err(e) => {
            tracing::error!("Unable to read full environment: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let settings = Settings::load_or_default(config_path);

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match rt.block_on(serve(credentials, settings, console)) {
        Ok(()) => {
            tracing::info!("Bot shut down");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("Bot stopped: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn open_brain(config: &BrainConfig) -> Result<BrainStore, BotError> {
    Ok(match config.backend {
        BrainBackend::Memory => BrainStore::memory(),
        BrainBackend::Json => BrainStore::json(&config.path),
        BrainBackend::Sqlite => BrainStore::sqlite(&config.path)?,
    })
}

fn build_router(settings: &Settings) -> Result<Router, ConfigError> {
    let mut router = Router::standard().map_err(|e| ConfigError::InvalidValue(e.to_string()))?;
    for responder in &settings.responders {
        router.hear(responder.to_listener()?);
    }
    for listener in router.listeners() {
        tracing::info!(
            "Listener {}: {}",
            listener.name,
            listener.description.as_deref().unwrap_or("no description")
        );
    }
    Ok(router)
}

async fn serve(credentials: Credentials, settings: Settings, console: bool) -> Result<(), BotError> {
    let brain = Arc::new(open_brain(&settings.brain)?);
    brain.load().await?;

    let groupme = Arc::new(GroupMeAdapter::new(credentials.clone(), settings.api_base.as_str()));
    if !console {
        seed_directory(&groupme, brain.as_ref()).await;
    }

    let mut blacklist = BlacklistService::new(brain.clone(), brain.clone());
    blacklist.load().await?;

    let router = build_router(&settings)?;

    if console {
        let bot = Arc::new(ConsoleAdapter::new(credentials.bot_id.as_str()));
        let dispatcher = MessageDispatcher::new(router, blacklist, brain.clone(), brain, bot.clone());
        run_console_bot(bot, dispatcher).await
    } else {
        let dispatcher = MessageDispatcher::new(router, blacklist, brain.clone(), brain, groupme.clone());
        let poll = Duration::from_secs(settings.poll_interval_secs);
        run_groupme_bot(groupme, dispatcher, poll).await
    }
}

/// Add current group members to the directory; failures only cost coverage
async fn seed_directory(groupme: &GroupMeAdapter, brain: &BrainStore) {
    match groupme.fetch_members().await {
        Ok(members) => {
            let mut changed = false;
            for member in members {
                changed |= brain.remember(member).await;
            }
            if changed {
                if let Err(e) = brain.save().await {
                    tracing::warn!("Failed to save group members: {}", e);
                }
            }
            tracing::info!("Directory has {} users", brain.users().await.len());
        }
        Err(e) => tracing::warn!("Failed to fetch group members: {}", e),
    }
}

async fn run_groupme_bot(
    bot: Arc<GroupMeAdapter>,
    mut dispatcher: MessageDispatcher,
    poll: Duration,
) -> Result<(), BotError> {
    bot.start().await?;

    let mut after_id = bot
        .latest_message_id()
        .await?
        .unwrap_or_else(|| "0".to_string());
    tracing::info!("Listening for messages after {}", after_id);

    let mut interval = tokio::time::interval(poll);
    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown signal received, shutting down...");
                break;
            }
        }

        let messages = match bot.get_messages(&after_id).await {
            Ok(messages) => messages,
            Err(e) => {
                tracing::warn!("Failed to poll messages: {}", e);
                continue;
            }
        };

        for raw in messages {
            after_id = raw.id.clone();
            if raw.is_from_bot() {
                continue;
            }
            let message = raw.into_message(bot.room_id());
            dispatcher.dispatch(&message).await;
        }
    }

    Ok(())
}

async fn run_console_bot(bot: Arc<ConsoleAdapter>, mut dispatcher: MessageDispatcher) -> Result<(), BotError> {
    bot.start().await?;

    let info = bot.bot_info();
    tracing::info!("Bot started: {} ({})", info.name, info.platform);

    let parser = MessageParser::new(User::new("console", "Console"))
        .map_err(|e| BotError::Internal(e.to_string()))?;

    while let Some(line) = bot.read_line().await {
        if line.trim().is_empty() {
            continue;
        }
        let message = parser.parse("console", &line);
        dispatcher.dispatch(&message).await;
    }

    Ok(())
}

fn init_config(path: &str, force: bool) -> ExitCode {
    if Path::new(path).exists() && !force {
        tracing::error!("{} already exists, pass --force to overwrite", path);
        return ExitCode::FAILURE;
    }

    let yaml = match Settings::default().to_yaml() {
        Ok(yaml) => yaml,
        Err(e) => {
            tracing::error!("Failed to render settings: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match std::fs::write(path, yaml) {
        Ok(()) => {
            println!("Wrote default settings to {}", path);
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("Failed to write {}: {}", path, e);
            ExitCode::FAILURE
        }
    }
}
