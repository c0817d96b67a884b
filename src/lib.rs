//! A Discord jukebox: per-guild playlists played into voice channels, driven
//! by slash commands and the buttons on a player message.

use std::sync::Arc;

pub mod commands;
pub mod events;
pub mod utils;

use commands::music::{
    join::*, leave::*, mode::*, pause::*, play::*, playlist::*, refresh::*, skip::*, stop::*,
    volume::*,
};
use commands::music::utils::music_manager::SessionRegistry;
use commands::music::utils::settings_manager::SettingsManager;
use utils::config::BotConfig;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;
pub type CommandResult = Result<(), Error>;

/// Shared state, accessible in all command invocations and event handlers
pub struct Data {
    pub sessions: Arc<SessionRegistry>,
    pub config: Arc<BotConfig>,
    pub settings: Arc<SettingsManager>,
}

impl Data {
    pub fn new(config: BotConfig, sessions: Arc<SessionRegistry>) -> Self {
        let settings = SettingsManager::new(&config.database_path, config.default_volume);
        Self {
            sessions,
            config: Arc::new(config),
            settings: Arc::new(settings),
        }
    }
}

#[poise::command(slash_command, category = "General")]
async fn help(
    ctx: Context<'_>,
    #[description = "Specific command to show help about"]
    #[autocomplete = "poise::builtins::autocomplete_command"]
    command: Option<String>,
) -> CommandResult {
    poise::builtins::help(
        ctx,
        command.as_deref(),
        poise::builtins::HelpConfiguration {
            show_context_menu_commands: true,
            ..Default::default()
        },
    )
    .await
    .map_err(|e| e.into())
}

#[poise::command(prefix_command, hide_in_help)]
async fn register(ctx: Context<'_>) -> Result<(), Error> {
    poise::builtins::register_application_commands_buttons(ctx)
        .await
        .map_err(|e| e.into())
}

/// Every command the bot registers.
pub fn all_commands() -> Vec<poise::Command<Data, Error>> {
    vec![
        // Default commands
        register(),
        help(),
        // Music commands
        join(),
        play(),
        pause(),
        resume(),
        skip(),
        previous(),
        stop(),
        leave(),
        volume(),
        mode(),
        sort(),
        playlist(),
        refresh(),
        addtrack(),
    ]
}
