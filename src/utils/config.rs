//! Bot configuration read from the environment (after `.env` is loaded).

use serenity::model::id::UserId;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::commands::music::utils::audio_engine::Volume;
use crate::commands::music::utils::playlist::DEFAULT_PAGE_SIZE;
use crate::commands::music::utils::state_machine::DEFAULT_SETTLE_DELAY;
use crate::commands::music::utils::track_store::{DatabaseStore, DirectoryStore, TrackStore};
use crate::utils::database::APPDATA_DB;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Missing {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: '{value}'")]
    Invalid { name: &'static str, value: String },
}

/// Where tracks are loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MusicSource {
    /// Audio files in `MUSIC_DIR`.
    #[default]
    Local,
    /// The `tracks` table, scoped to the user who started the session.
    Database,
}

impl FromStr for MusicSource {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "local" => Ok(MusicSource::Local),
            "database" | "db" => Ok(MusicSource::Database),
            _ => Err(()),
        }
    }
}

#[derive(Clone)]
pub struct BotConfig {
    pub discord_token: String,
    pub music_source: MusicSource,
    pub music_dir: PathBuf,
    pub database_path: PathBuf,
    pub default_volume: Volume,
    pub page_size: usize,
    pub settle_delay: Duration,
    pub ytdlp_path: String,
}

impl fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotConfig")
            .field("discord_token", &"<redacted>")
            .field("music_source", &self.music_source)
            .field("music_dir", &self.music_dir)
            .field("database_path", &self.database_path)
            .field("default_volume", &self.default_volume)
            .field("page_size", &self.page_size)
            .field("settle_delay", &self.settle_delay)
            .field("ytdlp_path", &self.ytdlp_path)
            .finish()
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}

impl BotConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset keys take their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let discord_token = lookup("DISCORD_TOKEN")
            .filter(|token| !token.trim().is_empty())
            .ok_or(ConfigError::Missing("DISCORD_TOKEN"))?;

        let page_size: usize = parse(&lookup, "PAGE_SIZE", DEFAULT_PAGE_SIZE)?;
        if page_size == 0 {
            return Err(ConfigError::Invalid {
                name: "PAGE_SIZE",
                value: "0".to_string(),
            });
        }

        let default_volume: i64 = parse(&lookup, "DEFAULT_VOLUME", 50)?;
        let settle_ms: u64 = parse(
            &lookup,
            "SETTLE_DELAY_MS",
            DEFAULT_SETTLE_DELAY.as_millis() as u64,
        )?;

        Ok(Self {
            discord_token,
            music_source: parse(&lookup, "MUSIC_SOURCE", MusicSource::Local)?,
            music_dir: lookup("MUSIC_DIR").unwrap_or_else(|| "music".into()).into(),
            database_path: lookup("DATABASE_PATH")
                .unwrap_or_else(|| APPDATA_DB.into())
                .into(),
            default_volume: Volume::from_display(default_volume),
            page_size,
            settle_delay: Duration::from_millis(settle_ms),
            ytdlp_path: lookup("YTDLP_PATH").unwrap_or_else(|| "yt-dlp".into()),
        })
    }

    /// The track store for a session started by `owner`.
    pub fn track_store(&self, owner: UserId) -> Arc<dyn TrackStore> {
        match self.music_source {
            MusicSource::Local => Arc::new(DirectoryStore::new(&self.music_dir)),
            MusicSource::Database => Arc::new(DatabaseStore::new(&self.database_path, owner.get())),
        }
    }
}
