use dashmap::DashMap;
use serenity::model::id::GuildId;
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::utils::database;

use super::audio_engine::Volume;
use super::playlist::PlayMode;

/// A guild's saved player preferences.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerSettings {
    pub play_mode: PlayMode,
    pub volume: Volume,
}

/// Per-guild play mode and volume, cached in memory and written through to
/// the `player_settings` table. Database failures are logged and the cache
/// keeps working.
pub struct SettingsManager {
    db_path: PathBuf,
    cache: DashMap<GuildId, PlayerSettings>,
    default_volume: Volume,
}

impl SettingsManager {
    pub fn new(db_path: impl Into<PathBuf>, default_volume: Volume) -> Self {
        Self {
            db_path: db_path.into(),
            cache: DashMap::new(),
            default_volume,
        }
    }

    /// Saved settings for the guild, or `None` if it never changed any.
    pub async fn load(&self, guild_id: GuildId) -> Option<PlayerSettings> {
        if let Some(settings) = self.cache.get(&guild_id) {
            return Some(*settings);
        }

        let path = self.db_path.clone();
        let row = tokio::task::spawn_blocking(move || {
            let conn = database::open(&path)?;
            database::get_player_settings(&conn, guild_id.get())
        })
        .await;

        let (mode, volume) = match row {
            Ok(Ok(Some(row))) => row,
            Ok(Ok(None)) => return None,
            Ok(Err(e)) => {
                warn!("Error loading player settings for guild {}: {}", guild_id, e);
                return None;
            }
            Err(e) => {
                warn!("Settings lookup task failed for guild {}: {}", guild_id, e);
                return None;
            }
        };

        let play_mode = mode.parse().unwrap_or_else(|e| {
            warn!("Ignoring saved play mode for guild {}: {}", guild_id, e);
            PlayMode::default()
        });
        let settings = PlayerSettings {
            play_mode,
            volume: Volume::from_display(volume.into()),
        };
        self.cache.insert(guild_id, settings);
        Some(settings)
    }

    pub async fn save_play_mode(&self, guild_id: GuildId, play_mode: PlayMode) {
        let settings = self.current(guild_id).await;
        self.save(guild_id, PlayerSettings { play_mode, ..settings })
            .await;
    }

    pub async fn save_volume(&self, guild_id: GuildId, volume: Volume) {
        let settings = self.current(guild_id).await;
        self.save(guild_id, PlayerSettings { volume, ..settings }).await;
    }

    async fn current(&self, guild_id: GuildId) -> PlayerSettings {
        self.load(guild_id).await.unwrap_or(PlayerSettings {
            play_mode: PlayMode::default(),
            volume: self.default_volume,
        })
    }

    async fn save(&self, guild_id: GuildId, settings: PlayerSettings) {
        self.cache.insert(guild_id, settings);

        let path = self.db_path.clone();
        let result = tokio::task::spawn_blocking(move || {
            let conn = database::open(&path)?;
            database::set_player_settings(
                &conn,
                guild_id.get(),
                &settings.play_mode.to_string(),
                settings.volume.as_display(),
            )
        })
        .await;

        match result {
            Ok(Ok(())) => debug!("Saved player settings for guild {}", guild_id),
            Ok(Err(e)) => warn!("Failed to save player settings for guild {}: {}", guild_id, e),
            Err(e) => warn!("Settings save task failed for guild {}: {}", guild_id, e),
        }
    }
}
