use dashmap::DashMap;
use poise::serenity_prelude as serenity;
use serenity::client::Context;
use serenity::model::id::{ChannelId, GuildId, UserId};
use songbird::Songbird;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::utils::database::NewTrack;

use super::audio_engine::Volume;
use super::player_view::PlayerView;
use super::playlist::{PlayMode, Track};
use super::settings_manager::SettingsManager;
use super::state_machine::PlaybackStateMachine;
use super::track_store::TrackStore;

/// Errors that can occur during music operations
#[derive(Error, Debug)]
pub enum MusicError {
    #[error("Not in a guild")]
    NotInGuild,

    #[error("Failed to join voice channel: {0}")]
    JoinError(String),

    #[error("Not connected to a voice channel")]
    NotConnected,

    #[error("Failed to get voice manager")]
    NoVoiceManager,

    #[error("User is not in a voice channel")]
    UserNotInVoiceChannel,

    #[error("No tracks in the playlist")]
    EmptyPlaylist,

    #[error("Track #{} does not exist, the playlist has {len} tracks", index + 1)]
    IndexOutOfRange { index: usize, len: usize },

    #[error("No player is running in this server")]
    NoSession,

    #[error("Failed to start decoder: {0}")]
    DecoderError(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to load tracks: {0}")]
    StoreError(String),

    #[error("Audio error: {0}")]
    AudioError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Failed to update player message: {0}")]
    ViewError(String),

    #[error("The player was closed")]
    SessionClosed,
}

/// Result type for music operations
pub type MusicResult<T> = Result<T, MusicError>;

/// One guild's playback context: the state machine plus the collaborators
/// that live exactly as long as it does.
pub struct PlaybackSession {
    guild_id: GuildId,
    requester: UserId,
    machine: Arc<PlaybackStateMachine>,
    store: Arc<dyn TrackStore>,
    settings: Option<Arc<SettingsManager>>,
    view: Arc<dyn PlayerView>,
}

impl std::fmt::Debug for PlaybackSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackSession")
            .field("guild_id", &self.guild_id)
            .field("requester", &self.requester)
            .finish_non_exhaustive()
    }
}

impl PlaybackSession {
    pub fn new(
        guild_id: GuildId,
        requester: UserId,
        machine: Arc<PlaybackStateMachine>,
        store: Arc<dyn TrackStore>,
        view: Arc<dyn PlayerView>,
    ) -> Self {
        Self {
            guild_id,
            requester,
            machine,
            store,
            settings: None,
            view,
        }
    }

    /// Persist play mode and volume changes for this guild.
    pub fn with_settings(mut self, settings: Arc<SettingsManager>) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    pub fn requester(&self) -> UserId {
        self.requester
    }

    pub fn machine(&self) -> &Arc<PlaybackStateMachine> {
        &self.machine
    }

    /// Apply the guild's saved play mode and volume, if any.
    pub async fn restore_settings(&self) {
        let Some(settings) = &self.settings else {
            return;
        };
        let Some(saved) = settings.load(self.guild_id).await else {
            return;
        };
        info!(
            "Restoring settings for guild {}: {} at {}",
            self.guild_id, saved.play_mode, saved.volume
        );
        self.machine.set_play_mode(saved.play_mode).await;
        if let Err(e) = self.machine.set_volume(saved.volume).await {
            warn!(
                "Failed to restore volume for guild {}: {}",
                self.guild_id, e
            );
        }
    }

    /// Reload the playlist from the track store. A failing store leaves the
    /// playlist empty.
    pub async fn refresh(&self) -> MusicResult<usize> {
        match self.store.load().await {
            Ok(tracks) => {
                let count = self.machine.replace_tracks(tracks).await;
                info!("Loaded {} tracks for guild {}", count, self.guild_id);
                Ok(count)
            }
            Err(e) => {
                error!("Failed to load tracks for guild {}: {}", self.guild_id, e);
                self.machine.replace_tracks(Vec::new()).await;
                Err(e)
            }
        }
    }

    /// Add a track to the store and reload.
    pub async fn add_track(&self, track: NewTrack) -> MusicResult<Track> {
        let track = self.store.add(track).await?;
        self.refresh().await?;
        Ok(track)
    }

    pub async fn set_volume(&self, volume: Volume) -> MusicResult<Volume> {
        let volume = self.machine.set_volume(volume).await?;
        if let Some(settings) = &self.settings {
            settings.save_volume(self.guild_id, volume).await;
        }
        Ok(volume)
    }

    pub async fn cycle_play_mode(&self) -> PlayMode {
        let mode = self.machine.cycle_play_mode().await;
        if let Some(settings) = &self.settings {
            settings.save_play_mode(self.guild_id, mode).await;
        }
        mode
    }

    /// Stop playback, leave voice and remove the player message.
    pub async fn close(&self) {
        self.machine.shutdown().await;
        self.view.close().await;
        info!(
            "Closed playback session for guild {} started by {}",
            self.guild_id, self.requester
        );
    }
}

/// The live sessions, one per guild.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<GuildId, Arc<PlaybackSession>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the guild's session, building it with `make` if there is none.
    /// The flag is `true` when a new session was created.
    pub fn create(
        &self,
        guild_id: GuildId,
        make: impl FnOnce() -> PlaybackSession,
    ) -> (Arc<PlaybackSession>, bool) {
        let mut created = false;
        let session = self
            .sessions
            .entry(guild_id)
            .or_insert_with(|| {
                created = true;
                Arc::new(make())
            })
            .clone();
        if created {
            info!("Created playback session for guild {}", guild_id);
        }
        (session, created)
    }

    pub fn get(&self, guild_id: GuildId) -> MusicResult<Arc<PlaybackSession>> {
        self.sessions
            .get(&guild_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(MusicError::NoSession)
    }

    pub fn contains(&self, guild_id: GuildId) -> bool {
        self.sessions.contains_key(&guild_id)
    }

    /// Remove the guild's session and release its resources.
    pub async fn destroy(&self, guild_id: GuildId) -> MusicResult<()> {
        let (_, session) = self
            .sessions
            .remove(&guild_id)
            .ok_or(MusicError::NoSession)?;
        session.close().await;
        Ok(())
    }

    pub async fn destroy_all(&self) {
        let guilds: Vec<GuildId> = self.sessions.iter().map(|entry| *entry.key()).collect();
        for guild_id in guilds {
            if let Err(e) = self.destroy(guild_id).await {
                warn!("Failed to destroy session for guild {}: {}", guild_id, e);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Get the Songbird voice client from the context
pub async fn get_songbird(ctx: &Context) -> MusicResult<Arc<Songbird>> {
    songbird::get(ctx).await.ok_or(MusicError::NoVoiceManager)
}

/// Get the voice channel ID that the user is currently in
pub fn get_user_voice_channel(
    ctx: &Context,
    guild_id: GuildId,
    user_id: UserId,
) -> MusicResult<ChannelId> {
    let guild = ctx.cache.guild(guild_id).ok_or(MusicError::NotInGuild)?;

    let voice_state = guild
        .voice_states
        .get(&user_id)
        .ok_or(MusicError::UserNotInVoiceChannel)?;

    voice_state
        .channel_id
        .ok_or(MusicError::UserNotInVoiceChannel)
}
