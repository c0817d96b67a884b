//! The player message kept in sync with a session's state.

use poise::serenity_prelude as serenity;
use serenity::all::{CreateMessage, EditMessage};
use serenity::async_trait;
use serenity::model::id::{ChannelId, GuildId, MessageId};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::audio_engine::{PlayerStatus, Volume};
use super::embedded_messages;
use super::music_manager::{MusicError, MusicResult};
use super::playlist::{Pagination, PlayMode, SortOrder, Track};
use super::state_machine::PlaybackState;

/// Everything needed to render the player message.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSnapshot {
    pub state: PlaybackState,
    pub status: PlayerStatus,
    pub current: Option<Track>,
    pub current_index: usize,
    pub track_count: usize,
    pub play_mode: PlayMode,
    pub sort_order: SortOrder,
    pub volume: Volume,
    /// Tracks on the visible page with their logical index.
    pub page: Vec<(usize, Track)>,
    pub pagination: Pagination,
}

impl PlayerSnapshot {
    pub fn is_paused(&self) -> bool {
        self.status == PlayerStatus::Paused
    }
}

/// Sink for state changes the user should see.
#[async_trait]
pub trait PlayerView: Send + Sync {
    /// Re-render the player message.
    async fn refresh(&self, snapshot: PlayerSnapshot) -> MusicResult<()>;

    /// Tell the user something went wrong outside of a command reply.
    async fn notify(&self, text: String);

    /// Tear down whatever the view displays when the session closes.
    async fn close(&self) {}
}

/// Edits one message in a text channel, re-sending it when the edit fails.
pub struct DiscordPlayerView {
    http: Arc<serenity::Http>,
    guild_id: GuildId,
    channel_id: ChannelId,
    message_id: Mutex<Option<MessageId>>,
}

impl DiscordPlayerView {
    pub fn new(http: Arc<serenity::Http>, guild_id: GuildId, channel_id: ChannelId) -> Self {
        Self {
            http,
            guild_id,
            channel_id,
            message_id: Mutex::new(None),
        }
    }

    /// Remove the player message.
    pub async fn delete(&self) {
        if let Some(message_id) = self.message_id.lock().await.take() {
            if let Err(e) = self
                .http
                .delete_message(self.channel_id, message_id, None)
                .await
            {
                warn!(
                    "Failed to delete player message {} in channel {}: {}",
                    message_id, self.channel_id, e
                );
            }
        }
    }
}

#[async_trait]
impl PlayerView for DiscordPlayerView {
    async fn refresh(&self, snapshot: PlayerSnapshot) -> MusicResult<()> {
        let embed = embedded_messages::music_player(&snapshot);
        let components = super::button_controls::player_controls(&snapshot);
        let mut stored = self.message_id.lock().await;

        if let Some(message_id) = *stored {
            debug!("Updating player message for guild {}", self.guild_id);
            let edit = EditMessage::new()
                .embed(embed.clone())
                .components(components.clone());
            match self
                .channel_id
                .edit_message(&self.http, message_id, edit)
                .await
            {
                Ok(_) => return Ok(()),
                Err(e) => debug!("Failed to update player message, sending new one: {}", e),
            }
        }

        let message = self
            .channel_id
            .send_message(
                &self.http,
                CreateMessage::new().embed(embed).components(components),
            )
            .await
            .map_err(|e| MusicError::ViewError(e.to_string()))?;
        *stored = Some(message.id);
        Ok(())
    }

    async fn notify(&self, text: String) {
        let message = CreateMessage::new().embed(embedded_messages::generic_error(&text));
        if let Err(e) = self.channel_id.send_message(&self.http, message).await {
            warn!(
                "Failed to send notification to channel {}: {}",
                self.channel_id, e
            );
        }
    }

    async fn close(&self) {
        self.delete().await;
    }
}
