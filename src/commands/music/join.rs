use super::*;
use crate::commands::music::utils::{
    audio_engine::AudioEngine,
    music_manager::{get_songbird, get_user_voice_channel},
    player_view::{DiscordPlayerView, PlayerView},
    playlist::Playlist,
    songbird_engine::SongbirdEngine,
    state_machine::PlaybackStateMachine,
};
use tracing::{info, warn};

/// Join your voice channel and open the player
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn join(ctx: Context<'_>) -> CommandResult {
    ctx.defer_ephemeral().await?;
    let result = start_session(ctx).await;
    respond(ctx, result, |(_, track_count)| {
        embedded_messages::session_started(track_count)
    })
    .await
}

/// Get or create the guild's session, point it at the caller's voice
/// channel and connect. Returns the session and its track count.
pub(crate) async fn start_session(
    ctx: Context<'_>,
) -> MusicResult<(Arc<PlaybackSession>, usize)> {
    let guild_id = ctx.guild_id().ok_or(MusicError::NotInGuild)?;
    let user_id = ctx.author().id;
    let voice_channel = get_user_voice_channel(ctx.serenity_context(), guild_id, user_id)?;
    let songbird = get_songbird(ctx.serenity_context()).await?;
    let data = ctx.data();
    let config = &data.config;

    let (session, created) = data.sessions.create(guild_id, || {
        let view: Arc<dyn PlayerView> = Arc::new(DiscordPlayerView::new(
            ctx.serenity_context().http.clone(),
            guild_id,
            ctx.channel_id(),
        ));
        let engine = Arc::new(SongbirdEngine::new(
            guild_id,
            songbird,
            config.ytdlp_path.clone(),
            Arc::clone(&view),
            config.default_volume,
        ));
        let machine = PlaybackStateMachine::new(
            format!("guild {}", guild_id),
            Playlist::new(config.page_size),
            engine,
            Arc::clone(&view),
            config.settle_delay,
        );
        PlaybackSession::new(
            guild_id,
            user_id,
            machine,
            config.track_store(user_id),
            view,
        )
        .with_settings(Arc::clone(&data.settings))
    });

    session.machine().set_voice_channel(Some(voice_channel));

    let track_count = if created {
        session.restore_settings().await;
        match session.refresh().await {
            Ok(count) => count,
            Err(e) => {
                warn!("Session for guild {} starts with no tracks: {}", guild_id, e);
                0
            }
        }
    } else {
        session.machine().snapshot().await.track_count
    };

    session
        .machine()
        .engine()
        .join(Some(voice_channel))
        .await?;
    info!(
        "{} joined {} in guild {} ({} tracks)",
        user_id, voice_channel, guild_id, track_count
    );
    Ok((session, track_count))
}
