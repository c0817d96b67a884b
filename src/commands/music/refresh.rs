use super::*;
use crate::commands::music::utils::format_duration;
use crate::utils::database::NewTrack;
use std::time::Duration;

/// Reload the playlist from the music library
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn refresh(ctx: Context<'_>) -> CommandResult {
    ctx.defer_ephemeral().await?;
    let result = match session(ctx) {
        Ok(session) => session.refresh().await,
        Err(e) => Err(e),
    };
    respond(ctx, result, embedded_messages::refreshed).await
}

/// Add a track by URL to your library
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn addtrack(
    ctx: Context<'_>,
    #[description = "Track title"] title: String,
    #[description = "http(s) URL of the track"] url: String,
    #[description = "Length in seconds"] seconds: Option<u64>,
) -> CommandResult {
    ctx.defer_ephemeral().await?;
    let track = NewTrack {
        title,
        url,
        thumbnail: None,
        duration: seconds.map(|s| format_duration(Duration::from_secs(s))),
    };
    let result = match session(ctx) {
        Ok(session) => session.add_track(track).await,
        Err(e) => Err(e),
    };
    respond(ctx, result, |track| embedded_messages::track_added(&track)).await
}
