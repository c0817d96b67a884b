use super::*;
use crate::commands::music::utils::audio_engine::Volume;

/// Set the playback volume
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn volume(
    ctx: Context<'_>,
    #[description = "Volume from 0 to 100"] level: i64,
) -> CommandResult {
    let result = match session(ctx) {
        Ok(session) => session.set_volume(Volume::from_display(level)).await,
        Err(e) => Err(e),
    };
    respond(ctx, result, embedded_messages::volume_set).await
}
