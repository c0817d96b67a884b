use super::*;

/// Leave the voice channel and close the player
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn leave(ctx: Context<'_>) -> CommandResult {
    ctx.defer_ephemeral().await?;
    let result = match ctx.guild_id() {
        Some(guild_id) => ctx.data().sessions.destroy(guild_id).await,
        None => Err(MusicError::NotInGuild),
    };
    respond(ctx, result, |_| embedded_messages::left_voice_channel()).await
}
