use super::*;

/// Stop playback but keep the player open
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn stop(ctx: Context<'_>) -> CommandResult {
    ctx.defer_ephemeral().await?;
    let result = match session(ctx) {
        Ok(session) => session.machine().stop().await,
        Err(e) => Err(e),
    };
    respond(ctx, result, |_| embedded_messages::stopped()).await
}
