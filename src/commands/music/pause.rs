use super::*;

/// Pause the current track
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn pause(ctx: Context<'_>) -> CommandResult {
    let result = match session(ctx) {
        Ok(session) => session.machine().pause().await,
        Err(e) => Err(e),
    };
    respond(ctx, result, |_| embedded_messages::paused()).await
}

/// Resume a paused track
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn resume(ctx: Context<'_>) -> CommandResult {
    let result = match session(ctx) {
        Ok(session) => session.machine().resume().await,
        Err(e) => Err(e),
    };
    respond(ctx, result, |_| embedded_messages::resumed()).await
}
