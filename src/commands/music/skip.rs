use super::*;

/// Skip to the next track
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn skip(ctx: Context<'_>) -> CommandResult {
    ctx.defer_ephemeral().await?;
    let result = match session(ctx) {
        Ok(session) => session.machine().next().await,
        Err(e) => Err(e),
    };
    respond(ctx, result, |_| embedded_messages::skipped()).await
}

/// Go back to the previous track
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn previous(ctx: Context<'_>) -> CommandResult {
    ctx.defer_ephemeral().await?;
    let result = match session(ctx) {
        Ok(session) => session.machine().prev().await,
        Err(e) => Err(e),
    };
    respond(ctx, result, |_| embedded_messages::went_back()).await
}
