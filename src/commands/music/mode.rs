use super::*;

/// Switch to the next play mode (repeat one, sequential, play once, shuffle)
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn mode(ctx: Context<'_>) -> CommandResult {
    let result = match session(ctx) {
        Ok(session) => Ok(session.cycle_play_mode().await),
        Err(e) => Err(e),
    };
    respond(ctx, result, embedded_messages::play_mode).await
}

/// Toggle sorting the playlist by date or by title
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn sort(ctx: Context<'_>) -> CommandResult {
    let result = match session(ctx) {
        Ok(session) => Ok(session.machine().toggle_sort().await),
        Err(e) => Err(e),
    };
    respond(ctx, result, embedded_messages::sort_order).await
}
