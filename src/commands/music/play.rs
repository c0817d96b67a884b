use super::*;
use crate::commands::music::join::start_session;

/// Play the current track, or the track at a playlist position
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn play(
    ctx: Context<'_>,
    #[description = "Playlist position to play"]
    #[min = 1]
    position: Option<usize>,
) -> CommandResult {
    ctx.defer_ephemeral().await?;
    let result = play_position(ctx, position).await;
    respond(ctx, result, embedded_messages::playing).await
}

async fn play_position(ctx: Context<'_>, position: Option<usize>) -> MusicResult<usize> {
    let (session, _) = start_session(ctx).await?;
    let machine = session.machine();
    match position {
        Some(position) => {
            let index = position.saturating_sub(1);
            machine.play_index(index).await?;
            Ok(index)
        }
        None => machine.play_current().await,
    }
}
