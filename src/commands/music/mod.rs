pub mod join;
pub mod leave;
pub mod mode;
pub mod pause;
pub mod play;
pub mod playlist;
pub mod refresh;
pub mod skip;
pub mod stop;
pub mod volume;

pub mod utils;

use poise::CreateReply;
use std::sync::Arc;
use tracing::debug;

use crate::{CommandResult, Context};
use utils::embedded_messages;
use utils::music_manager::{MusicError, MusicResult, PlaybackSession};

/// The running session for the invoking guild.
fn session(ctx: Context<'_>) -> MusicResult<Arc<PlaybackSession>> {
    let guild_id = ctx.guild_id().ok_or(MusicError::NotInGuild)?;
    ctx.data().sessions.get(guild_id)
}

/// Reply with `reply(value)` on success or an error embed on failure.
async fn respond<T>(
    ctx: Context<'_>,
    result: MusicResult<T>,
    reply: impl FnOnce(T) -> CreateReply,
) -> CommandResult {
    let reply = match result {
        Ok(value) => reply(value),
        Err(MusicError::NoSession) => embedded_messages::no_session(),
        Err(MusicError::UserNotInVoiceChannel) => embedded_messages::user_not_in_voice_channel(),
        Err(e) => {
            debug!("/{} failed: {}", ctx.command().name, e);
            embedded_messages::error(&e)
        }
    };
    ctx.send(reply).await?;
    Ok(())
}
