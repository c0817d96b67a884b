use super::*;

/// Show a page of the playlist
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn playlist(
    ctx: Context<'_>,
    #[description = "Page number"]
    #[min = 1]
    page: Option<usize>,
) -> CommandResult {
    let result = match session(ctx) {
        Ok(session) => {
            let machine = session.machine();
            if let Some(page) = page {
                machine.show_page(page.saturating_sub(1)).await;
            }
            Ok(machine.snapshot().await)
        }
        Err(e) => Err(e),
    };
    respond(ctx, result, |snapshot| embedded_messages::playlist_page(&snapshot)).await
}
