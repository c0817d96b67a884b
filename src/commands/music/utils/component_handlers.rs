use poise::serenity_prelude::{self as serenity, ComponentInteraction, Context};
use tracing::{debug, error, warn};

use crate::Data;

use super::audio_engine::Volume;
use super::button_controls::{PlayerButton, VOLUME_STEP};
use super::music_manager::{MusicResult, PlaybackSession, SessionRegistry};
use super::playlist::Direction;
use super::state_machine::PlaybackState;

type ButtonInteractionResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Handle a press on one of the player message buttons
pub async fn handle_interaction(
    ctx: &Context,
    interaction: &ComponentInteraction,
    data: &Data,
) -> ButtonInteractionResult {
    let guild_id = interaction.guild_id.ok_or("Not in a guild")?;

    // Acknowledge right away; the player message is edited by the session's view.
    interaction.defer(ctx).await?;

    let Some(button) = PlayerButton::from_custom_id(&interaction.data.custom_id) else {
        error!("Unknown button ID: {}", interaction.data.custom_id);
        return error_followup(ctx, interaction, "Unknown button action.").await;
    };

    let session = match data.sessions.get(guild_id) {
        Ok(session) => session,
        Err(e) => return error_followup(ctx, interaction, &e.to_string()).await,
    };

    debug!(
        "{:?} pressed by {} in guild {}",
        button, interaction.user.id, guild_id
    );
    if let Err(e) = apply_button(button, &session, &data.sessions).await {
        warn!("{:?} failed in guild {}: {}", button, guild_id, e);
        return error_followup(ctx, interaction, &e.to_string()).await;
    }

    Ok(())
}

/// Volume after pressing a volume button `presses` times (negative for down).
pub fn stepped_volume(current: Volume, presses: i64) -> Volume {
    Volume::from_display(i64::from(current.as_display()) + presses * VOLUME_STEP)
}

/// Run the action behind `button` against a session.
pub async fn apply_button(
    button: PlayerButton,
    session: &PlaybackSession,
    registry: &SessionRegistry,
) -> MusicResult<()> {
    let machine = session.machine();
    match button {
        PlayerButton::Previous => machine.prev().await,
        PlayerButton::Next => machine.next().await,
        PlayerButton::PlayPause => {
            if machine.state() == PlaybackState::Idle {
                let index = machine.current_index().await;
                machine.play_index(index).await
            } else {
                machine.toggle_pause().await
            }
        }
        PlayerButton::Stop => machine.stop().await,
        PlayerButton::Mode => {
            session.cycle_play_mode().await;
            Ok(())
        }
        PlayerButton::Sort => {
            machine.toggle_sort().await;
            Ok(())
        }
        PlayerButton::VolumeDown | PlayerButton::VolumeUp => {
            let presses = if button == PlayerButton::VolumeUp { 1 } else { -1 };
            let volume = stepped_volume(machine.engine().volume(), presses);
            session.set_volume(volume).await.map(drop)
        }
        PlayerButton::PageDown => {
            machine.turn_page(Direction::Backward).await;
            Ok(())
        }
        PlayerButton::PageUp => {
            machine.turn_page(Direction::Forward).await;
            Ok(())
        }
        PlayerButton::Eject => registry.destroy(session.guild_id()).await,
    }
}

/// Send an ephemeral error followup message for failed interactions
async fn error_followup(
    ctx: &Context,
    interaction: &ComponentInteraction,
    content: &str,
) -> ButtonInteractionResult {
    interaction
        .create_followup(
            &ctx.http,
            serenity::CreateInteractionResponseFollowup::new()
                .content(content)
                .ephemeral(true),
        )
        .await?;
    Ok(())
}
