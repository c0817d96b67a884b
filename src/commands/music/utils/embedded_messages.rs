use poise::CreateReply;
use poise::serenity_prelude::CreateEmbed;

use super::audio_engine::Volume;
use super::music_manager::MusicError;
use super::player_view::PlayerSnapshot;
use super::playlist::{PlayMode, SortOrder, Track};
use super::state_machine::PlaybackState;

const GREEN: u32 = 0x00ff00;
const RED: u32 = 0xff0000;
const BLURPLE: u32 = 0x5865f2;

/// Markdown link for a track; local files are shown without a link.
fn track_link(track: &Track) -> String {
    if track.is_remote() {
        format!("[{}]({})", track.title, track.url)
    } else {
        format!("**{}**", track.title)
    }
}

/// One line per track on the visible page, marking the cursor.
pub fn format_page(snapshot: &PlayerSnapshot) -> String {
    if snapshot.page.is_empty() {
        return "**📭 Playlist is empty**".to_string();
    }

    let mut lines = String::new();
    for (index, track) in &snapshot.page {
        let marker = if *index == snapshot.current_index {
            "▶️"
        } else {
            "▫️"
        };
        lines.push_str(&format!("{} `{}.` {}", marker, index + 1, track_link(track)));
        if let Some(duration) = &track.duration {
            lines.push_str(&format!(" `{}`", duration));
        }
        lines.push('\n');
    }
    lines
}

fn status_line(snapshot: &PlayerSnapshot) -> &'static str {
    match (snapshot.state, snapshot.is_paused()) {
        (PlaybackState::Playing, true) => "⏸️ Paused",
        (PlaybackState::Playing, false) => "🎵 Now Playing",
        (PlaybackState::Transitioning, _) => "⏳ Loading",
        (PlaybackState::Idle, _) => "🔇 Nothing playing",
    }
}

/// The embed of the player message.
pub fn music_player(snapshot: &PlayerSnapshot) -> CreateEmbed {
    let mut description = format!("**{}**\n", status_line(snapshot));
    if let Some(track) = &snapshot.current {
        description.push_str(&track_link(track));
        description.push_str("\n\n");
    } else {
        description.push('\n');
    }
    description.push_str(&format_page(snapshot));

    let mut embed = CreateEmbed::new()
        .title("🎶 Music Player")
        .description(description)
        .field(
            "Mode",
            format!("{} `{}`", snapshot.play_mode.emoji(), snapshot.play_mode),
            true,
        )
        .field("Sort", format!("`{}`", snapshot.sort_order), true)
        .field("Volume", format!("`{}`", snapshot.volume), true)
        .field(
            "Page",
            format!(
                "`{}/{}` • {} tracks",
                snapshot.pagination.current_page + 1,
                snapshot.pagination.max_page,
                snapshot.track_count
            ),
            false,
        )
        .color(BLURPLE);

    if let Some(thumbnail) = snapshot.current.as_ref().and_then(|t| t.thumbnail.clone()) {
        embed = embed.thumbnail(thumbnail);
    }
    embed
}

/// Plain red embed with a message.
pub fn generic_error(message: &str) -> CreateEmbed {
    CreateEmbed::new()
        .title("❌ Error")
        .description(message)
        .color(RED)
}

/// Ephemeral reply describing a failed music operation.
pub fn error(err: &MusicError) -> CreateReply {
    CreateReply::default()
        .embed(generic_error(&err.to_string()))
        .ephemeral(true)
}

/// Create an embed for when a user is not connected to a voice channel
pub fn user_not_in_voice_channel() -> CreateReply {
    error(&MusicError::UserNotInVoiceChannel)
}

/// Create an embed for when no player is running in the guild
pub fn no_session() -> CreateReply {
    CreateReply::default()
        .embed(
            CreateEmbed::new()
                .title("❌ Error")
                .description("No player is running here. Use `/join` first.")
                .color(RED),
        )
        .ephemeral(true)
}

fn success(title: &str, description: impl Into<String>) -> CreateReply {
    CreateReply::default()
        .embed(
            CreateEmbed::new()
                .title(title)
                .description(description)
                .color(GREEN),
        )
        .ephemeral(true)
}

pub fn session_started(track_count: usize) -> CreateReply {
    success(
        "👋 Joined",
        format!("Loaded {} tracks. Use the player below or `/play`.", track_count),
    )
}

pub fn playing(index: usize) -> CreateReply {
    success("▶️ Playing", format!("Starting track #{}", index + 1))
}

pub fn paused() -> CreateReply {
    success("⏸️ Paused", "Playback paused")
}

pub fn resumed() -> CreateReply {
    success("▶️ Resumed", "Playback resumed")
}

pub fn skipped() -> CreateReply {
    success("⏭️ Skipped", "Skipped to the next track")
}

pub fn went_back() -> CreateReply {
    success("⏮️ Previous", "Went back to the previous track")
}

pub fn stopped() -> CreateReply {
    success("⏹️ Stopped", "Playback stopped")
}

pub fn left_voice_channel() -> CreateReply {
    success("👋 Left Voice Channel", "Disconnected and closed the player")
}

pub fn volume_set(volume: Volume) -> CreateReply {
    success("🔊 Volume", format!("Volume set to `{}`", volume))
}

pub fn play_mode(mode: PlayMode) -> CreateReply {
    success("🎚️ Play Mode", format!("{} `{}`", mode.emoji(), mode))
}

pub fn sort_order(order: SortOrder) -> CreateReply {
    success("🔃 Sort", format!("Sorting by `{}`", order))
}

pub fn refreshed(track_count: usize) -> CreateReply {
    success("🔄 Refreshed", format!("Loaded {} tracks", track_count))
}

pub fn track_added(track: &Track) -> CreateReply {
    success("➕ Track Added", format!("Added {}", track_link(track)))
}

/// The playlist page as a standalone reply.
pub fn playlist_page(snapshot: &PlayerSnapshot) -> CreateReply {
    CreateReply::default()
        .embed(
            CreateEmbed::new()
                .title(format!(
                    "📋 Playlist • page {}/{}",
                    snapshot.pagination.current_page + 1,
                    snapshot.pagination.max_page
                ))
                .description(format_page(snapshot))
                .color(BLURPLE),
        )
        .ephemeral(true)
}
