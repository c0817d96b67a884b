use serenity::all::{ButtonStyle, CreateActionRow, CreateButton, ReactionType};

use super::player_view::PlayerSnapshot;
use super::state_machine::PlaybackState;

/// Buttons on the player message, identified by their custom id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerButton {
    Previous,
    PlayPause,
    Next,
    Stop,
    Mode,
    Sort,
    VolumeDown,
    VolumeUp,
    PageDown,
    PageUp,
    Eject,
}

impl PlayerButton {
    pub const ALL: [PlayerButton; 11] = [
        PlayerButton::Previous,
        PlayerButton::PlayPause,
        PlayerButton::Next,
        PlayerButton::Stop,
        PlayerButton::Mode,
        PlayerButton::Sort,
        PlayerButton::VolumeDown,
        PlayerButton::VolumeUp,
        PlayerButton::PageDown,
        PlayerButton::PageUp,
        PlayerButton::Eject,
    ];

    pub fn custom_id(self) -> &'static str {
        match self {
            PlayerButton::Previous => "music_prev",
            PlayerButton::PlayPause => "music_play_pause",
            PlayerButton::Next => "music_next",
            PlayerButton::Stop => "music_stop",
            PlayerButton::Mode => "music_mode",
            PlayerButton::Sort => "music_sort",
            PlayerButton::VolumeDown => "music_vol_down",
            PlayerButton::VolumeUp => "music_vol_up",
            PlayerButton::PageDown => "music_page_prev",
            PlayerButton::PageUp => "music_page_next",
            PlayerButton::Eject => "music_eject",
        }
    }

    pub fn from_custom_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|button| button.custom_id() == id)
    }
}

/// Volume change applied by the volume buttons, on the 0–100 scale.
pub const VOLUME_STEP: i64 = 10;

fn button(kind: PlayerButton, emoji: &str, style: ButtonStyle) -> CreateButton {
    CreateButton::new(kind.custom_id())
        .emoji(ReactionType::Unicode(emoji.to_string()))
        .style(style)
}

/// The control rows for the player message.
pub fn player_controls(snapshot: &PlayerSnapshot) -> Vec<CreateActionRow> {
    let empty = snapshot.track_count == 0;
    let active = snapshot.state != PlaybackState::Idle;
    let audible = active && !snapshot.is_paused();

    let play_pause = button(
        PlayerButton::PlayPause,
        if audible { "⏸️" } else { "▶️" },
        ButtonStyle::Primary,
    )
    .label(if audible { "Pause" } else { "Play" })
    .disabled(empty);

    let transport = vec![
        button(PlayerButton::Previous, "⏮️", ButtonStyle::Secondary).disabled(empty),
        play_pause,
        button(PlayerButton::Next, "⏭️", ButtonStyle::Secondary).disabled(empty),
        button(PlayerButton::Stop, "⏹️", ButtonStyle::Danger).disabled(!active),
        button(PlayerButton::Eject, "⏏️", ButtonStyle::Danger),
    ];

    let volume = snapshot.volume.as_display();
    let settings = vec![
        button(
            PlayerButton::Mode,
            snapshot.play_mode.emoji(),
            ButtonStyle::Secondary,
        )
        .label("Mode"),
        button(PlayerButton::Sort, "🔃", ButtonStyle::Secondary)
            .label(format!("By {}", snapshot.sort_order)),
        button(PlayerButton::VolumeDown, "🔉", ButtonStyle::Secondary).disabled(volume == 0),
        button(PlayerButton::VolumeUp, "🔊", ButtonStyle::Secondary).disabled(volume >= 100),
    ];

    let page = snapshot.pagination.current_page;
    let paging = vec![
        button(PlayerButton::PageDown, "◀️", ButtonStyle::Secondary).disabled(page == 0),
        button(PlayerButton::PageUp, "▶️", ButtonStyle::Secondary)
            .disabled(page + 1 >= snapshot.pagination.max_page),
    ];

    vec![
        CreateActionRow::Buttons(transport),
        CreateActionRow::Buttons(settings),
        CreateActionRow::Buttons(paging),
    ]
}
