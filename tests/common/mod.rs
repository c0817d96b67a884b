//! Common test utilities, fixtures, and mocks
//! This module contains shared functionality used across different test categories

pub mod fixtures;
pub mod mocks;

use serenity::model::id::{ChannelId, GuildId, UserId};
use std::sync::Arc;
use std::time::Duration;

use jukebox::commands::music::utils::music_manager::PlaybackSession;
use jukebox::commands::music::utils::player_view::PlayerView;
use jukebox::commands::music::utils::playlist::{DEFAULT_PAGE_SIZE, Playlist, Track};
use jukebox::commands::music::utils::state_machine::{PlaybackState, PlaybackStateMachine};
use jukebox::commands::music::utils::track_store::TrackStore;

use fixtures::{SAMPLE_GUILD_ID, SAMPLE_USER_ID, SAMPLE_VOICE_CHANNEL_ID, SHUFFLE_SEED};
use mocks::{FakeEngine, RecordingView};

/// How long the helpers wait for background work before failing the test.
pub const WAIT_LIMIT: Duration = Duration::from_secs(2);

/// Settle delay used by test machines; short but non-zero.
pub const TEST_SETTLE_DELAY: Duration = Duration::from_millis(5);

/// A state machine wired to fakes the test can inspect.
pub struct Harness {
    pub machine: Arc<PlaybackStateMachine>,
    pub engine: Arc<FakeEngine>,
    pub view: Arc<RecordingView>,
}

/// Build a machine over `tracks`. Must run inside a tokio runtime.
pub fn harness(tracks: Vec<Track>) -> Harness {
    let engine = Arc::new(FakeEngine::new());
    let view = Arc::new(RecordingView::new());
    let machine = machine_with(tracks, engine.clone(), view.clone());
    Harness {
        machine,
        engine,
        view,
    }
}

pub fn machine_with(
    tracks: Vec<Track>,
    engine: Arc<FakeEngine>,
    view: Arc<dyn PlayerView>,
) -> Arc<PlaybackStateMachine> {
    let mut playlist = Playlist::with_seed(DEFAULT_PAGE_SIZE, SHUFFLE_SEED);
    playlist.replace_tracks(tracks);
    let machine = PlaybackStateMachine::new("test", playlist, engine, view, TEST_SETTLE_DELAY);
    machine.set_voice_channel(Some(ChannelId::new(SAMPLE_VOICE_CHANNEL_ID)));
    machine
}

/// A session over an empty playlist, loading from `store`.
pub fn session(store: Arc<dyn TrackStore>) -> (PlaybackSession, Harness) {
    let harness = harness(Vec::new());
    let session = PlaybackSession::new(
        GuildId::new(SAMPLE_GUILD_ID),
        UserId::new(SAMPLE_USER_ID),
        harness.machine.clone(),
        store,
        harness.view.clone(),
    );
    (session, harness)
}

pub async fn wait_for_state(machine: &PlaybackStateMachine, expected: PlaybackState) {
    let mut states = machine.subscribe_state();
    tokio::time::timeout(WAIT_LIMIT, states.wait_for(|state| *state == expected))
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {expected}, still {}", machine.state()))
        .expect("state channel closed");
}

/// Poll `condition` until it holds.
pub async fn wait_until(what: &str, condition: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + WAIT_LIMIT;
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {what}"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Let background tasks run for a moment.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use jukebox::commands::music::utils::audio_engine::AudioEngine;

    #[tokio::test]
    async fn harness_starts_idle() {
        let harness = harness(fixtures::sample_tracks(3));
        assert_eq!(harness.machine.state(), PlaybackState::Idle);
        assert_eq!(harness.machine.snapshot().await.track_count, 3);
        assert_eq!(harness.engine.listener_count(), 0);
    }
}
