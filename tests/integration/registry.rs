use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use rstest::rstest;
use serenity::model::id::GuildId;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

use jukebox::commands::music::utils::audio_engine::{AudioEngine, Volume};
use jukebox::commands::music::utils::button_controls::PlayerButton;
use jukebox::commands::music::utils::component_handlers::apply_button;
use jukebox::commands::music::utils::music_manager::{MusicError, SessionRegistry};
use jukebox::commands::music::utils::playlist::{PlayMode, SortOrder};
use jukebox::commands::music::utils::settings_manager::SettingsManager;
use jukebox::commands::music::utils::state_machine::PlaybackState;

use crate::common::fixtures::{SAMPLE_GUILD_ID, new_track, sample_tracks, track};
use crate::common::mocks::{EngineCall, FakeStore};
use crate::common::{WAIT_LIMIT, session, wait_for_state};
use crate::test_utils;

fn guild() -> GuildId {
    GuildId::new(SAMPLE_GUILD_ID)
}

#[tokio::test]
async fn create_builds_a_session_once_per_guild() {
    test_utils::init();
    let registry = SessionRegistry::new();
    let built = AtomicUsize::new(0);
    let make = || {
        built.fetch_add(1, Ordering::SeqCst);
        session(Arc::new(FakeStore::new(Vec::new()))).0
    };

    let (first, created) = registry.create(guild(), make);
    assert!(created);
    let (second, created) = registry.create(guild(), || {
        built.fetch_add(1, Ordering::SeqCst);
        session(Arc::new(FakeStore::new(Vec::new()))).0
    });
    assert!(!created);

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(built.load(Ordering::SeqCst), 1);
    assert_eq!(registry.len(), 1);
}

#[tokio::test]
async fn missing_sessions_are_reported() {
    let registry = SessionRegistry::new();

    assert_matches!(registry.get(guild()), Err(MusicError::NoSession));
    assert_matches!(registry.destroy(guild()).await, Err(MusicError::NoSession));
    assert!(registry.is_empty());
}

#[tokio::test]
async fn destroy_shuts_the_session_down() {
    test_utils::init();
    let registry = SessionRegistry::new();
    let (session, h) = session(Arc::new(FakeStore::new(sample_tracks(2))));
    registry.create(guild(), || session);
    let session = registry.get(guild()).unwrap();
    session.refresh().await.unwrap();
    session.machine().play_index(0).await.unwrap();

    registry.destroy(guild()).await.unwrap();

    assert!(!registry.contains(guild()));
    assert_eq!(h.engine.calls().last(), Some(&EngineCall::Leave));
    assert_eq!(h.machine.state(), PlaybackState::Idle);
    assert!(h.view.is_closed());
}

#[tokio::test]
async fn destroy_completes_while_an_operation_is_stuck() {
    test_utils::init();
    let registry = SessionRegistry::new();
    let (session, h) = session(Arc::new(FakeStore::new(sample_tracks(2))));
    let (session, _) = registry.create(guild(), || session);
    session.refresh().await.unwrap();
    h.engine.set_linger(Duration::from_secs(3600));
    let _stuck = session.machine().play_index(0);
    wait_for_state(&h.machine, PlaybackState::Playing).await;

    tokio::time::timeout(WAIT_LIMIT, registry.destroy(guild()))
        .await
        .expect("destroy waited on the operation queue")
        .unwrap();

    assert!(registry.is_empty());
    assert_eq!(h.engine.calls().last(), Some(&EngineCall::Leave));
    assert!(h.view.is_closed());
}

#[tokio::test]
async fn destroy_all_empties_the_registry() {
    test_utils::init();
    let registry = SessionRegistry::new();
    for id in 1..=3 {
        registry.create(GuildId::new(id), || {
            session(Arc::new(FakeStore::new(Vec::new()))).0
        });
    }

    registry.destroy_all().await;

    assert!(registry.is_empty());
}

#[tokio::test]
async fn refresh_loads_tracks_in_sort_order() {
    test_utils::init();
    let mut tracks = sample_tracks(3);
    tracks.reverse();
    let (session, h) = session(Arc::new(FakeStore::new(tracks)));

    assert_eq!(session.refresh().await.unwrap(), 3);

    let snapshot = h.machine.snapshot().await;
    assert_eq!(snapshot.sort_order, SortOrder::ByDate);
    let titles: Vec<_> = snapshot.page.iter().map(|(_, t)| t.title.as_str()).collect();
    assert_eq!(titles, ["T0", "T1", "T2"]);
}

#[tokio::test]
async fn failed_refresh_leaves_an_empty_playlist() {
    test_utils::init();
    let store = Arc::new(FakeStore::new(sample_tracks(3)));
    let (session, h) = session(store.clone());
    session.refresh().await.unwrap();

    store.set_failing(true);
    let err = session.refresh().await.unwrap_err();

    assert_matches!(err, MusicError::StoreError(_));
    assert_eq!(h.machine.snapshot().await.track_count, 0);
    assert_matches!(
        h.machine.play_index(0).await,
        Err(MusicError::EmptyPlaylist)
    );
}

#[tokio::test]
async fn added_tracks_show_up_after_refresh() {
    test_utils::init();
    let (session, h) = session(Arc::new(FakeStore::new(vec![track(1, "Old")])));
    session.refresh().await.unwrap();

    let added = session.add_track(new_track("Fresh")).await.unwrap();

    assert_eq!(added.id, 2);
    assert_eq!(h.machine.snapshot().await.track_count, 2);
}

#[tokio::test]
async fn settings_survive_a_new_session() {
    test_utils::init();
    let dir = TempDir::new().unwrap();
    let settings = Arc::new(SettingsManager::new(dir.path().join("app.db"), Volume::default()));

    let (first, _) = session(Arc::new(FakeStore::new(Vec::new())));
    let first = first.with_settings(settings.clone());
    assert_eq!(first.cycle_play_mode().await, PlayMode::PlayOnce);
    first.set_volume(Volume::from_display(30)).await.unwrap();

    let (second, h) = session(Arc::new(FakeStore::new(Vec::new())));
    let second = second.with_settings(settings);
    second.restore_settings().await;

    let snapshot = h.machine.snapshot().await;
    assert_eq!(snapshot.play_mode, PlayMode::PlayOnce);
    assert_eq!(snapshot.volume.as_display(), 30);
}

#[tokio::test]
async fn play_pause_button_starts_from_the_cursor_when_idle() {
    test_utils::init();
    let registry = SessionRegistry::new();
    let (session, h) = session(Arc::new(FakeStore::new(sample_tracks(3))));
    session.refresh().await.unwrap();

    apply_button(PlayerButton::PlayPause, &session, &registry)
        .await
        .unwrap();
    wait_for_state(&h.machine, PlaybackState::Playing).await;
    apply_button(PlayerButton::PlayPause, &session, &registry)
        .await
        .unwrap();

    assert_eq!(
        h.engine.calls(),
        vec![
            EngineCall::Join,
            EngineCall::Play("T0".into()),
            EngineCall::Pause
        ]
    );
}

#[rstest]
#[case(PlayerButton::Next, "T1")]
#[case(PlayerButton::Previous, "T2")]
#[tokio::test]
async fn transport_buttons_move_the_cursor(#[case] button: PlayerButton, #[case] expected: &str) {
    test_utils::init();
    let registry = SessionRegistry::new();
    let (session, h) = session(Arc::new(FakeStore::new(sample_tracks(3))));
    session.refresh().await.unwrap();

    apply_button(button, &session, &registry).await.unwrap();

    assert_eq!(h.engine.plays(), vec![expected.to_string()]);
}

#[tokio::test]
async fn volume_buttons_step_and_clamp() {
    test_utils::init();
    let registry = SessionRegistry::new();
    let (session, h) = session(Arc::new(FakeStore::new(Vec::new())));
    session.set_volume(Volume::from_display(95)).await.unwrap();

    apply_button(PlayerButton::VolumeUp, &session, &registry)
        .await
        .unwrap();
    assert_eq!(h.engine.volume().as_display(), 100);

    apply_button(PlayerButton::VolumeDown, &session, &registry)
        .await
        .unwrap();
    assert_eq!(h.engine.volume().as_display(), 90);
}

#[tokio::test]
async fn mode_and_sort_buttons_update_the_player() {
    test_utils::init();
    let registry = SessionRegistry::new();
    let (session, h) = session(Arc::new(FakeStore::new(sample_tracks(2))));
    session.refresh().await.unwrap();

    apply_button(PlayerButton::Mode, &session, &registry)
        .await
        .unwrap();
    apply_button(PlayerButton::Sort, &session, &registry)
        .await
        .unwrap();

    let snapshot = h.view.last_snapshot().unwrap();
    assert_eq!(snapshot.play_mode, PlayMode::PlayOnce);
    assert_eq!(snapshot.sort_order, SortOrder::ByTitle);
}

#[tokio::test]
async fn eject_button_removes_the_session() {
    test_utils::init();
    let registry = SessionRegistry::new();
    let (session, h) = session(Arc::new(FakeStore::new(sample_tracks(1))));
    let (session, _) = registry.create(guild(), || session);

    apply_button(PlayerButton::Eject, &session, &registry)
        .await
        .unwrap();

    assert!(!registry.contains(guild()));
    assert!(h.view.is_closed());
    assert_matches!(
        apply_button(PlayerButton::Eject, &session, &registry).await,
        Err(MusicError::NoSession)
    );
}
