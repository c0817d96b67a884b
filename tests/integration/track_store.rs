use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

use jukebox::commands::music::utils::music_manager::MusicError;
use jukebox::commands::music::utils::playlist::SortOrder;
use jukebox::commands::music::utils::track_store::{DatabaseStore, DirectoryStore, TrackStore};

use crate::common::fixtures::{SAMPLE_USER_ID, new_track};
use crate::common::session;
use crate::test_utils;

#[tokio::test]
async fn directory_session_plays_local_files() {
    test_utils::init();
    let dir = TempDir::new().unwrap();
    for name in ["b-side.mp3", "a-side.flac", "cover.png", "notes.txt"] {
        fs::write(dir.path().join(name), b"not really audio").unwrap();
    }
    let (session, h) = session(Arc::new(DirectoryStore::new(dir.path())));

    assert_eq!(session.refresh().await.unwrap(), 2);
    if h.machine.snapshot().await.sort_order != SortOrder::ByTitle {
        h.machine.toggle_sort().await;
    }
    h.machine.play_index(0).await.unwrap();

    assert_eq!(h.engine.plays(), vec!["a-side".to_string()]);
    let current = h.machine.snapshot().await.current.unwrap();
    assert!(!current.is_remote());
    assert!(current.url.ends_with("a-side.flac"));
}

#[tokio::test]
async fn directory_ids_are_stable_across_refreshes() {
    test_utils::init();
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("one.mp3"), b"1").unwrap();
    let store = DirectoryStore::new(dir.path());
    let first = store.load().await.unwrap();

    fs::write(dir.path().join("two.mp3"), b"2").unwrap();
    let second = store.load().await.unwrap();

    let one = second.iter().find(|t| t.title == "one").unwrap();
    assert_eq!(one.id, first[0].id);
    assert_eq!(second.len(), 2);
}

#[tokio::test]
async fn database_session_adds_and_plays_tracks() {
    test_utils::init();
    let dir = TempDir::new().unwrap();
    let store = Arc::new(DatabaseStore::new(dir.path().join("app.db"), SAMPLE_USER_ID));
    let (session, h) = session(store);

    session.add_track(new_track("First")).await.unwrap();
    session.add_track(new_track("Second")).await.unwrap();
    h.machine.play_index(1).await.unwrap();

    assert_eq!(h.machine.snapshot().await.track_count, 2);
    assert_eq!(h.engine.plays(), vec!["Second".to_string()]);
}

#[tokio::test]
async fn database_tracks_belong_to_their_owner() {
    test_utils::init();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.db");
    let mine = DatabaseStore::new(&path, 1);
    let theirs = DatabaseStore::new(&path, 2);

    mine.add(new_track("Mine")).await.unwrap();

    assert_eq!(mine.load().await.unwrap().len(), 1);
    assert!(theirs.load().await.unwrap().is_empty());
}

#[tokio::test]
async fn directory_store_refuses_new_tracks() {
    let dir = TempDir::new().unwrap();
    let (session, h) = session(Arc::new(DirectoryStore::new(dir.path())));

    assert_matches!(
        session.add_track(new_track("Remote")).await,
        Err(MusicError::StoreError(_))
    );
    assert_eq!(h.machine.snapshot().await.track_count, 0);
}

#[tokio::test]
async fn missing_directory_empties_the_playlist() {
    let dir = TempDir::new().unwrap();
    let (session, h) = session(Arc::new(DirectoryStore::new(dir.path().join("gone"))));

    assert_matches!(session.refresh().await, Err(MusicError::StoreError(_)));
    assert_eq!(h.machine.snapshot().await.track_count, 0);
}
