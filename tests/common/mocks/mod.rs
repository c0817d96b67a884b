//! Stand-ins for the audio engine, the player message and the track store

use async_trait::async_trait;
use chrono::Utc;
use mockall::mock;
use serenity::model::id::ChannelId;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use jukebox::commands::music::utils::audio_engine::{AudioEngine, PlayerStatus, StatusBus, Volume};
use jukebox::commands::music::utils::music_manager::{MusicError, MusicResult};
use jukebox::commands::music::utils::player_view::{PlayerSnapshot, PlayerView};
use jukebox::commands::music::utils::playlist::Track;
use jukebox::commands::music::utils::track_store::TrackStore;
use jukebox::utils::database::NewTrack;

/// A call the state machine made on the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    Join,
    Play(String),
    Pause,
    Resume,
    Stop,
    SetVolume(u8),
    Leave,
}

/// In-memory engine that records every call and reports status the way the
/// songbird engine does.
pub struct FakeEngine {
    bus: StatusBus,
    calls: Mutex<Vec<EngineCall>>,
    volume: Mutex<Volume>,
    confirm_playback: AtomicBool,
    failing: Mutex<Vec<String>>,
    linger: Mutex<Duration>,
    join_delay: Mutex<Duration>,
}

impl Default for FakeEngine {
    fn default() -> Self {
        Self {
            bus: StatusBus::new(),
            calls: Mutex::new(Vec::new()),
            volume: Mutex::new(Volume::default()),
            confirm_playback: AtomicBool::new(true),
            failing: Mutex::new(Vec::new()),
            linger: Mutex::new(Duration::ZERO),
            join_delay: Mutex::new(Duration::ZERO),
        }
    }
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Titles passed to `play`, in order.
    pub fn plays(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                EngineCall::Play(title) => Some(title),
                _ => None,
            })
            .collect()
    }

    /// Whether `play` reports the track as started.
    pub fn set_confirm_playback(&self, confirm: bool) {
        self.confirm_playback.store(confirm, Ordering::SeqCst);
    }

    /// Make `play` fail for the track titled `title`.
    pub fn fail_on(&self, title: &str) {
        self.failing.lock().unwrap().push(title.to_string());
    }

    /// Keep `play` running for `linger` after the track has started.
    pub fn set_linger(&self, linger: Duration) {
        *self.linger.lock().unwrap() = linger;
    }

    /// Make `join` take `delay` before connecting.
    pub fn set_join_delay(&self, delay: Duration) {
        *self.join_delay.lock().unwrap() = delay;
    }

    /// The current track reached its natural end.
    pub fn finish_track(&self) {
        self.bus.publish(PlayerStatus::Idle);
    }

    fn record(&self, call: EngineCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl AudioEngine for FakeEngine {
    async fn join(&self, channel: Option<ChannelId>) -> MusicResult<()> {
        channel.ok_or(MusicError::UserNotInVoiceChannel)?;
        let delay = *self.join_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.record(EngineCall::Join);
        Ok(())
    }

    async fn play(&self, track: &Track) -> MusicResult<()> {
        self.record(EngineCall::Play(track.title.clone()));
        if self.failing.lock().unwrap().contains(&track.title) {
            return Err(MusicError::UnsupportedFormat(track.title.clone()));
        }
        if self.confirm_playback.load(Ordering::SeqCst) {
            self.bus.publish(PlayerStatus::Playing);
        }
        let linger = *self.linger.lock().unwrap();
        if !linger.is_zero() {
            tokio::time::sleep(linger).await;
        }
        Ok(())
    }

    async fn pause(&self) -> MusicResult<()> {
        self.record(EngineCall::Pause);
        self.bus.publish(PlayerStatus::Paused);
        Ok(())
    }

    async fn resume(&self) -> MusicResult<()> {
        self.record(EngineCall::Resume);
        self.bus.publish(PlayerStatus::Playing);
        Ok(())
    }

    async fn stop(&self) -> MusicResult<()> {
        self.record(EngineCall::Stop);
        self.bus.publish(PlayerStatus::Idle);
        Ok(())
    }

    async fn set_volume(&self, volume: Volume) -> MusicResult<()> {
        self.record(EngineCall::SetVolume(volume.as_display()));
        *self.volume.lock().unwrap() = volume;
        Ok(())
    }

    fn volume(&self) -> Volume {
        *self.volume.lock().unwrap()
    }

    async fn leave(&self) -> MusicResult<()> {
        self.record(EngineCall::Leave);
        Ok(())
    }

    fn status_bus(&self) -> &StatusBus {
        &self.bus
    }
}

mock! {
    pub View {}

    #[async_trait]
    impl PlayerView for View {
        async fn refresh(&self, snapshot: PlayerSnapshot) -> MusicResult<()>;
        async fn notify(&self, text: String);
        async fn close(&self);
    }
}

/// A view that keeps everything it is shown.
#[derive(Default)]
pub struct RecordingView {
    snapshots: Mutex<Vec<PlayerSnapshot>>,
    notices: Mutex<Vec<String>>,
    closed: AtomicBool,
}

impl RecordingView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_snapshot(&self) -> Option<PlayerSnapshot> {
        self.snapshots.lock().unwrap().last().cloned()
    }

    pub fn refresh_count(&self) -> usize {
        self.snapshots.lock().unwrap().len()
    }

    pub fn notices(&self) -> Vec<String> {
        self.notices.lock().unwrap().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlayerView for RecordingView {
    async fn refresh(&self, snapshot: PlayerSnapshot) -> MusicResult<()> {
        self.snapshots.lock().unwrap().push(snapshot);
        Ok(())
    }

    async fn notify(&self, text: String) {
        self.notices.lock().unwrap().push(text);
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Track store backed by a vector.
pub struct FakeStore {
    tracks: Mutex<Vec<Track>>,
    failing: AtomicBool,
    next_id: AtomicI64,
}

impl FakeStore {
    pub fn new(tracks: Vec<Track>) -> Self {
        let next_id = tracks.iter().map(|t| t.id).max().unwrap_or(0) + 1;
        Self {
            tracks: Mutex::new(tracks),
            failing: AtomicBool::new(false),
            next_id: AtomicI64::new(next_id),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl TrackStore for FakeStore {
    async fn load(&self) -> MusicResult<Vec<Track>> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(MusicError::StoreError("store unavailable".to_string()));
        }
        Ok(self.tracks.lock().unwrap().clone())
    }

    async fn add(&self, track: NewTrack) -> MusicResult<Track> {
        let track = Track {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            title: track.title,
            url: track.url,
            thumbnail: track.thumbnail,
            duration: track.duration,
            created_at: Utc::now(),
        };
        self.tracks.lock().unwrap().push(track.clone());
        Ok(track)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::fixtures::sample_tracks;

    #[tokio::test]
    async fn fake_engine_confirms_playback_on_its_bus() {
        let engine = FakeEngine::new();
        let mut sub = engine.subscribe();
        engine.play(&sample_tracks(1)[0]).await.unwrap();

        assert_eq!(sub.receiver.recv().await, Some(PlayerStatus::Playing));
        assert_eq!(engine.plays(), vec!["T0".to_string()]);
    }

    #[tokio::test]
    async fn fake_store_can_fail() {
        let store = FakeStore::new(sample_tracks(2));
        assert_eq!(store.load().await.unwrap().len(), 2);
        store.set_failing(true);
        assert!(store.load().await.is_err());
    }
}
