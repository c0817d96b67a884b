//! Coordinates the playlist and the audio engine for one session.
//!
//! Every playback-mutating request is funnelled through the session's
//! [`OperationSerializer`]. Engine status changes arrive on a single
//! subscription and are folded into [`PlaybackState`] by [`transition`];
//! a natural end of track comes back in as an `AutoAdvance` operation.

use serenity::model::id::ChannelId;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::audio_engine::{AudioEngine, PlayerStatus, StatusSubscription, SubscriptionId, Volume};
use super::music_manager::{MusicError, MusicResult};
use super::player_view::{PlayerSnapshot, PlayerView};
use super::playlist::{Direction, PlayMode, Playlist, SortOrder, Track};
use super::serializer::{OperationHandle, OperationKind, OperationSerializer};

/// Pause between stopping a track and starting the next one on a manual skip.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Idle,
    Transitioning,
    Playing,
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Follow-up work requested by a state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    RefreshView,
    SubmitAutoAdvance,
}

/// Fold an engine status into the playback state.
///
/// `in_flight` is the operation the serializer is running when the status
/// arrives; a track ending underneath a manual skip is not a natural end.
pub fn transition(
    state: PlaybackState,
    status: PlayerStatus,
    in_flight: Option<OperationKind>,
) -> (PlaybackState, Option<Effect>) {
    use PlaybackState::*;

    match (state, status) {
        (Transitioning, PlayerStatus::Playing) => (Playing, Some(Effect::RefreshView)),
        (Playing, PlayerStatus::Idle) => match in_flight {
            Some(kind) if kind.suppresses_auto_advance() => {
                debug!("Track ended during {}, not auto-advancing", kind);
                (Idle, None)
            }
            _ => (Idle, Some(Effect::SubmitAutoAdvance)),
        },
        // The previous track ending late; the running operation reports its
        // own failure.
        (Transitioning, PlayerStatus::Idle)
            if in_flight.is_some_and(OperationKind::starts_playback) =>
        {
            debug!("Ignoring stale end of track while starting the next one");
            (Transitioning, None)
        }
        // The engine gave up before the track ever started.
        (Transitioning, PlayerStatus::Idle) => (Idle, Some(Effect::RefreshView)),
        (Playing, PlayerStatus::Paused | PlayerStatus::Playing) => {
            (Playing, Some(Effect::RefreshView))
        }
        (state, status) => {
            debug!("Ignoring {} while {}", status, state);
            (state, None)
        }
    }
}

struct StatusListener {
    id: SubscriptionId,
    task: JoinHandle<()>,
}

pub struct PlaybackStateMachine {
    label: String,
    playlist: AsyncMutex<Playlist>,
    engine: Arc<dyn AudioEngine>,
    view: Arc<dyn PlayerView>,
    serializer: OperationSerializer,
    state: watch::Sender<PlaybackState>,
    listener: Mutex<Option<StatusListener>>,
    voice_channel: Mutex<Option<ChannelId>>,
    settle_delay: Duration,
    weak_self: Weak<Self>,
}

impl PlaybackStateMachine {
    /// Must be called inside a tokio runtime; spawns the operation worker.
    pub fn new(
        label: impl Into<String>,
        playlist: Playlist,
        engine: Arc<dyn AudioEngine>,
        view: Arc<dyn PlayerView>,
        settle_delay: Duration,
    ) -> Arc<Self> {
        let label = label.into();
        let (state, _) = watch::channel(PlaybackState::Idle);
        Arc::new_cyclic(|weak_self| Self {
            serializer: OperationSerializer::new(label.clone()),
            label,
            playlist: AsyncMutex::new(playlist),
            engine,
            view,
            state,
            listener: Mutex::new(None),
            voice_channel: Mutex::new(None),
            settle_delay,
            weak_self: weak_self.clone(),
        })
    }

    pub fn state(&self) -> PlaybackState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<PlaybackState> {
        self.state.subscribe()
    }

    pub async fn current_index(&self) -> usize {
        self.playlist.lock().await.current_index()
    }

    pub fn engine(&self) -> &Arc<dyn AudioEngine> {
        &self.engine
    }

    pub fn serializer(&self) -> &OperationSerializer {
        &self.serializer
    }

    /// The voice channel `play_track` joins.
    pub fn set_voice_channel(&self, channel: Option<ChannelId>) {
        *lock(&self.voice_channel) = channel;
    }

    pub fn play_index(self: &Arc<Self>, index: usize) -> OperationHandle<()> {
        self.submit(OperationKind::PlayIndex(index), move |m| async move {
            m.idle_on_error(m.play_track(index)).await.map(drop)
        })
    }

    pub fn next(self: &Arc<Self>) -> OperationHandle<()> {
        self.submit(OperationKind::Next, |m| async move {
            m.idle_on_error(m.skip(Direction::Forward)).await
        })
    }

    pub fn prev(self: &Arc<Self>) -> OperationHandle<()> {
        self.submit(OperationKind::Prev, |m| async move {
            m.idle_on_error(m.skip(Direction::Backward)).await
        })
    }

    pub fn pause(self: &Arc<Self>) -> OperationHandle<()> {
        self.submit(OperationKind::Pause, |m| async move {
            m.engine.pause().await?;
            m.refresh_view().await;
            Ok(())
        })
    }

    pub fn resume(self: &Arc<Self>) -> OperationHandle<()> {
        self.submit(OperationKind::Resume, |m| async move {
            m.engine.resume().await?;
            m.refresh_view().await;
            Ok(())
        })
    }

    pub fn stop(self: &Arc<Self>) -> OperationHandle<()> {
        self.submit(OperationKind::Stop, |m| async move {
            m.detach_listener();
            let result = m.engine.stop().await;
            m.set_state(PlaybackState::Idle);
            m.refresh_view().await;
            result
        })
    }

    /// Start the track under the cursor when idle, resume it when paused.
    /// A track that is already playing is left alone.
    pub async fn play_current(self: &Arc<Self>) -> MusicResult<usize> {
        let index = self.current_index().await;
        match self.state() {
            PlaybackState::Idle => self.play_index(index).await?,
            _ if self.engine.status() == PlayerStatus::Paused => self.resume().await?,
            state => debug!("[{}] already {} at #{}", self.label, state, index),
        }
        Ok(index)
    }

    /// Pause when something is audible, resume otherwise.
    pub fn toggle_pause(self: &Arc<Self>) -> OperationHandle<()> {
        match self.engine.status() {
            PlayerStatus::Playing | PlayerStatus::Buffering => self.pause(),
            _ => self.resume(),
        }
    }

    pub async fn set_volume(&self, volume: Volume) -> MusicResult<Volume> {
        self.engine.set_volume(volume).await?;
        info!("[{}] volume set to {}", self.label, volume);
        self.refresh_view().await;
        Ok(volume)
    }

    pub async fn cycle_play_mode(&self) -> PlayMode {
        let mode = self.playlist.lock().await.cycle_play_mode();
        info!("[{}] play mode is now {}", self.label, mode);
        self.refresh_view().await;
        mode
    }

    pub async fn set_play_mode(&self, mode: PlayMode) {
        self.playlist.lock().await.set_play_mode(mode);
    }

    pub async fn toggle_sort(&self) -> SortOrder {
        let order = self.playlist.lock().await.toggle_sort();
        info!("[{}] sorting by {}", self.label, order);
        self.refresh_view().await;
        order
    }

    pub async fn turn_page(&self, direction: Direction) -> usize {
        let page = {
            let mut playlist = self.playlist.lock().await;
            match direction {
                Direction::Forward => playlist.next_page(),
                Direction::Backward => playlist.prev_page(),
            }
        };
        self.refresh_view().await;
        page
    }

    pub async fn show_page(&self, page: usize) -> usize {
        self.playlist.lock().await.set_page(page)
    }

    /// Swap in a freshly loaded track list.
    pub async fn replace_tracks(&self, tracks: Vec<Track>) -> usize {
        let count = {
            let mut playlist = self.playlist.lock().await;
            playlist.replace_tracks(tracks);
            playlist.len()
        };
        self.refresh_view().await;
        count
    }

    pub async fn clear_tracks(&self) {
        self.playlist.lock().await.clear();
    }

    pub async fn snapshot(&self) -> PlayerSnapshot {
        let playlist = self.playlist.lock().await;
        PlayerSnapshot {
            state: self.state(),
            status: self.engine.status(),
            current: playlist.current().cloned(),
            current_index: playlist.current_index(),
            track_count: playlist.len(),
            play_mode: playlist.play_mode(),
            sort_order: playlist.sort_order(),
            volume: self.engine.volume(),
            page: playlist
                .page()
                .into_iter()
                .map(|(i, track)| (i, track.clone()))
                .collect(),
            pagination: playlist.pagination(),
        }
    }

    /// Stop accepting operations, stop playback and disconnect.
    ///
    /// Runs outside the operation queue, so a stalled operation is cancelled
    /// rather than waited on.
    pub async fn shutdown(&self) {
        self.serializer.close().await;
        self.detach_listener();
        if let Err(e) = self.engine.stop().await {
            warn!("[{}] stop during shutdown failed: {}", self.label, e);
        }
        if let Err(e) = self.engine.leave().await {
            warn!("[{}] leaving voice failed: {}", self.label, e);
        }
        self.set_state(PlaybackState::Idle);
        self.clear_tracks().await;
        info!("[{}] session shut down", self.label);
    }

    fn submit<F, Fut>(self: &Arc<Self>, kind: OperationKind, op: F) -> OperationHandle<()>
    where
        F: FnOnce(Arc<Self>) -> Fut,
        Fut: Future<Output = MusicResult<()>> + Send + 'static,
    {
        self.serializer.submit(kind, op(Arc::clone(self)))
    }

    async fn idle_on_error<T>(&self, op: impl Future<Output = MusicResult<T>>) -> MusicResult<T> {
        let result = op.await;
        if let Err(e) = &result {
            warn!("[{}] operation failed: {}", self.label, e);
            self.set_state(PlaybackState::Idle);
            self.refresh_view().await;
        }
        result
    }

    /// Start the track at logical position `index`.
    async fn play_track(&self, index: usize) -> MusicResult<Track> {
        self.set_state(PlaybackState::Transitioning);

        let channel = *lock(&self.voice_channel);
        self.engine.join(channel).await?;

        let track = {
            let mut playlist = self.playlist.lock().await;
            playlist.set_current_index(index)?;
            playlist.resolve(index)?.clone()
        };

        self.ensure_listener();
        info!(
            "[{}] playing #{} '{}' ({})",
            self.label, index, track.title, track.url
        );
        self.engine.play(&track).await?;
        Ok(track)
    }

    async fn skip(&self, direction: Direction) -> MusicResult<()> {
        if self.state() == PlaybackState::Playing {
            self.set_state(PlaybackState::Transitioning);
            self.detach_listener();
            self.engine.stop().await?;
            tokio::time::sleep(self.settle_delay).await;
        }
        let index = self.playlist.lock().await.advance(direction)?;
        self.play_track(index).await.map(drop)
    }

    async fn auto_advance(&self) -> MusicResult<()> {
        let (mode, current, len) = {
            let playlist = self.playlist.lock().await;
            (playlist.play_mode(), playlist.current_index(), playlist.len())
        };
        if len == 0 {
            return Err(MusicError::EmptyPlaylist);
        }

        debug!("[{}] auto-advancing in {} mode", self.label, mode);
        let index = match mode {
            PlayMode::RepeatOne => current,
            PlayMode::PlayOnce => {
                self.set_state(PlaybackState::Idle);
                self.refresh_view().await;
                return Ok(());
            }
            PlayMode::Sequential | PlayMode::Shuffle => {
                self.playlist.lock().await.advance(Direction::Forward)?
            }
        };
        self.play_track(index).await.map(drop)
    }

    async fn on_status(self: &Arc<Self>, status: PlayerStatus) {
        let in_flight = self.serializer.in_flight();
        let mut effect = None;
        self.state.send_if_modified(|state| {
            let (next, follow_up) = transition(*state, status, in_flight);
            effect = follow_up;
            let changed = next != *state;
            if changed {
                debug!("[{}] {} -> {} on {}", self.label, state, next, status);
            }
            *state = next;
            changed
        });

        match effect {
            Some(Effect::SubmitAutoAdvance) => {
                self.submit_auto_advance();
                self.refresh_view().await;
            }
            Some(Effect::RefreshView) => self.refresh_view().await,
            None => {}
        }
    }

    fn submit_auto_advance(self: &Arc<Self>) {
        let handle = self.submit(OperationKind::AutoAdvance, |m| async move {
            m.idle_on_error(m.auto_advance()).await
        });
        let view = Arc::clone(&self.view);
        let label = self.label.clone();
        tokio::spawn(async move {
            if let Err(e) = handle.await {
                warn!("[{}] auto-advance failed: {}", label, e);
                view.notify(format!("Couldn't continue playback: {e}")).await;
            }
        });
    }

    /// Register the status listener unless one is already attached.
    fn ensure_listener(&self) {
        let mut slot = lock(&self.listener);
        if slot.is_some() {
            return;
        }

        let StatusSubscription { id, mut receiver } = self.engine.subscribe();
        let machine = self.weak_self.clone();
        let task = tokio::spawn(async move {
            while let Some(status) = receiver.recv().await {
                let Some(machine) = machine.upgrade() else {
                    break;
                };
                machine.on_status(status).await;
            }
        });
        debug!("[{}] attached status listener {}", self.label, id);
        *slot = Some(StatusListener { id, task });
    }

    fn detach_listener(&self) {
        if let Some(listener) = lock(&self.listener).take() {
            self.engine.unsubscribe(listener.id);
            listener.task.abort();
            debug!("[{}] detached status listener {}", self.label, listener.id);
        }
    }

    fn set_state(&self, next: PlaybackState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!("[{}] {} -> {}", self.label, previous, next);
        }
    }

    async fn refresh_view(&self) {
        let snapshot = self.snapshot().await;
        if let Err(e) = self.view.refresh(snapshot).await {
            warn!("[{}] failed to refresh player message: {}", self.label, e);
        }
    }
}

impl Drop for PlaybackStateMachine {
    fn drop(&mut self) {
        if let Some(listener) = lock(&self.listener).take() {
            listener.task.abort();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
