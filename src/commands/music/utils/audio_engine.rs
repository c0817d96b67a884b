//! The contract between the playback state machine and whatever actually
//! produces sound. The production implementation lives in
//! [`songbird_engine`](super::songbird_engine); tests provide their own.

use serenity::async_trait;
use serenity::model::id::ChannelId;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::trace;

use super::music_manager::MusicResult;
use super::playlist::Track;

/// Status reported by the audio output engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayerStatus {
    #[default]
    Idle,
    Buffering,
    Playing,
    Paused,
}

impl fmt::Display for PlayerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Output volume, stored on the unit interval.
///
/// Discord users see a 0–100 scale; conversion happens only through
/// [`Volume::from_display`] and [`Volume::as_display`].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Volume(f32);

impl Volume {
    pub const MUTED: Volume = Volume(0.0);
    pub const FULL: Volume = Volume(1.0);

    pub fn new(unit: f32) -> Self {
        if unit.is_nan() {
            return Self::MUTED;
        }
        Self(unit.clamp(0.0, 1.0))
    }

    /// Build from the 0–100 display scale, clamping out-of-range input.
    pub fn from_display(value: i64) -> Self {
        Self(value.clamp(0, 100) as f32 / 100.0)
    }

    pub fn as_unit(self) -> f32 {
        self.0
    }

    pub fn as_display(self) -> u8 {
        (self.0 * 100.0).round() as u8
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self(0.5)
    }
}

impl fmt::Display for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.as_display())
    }
}

pub type SubscriptionId = u64;

/// A registered status listener. Dropping the receiver does not unregister
/// it; call [`AudioEngine::unsubscribe`] with the id.
pub struct StatusSubscription {
    pub id: SubscriptionId,
    pub receiver: UnboundedReceiver<PlayerStatus>,
}

#[derive(Default)]
struct BusInner {
    next_id: SubscriptionId,
    listeners: HashMap<SubscriptionId, UnboundedSender<PlayerStatus>>,
    last: PlayerStatus,
}

/// Fan-out of engine status changes to registered listeners.
#[derive(Clone, Default)]
pub struct StatusBus {
    inner: Arc<Mutex<BusInner>>,
}

impl StatusBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> StatusSubscription {
        let (tx, receiver) = mpsc::unbounded_channel();
        let mut inner = self.lock();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.listeners.insert(id, tx);
        StatusSubscription { id, receiver }
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.lock().listeners.remove(&id);
    }

    pub fn publish(&self, status: PlayerStatus) {
        let mut inner = self.lock();
        inner.last = status;
        inner.listeners.retain(|_, tx| tx.send(status).is_ok());
        trace!("Published {} to {} listeners", status, inner.listeners.len());
    }

    pub fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }

    /// The most recently published status.
    pub fn last(&self) -> PlayerStatus {
        self.lock().last
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BusInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Audio output for one session.
#[async_trait]
pub trait AudioEngine: Send + Sync {
    /// Connect to `channel`. `None` means the requester is not in voice.
    async fn join(&self, channel: Option<ChannelId>) -> MusicResult<()>;

    /// Replace whatever is playing with `track`, fading it in.
    async fn play(&self, track: &Track) -> MusicResult<()>;

    async fn pause(&self) -> MusicResult<()>;

    async fn resume(&self) -> MusicResult<()>;

    /// Fade out, halt and release the current output.
    async fn stop(&self) -> MusicResult<()>;

    async fn set_volume(&self, volume: Volume) -> MusicResult<()>;

    fn volume(&self) -> Volume;

    async fn leave(&self) -> MusicResult<()>;

    fn status_bus(&self) -> &StatusBus;

    fn subscribe(&self) -> StatusSubscription {
        self.status_bus().subscribe()
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.status_bus().unsubscribe(id)
    }

    fn listener_count(&self) -> usize {
        self.status_bus().listener_count()
    }

    fn status(&self) -> PlayerStatus {
        self.status_bus().last()
    }
}
