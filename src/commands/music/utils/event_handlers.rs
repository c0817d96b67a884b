use poise::serenity_prelude as serenity;
use serenity::async_trait;
use serenity::model::id::GuildId;
use songbird::{CoreEvent, Event, EventContext, TrackEvent};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, trace, warn};

use super::audio_engine::{PlayerStatus, StatusBus};

/// Track events the engine listens for.
pub const TRACK_EVENTS: [TrackEvent; 6] = [
    TrackEvent::Preparing,
    TrackEvent::Playable,
    TrackEvent::Play,
    TrackEvent::Pause,
    TrackEvent::End,
    TrackEvent::Error,
];

/// The player status a songbird track event stands for.
pub fn status_for_event(event: TrackEvent) -> Option<PlayerStatus> {
    match event {
        TrackEvent::Preparing => Some(PlayerStatus::Buffering),
        TrackEvent::Playable | TrackEvent::Play => Some(PlayerStatus::Playing),
        TrackEvent::Pause => Some(PlayerStatus::Paused),
        TrackEvent::End | TrackEvent::Error => Some(PlayerStatus::Idle),
        _ => None,
    }
}

/// Forwards one track's events to the status bus, as long as the track is
/// still the one the engine is playing.
pub struct TrackStatusNotifier {
    pub guild_id: GuildId,
    pub event: TrackEvent,
    pub generation: u64,
    pub current_generation: Arc<AtomicU64>,
    pub bus: StatusBus,
}

impl TrackStatusNotifier {
    fn is_stale(&self) -> bool {
        self.current_generation.load(Ordering::SeqCst) != self.generation
    }
}

#[async_trait]
impl songbird::EventHandler for TrackStatusNotifier {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        let EventContext::Track(states) = ctx else {
            return None;
        };
        if self.is_stale() {
            trace!(
                "Dropping {:?} from replaced track in guild {}",
                self.event, self.guild_id
            );
            return None;
        }

        if let Some((state, _)) = states.first() {
            if let songbird::tracks::PlayMode::Errored(e) = &state.playing {
                warn!("Track failed in guild {}: {}", self.guild_id, e);
            }
        }

        if let Some(status) = status_for_event(self.event) {
            debug!(
                "Track event {:?} in guild {} -> {}",
                self.event, self.guild_id, status
            );
            self.bus.publish(status);
        }
        None
    }
}

/// Logs voice connection changes for a call.
pub struct ConnectionLogger {
    pub guild_id: GuildId,
}

impl ConnectionLogger {
    pub const EVENTS: [CoreEvent; 3] = [
        CoreEvent::DriverConnect,
        CoreEvent::DriverReconnect,
        CoreEvent::DriverDisconnect,
    ];
}

#[async_trait]
impl songbird::EventHandler for ConnectionLogger {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        match ctx {
            EventContext::DriverConnect(data) => info!(
                "Voice connected in guild {} (channel {:?})",
                self.guild_id, data.channel_id
            ),
            EventContext::DriverReconnect(data) => info!(
                "Voice reconnected in guild {} (channel {:?})",
                self.guild_id, data.channel_id
            ),
            EventContext::DriverDisconnect(data) => warn!(
                "Voice disconnected in guild {}: {:?} ({:?})",
                self.guild_id, data.kind, data.reason
            ),
            _ => {}
        }
        None
    }
}
