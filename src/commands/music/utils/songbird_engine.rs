//! [`AudioEngine`] over a songbird voice call.
//!
//! Local tracks are opened as files. Remote tracks are piped through a
//! `yt-dlp` child process whose stderr is watched for format errors. Each
//! `play` bumps a generation counter so events from a replaced track never
//! reach the status bus.

use poise::serenity_prelude as serenity;
use regex::Regex;
use serenity::async_trait;
use serenity::model::id::{ChannelId, GuildId};
use serenity::prelude::Mutex as SerenityMutex;
use songbird::input::{ChildContainer, File, Input};
use songbird::tracks::{PlayMode as TrackPlayMode, ReadyState, Track as SongbirdTrack, TrackHandle};
use songbird::{Call, Event, Songbird};
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::process::{ChildStderr, Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock, Mutex, PoisonError};
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::audio_engine::{AudioEngine, PlayerStatus, StatusBus, Volume};
use super::event_handlers::{ConnectionLogger, TRACK_EVENTS, TrackStatusNotifier};
use super::fade::{Fade, VolumeTarget};
use super::music_manager::{MusicError, MusicResult};
use super::player_view::PlayerView;
use super::playlist::Track;

/// yt-dlp stderr lines that mean the URL can't be turned into audio.
static UNSUPPORTED_FORMAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(unsupported url|requested format is not available|no video formats found|unable to extract)",
    )
    .expect("valid unsupported-format pattern")
});

/// Arguments passed to the decoder ahead of the URL.
pub const DECODER_ARGS: [&str; 7] = ["-f", "bestaudio", "-x", "--audio-format", "opus", "-o", "-"];

/// First line of decoder output reporting an unplayable source.
pub fn first_unsupported_line(reader: impl BufRead) -> Option<String> {
    for line in reader.lines() {
        let Ok(line) = line else {
            break;
        };
        debug!("yt-dlp: {}", line);
        if UNSUPPORTED_FORMAT.is_match(&line) {
            return Some(line);
        }
    }
    None
}

impl VolumeTarget for TrackHandle {
    fn apply_volume(&self, volume: f32) -> MusicResult<()> {
        self.set_volume(volume)
            .map_err(|e| MusicError::AudioError(e.to_string()))
    }
}

/// The track currently owned by the engine and the tasks tied to it.
struct Playback {
    handle: TrackHandle,
    fade: Option<JoinHandle<()>>,
    watcher: Option<JoinHandle<()>>,
}

impl Playback {
    fn abort_tasks(&mut self) {
        if let Some(fade) = self.fade.take() {
            fade.abort();
        }
        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
        }
    }
}

pub struct SongbirdEngine {
    guild_id: GuildId,
    songbird: Arc<Songbird>,
    ytdlp_path: String,
    view: Arc<dyn PlayerView>,
    bus: StatusBus,
    volume: Mutex<Volume>,
    call: Mutex<Option<Arc<SerenityMutex<Call>>>>,
    current: AsyncMutex<Option<Playback>>,
    generation: Arc<AtomicU64>,
}

impl SongbirdEngine {
    pub fn new(
        guild_id: GuildId,
        songbird: Arc<Songbird>,
        ytdlp_path: impl Into<String>,
        view: Arc<dyn PlayerView>,
        volume: Volume,
    ) -> Self {
        Self {
            guild_id,
            songbird,
            ytdlp_path: ytdlp_path.into(),
            view,
            bus: StatusBus::new(),
            volume: Mutex::new(volume),
            call: Mutex::new(None),
            current: AsyncMutex::new(None),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    fn call(&self) -> MusicResult<Arc<SerenityMutex<Call>>> {
        self.call
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .or_else(|| self.songbird.get(self.guild_id))
            .ok_or(MusicError::NotConnected)
    }

    /// Stop and forget the current track. Events it still emits are stale.
    async fn teardown(&self) -> Option<TrackHandle> {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let mut playback = self.current.lock().await.take()?;
        playback.abort_tasks();
        Some(playback.handle)
    }

    fn open_input(&self, track: &Track) -> MusicResult<(Input, Option<ChildStderr>)> {
        if !track.is_remote() {
            let path = PathBuf::from(&track.url);
            if !path.is_file() {
                return Err(MusicError::DecoderError(format!(
                    "{} does not exist",
                    path.display()
                )));
            }
            return Ok((File::new(path).into(), None));
        }

        let mut child = Command::new(&self.ytdlp_path)
            .args(DECODER_ARGS)
            .arg(&track.url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| MusicError::DecoderError(format!("{}: {}", self.ytdlp_path, e)))?;
        debug!(
            "Spawned {} (pid {}) for {}",
            self.ytdlp_path,
            child.id(),
            track.url
        );

        let stderr = child.stderr.take();
        Ok((ChildContainer::from(child).into(), stderr))
    }

    /// Report the first format error from the decoder and end the track.
    fn watch_stderr(
        &self,
        stderr: ChildStderr,
        generation: u64,
        handle: TrackHandle,
        url: String,
    ) -> JoinHandle<()> {
        let bus = self.bus.clone();
        let view = Arc::clone(&self.view);
        let current = Arc::clone(&self.generation);
        let guild_id = self.guild_id;

        tokio::spawn(async move {
            let failure =
                tokio::task::spawn_blocking(move || first_unsupported_line(BufReader::new(stderr)))
                    .await;
            let Ok(Some(line)) = failure else {
                return;
            };
            if current.load(Ordering::SeqCst) != generation {
                return;
            }

            warn!("Decoder rejected {} in guild {}: {}", url, guild_id, line);
            view.notify(format!("Can't play {url}: {line}")).await;
            if let Err(e) = handle.stop() {
                debug!("Track already gone after decoder error: {}", e);
            }
            bus.publish(PlayerStatus::Idle);
        })
    }

    fn register_events(&self, handle: &TrackHandle, generation: u64) -> MusicResult<()> {
        for event in TRACK_EVENTS {
            handle
                .add_event(
                    Event::Track(event),
                    TrackStatusNotifier {
                        guild_id: self.guild_id,
                        event,
                        generation,
                        current_generation: Arc::clone(&self.generation),
                        bus: self.bus.clone(),
                    },
                )
                .map_err(|e| MusicError::AudioError(e.to_string()))?;
        }
        Ok(())
    }

    async fn fade_out(&self, handle: &TrackHandle) {
        if let Err(e) = Fade::fade_out(self.volume()).run(handle).await {
            debug!("Fade out cut short in guild {}: {}", self.guild_id, e);
        }
    }
}

#[async_trait]
impl AudioEngine for SongbirdEngine {
    async fn join(&self, channel: Option<ChannelId>) -> MusicResult<()> {
        let channel = channel.ok_or(MusicError::UserNotInVoiceChannel)?;

        let existing = self.songbird.get(self.guild_id);
        if let Some(call) = &existing {
            if call.lock().await.current_channel() == Some(channel.into()) {
                return Ok(());
            }
        }

        let call = self
            .songbird
            .join(self.guild_id, channel)
            .await
            .map_err(|e| MusicError::JoinError(e.to_string()))?;

        if existing.is_none() {
            let mut handler = call.lock().await;
            for event in ConnectionLogger::EVENTS {
                handler.add_global_event(
                    Event::Core(event),
                    ConnectionLogger {
                        guild_id: self.guild_id,
                    },
                );
            }
        }

        info!("Joined channel {} in guild {}", channel, self.guild_id);
        *self.call.lock().unwrap_or_else(PoisonError::into_inner) = Some(call);
        Ok(())
    }

    async fn play(&self, track: &Track) -> MusicResult<()> {
        if let Some(previous) = self.teardown().await {
            if let Err(e) = previous.stop() {
                debug!("Previous track already stopped: {}", e);
            }
        }
        let generation = self.generation.load(Ordering::SeqCst);

        let call = self.call()?;
        let (input, stderr) = match self.open_input(track) {
            Ok(opened) => opened,
            Err(e) => {
                self.view
                    .notify(format!("Can't play {}: {}", track.title, e))
                    .await;
                return Err(e);
            }
        };

        let handle = call
            .lock()
            .await
            .play_only(SongbirdTrack::from(input).volume(0.0));
        self.register_events(&handle, generation)?;

        let target = self.volume();
        let fade_handle = handle.clone();
        let guild_id = self.guild_id;
        let fade = tokio::spawn(async move {
            if let Err(e) = Fade::fade_in(target).run(&fade_handle).await {
                debug!("Fade in cut short in guild {}: {}", guild_id, e);
            }
        });
        let watcher = stderr.map(|stderr| {
            self.watch_stderr(stderr, generation, handle.clone(), track.url.clone())
        });

        // The track may have become playable before the handlers were attached.
        if let Ok(info) = handle.get_info().await {
            if info.ready == ReadyState::Playable && matches!(info.playing, TrackPlayMode::Play) {
                self.bus.publish(PlayerStatus::Playing);
            }
        }

        *self.current.lock().await = Some(Playback {
            handle,
            fade: Some(fade),
            watcher,
        });
        Ok(())
    }

    async fn pause(&self) -> MusicResult<()> {
        if self.bus.last() != PlayerStatus::Playing {
            return Ok(());
        }
        let handle = {
            let mut current = self.current.lock().await;
            let Some(playback) = current.as_mut() else {
                return Ok(());
            };
            if let Some(fade) = playback.fade.take() {
                fade.abort();
            }
            playback.handle.clone()
        };

        self.fade_out(&handle).await;
        handle
            .pause()
            .map_err(|e| MusicError::AudioError(e.to_string()))?;
        // Paused at silence; put the level back so resume is audible.
        handle.apply_volume(self.volume().as_unit())
    }

    async fn resume(&self) -> MusicResult<()> {
        if self.bus.last() != PlayerStatus::Paused {
            return Ok(());
        }
        let current = self.current.lock().await;
        let Some(playback) = current.as_ref() else {
            return Ok(());
        };
        playback
            .handle
            .play()
            .map_err(|e| MusicError::AudioError(e.to_string()))
    }

    async fn stop(&self) -> MusicResult<()> {
        let Some(handle) = self.teardown().await else {
            self.bus.publish(PlayerStatus::Idle);
            return Ok(());
        };

        if self.bus.last() == PlayerStatus::Playing {
            self.fade_out(&handle).await;
        }
        let result = handle
            .stop()
            .map_err(|e| MusicError::AudioError(e.to_string()));
        self.bus.publish(PlayerStatus::Idle);
        debug!("Stopped playback in guild {}", self.guild_id);
        result
    }

    async fn set_volume(&self, volume: Volume) -> MusicResult<()> {
        *self.volume.lock().unwrap_or_else(PoisonError::into_inner) = volume;

        let mut current = self.current.lock().await;
        let Some(playback) = current.as_mut() else {
            return Ok(());
        };
        if let Some(fade) = playback.fade.take() {
            fade.abort();
        }
        playback.handle.apply_volume(volume.as_unit())
    }

    fn volume(&self) -> Volume {
        *self.volume.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn leave(&self) -> MusicResult<()> {
        if let Some(handle) = self.teardown().await {
            if let Err(e) = handle.stop() {
                debug!("Track already stopped before leaving: {}", e);
            }
        }
        self.bus.publish(PlayerStatus::Idle);
        self.call
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if self.songbird.get(self.guild_id).is_none() {
            return Ok(());
        }
        self.songbird
            .remove(self.guild_id)
            .await
            .map_err(|e| MusicError::JoinError(e.to_string()))?;
        info!("Left voice in guild {}", self.guild_id);
        Ok(())
    }

    fn status_bus(&self) -> &StatusBus {
        &self.bus
    }
}
