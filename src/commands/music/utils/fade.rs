//! Linear volume ramps applied when a track starts or is paused/stopped.

use std::time::Duration;
use tracing::trace;

use super::audio_engine::Volume;
use super::music_manager::MusicResult;

pub const FADE_IN_DURATION: Duration = Duration::from_millis(2000);
pub const FADE_OUT_DURATION: Duration = Duration::from_millis(1500);
pub const FADE_STEPS: u32 = 20;

/// Anything whose volume can be set on the unit interval.
pub trait VolumeTarget: Send + Sync {
    fn apply_volume(&self, volume: f32) -> MusicResult<()>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fade {
    from: Volume,
    to: Volume,
    duration: Duration,
    steps: u32,
}

impl Fade {
    pub fn new(from: Volume, to: Volume, duration: Duration, steps: u32) -> Self {
        Self {
            from,
            to,
            duration,
            steps: steps.max(1),
        }
    }

    pub fn fade_in(to: Volume) -> Self {
        Self::new(Volume::MUTED, to, FADE_IN_DURATION, FADE_STEPS)
    }

    pub fn fade_out(from: Volume) -> Self {
        Self::new(from, Volume::MUTED, FADE_OUT_DURATION, FADE_STEPS)
    }

    /// Volume after each step; the last level is always `to`.
    pub fn levels(&self) -> impl Iterator<Item = f32> + '_ {
        let from = self.from.as_unit();
        let delta = self.to.as_unit() - from;
        (1..=self.steps).map(move |i| from + delta * (i as f32 / self.steps as f32))
    }

    pub fn step_interval(&self) -> Duration {
        self.duration / self.steps
    }

    /// Walk the ramp, sleeping between steps. Stops at the first failure,
    /// which usually means the track has already ended.
    pub async fn run<T: VolumeTarget + ?Sized>(&self, target: &T) -> MusicResult<()> {
        let interval = self.step_interval();
        target.apply_volume(self.from.as_unit())?;
        for level in self.levels() {
            tokio::time::sleep(interval).await;
            trace!("Fade step to {:.3}", level);
            target.apply_volume(level)?;
        }
        Ok(())
    }
}
