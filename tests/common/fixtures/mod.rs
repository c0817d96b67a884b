//! Sample ids and tracks used across the tests

use chrono::{DateTime, Duration, TimeZone, Utc};
use jukebox::commands::music::utils::playlist::Track;
use jukebox::utils::database::NewTrack;

pub const SAMPLE_GUILD_ID: u64 = 123456789;

pub const SAMPLE_USER_ID: u64 = 987654321;

pub const SAMPLE_VOICE_CHANNEL_ID: u64 = 555000555;

/// Fixed seed so shuffles are reproducible.
pub const SHUFFLE_SEED: u64 = 7;

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

/// A remote track titled `title`, created `id` minutes after the base time.
pub fn track(id: i64, title: &str) -> Track {
    Track {
        id,
        title: title.to_string(),
        url: format!("https://music.example.com/{id}"),
        thumbnail: None,
        duration: Some("3:00".to_string()),
        created_at: base_time() + Duration::minutes(id),
    }
}

/// `T0`, `T1`, ... in creation order.
pub fn sample_tracks(count: usize) -> Vec<Track> {
    (0..count as i64).map(|i| track(i, &format!("T{i}"))).collect()
}

pub fn new_track(title: &str) -> NewTrack {
    NewTrack {
        title: title.to_string(),
        url: format!("https://music.example.com/{}", title.to_lowercase()),
        thumbnail: None,
        duration: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_tracks_are_in_creation_order() {
        let tracks = sample_tracks(3);
        assert_eq!(tracks[0].title, "T0");
        assert!(tracks[0].created_at < tracks[2].created_at);
        assert!(tracks.iter().all(Track::is_remote));
    }
}
