//! Where a session's tracks come from: a local directory of audio files or
//! the per-owner `tracks` table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serenity::async_trait;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use url::Url;

use crate::utils::database::{self, NewTrack};

use super::music_manager::{MusicError, MusicResult};
use super::playlist::Track;

/// File extensions picked up by [`DirectoryStore`].
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg", "flac", "m4a", "aac", "opus", "webm"];

/// Keeps track ids stable between scans of the same directory.
const INDEX_FILE: &str = ".jukebox_index.json";

#[async_trait]
pub trait TrackStore: Send + Sync {
    /// Read the full track list.
    async fn load(&self) -> MusicResult<Vec<Track>>;

    /// Persist a new remote track.
    async fn add(&self, track: NewTrack) -> MusicResult<Track>;
}

fn store_error(e: impl std::fmt::Display) -> MusicError {
    MusicError::StoreError(e.to_string())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexEntry {
    id: i64,
    created_at: DateTime<Utc>,
}

/// Audio files in one directory, not recursive.
pub struct DirectoryStore {
    dir: PathBuf,
}

impl DirectoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

pub fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            AUDIO_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

fn load_index(path: &Path) -> HashMap<String, IndexEntry> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(_) => {
            debug!("No track index at {:?}, starting fresh", path);
            return HashMap::new();
        }
    };
    if content.trim().is_empty() {
        return HashMap::new();
    }
    match serde_json::from_str(&content) {
        Ok(index) => index,
        Err(e) => {
            warn!("Track index {:?} is corrupt, rebuilding: {}", path, e);
            HashMap::new()
        }
    }
}

fn save_index(path: &Path, index: &HashMap<String, IndexEntry>) {
    let result = serde_json::to_string_pretty(index)
        .map_err(|e| e.to_string())
        .and_then(|data| fs::write(path, data).map_err(|e| e.to_string()));
    if let Err(e) = result {
        // Ids are still correct for this scan; they just may change next time.
        warn!("Failed to save track index {:?}: {}", path, e);
    }
}

fn scan_directory(dir: &Path) -> MusicResult<Vec<Track>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|e| store_error(format!("{}: {}", dir.display(), e)))?
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| path.is_file() && is_audio_file(path))
        .collect();
    files.sort();

    let index_path = dir.join(INDEX_FILE);
    let mut index = load_index(&index_path);
    let mut next_id = index.values().map(|entry| entry.id).max().unwrap_or(0) + 1;
    let mut changed = false;

    let mut tracks = Vec::with_capacity(files.len());
    for path in files {
        let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_owned) else {
            warn!("Skipping file with non UTF-8 name: {:?}", path);
            continue;
        };

        let entry = index.entry(name.clone()).or_insert_with(|| {
            changed = true;
            let created_at = fs::metadata(&path)
                .and_then(|meta| meta.modified())
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now());
            let entry = IndexEntry {
                id: next_id,
                created_at,
            };
            next_id += 1;
            entry
        });

        let title = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(name.as_str())
            .to_string();

        tracks.push(Track {
            id: entry.id,
            title,
            url: path.to_string_lossy().into_owned(),
            thumbnail: None,
            duration: None,
            created_at: entry.created_at,
        });
    }

    if changed {
        save_index(&index_path, &index);
    }
    Ok(tracks)
}

#[async_trait]
impl TrackStore for DirectoryStore {
    async fn load(&self) -> MusicResult<Vec<Track>> {
        let dir = self.dir.clone();
        let tracks = tokio::task::spawn_blocking(move || scan_directory(&dir))
            .await
            .map_err(store_error)??;
        info!("Found {} audio files in {}", tracks.len(), self.dir.display());
        Ok(tracks)
    }

    async fn add(&self, _track: NewTrack) -> MusicResult<Track> {
        Err(MusicError::StoreError(format!(
            "tracks are added by copying files into {}",
            self.dir.display()
        )))
    }
}

/// Tracks stored in SQLite, scoped to the owning user.
pub struct DatabaseStore {
    path: PathBuf,
    owner_id: u64,
}

impl DatabaseStore {
    pub fn new(path: impl Into<PathBuf>, owner_id: u64) -> Self {
        Self {
            path: path.into(),
            owner_id,
        }
    }
}

/// Only http(s) URLs can be handed to the decoder.
pub fn validate_remote_url(url: &str) -> MusicResult<()> {
    match Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(()),
        _ => Err(MusicError::UnsupportedFormat(format!(
            "'{url}' is not an http(s) URL"
        ))),
    }
}

#[async_trait]
impl TrackStore for DatabaseStore {
    async fn load(&self) -> MusicResult<Vec<Track>> {
        let path = self.path.clone();
        let owner_id = self.owner_id;
        tokio::task::spawn_blocking(move || {
            let conn = database::open(&path).map_err(store_error)?;
            database::tracks_for_owner(&conn, owner_id).map_err(store_error)
        })
        .await
        .map_err(store_error)?
    }

    async fn add(&self, track: NewTrack) -> MusicResult<Track> {
        validate_remote_url(&track.url)?;
        let path = self.path.clone();
        let owner_id = self.owner_id;
        let track = tokio::task::spawn_blocking(move || {
            let conn = database::open(&path).map_err(store_error)?;
            database::insert_track(&conn, owner_id, &track).map_err(store_error)
        })
        .await
        .map_err(store_error)??;
        info!("Owner {} added track '{}'", owner_id, track.title);
        Ok(track)
    }
}
