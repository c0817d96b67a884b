//! The playlist model: an ordered track list with a current position, a play
//! mode, an optional shuffle permutation, a sort order and page bookkeeping.
//!
//! The state machine only talks to this type through `resolve`, `advance`,
//! `current_index` and `set_current_index`; everything else is driven by the
//! UI (mode/sort buttons, paging) or by a refresh from a [`TrackStore`].
//!
//! [`TrackStore`]: super::track_store::TrackStore

use chrono::{DateTime, Utc};
use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;
use url::Url;

use super::music_manager::{MusicError, MusicResult};

/// Default number of tracks shown on one page of the player message.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// A playable track. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: i64,
    pub title: String,
    /// Local file path or remote URL.
    pub url: String,
    pub thumbnail: Option<String>,
    /// Display duration as provided by the store (e.g. "3:45").
    pub duration: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Track {
    /// Whether this track has to be fetched through the external decoder.
    pub fn is_remote(&self) -> bool {
        Url::parse(&self.url).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
    }
}

/// What happens when a track reaches its natural end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlayMode {
    RepeatOne,
    #[default]
    Sequential,
    PlayOnce,
    Shuffle,
}

impl PlayMode {
    /// The mode that follows this one when cycling.
    pub fn next(self) -> Self {
        match self {
            PlayMode::RepeatOne => PlayMode::Sequential,
            PlayMode::Sequential => PlayMode::PlayOnce,
            PlayMode::PlayOnce => PlayMode::Shuffle,
            PlayMode::Shuffle => PlayMode::RepeatOne,
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            PlayMode::RepeatOne => "🔂",
            PlayMode::Sequential => "🔁",
            PlayMode::PlayOnce => "➡️",
            PlayMode::Shuffle => "🔀",
        }
    }
}

impl fmt::Display for PlayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlayMode::RepeatOne => "repeat_one",
            PlayMode::Sequential => "sequential",
            PlayMode::PlayOnce => "play_once",
            PlayMode::Shuffle => "shuffle",
        };
        f.write_str(name)
    }
}

impl FromStr for PlayMode {
    type Err = MusicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "repeat_one" => Ok(PlayMode::RepeatOne),
            "sequential" => Ok(PlayMode::Sequential),
            "play_once" => Ok(PlayMode::PlayOnce),
            "shuffle" => Ok(PlayMode::Shuffle),
            other => Err(MusicError::ConfigError(format!("unknown play mode '{other}'"))),
        }
    }
}

/// Key the track list is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortOrder {
    #[default]
    ByDate,
    ByTitle,
}

impl SortOrder {
    fn toggled(self) -> Self {
        match self {
            SortOrder::ByDate => SortOrder::ByTitle,
            SortOrder::ByTitle => SortOrder::ByDate,
        }
    }

    fn sort(self, tracks: &mut [Track]) {
        match self {
            SortOrder::ByDate => tracks.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
            SortOrder::ByTitle => tracks.sort_by(|a, b| a.title.cmp(&b.title)),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::ByDate => f.write_str("date"),
            SortOrder::ByTitle => f.write_str("title"),
        }
    }
}

/// Step direction for [`Playlist::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Page bookkeeping derived from the track count. Pages are zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page_size: usize,
    pub current_page: usize,
    pub max_page: usize,
}

impl Pagination {
    fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            current_page: 0,
            max_page: 1,
        }
    }

    fn recompute(&mut self, len: usize) {
        self.max_page = len.div_ceil(self.page_size).max(1);
        self.current_page = self.current_page.min(self.max_page - 1);
    }
}

pub struct Playlist {
    tracks: Vec<Track>,
    current_index: usize,
    play_mode: PlayMode,
    shuffle_order: Vec<usize>,
    sort_order: SortOrder,
    pagination: Pagination,
    rng: StdRng,
}

impl Default for Playlist {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl Playlist {
    pub fn new(page_size: usize) -> Self {
        Self::with_seed(page_size, rand::random())
    }

    /// Build a playlist whose shuffles are reproducible.
    pub fn with_seed(page_size: usize, seed: u64) -> Self {
        Self {
            tracks: Vec::new(),
            current_index: 0,
            play_mode: PlayMode::default(),
            shuffle_order: Vec::new(),
            sort_order: SortOrder::default(),
            pagination: Pagination::new(page_size),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn play_mode(&self) -> PlayMode {
        self.play_mode
    }

    pub fn sort_order(&self) -> SortOrder {
        self.sort_order
    }

    pub fn pagination(&self) -> Pagination {
        self.pagination
    }

    pub fn shuffle_order(&self) -> &[usize] {
        &self.shuffle_order
    }

    /// Replace the whole track list, e.g. after a refresh from the store.
    pub fn replace_tracks(&mut self, mut tracks: Vec<Track>) {
        self.sort_order.sort(&mut tracks);
        self.tracks = tracks;
        if self.current_index >= self.tracks.len() {
            self.current_index = 0;
        }
        self.pagination.recompute(self.tracks.len());
        self.regenerate_shuffle();
        debug!("Playlist replaced with {} tracks", self.tracks.len());
    }

    /// Drop every track; used when the session ends.
    pub fn clear(&mut self) {
        self.replace_tracks(Vec::new());
        self.pagination.current_page = 0;
    }

    /// Move the cursor to logical position `index`.
    pub fn set_current_index(&mut self, index: usize) -> MusicResult<()> {
        self.check_index(index)?;
        self.current_index = index;
        Ok(())
    }

    /// Track at logical position `index`, going through the shuffle order
    /// when shuffle is active.
    pub fn resolve(&self, index: usize) -> MusicResult<&Track> {
        self.check_index(index)?;
        let actual = match self.play_mode {
            PlayMode::Shuffle => self.shuffle_order.get(index).copied().unwrap_or(index),
            _ => index,
        };
        self.tracks
            .get(actual)
            .ok_or(MusicError::IndexOutOfRange {
                index: actual,
                len: self.tracks.len(),
            })
    }

    /// The track under the cursor.
    pub fn current(&self) -> Option<&Track> {
        self.resolve(self.current_index).ok()
    }

    /// Step the cursor one position, wrapping at both ends, and return it.
    pub fn advance(&mut self, direction: Direction) -> MusicResult<usize> {
        let len = self.tracks.len();
        if len == 0 {
            return Err(MusicError::EmptyPlaylist);
        }
        self.current_index = match direction {
            Direction::Forward => (self.current_index + 1) % len,
            Direction::Backward => (self.current_index + len - 1) % len,
        };
        Ok(self.current_index)
    }

    pub fn cycle_play_mode(&mut self) -> PlayMode {
        self.set_play_mode(self.play_mode.next());
        self.play_mode
    }

    /// Restore a persisted mode.
    pub fn set_play_mode(&mut self, mode: PlayMode) {
        self.play_mode = mode;
        if mode == PlayMode::Shuffle {
            self.regenerate_shuffle();
        }
    }

    /// Flip the sort order and re-sort. The cursor stays on the same track.
    pub fn toggle_sort(&mut self) -> SortOrder {
        let current_id = self.tracks.get(self.current_index).map(|t| t.id);
        self.sort_order = self.sort_order.toggled();
        self.sort_order.sort(&mut self.tracks);
        if let Some(id) = current_id {
            self.current_index = self
                .tracks
                .iter()
                .position(|t| t.id == id)
                .unwrap_or_default();
        }
        self.regenerate_shuffle();
        self.sort_order
    }

    pub fn next_page(&mut self) -> usize {
        let p = &mut self.pagination;
        p.current_page = (p.current_page + 1).min(p.max_page - 1);
        p.current_page
    }

    pub fn prev_page(&mut self) -> usize {
        let p = &mut self.pagination;
        p.current_page = p.current_page.saturating_sub(1);
        p.current_page
    }

    pub fn set_page(&mut self, page: usize) -> usize {
        let p = &mut self.pagination;
        p.current_page = page.min(p.max_page - 1);
        p.current_page
    }

    /// Tracks on the current page, paired with their logical index.
    pub fn page(&self) -> Vec<(usize, &Track)> {
        let start = self.pagination.current_page * self.pagination.page_size;
        let end = (start + self.pagination.page_size).min(self.tracks.len());
        (start..end)
            .filter_map(|i| self.resolve(i).ok().map(|t| (i, t)))
            .collect()
    }

    fn check_index(&self, index: usize) -> MusicResult<()> {
        match self.tracks.len() {
            0 => Err(MusicError::EmptyPlaylist),
            len if index >= len => Err(MusicError::IndexOutOfRange { index, len }),
            _ => Ok(()),
        }
    }

    /// Rebuild the shuffle permutation so that the cursor maps to itself.
    ///
    /// Shuffling every other slot and pinning the cursor yields the same
    /// distribution as re-rolling a full shuffle until the cursor happens to
    /// be a fixed point, without the unbounded retry loop.
    fn regenerate_shuffle(&mut self) {
        if self.play_mode != PlayMode::Shuffle {
            self.shuffle_order.clear();
            return;
        }
        let anchor = self.current_index;
        let mut rest: Vec<usize> = (0..self.tracks.len()).filter(|&i| i != anchor).collect();
        rest.shuffle(&mut self.rng);
        if anchor < self.tracks.len() {
            rest.insert(anchor, anchor);
        }
        self.shuffle_order = rest;
        debug!("Regenerated shuffle order: {:?}", self.shuffle_order);
    }
}
