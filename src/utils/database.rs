//! Provides functions for interacting with the application's SQLite database.
//! Handles table creation, the per-owner track table used in database mode,
//! and per-guild player settings (play mode and volume).
//!
//! Every function takes a `&Connection` so callers decide where the database
//! lives; tests pass an in-memory connection.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Result as SqlResult, params};
use std::path::Path;

use crate::commands::music::utils::playlist::Track;

/// The default filename for the SQLite database.
pub const APPDATA_DB: &str = "application_data.db";

/// Opens the database at `path` and makes sure the tables exist.
pub fn open(path: impl AsRef<Path>) -> SqlResult<Connection> {
    let conn = Connection::open(path)?;
    create_tables(&conn)?;
    Ok(conn)
}

/// Creates the database tables (`tracks`, `player_settings`) if they don't exist.
pub fn create_tables(conn: &Connection) -> SqlResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS tracks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            owner_id INTEGER NOT NULL,
            title TEXT NOT NULL,
            url TEXT NOT NULL,
            thumbnail TEXT,
            duration TEXT,
            created_at INTEGER NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS tracks_owner ON tracks (owner_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS player_settings (
            guild_id INTEGER PRIMARY KEY,
            play_mode TEXT NOT NULL,
            volume INTEGER NOT NULL
        )",
        [],
    )?;

    Ok(())
}

/// A track row before it has been assigned an id.
#[derive(Debug, Clone)]
pub struct NewTrack {
    pub title: String,
    pub url: String,
    pub thumbnail: Option<String>,
    pub duration: Option<String>,
}

/// Inserts a track owned by `owner_id` and returns it with its new id.
pub fn insert_track(conn: &Connection, owner_id: u64, track: &NewTrack) -> SqlResult<Track> {
    let created_at = Utc::now();
    conn.execute(
        "INSERT INTO tracks (owner_id, title, url, thumbnail, duration, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            owner_id,
            &track.title,
            &track.url,
            &track.thumbnail,
            &track.duration,
            created_at.timestamp()
        ],
    )?;

    Ok(Track {
        id: conn.last_insert_rowid(),
        title: track.title.clone(),
        url: track.url.clone(),
        thumbnail: track.thumbnail.clone(),
        duration: track.duration.clone(),
        // Stored with second precision; keep the in-memory copy consistent.
        created_at: DateTime::from_timestamp(created_at.timestamp(), 0).unwrap_or(created_at),
    })
}

/// Retrieves every track owned by `owner_id`, oldest first.
pub fn tracks_for_owner(conn: &Connection, owner_id: u64) -> SqlResult<Vec<Track>> {
    let mut statement = conn.prepare(
        "SELECT id, title, url, thumbnail, duration, created_at
         FROM tracks WHERE owner_id = ?1 ORDER BY created_at, id",
    )?;

    let rows = statement.query_map(params![owner_id], |row| {
        let created_at: i64 = row.get(5)?;
        Ok(Track {
            id: row.get(0)?,
            title: row.get(1)?,
            url: row.get(2)?,
            thumbnail: row.get(3)?,
            duration: row.get(4)?,
            created_at: DateTime::from_timestamp(created_at, 0).unwrap_or_default(),
        })
    })?;

    rows.collect()
}

/// Inserts or replaces the player settings for a guild.
pub fn set_player_settings(
    conn: &Connection,
    guild_id: u64,
    play_mode: &str,
    volume: u8,
) -> SqlResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO player_settings (guild_id, play_mode, volume) VALUES (?1, ?2, ?3)",
        params![guild_id, play_mode, volume],
    )?;
    Ok(())
}

/// Retrieves the saved play mode and volume (0–100) for a guild.
pub fn get_player_settings(conn: &Connection, guild_id: u64) -> SqlResult<Option<(String, u8)>> {
    conn.query_row(
        "SELECT play_mode, volume FROM player_settings WHERE guild_id = ?1",
        params![guild_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )
    .optional()
}
