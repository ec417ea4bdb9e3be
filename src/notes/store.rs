//! Note persistence using SQLite.

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

use super::{Note, NoteUpdate};

const NOTE_COLUMNS: &str = "id, video_id, content, tags, created_at, updated_at";

/// Persists notes in SQLite.
///
/// # Schema
/// ```sql
/// CREATE TABLE notes (
///     id         TEXT PRIMARY KEY,  -- UUID v4
///     video_id   TEXT,
///     content    TEXT NOT NULL,
///     tags       TEXT NOT NULL,     -- JSON array
///     created_at TEXT NOT NULL,     -- RFC 3339, UTC, microseconds
///     updated_at TEXT NOT NULL
/// );
/// ```
pub struct NoteStore {
    conn: Mutex<Connection>,
}

impl NoteStore {
    /// Opens (or creates) the SQLite database and ensures the table exists.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref();
        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open notes DB at {}", db_path.display()))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.create_table()?;
        Ok(store)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn create_table(&self) -> Result<()> {
        self.conn()
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS notes (
                    id         TEXT PRIMARY KEY,
                    video_id   TEXT,
                    content    TEXT NOT NULL,
                    tags       TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_notes_video_id ON notes(video_id);",
            )
            .context("Failed to create notes table")?;
        Ok(())
    }

    /// Creates a note. `content` is stored as given; callers trim and validate.
    pub fn create(&self, video_id: Option<&str>, content: &str, tags: Vec<String>) -> Result<Note> {
        let now = stored_now();
        let note = Note {
            id: Uuid::new_v4().to_string(),
            video_id: video_id.map(str::to_string),
            content: content.to_string(),
            tags,
            created_at: now,
            updated_at: now,
        };

        let tags_json = serde_json::to_string(&note.tags).context("Failed to encode tags")?;
        self.conn()
            .execute(
                "INSERT INTO notes (id, video_id, content, tags, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    note.id,
                    note.video_id,
                    note.content,
                    tags_json,
                    format_timestamp(&note.created_at),
                    format_timestamp(&note.updated_at),
                ],
            )
            .context("Failed to insert note")?;

        Ok(note)
    }

    /// Fetches one note by id.
    pub fn get(&self, id: &str) -> Result<Option<Note>> {
        let conn = self.conn();
        Self::get_locked(&conn, id)
    }

    fn get_locked(conn: &Connection, id: &str) -> Result<Option<Note>> {
        let raw = conn
            .query_row(
                &format!("SELECT {} FROM notes WHERE id = ?1", NOTE_COLUMNS),
                params![id],
                RawNote::from_row,
            )
            .optional()
            .context("Failed to query note")?;
        raw.map(RawNote::into_note).transpose()
    }

    /// Notes for a video, most recently updated first.
    pub fn list_by_video(&self, video_id: &str) -> Result<Vec<Note>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM notes WHERE video_id = ?1
                 ORDER BY updated_at DESC, created_at DESC, rowid DESC",
                NOTE_COLUMNS
            ))
            .context("Failed to prepare list query")?;
        let rows = stmt
            .query_map(params![video_id], RawNote::from_row)
            .context("Failed to query notes")?;
        collect_notes(rows)
    }

    /// Case-insensitive substring search over note content.
    ///
    /// An empty query matches every note.
    pub fn search(&self, query: &str) -> Result<Vec<Note>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM notes WHERE instr(lower(content), lower(?1)) > 0 OR ?1 = ''
                 ORDER BY updated_at DESC, created_at DESC, rowid DESC",
                NOTE_COLUMNS
            ))
            .context("Failed to prepare search query")?;
        let rows = stmt
            .query_map(params![query], RawNote::from_row)
            .context("Failed to search notes")?;
        collect_notes(rows)
    }

    /// Applies a partial update and bumps `updated_at`.
    ///
    /// Returns `Ok(None)` if no note has this id.
    pub fn update(&self, id: &str, update: NoteUpdate) -> Result<Option<Note>> {
        let conn = self.conn();
        let Some(mut note) = Self::get_locked(&conn, id)? else {
            return Ok(None);
        };

        if let Some(content) = update.content {
            note.content = content;
        }
        if let Some(tags) = update.tags {
            note.tags = tags;
        }
        note.updated_at = stored_now();

        let tags_json = serde_json::to_string(&note.tags).context("Failed to encode tags")?;
        conn.execute(
            "UPDATE notes SET content = ?2, tags = ?3, updated_at = ?4 WHERE id = ?1",
            params![
                note.id,
                note.content,
                tags_json,
                format_timestamp(&note.updated_at)
            ],
        )
        .context("Failed to update note")?;

        Ok(Some(note))
    }

    /// Deletes a note, returning it if it existed.
    pub fn delete(&self, id: &str) -> Result<Option<Note>> {
        let conn = self.conn();
        let Some(note) = Self::get_locked(&conn, id)? else {
            return Ok(None);
        };
        conn.execute("DELETE FROM notes WHERE id = ?1", params![id])
            .context("Failed to delete note")?;
        Ok(Some(note))
    }
}

/// Row as stored, before timestamp and tag decoding.
struct RawNote {
    id: String,
    video_id: Option<String>,
    content: String,
    tags: String,
    created_at: String,
    updated_at: String,
}

impl RawNote {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            video_id: row.get(1)?,
            content: row.get(2)?,
            tags: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }

    fn into_note(self) -> Result<Note> {
        let tags: Vec<String> = serde_json::from_str(&self.tags)
            .with_context(|| format!("Failed to decode tags for note {}", self.id))?;
        let created_at = self
            .created_at
            .parse()
            .with_context(|| format!("Failed to parse created_at for note {}", self.id))?;
        let updated_at = self
            .updated_at
            .parse()
            .with_context(|| format!("Failed to parse updated_at for note {}", self.id))?;
        Ok(Note {
            id: self.id,
            video_id: self.video_id,
            content: self.content,
            tags,
            created_at,
            updated_at,
        })
    }
}

fn collect_notes<I>(rows: I) -> Result<Vec<Note>>
where
    I: Iterator<Item = rusqlite::Result<RawNote>>,
{
    let mut notes = Vec::new();
    for row in rows {
        let raw = row.context("Failed to read note row")?;
        notes.push(raw.into_note()?);
    }
    Ok(notes)
}

/// Current time at the precision stored in the database.
fn stored_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Fixed-width UTC timestamps so lexical order matches time order.
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}
