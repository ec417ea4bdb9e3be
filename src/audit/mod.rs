//! Append-only audit log of dashboard actions, stored in SQLite.
//!
//! Recording is best effort: a failed write is logged and never fails the
//! request that triggered it.

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::error;

/// Actions recorded by the API layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    FetchVideoDetails,
    UpdateVideoDetails,
    FetchCommentsPage,
    FetchCommentsAll,
    PostComment,
    DeleteComment,
    DeleteCommentThread,
    AddNote,
    UpdateNote,
    DeleteNote,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::FetchVideoDetails => "FETCH_VIDEO_DETAILS",
            AuditAction::UpdateVideoDetails => "UPDATE_VIDEO_DETAILS",
            AuditAction::FetchCommentsPage => "FETCH_COMMENTS_PAGE",
            AuditAction::FetchCommentsAll => "FETCH_COMMENTS_ALL",
            AuditAction::PostComment => "POST_COMMENT",
            AuditAction::DeleteComment => "DELETE_COMMENT",
            AuditAction::DeleteCommentThread => "DELETE_COMMENTTHREAD",
            AuditAction::AddNote => "ADD_NOTE",
            AuditAction::UpdateNote => "UPDATE_NOTE",
            AuditAction::DeleteNote => "DELETE_NOTE",
        }
    }
}

/// One recorded action.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub action: String,
    pub meta: Value,
    pub created_at: DateTime<Utc>,
}

pub struct AuditLog {
    conn: Mutex<Connection>,
}

impl AuditLog {
    /// Opens (or creates) the SQLite database and ensures the table exists.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref();
        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open audit DB at {}", db_path.display()))?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS audit_log (
                id         INTEGER PRIMARY KEY,
                action     TEXT NOT NULL,
                meta       TEXT NOT NULL,
                created_at TEXT NOT NULL
            );",
        )
        .context("Failed to create audit_log table")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends an entry.
    pub fn append(&self, action: AuditAction, meta: &Value) -> Result<()> {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        self.conn()
            .execute(
                "INSERT INTO audit_log (action, meta, created_at) VALUES (?1, ?2, ?3)",
                params![action.as_str(), meta.to_string(), now],
            )
            .context("Failed to insert audit entry")?;
        Ok(())
    }

    /// Appends an entry, logging instead of returning any failure.
    pub fn record(&self, action: AuditAction, meta: Value) {
        if let Err(e) = self.append(action, &meta) {
            error!(action = action.as_str(), error = %e, "Audit log write failed");
        }
    }

    /// Most recent entries first.
    pub fn recent(&self, limit: usize) -> Result<Vec<AuditEntry>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT action, meta, created_at FROM audit_log ORDER BY id DESC LIMIT ?1",
            )
            .context("Failed to prepare audit query")?;
        let rows = stmt
            .query_map(params![limit as i64], |row| {
                let action: String = row.get(0)?;
                let meta: String = row.get(1)?;
                let created_at: String = row.get(2)?;
                Ok((action, meta, created_at))
            })
            .context("Failed to query audit log")?;

        let mut entries = Vec::new();
        for row in rows {
            let (action, meta, created_at) = row.context("Failed to read audit row")?;
            entries.push(AuditEntry {
                action,
                meta: serde_json::from_str(&meta).context("Failed to decode audit meta")?,
                created_at: created_at.parse().context("Failed to parse audit timestamp")?,
            });
        }
        Ok(entries)
    }
}
