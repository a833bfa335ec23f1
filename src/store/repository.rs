//! Read-only accessor over the note store.
//!
//! The store is a Core Data SQLite database: `ZSFNOTE` holds the notes,
//! `ZSFNOTETAG` the tags, and `Z_5TAGS` the many-to-many junction. The
//! connection is opened read-only; every query here is a SELECT.

use rusqlite::{params_from_iter, Connection, OpenFlags, OptionalExtension, Row};
use std::path::Path;

use super::note::{core_data_to_utc, Note};
use crate::error::{Error, Result};

const NOTE_COLUMNS: &str = "ZUNIQUEIDENTIFIER, ZTITLE, ZTEXT, ZSUBTITLE, \
     ZCREATIONDATE, ZMODIFICATIONDATE, ZTRASHED";

pub struct NoteRepository {
    conn: Connection,
}

impl NoteRepository {
    /// Open the note store read-only. Fails with `RepositoryUnavailable`
    /// if the file is missing or not a database.
    pub fn open(db_path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(
            db_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self { conn })
    }

    /// In-memory store with the note-table schema, for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(
            r#"
            CREATE TABLE ZSFNOTE (
                Z_PK INTEGER PRIMARY KEY,
                ZUNIQUEIDENTIFIER TEXT NOT NULL UNIQUE,
                ZTITLE TEXT,
                ZTEXT TEXT,
                ZSUBTITLE TEXT,
                ZCREATIONDATE REAL,
                ZMODIFICATIONDATE REAL,
                ZTRASHED INTEGER NOT NULL DEFAULT 0
            );
            CREATE TABLE ZSFNOTETAG (
                Z_PK INTEGER PRIMARY KEY,
                ZTITLE TEXT NOT NULL
            );
            CREATE TABLE Z_5TAGS (
                Z_5NOTES INTEGER NOT NULL,
                Z_10TAGS INTEGER NOT NULL
            );
            "#,
        )?;
        Ok(Self { conn })
    }

    /// Raw connection handle, for test fixtures only.
    #[cfg(test)]
    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    /// All non-trashed notes, the corpus for index building.
    pub fn list_active(&self) -> Result<Vec<Note>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {NOTE_COLUMNS} FROM ZSFNOTE WHERE ZTRASHED = 0 ORDER BY Z_PK"
        ))?;
        let rows = stmt.query_map([], row_to_note)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Error::from)
    }

    /// Single-note lookup. Trashed notes are treated as absent.
    pub fn find_by_id(&self, id: &str) -> Result<Note> {
        let found = self
            .conn
            .query_row(
                &format!(
                    "SELECT {NOTE_COLUMNS} FROM ZSFNOTE \
                     WHERE ZUNIQUEIDENTIFIER = ?1 AND ZTRASHED = 0"
                ),
                [id],
                row_to_note,
            )
            .optional()?;

        found.ok_or_else(|| Error::NoteNotFound { id: id.to_string() })
    }

    /// Batch fetch for enrichment. Returns rows in the order of `ids`;
    /// missing and trashed ids are silently dropped.
    pub fn find_by_ids(&self, ids: &[String]) -> Result<Vec<Note>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {NOTE_COLUMNS} FROM ZSFNOTE \
             WHERE ZUNIQUEIDENTIFIER IN ({placeholders}) AND ZTRASHED = 0"
        ))?;
        let rows = stmt.query_map(params_from_iter(ids.iter()), row_to_note)?;

        let mut by_id = std::collections::HashMap::new();
        for row in rows {
            let note = row?;
            by_id.insert(note.id.clone(), note);
        }

        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    /// Tag names for one note, in junction-table order, passed through
    /// unchanged (no dedup).
    pub fn tags_for_note(&self, id: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT t.ZTITLE FROM ZSFNOTETAG t \
             JOIN Z_5TAGS j ON j.Z_10TAGS = t.Z_PK \
             JOIN ZSFNOTE n ON n.Z_PK = j.Z_5NOTES \
             WHERE n.ZUNIQUEIDENTIFIER = ?1 \
             ORDER BY j.rowid",
        )?;
        let rows = stmt.query_map([id], |row| row.get(0))?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Error::from)
    }

    /// All tag names, deduplicated and alphabetically sorted.
    pub fn list_all_tags(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT ZTITLE FROM ZSFNOTETAG ORDER BY ZTITLE")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Error::from)
    }

    /// Case-insensitive substring match against title or content,
    /// trashed excluded, most recently modified first. SQLite LIKE is
    /// ASCII case-insensitive, which matches the store's own search.
    pub fn keyword_search(&self, query: &str, limit: usize) -> Result<Vec<Note>> {
        let pattern = format!("%{}%", escape_like(query));
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {NOTE_COLUMNS} FROM ZSFNOTE \
             WHERE ZTRASHED = 0 \
               AND (ZTITLE LIKE ?1 ESCAPE '\\' OR ZTEXT LIKE ?1 ESCAPE '\\') \
             ORDER BY ZMODIFICATIONDATE DESC \
             LIMIT ?2"
        ))?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map(rusqlite::params![pattern, limit], row_to_note)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Error::from)
    }
}

fn row_to_note(row: &Row<'_>) -> rusqlite::Result<Note> {
    let created: Option<f64> = row.get(4)?;
    let modified: Option<f64> = row.get(5)?;
    let trashed: i64 = row.get(6)?;

    Ok(Note {
        id: row.get(0)?,
        title: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        content: row.get(2)?,
        subtitle: row.get(3)?,
        created: core_data_to_utc(created.unwrap_or(0.0)),
        modified: core_data_to_utc(modified.unwrap_or(0.0)),
        trashed: trashed != 0,
    })
}

/// Escape LIKE metacharacters so user queries match literally.
fn escape_like(query: &str) -> String {
    query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
