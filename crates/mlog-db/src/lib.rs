//! Storage layer for the mechanic's logbook.
//!
//! Provides the checkpoint blob store and the work-day reporting store using
//! `rusqlite`.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! A `Database` instance can be moved between threads but cannot be shared
//! across threads without external synchronization. The recorder that owns it
//! is single-owner anyway; a second process is kept out with a lock file by
//! the CLI.
//!
//! # Schema
//!
//! ## Checkpoints
//!
//! `checkpoints` is a plain key/blob table. Values are opaque to this crate;
//! the recorder writes JSON. Each write overwrites the previous value for the
//! key.
//!
//! ## Work days
//!
//! Dates are stored as TEXT `YYYY-MM-DD` so lexicographic ordering matches
//! chronological ordering. Track points are a JSON array, or NULL when the
//! recording captured none.

use std::path::Path;

use chrono::{NaiveDate, SecondsFormat, Utc};
use mlog_core::{
    ArchivingStore, CheckpointStore, ReportSink, StoreError, TrackPoint, WorkDayRecord,
};
use rusqlite::{Connection, OptionalExtension, Row, params};
use thiserror::Error;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Failed to parse a stored work-day date.
    #[error("invalid date for work day {id}: {date}")]
    DateParse {
        id: i64,
        date: String,
        #[source]
        source: chrono::ParseError,
    },
    /// Failed to encode track points for a new row.
    #[error("failed to encode track points: {0}")]
    TrackPointsEncode(#[source] serde_json::Error),
    /// Failed to decode stored track points.
    #[error("invalid track points for work day {id}: {source}")]
    TrackPoints {
        id: i64,
        #[source]
        source: serde_json::Error,
    },
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

/// A saved work day with its row id.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredWorkDay {
    pub id: i64,
    pub created_at: String,
    pub record: WorkDayRecord,
}

struct WorkDayRow {
    id: i64,
    date: String,
    driving_hours: f64,
    working_hours: f64,
    kilometers: f64,
    city: String,
    track_points: Option<String>,
    note: String,
    completed: bool,
    day_type: String,
    created_at: String,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS checkpoints (
                key TEXT PRIMARY KEY,
                value BLOB NOT NULL,
                updated_at TEXT NOT NULL
            );

            -- Work days: one row per saved recording
            -- date: local calendar day, 'YYYY-MM-DD'
            -- track_points: JSON array or NULL
            CREATE TABLE IF NOT EXISTS work_days (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL,
                driving_hours REAL NOT NULL DEFAULT 0,
                working_hours REAL NOT NULL DEFAULT 0,
                kilometers REAL NOT NULL DEFAULT 0,
                city TEXT NOT NULL DEFAULT '',
                track_points TEXT,
                note TEXT NOT NULL DEFAULT '',
                completed INTEGER NOT NULL DEFAULT 0,
                day_type TEXT NOT NULL DEFAULT 'work',
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_work_days_date ON work_days(date);
            ",
        )?;
        Ok(())
    }

    /// Reads one checkpoint blob.
    pub fn get_checkpoint(&self, key: &str) -> Result<Option<Vec<u8>>, DbError> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM checkpoints WHERE key = ?",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Writes one checkpoint blob, replacing any previous value.
    pub fn set_checkpoint(&self, key: &str, value: &[u8]) -> Result<(), DbError> {
        self.conn.execute(
            "
            INSERT INTO checkpoints (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            ",
            params![key, value, now_timestamp()],
        )?;
        Ok(())
    }

    /// Deletes one checkpoint blob. Deleting a missing key is not an error.
    pub fn delete_checkpoint(&self, key: &str) -> Result<(), DbError> {
        self.conn
            .execute("DELETE FROM checkpoints WHERE key = ?", [key])?;
        Ok(())
    }

    /// Inserts a work day and returns its row id.
    pub fn insert_work_day(&self, record: &WorkDayRecord) -> Result<i64, DbError> {
        insert_work_day_row(&self.conn, record)
    }

    /// Inserts a work day and deletes checkpoint `cleared_key` in one
    /// transaction. Returns the new row id.
    pub fn archive_work_day(
        &mut self,
        record: &WorkDayRecord,
        cleared_key: &str,
    ) -> Result<i64, DbError> {
        let tx = self.conn.transaction()?;
        let id = insert_work_day_row(&tx, record)?;
        tx.execute("DELETE FROM checkpoints WHERE key = ?", [cleared_key])?;
        tx.commit()?;
        Ok(id)
    }

    /// Lists all work days ordered by date then id.
    pub fn list_work_days(&self) -> Result<Vec<StoredWorkDay>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, date, driving_hours, working_hours, kilometers, city, track_points, note, completed, day_type, created_at
            FROM work_days
            ORDER BY date ASC, id ASC
            ",
        )?;
        let rows = stmt.query_map([], work_day_row)?;
        let mut days = Vec::new();
        for row in rows {
            days.push(row?.into_stored()?);
        }
        Ok(days)
    }

    /// Lists work days within a date range.
    ///
    /// The range is inclusive of `start` and exclusive of `end`.
    pub fn list_work_days_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<StoredWorkDay>, DbError> {
        if end <= start {
            return Ok(Vec::new());
        }
        let start = start.format(DATE_FORMAT).to_string();
        let end = end.format(DATE_FORMAT).to_string();
        let mut stmt = self.conn.prepare(
            "
            SELECT id, date, driving_hours, working_hours, kilometers, city, track_points, note, completed, day_type, created_at
            FROM work_days
            WHERE date >= ? AND date < ?
            ORDER BY date ASC, id ASC
            ",
        )?;
        let rows = stmt.query_map([start, end], work_day_row)?;
        let mut days = Vec::new();
        for row in rows {
            days.push(row?.into_stored()?);
        }
        Ok(days)
    }
}

impl CheckpointStore for Database {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.get_checkpoint(key).map_err(StoreError::backend)
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.set_checkpoint(key, value).map_err(StoreError::backend)
    }

    fn delete(&mut self, key: &str) -> Result<(), StoreError> {
        self.delete_checkpoint(key).map_err(StoreError::backend)
    }
}

impl ArchivingStore for Database {
    fn submit_clearing(&mut self, record: &WorkDayRecord, key: &str) -> Result<(), StoreError> {
        let id = self
            .archive_work_day(record, key)
            .map_err(StoreError::backend)?;
        tracing::debug!(id, date = %record.date, key, "work day archived");
        Ok(())
    }
}

impl ReportSink for Database {
    fn submit(&mut self, record: &WorkDayRecord) -> Result<(), StoreError> {
        let id = self.insert_work_day(record).map_err(StoreError::backend)?;
        tracing::debug!(id, date = %record.date, "work day stored");
        Ok(())
    }
}

fn insert_work_day_row(conn: &Connection, record: &WorkDayRecord) -> Result<i64, DbError> {
    let track_points = record
        .track_points
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(DbError::TrackPointsEncode)?;
    conn.execute(
        "
        INSERT INTO work_days
        (date, driving_hours, working_hours, kilometers, city, track_points, note, completed, day_type, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ",
        params![
            record.date.format(DATE_FORMAT).to_string(),
            record.driving_hours,
            record.working_hours,
            record.kilometers,
            record.city,
            track_points,
            record.note,
            record.completed,
            record.day_type,
            now_timestamp(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn work_day_row(row: &Row<'_>) -> rusqlite::Result<WorkDayRow> {
    Ok(WorkDayRow {
        id: row.get(0)?,
        date: row.get(1)?,
        driving_hours: row.get(2)?,
        working_hours: row.get(3)?,
        kilometers: row.get(4)?,
        city: row.get(5)?,
        track_points: row.get(6)?,
        note: row.get(7)?,
        completed: row.get(8)?,
        day_type: row.get(9)?,
        created_at: row.get(10)?,
    })
}

impl WorkDayRow {
    fn into_stored(self) -> Result<StoredWorkDay, DbError> {
        let date = NaiveDate::parse_from_str(&self.date, DATE_FORMAT).map_err(|source| {
            DbError::DateParse {
                id: self.id,
                date: self.date.clone(),
                source,
            }
        })?;
        let track_points = self
            .track_points
            .as_deref()
            .map(serde_json::from_str::<Vec<TrackPoint>>)
            .transpose()
            .map_err(|source| DbError::TrackPoints {
                id: self.id,
                source,
            })?;
        Ok(StoredWorkDay {
            id: self.id,
            created_at: self.created_at,
            record: WorkDayRecord {
                date,
                driving_hours: self.driving_hours,
                working_hours: self.working_hours,
                kilometers: self.kilometers,
                city: self.city,
                track_points,
                note: self.note,
                completed: self.completed,
                day_type: self.day_type,
            },
        })
    }
}

fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
