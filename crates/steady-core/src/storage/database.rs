//! SQLite-based local history of completed sessions.
//!
//! The server session record is the durable source of truth; this table is
//! the on-device history behind the stats command, written when a run ends
//! regardless of whether the terminal gateway call succeeded.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::error::DatabaseError;
use crate::flow::plan::PathTag;
use crate::sync::SessionOutcome;

use super::data_dir;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: i64,
    /// Backend session id when one was assigned.
    pub session_id: Option<String>,
    pub path: Option<String>,
    pub technique: Option<String>,
    pub intensity_pre: Option<u8>,
    pub intensity_mid: Option<u8>,
    pub intensity_post: Option<u8>,
    pub fallback_used: bool,
    pub timed_out: bool,
    pub duration_secs: u64,
    pub ended_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Stats {
    pub total_sessions: u64,
    /// Mean of (pre - post) over sessions with both ratings.
    pub mean_intensity_drop: f64,
    pub fallback_rate: f64,
    pub timed_out_count: u64,
}

/// SQLite database for session history.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `~/.config/steady/steady.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    pub fn open() -> Result<Self, Box<dyn std::error::Error>> {
        let path = data_dir()?.join("steady.db");
        let conn = Connection::open(&path).map_err(|source| DatabaseError::OpenFailed {
            path,
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), DatabaseError> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS sessions (
                id             INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id     TEXT,
                path           TEXT,
                technique      TEXT,
                intensity_pre  INTEGER,
                intensity_mid  INTEGER,
                intensity_post INTEGER,
                fallback_used  INTEGER NOT NULL DEFAULT 0,
                timed_out      INTEGER NOT NULL DEFAULT 0,
                duration_secs  INTEGER NOT NULL,
                ended_at       TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_ended_at ON sessions(ended_at);",
        )?;
        Ok(())
    }

    /// Record a finished run.
    pub fn record_session(
        &self,
        session_id: Option<&str>,
        intensity_pre: Option<u8>,
        intensity_mid: Option<u8>,
        outcome: &SessionOutcome,
    ) -> Result<i64, DatabaseError> {
        self.conn.execute(
            "INSERT INTO sessions (session_id, path, technique, intensity_pre, intensity_mid,
                                   intensity_post, fallback_used, timed_out, duration_secs, ended_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                session_id,
                outcome.path.map(path_str),
                outcome.technique.map(|t| t.label()),
                intensity_pre,
                intensity_mid,
                outcome.intensity_post,
                outcome.fallback_used,
                outcome.timed_out,
                outcome.duration_secs,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Most recent sessions, newest first.
    pub fn recent(&self, limit: usize) -> Result<Vec<SessionRecord>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, session_id, path, technique, intensity_pre, intensity_mid,
                    intensity_post, fallback_used, timed_out, duration_secs, ended_at
             FROM sessions ORDER BY ended_at DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            let ended_at: String = row.get(10)?;
            Ok(SessionRecord {
                id: row.get(0)?,
                session_id: row.get(1)?,
                path: row.get(2)?,
                technique: row.get(3)?,
                intensity_pre: row.get(4)?,
                intensity_mid: row.get(5)?,
                intensity_post: row.get(6)?,
                fallback_used: row.get(7)?,
                timed_out: row.get(8)?,
                duration_secs: row.get(9)?,
                ended_at: DateTime::parse_from_rfc3339(&ended_at)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now()),
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Aggregate stats over the whole history.
    pub fn stats(&self) -> Result<Stats, DatabaseError> {
        let total_sessions: u64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM sessions", [], |r| r.get(0))?;
        let mean_intensity_drop: f64 = self
            .conn
            .query_row(
                "SELECT AVG(intensity_pre - intensity_post) FROM sessions
                 WHERE intensity_pre IS NOT NULL AND intensity_post IS NOT NULL",
                [],
                |r| r.get::<_, Option<f64>>(0),
            )?
            .unwrap_or(0.0);
        let fallbacks: u64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sessions WHERE fallback_used = 1",
            [],
            |r| r.get(0),
        )?;
        let timed_out_count: u64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sessions WHERE timed_out = 1",
            [],
            |r| r.get(0),
        )?;
        Ok(Stats {
            total_sessions,
            mean_intensity_drop,
            fallback_rate: if total_sessions == 0 {
                0.0
            } else {
                fallbacks as f64 / total_sessions as f64
            },
            timed_out_count,
        })
    }

    pub fn kv_get(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |r| {
                r.get(0)
            })
            .optional()?;
        Ok(value)
    }

    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }
}

fn path_str(path: PathTag) -> &'static str {
    match path {
        PathTag::Reframe => "reframe",
        PathTag::Defuse => "defuse",
        PathTag::Ground => "ground",
        PathTag::Crisis => "crisis",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::policy::Technique;

    fn outcome(post: Option<u8>, fallback: bool, timed_out: bool) -> SessionOutcome {
        SessionOutcome {
            intensity_post: post,
            confidence: Some(6),
            anchor: Some("walk".into()),
            path: Some(PathTag::Reframe),
            technique: Some(Technique::PacedBreathing),
            fallback_used: fallback,
            timed_out,
            duration_secs: 300,
        }
    }

    #[test]
    fn record_and_read_back() {
        let db = Database::open_memory().unwrap();
        let id = db
            .record_session(Some("sess-1"), Some(8), Some(5), &outcome(Some(3), false, false))
            .unwrap();
        assert!(id > 0);

        let recent = db.recent(10).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].session_id.as_deref(), Some("sess-1"));
        assert_eq!(recent[0].intensity_pre, Some(8));
        assert_eq!(recent[0].intensity_post, Some(3));
        assert_eq!(recent[0].path.as_deref(), Some("reframe"));
    }

    #[test]
    fn stats_aggregate_drop_and_rates() {
        let db = Database::open_memory().unwrap();
        db.record_session(None, Some(8), Some(6), &outcome(Some(4), false, false))
            .unwrap();
        db.record_session(None, Some(6), Some(6), &outcome(Some(4), true, true))
            .unwrap();

        let stats = db.stats().unwrap();
        assert_eq!(stats.total_sessions, 2);
        // Drops: (8-4) and (6-4) -> mean 3.
        assert!((stats.mean_intensity_drop - 3.0).abs() < f64::EPSILON);
        assert!((stats.fallback_rate - 0.5).abs() < f64::EPSILON);
        assert_eq!(stats.timed_out_count, 1);
    }

    #[test]
    fn stats_on_empty_history() {
        let db = Database::open_memory().unwrap();
        let stats = db.stats().unwrap();
        assert_eq!(stats.total_sessions, 0);
        assert_eq!(stats.mean_intensity_drop, 0.0);
        assert_eq!(stats.fallback_rate, 0.0);
    }

    #[test]
    fn kv_round_trip() {
        let db = Database::open_memory().unwrap();
        assert!(db.kv_get("missing").unwrap().is_none());
        db.kv_set("k", "v1").unwrap();
        db.kv_set("k", "v2").unwrap();
        assert_eq!(db.kv_get("k").unwrap().as_deref(), Some("v2"));
    }
}
