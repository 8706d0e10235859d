//! Reader for Cursor's AI tracking database
//! (`~/.cursor/ai-tracking/ai-code-tracking.db`).
//!
//! Cursor records code generations, not tokens, so nothing read here carries
//! a cost. Two tables are used:
//!
//! - `ai_code_hashes(createdAt INTEGER ms, fileExtension, source, ...)`
//! - `conversation_summaries(conversationId, title, model, mode, updatedAt ms)`

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OpenFlags, Row};
use tracing::{debug, trace};

use crate::error::{Result, UsageError};

/// One conversation summary row.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
    pub id: String,
    pub title: String,
    pub model: String,
    pub mode: String,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Conversation {
    /// Display label: the title, falling back to the mode.
    pub fn project(&self) -> &str {
        if self.title.is_empty() {
            &self.mode
        } else {
            &self.title
        }
    }
}

/// Read-only handle on the tracking database.
pub struct CursorStore {
    conn: Connection,
}

fn millis_to_utc(ms: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
}

fn count(n: i64) -> u64 {
    u64::try_from(n).unwrap_or(0)
}

/// Map a `(label, count)` row.
fn label_count(row: &Row<'_>) -> rusqlite::Result<(String, u64)> {
    Ok((row.get(0)?, count(row.get(1)?)))
}

impl CursorStore {
    /// Open the database read-only.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(UsageError::SourceUnavailable {
                path: path.to_path_buf(),
            });
        }
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        debug!(db = %path.display(), "Opened Cursor tracking database");
        Ok(Self { conn })
    }

    /// Total code generations.
    pub fn total_generations(&self) -> Result<u64> {
        let total: i64 = self
            .conn
            .query_row("SELECT count(*) FROM ai_code_hashes", [], |row| row.get(0))?;
        Ok(count(total))
    }

    /// Generations per UTC day, ordered by date.
    pub fn daily_generations(&self) -> Result<Vec<(String, u64)>> {
        self.label_counts(
            "SELECT date(createdAt / 1000, 'unixepoch') AS day, count(*) AS cnt
             FROM ai_code_hashes
             WHERE createdAt IS NOT NULL
             GROUP BY day
             ORDER BY day",
        )
    }

    /// Generations per file extension (`unknown` when absent), largest first.
    pub fn generations_by_extension(&self) -> Result<Vec<(String, u64)>> {
        self.label_counts(
            "SELECT COALESCE(fileExtension, 'unknown') AS ext, count(*) AS cnt
             FROM ai_code_hashes
             GROUP BY ext
             ORDER BY cnt DESC, ext",
        )
    }

    /// Generations per originating feature (tab completion, composer, ...).
    pub fn generations_by_source(&self) -> Result<Vec<(String, u64)>> {
        self.label_counts(
            "SELECT COALESCE(source, 'unknown') AS src, count(*) AS cnt
             FROM ai_code_hashes
             GROUP BY src
             ORDER BY src",
        )
    }

    fn label_counts(&self, sql: &str) -> Result<Vec<(String, u64)>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map([], label_count)?
            .filter_map(|r| match r {
                Ok(row) => Some(row),
                Err(e) => {
                    trace!(error = %e, "Skipping undecodable row");
                    None
                }
            })
            .collect();
        Ok(rows)
    }

    /// Conversations, most recently updated first.
    pub fn conversations(&self) -> Result<Vec<Conversation>> {
        let mut stmt = self.conn.prepare(
            "SELECT conversationId, COALESCE(title, ''), COALESCE(model, ''),
                    COALESCE(mode, ''), updatedAt
             FROM conversation_summaries
             ORDER BY updatedAt DESC",
        )?;
        let conversations = stmt
            .query_map([], |row| {
                Ok(Conversation {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    model: row.get(2)?,
                    mode: row.get(3)?,
                    updated_at: row.get::<_, Option<i64>>(4)?.and_then(millis_to_utc),
                })
            })?
            .filter_map(|r| match r {
                Ok(conversation) => Some(conversation),
                Err(e) => {
                    trace!(error = %e, "Skipping undecodable conversation row");
                    None
                }
            })
            .collect();
        Ok(conversations)
    }

    /// Earliest and latest generation times.
    pub fn date_range(&self) -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>)> {
        let (min, max): (Option<i64>, Option<i64>) = self.conn.query_row(
            "SELECT min(createdAt), max(createdAt) FROM ai_code_hashes",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok((min.and_then(millis_to_utc), max.and_then(millis_to_utc)))
    }
}

#[cfg(test)]
pub(crate) mod fixture {
    use rusqlite::{Connection, params};
    use std::path::Path;

    /// Create a tracking database with a handful of rows.
    ///
    /// Generations: 2026-02-01 x2 (rs, ts), 2026-02-02 x1 (rs), one row with
    /// no extension on 2026-02-02.
    pub(crate) fn create_tracking_db(path: &Path) {
        let conn = Connection::open(path).unwrap();
        conn.execute_batch(
            "CREATE TABLE ai_code_hashes (
                 hash TEXT PRIMARY KEY,
                 source TEXT,
                 fileExtension TEXT,
                 createdAt INTEGER
             );
             CREATE TABLE conversation_summaries (
                 conversationId TEXT PRIMARY KEY,
                 title TEXT,
                 model TEXT,
                 mode TEXT,
                 updatedAt INTEGER
             );",
        )
        .unwrap();

        // 2026-02-01T10:00:00Z and 2026-02-02T09:00:00Z in milliseconds
        let day1 = 1_769_940_000_000_i64;
        let day2 = 1_770_022_800_000_i64;
        let rows = [
            ("h1", "tab", Some("rs"), day1),
            ("h2", "composer", Some("ts"), day1 + 60_000),
            ("h3", "tab", Some("rs"), day2),
            ("h4", "composer", None, day2 + 60_000),
        ];
        for (hash, source, ext, created) in rows {
            conn.execute(
                "INSERT INTO ai_code_hashes (hash, source, fileExtension, createdAt) VALUES (?1, ?2, ?3, ?4)",
                params![hash, source, ext, created],
            )
            .unwrap();
        }

        conn.execute(
            "INSERT INTO conversation_summaries VALUES (?1, ?2, ?3, ?4, ?5)",
            params!["c1", "Fix login", "gpt-5", "agent", day1],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO conversation_summaries VALUES (?1, NULL, NULL, ?2, ?3)",
            params!["c2", "ask", day2],
        )
        .unwrap();
    }
}
