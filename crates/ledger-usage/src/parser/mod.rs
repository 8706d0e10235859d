//! Source parsers.
//!
//! Each submodule turns one on-disk format into [`Session`](crate::models::Session)s
//! or pre-aggregated records:
//! - [`stats_cache`]: Claude Code's pre-aggregated daily/model JSON blob
//! - [`session_log`]: Claude Code per-session JSONL logs
//! - [`rollout`]: Codex rollout JSONL files (two historical line schemas)
//! - [`cursor_store`]: Cursor's SQLite AI tracking database
//! - [`session_document`]: Gemini CLI per-session JSON documents

pub mod cursor_store;
pub mod rollout;
pub mod session_document;
pub mod session_log;
pub mod stats_cache;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Parse a log timestamp.
///
/// RFC 3339 (with or without fractional seconds) first, then a bare
/// `YYYY-MM-DDTHH:MM:SS[.fff]` taken as UTC. Empty or unparseable input gives
/// `None`.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}
