//! Parser for Codex rollout files (`~/.codex/sessions/YYYY/MM/DD/*.jsonl`).
//!
//! Two line schemas have shipped over time and may appear in the same tree:
//!
//! - current: typed envelopes (`session_meta`, `turn_context`, `event_msg`,
//!   `response_item`) with the body under `payload`
//! - legacy: a bare `{id, timestamp}` header followed by `{type: "message", role}`
//!   lines
//!
//! Every line is first reduced to a [`RolloutLine`] by [`classify`], then
//! folded into the session. Token counts arrive as cumulative snapshots, so a
//! later snapshot replaces an earlier one.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Component, Path};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace, warn};
use walkdir::WalkDir;

use super::parse_timestamp;
use super::session_log::project_name;
use crate::error::{Result, UsageError};
use crate::models::{Session, TokenUsage};

/// Model recorded for sessions that never name one.
pub const UNKNOWN_MODEL: &str = "codex-unknown";

/// Cumulative token usage from a `token_count` event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RolloutTokenUsage {
    pub input_tokens: u64,
    pub cached_input_tokens: u64,
    pub output_tokens: u64,
    pub reasoning_output_tokens: u64,
    pub total_tokens: u64,
}

impl RolloutTokenUsage {
    pub fn is_zero(&self) -> bool {
        self.input_tokens == 0
            && self.cached_input_tokens == 0
            && self.output_tokens == 0
            && self.reasoning_output_tokens == 0
            && self.total_tokens == 0
    }

    /// Usage as priced: reasoning counts as output, cached input as cache read.
    pub fn token_usage(&self) -> TokenUsage {
        TokenUsage::new(
            self.input_tokens,
            self.output_tokens + self.reasoning_output_tokens,
        )
        .with_cache(self.cached_input_tokens, 0)
    }

    /// Input plus output. Cached input is already part of `input_tokens`.
    pub fn billable_tokens(&self) -> u64 {
        self.input_tokens + self.output_tokens + self.reasoning_output_tokens
    }
}

/// One classified rollout line.
#[derive(Debug, Clone, PartialEq)]
pub enum RolloutLine {
    /// Current-format session header
    SessionMeta {
        id: String,
        cwd: String,
        timestamp: Option<DateTime<Utc>>,
    },
    /// Legacy-format header: top-level `id`, no `type`
    LegacyHeader {
        id: String,
        timestamp: Option<DateTime<Utc>>,
    },
    /// Per-turn settings; the model may change between turns
    TurnContext { model: String, cwd: String },
    /// Cumulative token snapshot
    TokenCount {
        usage: RolloutTokenUsage,
        timestamp: Option<DateTime<Utc>>,
    },
    UserMessage { timestamp: Option<DateTime<Utc>> },
    AgentMessage { timestamp: Option<DateTime<Utc>> },
    /// Any other event; only its timestamp matters
    Event { timestamp: Option<DateTime<Utc>> },
    ResponseItem { role: String },
    LegacyMessage { role: String },
    Ignored,
}

fn str_field<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or_default()
}

fn timestamp_field(value: &Value) -> Option<DateTime<Utc>> {
    parse_timestamp(str_field(value, "timestamp"))
}

fn token_snapshot(info: &Value) -> Option<RolloutTokenUsage> {
    let usage: RolloutTokenUsage = serde_json::from_value(info.get("total_token_usage")?.clone()).ok()?;
    (!usage.is_zero()).then_some(usage)
}

/// Classify a decoded line. The first matching rule wins.
pub fn classify(line: &Value) -> RolloutLine {
    let kind = str_field(line, "type");
    let payload = line.get("payload").unwrap_or(&Value::Null);

    if kind == "session_meta" {
        return RolloutLine::SessionMeta {
            id: str_field(payload, "id").to_string(),
            cwd: str_field(payload, "cwd").to_string(),
            timestamp: timestamp_field(payload).or_else(|| timestamp_field(line)),
        };
    }

    let id = str_field(line, "id");
    if !id.is_empty() && kind.is_empty() {
        return RolloutLine::LegacyHeader {
            id: id.to_string(),
            timestamp: timestamp_field(line),
        };
    }

    match kind {
        "turn_context" => RolloutLine::TurnContext {
            model: str_field(payload, "model").to_string(),
            cwd: str_field(payload, "cwd").to_string(),
        },
        "event_msg" => {
            let timestamp = timestamp_field(line);
            match str_field(payload, "type") {
                "token_count" => match payload.get("info").and_then(token_snapshot) {
                    Some(usage) => RolloutLine::TokenCount { usage, timestamp },
                    None => RolloutLine::Event { timestamp },
                },
                "user_message" => RolloutLine::UserMessage { timestamp },
                "agent_message" => RolloutLine::AgentMessage { timestamp },
                _ => RolloutLine::Event { timestamp },
            }
        }
        "response_item" => match str_field(payload, "role") {
            "" => RolloutLine::Ignored,
            role => RolloutLine::ResponseItem {
                role: role.to_string(),
            },
        },
        "message" => match str_field(line, "role") {
            "" => RolloutLine::Ignored,
            role => RolloutLine::LegacyMessage {
                role: role.to_string(),
            },
        },
        _ => RolloutLine::Ignored,
    }
}

/// A parsed rollout file.
#[derive(Debug, Clone, PartialEq)]
pub struct RolloutSession {
    /// Session with usage recorded under its final model
    pub session: Session,

    /// Last cumulative token snapshot
    pub usage: RolloutTokenUsage,

    /// Day the rollout belongs to: the date directory it was found in,
    /// otherwise the session start date
    pub capture_date: Option<NaiveDate>,
}

#[derive(Debug, Default)]
struct RolloutState {
    session: Session,
    model: Option<String>,
    usage: RolloutTokenUsage,
}

impl RolloutState {
    fn count_role(&mut self, role: &str) {
        match role {
            "user" => {
                self.session.user_messages += 1;
                self.session.message_count += 1;
            }
            "assistant" => self.session.message_count += 1,
            _ => {}
        }
    }

    fn observe(&mut self, timestamp: Option<DateTime<Utc>>) {
        if let Some(ts) = timestamp {
            self.session.observe_timestamp(ts);
        }
    }

    fn set_project(&mut self, cwd: &str) {
        if !cwd.is_empty() {
            self.session.project = project_name(cwd);
        }
    }

    fn apply(&mut self, line: RolloutLine) {
        match line {
            RolloutLine::SessionMeta { id, cwd, timestamp } => {
                if !id.is_empty() {
                    self.session.id = id;
                }
                self.set_project(&cwd);
                self.observe(timestamp);
            }
            RolloutLine::LegacyHeader { id, timestamp } => {
                self.session.id = id;
                self.observe(timestamp);
            }
            RolloutLine::TurnContext { model, cwd } => {
                if !model.is_empty() {
                    self.model = Some(model);
                }
                self.set_project(&cwd);
            }
            RolloutLine::TokenCount { usage, timestamp } => {
                self.usage = usage;
                self.observe(timestamp);
            }
            RolloutLine::UserMessage { timestamp } => {
                self.count_role("user");
                self.observe(timestamp);
            }
            RolloutLine::AgentMessage { timestamp } => {
                self.count_role("assistant");
                self.observe(timestamp);
            }
            RolloutLine::Event { timestamp } => self.observe(timestamp),
            RolloutLine::ResponseItem { role } | RolloutLine::LegacyMessage { role } => {
                self.count_role(&role)
            }
            RolloutLine::Ignored => {}
        }
    }

    fn finish(mut self, path_date: Option<NaiveDate>) -> RolloutSession {
        let model = self.model.unwrap_or_else(|| UNKNOWN_MODEL.to_string());
        self.session.record_usage(&model, self.usage.token_usage());
        let capture_date = path_date.or_else(|| self.session.start_date());
        RolloutSession {
            session: self.session,
            usage: self.usage,
            capture_date,
        }
    }
}

/// Parse one rollout from any line source.
pub fn parse_rollout_reader<R: BufRead>(
    reader: R,
    path_date: Option<NaiveDate>,
) -> Result<RolloutSession> {
    let mut state = RolloutState::default();

    for (index, line) in reader.split(b'\n').enumerate() {
        let line = line?;
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        match serde_json::from_slice::<Value>(&line) {
            Ok(value) => state.apply(classify(&value)),
            Err(e) => trace!(line = index + 1, error = %e, "Skipping undecodable rollout line"),
        }
    }

    Ok(state.finish(path_date))
}

/// Parse a single rollout file.
pub fn parse_rollout_file(path: &Path) -> Result<RolloutSession> {
    let file = File::open(path)?;
    parse_rollout_reader(BufReader::new(file), date_from_path(path))
}

/// Date encoded by the `YYYY/MM/DD` directories directly above `path`.
pub fn date_from_path(path: &Path) -> Option<NaiveDate> {
    let dirs: Vec<&str> = path
        .parent()?
        .components()
        .rev()
        .take(3)
        .map(|c| match c {
            Component::Normal(s) => s.to_str().unwrap_or_default(),
            _ => "",
        })
        .collect();
    let [day, month, year] = dirs[..] else {
        return None;
    };
    let all_digits = |s: &str, len: usize| s.len() == len && s.bytes().all(|b| b.is_ascii_digit());
    if !(all_digits(year, 4) && all_digits(month, 2) && all_digits(day, 2)) {
        return None;
    }
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}

/// Parse every `*.jsonl` rollout under `sessions_dir`, recursively.
///
/// Unreadable entries and files are skipped. Results are ordered by path.
pub fn load_rollouts(sessions_dir: &Path) -> Result<Vec<RolloutSession>> {
    if !sessions_dir.is_dir() {
        return Err(UsageError::SourceUnavailable {
            path: sessions_dir.to_path_buf(),
        });
    }

    let mut rollouts = Vec::new();
    let walker = WalkDir::new(sessions_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "jsonl"));

    for entry in walker {
        match parse_rollout_file(entry.path()) {
            Ok(rollout) => rollouts.push(rollout),
            Err(e) => warn!(file = %entry.path().display(), error = %e, "Failed to parse rollout"),
        }
    }

    debug!(dir = %sessions_dir.display(), count = rollouts.len(), "Loaded rollouts");
    Ok(rollouts)
}
