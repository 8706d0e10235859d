//! Parser for Claude Code session logs
//! (`~/.claude/projects/<encoded-dir>/<session>.jsonl`).
//!
//! Each file is one session, one JSON object per line, append-only. Lines that
//! do not decode are skipped.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use futures_util::future::join_all;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::Semaphore;
use tracing::{debug, trace, warn};

use super::parse_timestamp;
use crate::error::{Result, UsageError};
use crate::models::{Session, TokenUsage};

/// Maximum number of session files parsed at once.
pub const MAX_CONCURRENT_FILES: usize = 8;

// Every field is optional and null reads as absent.
#[derive(Debug, Deserialize)]
struct LogLine {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(rename = "sessionId", default)]
    session_id: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    message: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct LogMessage {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    usage: Option<LogUsage>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LogUsage {
    input_tokens: Option<u64>,
    output_tokens: Option<u64>,
    cache_read_input_tokens: Option<u64>,
    cache_creation_input_tokens: Option<u64>,
}

impl LogUsage {
    fn token_usage(&self) -> TokenUsage {
        TokenUsage::new(
            self.input_tokens.unwrap_or(0),
            self.output_tokens.unwrap_or(0),
        )
        .with_cache(
            self.cache_read_input_tokens.unwrap_or(0),
            self.cache_creation_input_tokens.unwrap_or(0),
        )
    }
}

/// Turn an encoded project directory name back into the path it names.
///
/// `-Users-me-proj` becomes `/Users/me/proj`. Names without the leading dash
/// are returned unchanged.
pub fn decode_project_path(dir_name: &str) -> String {
    match dir_name.strip_prefix('-') {
        Some(rest) => format!("/{}", rest.replace('-', "/")),
        None => dir_name.to_string(),
    }
}

/// Last non-empty path component, or the input if there is none.
pub fn project_name(decoded_path: &str) -> String {
    decoded_path
        .rsplit('/')
        .find(|part| !part.is_empty())
        .unwrap_or(decoded_path)
        .to_string()
}

/// Parse one session from any line source.
pub fn parse_session_reader<R: BufRead>(reader: R, project: &str) -> Result<Session> {
    let mut session = Session::new("", project);

    for (index, line) in reader.split(b'\n').enumerate() {
        let line = line?;
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        let entry: LogLine = match serde_json::from_slice(&line) {
            Ok(entry) => entry,
            Err(e) => {
                trace!(line = index + 1, error = %e, "Skipping undecodable session line");
                continue;
            }
        };

        if session.id.is_empty()
            && let Some(id) = entry.session_id.filter(|id| !id.is_empty())
        {
            session.id = id;
        }

        if let Some(ts) = entry.timestamp.as_deref().and_then(parse_timestamp) {
            session.observe_timestamp(ts);
        }

        match entry.kind.as_deref().unwrap_or_default() {
            "user" => session.user_messages += 1,
            "assistant" => {
                let message: LogMessage = entry
                    .message
                    .and_then(|v| serde_json::from_value(v).ok())
                    .unwrap_or_default();
                if let Some(usage) = message.usage
                    && let Some(model) = message.model.filter(|m| !m.is_empty())
                {
                    session.message_count += 1;
                    session.record_usage(&model, usage.token_usage());
                }
            }
            _ => {}
        }
    }

    Ok(session)
}

/// Parse a single session file.
pub fn parse_session_file(path: &Path, project: &str) -> Result<Session> {
    let file = File::open(path)?;
    parse_session_reader(BufReader::new(file), project)
}

/// Every `*.jsonl` file one level below `projects_dir`, paired with the
/// project name decoded from its directory.
fn collect_session_files(projects_dir: &Path) -> Result<Vec<(PathBuf, String)>> {
    if !projects_dir.is_dir() {
        return Err(UsageError::SourceUnavailable {
            path: projects_dir.to_path_buf(),
        });
    }

    let mut project_dirs: Vec<PathBuf> = std::fs::read_dir(projects_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    project_dirs.sort();

    let mut files = Vec::new();
    for dir in project_dirs {
        let Some(dir_name) = dir.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let project = project_name(&decode_project_path(dir_name));

        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Cannot read project directory");
                continue;
            }
        };
        let mut session_files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "jsonl"))
            .collect();
        session_files.sort();

        files.extend(session_files.into_iter().map(|f| (f, project.clone())));
    }
    Ok(files)
}

/// Parse every session file under `projects_dir` concurrently.
///
/// One blocking task per file, at most [`MAX_CONCURRENT_FILES`] running at a
/// time. Files that fail to read and sessions without an id are dropped.
/// Results are ordered by start time, then id.
pub async fn load_all_sessions(projects_dir: &Path) -> Result<Vec<Session>> {
    let files = collect_session_files(projects_dir)?;
    let file_count = files.len();

    let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_FILES));
    let sessions = Arc::new(Mutex::new(Vec::with_capacity(file_count)));
    let mut handles = Vec::with_capacity(file_count);

    for (file, project) in files {
        let permit = Arc::clone(&semaphore)
            .acquire_owned()
            .await
            .map_err(|e| UsageError::Task(e.to_string()))?;
        let sessions = Arc::clone(&sessions);

        handles.push(tokio::task::spawn_blocking(move || {
            let _permit = permit;
            match parse_session_file(&file, &project) {
                Ok(session) if session.id.is_empty() => {
                    trace!(file = %file.display(), "Session file has no session id");
                }
                Ok(session) => {
                    sessions
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .push(session);
                }
                Err(e) => {
                    warn!(file = %file.display(), error = %e, "Failed to parse session file");
                }
            }
        }));
    }

    for result in join_all(handles).await {
        result?;
    }

    let mut sessions = std::mem::take(&mut *sessions.lock().unwrap_or_else(PoisonError::into_inner));
    sessions.sort_by(|a, b| a.start_time.cmp(&b.start_time).then_with(|| a.id.cmp(&b.id)));

    debug!(
        dir = %projects_dir.display(),
        files = file_count,
        count = sessions.len(),
        "Loaded session logs"
    );
    Ok(sessions)
}
