//! Parser for Gemini CLI session documents
//! (`~/.gemini/tmp/<project-hash>/chats/session-*.json`).
//!
//! Each file is a single JSON document with the whole message history
//! embedded. Only `gemini` responses carry token counts.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::parse_timestamp;
use crate::error::{Result, UsageError};
use crate::models::{Session, TokenUsage};

/// Model assumed for responses that do not name one.
pub const DEFAULT_MODEL: &str = "gemini-2.5-pro";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionDocument {
    pub session_id: String,
    pub project_hash: String,
    pub start_time: String,
    pub last_updated: String,
    pub messages: Vec<DocumentMessage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DocumentMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub tokens: Option<MessageTokens>,
    pub model: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct MessageTokens {
    pub input: u64,
    pub output: u64,
    pub cached: u64,
    pub thoughts: u64,
    pub tool: u64,
    pub total: u64,
}

/// A session built from one document.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSession {
    pub session: Session,

    /// Number of priced responses per model
    pub responses_by_model: BTreeMap<String, u64>,
}

impl DocumentSession {
    /// Fold a parsed document into a session.
    pub fn from_document(doc: SessionDocument) -> Self {
        let mut session = Session::new(doc.session_id, doc.project_hash);
        session.start_time = parse_timestamp(&doc.start_time);
        session.end_time = parse_timestamp(&doc.last_updated).or(session.start_time);

        let mut responses_by_model = BTreeMap::new();
        for message in doc.messages {
            session.message_count += 1;
            match message.kind.as_str() {
                "user" => session.user_messages += 1,
                "gemini" => {
                    let Some(tokens) = message.tokens else {
                        continue;
                    };
                    let model = message
                        .model
                        .filter(|m| !m.is_empty())
                        .unwrap_or_else(|| DEFAULT_MODEL.to_string());
                    session.record_usage(
                        &model,
                        TokenUsage::new(tokens.input, tokens.output).with_cache(tokens.cached, 0),
                    );
                    *responses_by_model.entry(model).or_insert(0) += 1;
                }
                _ => {}
            }
        }

        Self {
            session,
            responses_by_model,
        }
    }
}

/// Parse a single session document.
pub fn parse_session_document(path: &Path) -> Result<DocumentSession> {
    let contents = std::fs::read_to_string(path)?;
    let doc: SessionDocument = serde_json::from_str(&contents)?;
    Ok(DocumentSession::from_document(doc))
}

fn is_session_file(entry: &walkdir::DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    let in_chats = entry
        .path()
        .parent()
        .and_then(Path::file_name)
        .is_some_and(|dir| dir == "chats");
    entry.file_type().is_file() && in_chats && name.starts_with("session-") && name.ends_with(".json")
}

/// True when any `tmp/*/chats` directory exists under `config_dir`.
pub fn has_chat_dirs(config_dir: &Path) -> bool {
    let Ok(entries) = std::fs::read_dir(config_dir.join("tmp")) else {
        return false;
    };
    entries
        .filter_map(|entry| entry.ok())
        .any(|entry| entry.path().join("chats").is_dir())
}

/// Parse every session document under `<config_dir>/tmp`.
///
/// Documents that fail to read or decode are skipped. Results are ordered by
/// path.
pub fn load_session_documents(config_dir: &Path) -> Result<Vec<DocumentSession>> {
    let tmp_dir = config_dir.join("tmp");
    if !tmp_dir.is_dir() {
        return Err(UsageError::SourceUnavailable { path: tmp_dir });
    }

    let mut sessions = Vec::new();
    let files = WalkDir::new(&tmp_dir)
        .min_depth(3)
        .max_depth(3)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(is_session_file);

    for entry in files {
        match parse_session_document(entry.path()) {
            Ok(session) => sessions.push(session),
            Err(e) => warn!(file = %entry.path().display(), error = %e, "Failed to parse session document"),
        }
    }

    debug!(dir = %tmp_dir.display(), count = sessions.len(), "Loaded session documents");
    Ok(sessions)
}
