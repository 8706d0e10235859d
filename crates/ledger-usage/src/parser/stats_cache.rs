//! Parser for the pre-aggregated Claude Code stats cache
//! (`~/.claude/stats-cache.json`).

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, UsageError};
use crate::models::TokenUsage;

/// Top-level stats cache document. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StatsCache {
    pub version: u32,
    pub last_computed_date: String,
    pub daily_activity: Vec<DailyActivity>,
    pub daily_model_tokens: Vec<DailyModelTokens>,
    pub model_usage: BTreeMap<String, ModelUsageEntry>,
    pub total_sessions: u64,
    pub total_messages: u64,
    pub longest_session: Option<LongestSession>,
    pub first_session_date: String,
    pub hour_counts: BTreeMap<String, u64>,
}

impl StatsCache {
    /// Cumulative per-model usage as token counts, keyed by raw model name.
    pub fn model_token_usage(&self) -> BTreeMap<String, TokenUsage> {
        self.model_usage
            .iter()
            .map(|(model, entry)| (model.clone(), entry.usage()))
            .collect()
    }
}

/// Activity counters for one day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DailyActivity {
    pub date: String,
    pub message_count: u64,
    pub session_count: u64,
    pub tool_call_count: u64,
}

/// Per-model token totals for one day, without an input/output split.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DailyModelTokens {
    pub date: String,
    pub tokens_by_model: BTreeMap<String, u64>,
}

/// Cumulative usage for one model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ModelUsageEntry {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_read_input_tokens: u64,
    pub cache_creation_input_tokens: u64,
}

impl ModelUsageEntry {
    pub fn usage(&self) -> TokenUsage {
        TokenUsage::new(self.input_tokens, self.output_tokens)
            .with_cache(self.cache_read_input_tokens, self.cache_creation_input_tokens)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LongestSession {
    pub session_id: String,
    pub duration: u64,
    pub message_count: u64,
    pub timestamp: String,
}

/// Read and parse the stats cache.
pub fn parse_stats_cache(path: &Path) -> Result<StatsCache> {
    if !path.exists() {
        return Err(UsageError::SourceUnavailable {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path)?;
    let cache = parse_stats_cache_str(&contents)?;
    debug!(
        file = %path.display(),
        days = cache.daily_activity.len(),
        models = cache.model_usage.len(),
        "Parsed stats cache"
    );
    Ok(cache)
}

/// Parse stats cache JSON text.
pub fn parse_stats_cache_str(contents: &str) -> Result<StatsCache> {
    Ok(serde_json::from_str(contents)?)
}
