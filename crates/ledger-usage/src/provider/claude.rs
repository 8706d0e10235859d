//! Claude Code: stats cache for totals and daily history, session logs for
//! the per-session list.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::{debug, warn};

use super::UsageProvider;
use crate::aggregate::{aggregate_daily, compute_summaries};
use crate::error::Result;
use crate::models::{DailyUsage, ModelBreakdown, PeriodSummaries, ProviderData, SessionInfo, SourceKind};
use crate::parser::stats_cache::{StatsCache, parse_stats_cache};
use crate::parser::session_log::load_all_sessions;
use crate::parser::{parse_date, parse_timestamp};
use crate::pricing::{calculate_cost, normalize_model_name, total_cost_from_model_usage};

pub struct ClaudeProvider {
    stats_cache: PathBuf,
    projects_dir: PathBuf,
}

impl ClaudeProvider {
    pub fn new(stats_cache: &Path, projects_dir: &Path) -> Self {
        Self {
            stats_cache: stats_cache.to_path_buf(),
            projects_dir: projects_dir.to_path_buf(),
        }
    }

    async fn read_cache(&self) -> Result<StatsCache> {
        let path = self.stats_cache.clone();
        tokio::task::spawn_blocking(move || parse_stats_cache(&path)).await?
    }

    /// Today / week / month / all-time summaries relative to `today`.
    pub async fn summaries(&self, today: NaiveDate) -> Result<PeriodSummaries> {
        let cache = self.read_cache().await?;
        Ok(compute_summaries(&cache, today))
    }
}

/// Totals, model breakdown and daily history from the stats cache.
pub fn provider_data_from_cache(cache: &StatsCache) -> ProviderData {
    let mut data = ProviderData::new(SourceKind::ClaudeCode);
    data.total_cost = Some(total_cost_from_model_usage(&cache.model_token_usage()));

    // Dated and undated names of one model share a canonical key
    let mut models: BTreeMap<String, ModelBreakdown> = BTreeMap::new();
    for (name, entry) in &cache.model_usage {
        let usage = entry.usage();
        let key = normalize_model_name(name);
        let breakdown = models.entry(key.clone()).or_insert_with(|| ModelBreakdown {
            model: key,
            cost: Some(0.0),
            ..ModelBreakdown::default()
        });
        breakdown.input_tokens += usage.input_tokens;
        breakdown.output_tokens += usage.output_tokens;
        breakdown.cache_read += usage.cache_read;
        breakdown.cache_write += usage.cache_write;
        breakdown.cost = breakdown.cost.map(|c| c + calculate_cost(name, &usage));
    }
    data.models = models.into_values().collect();
    data.total_tokens = data.models.iter().map(ModelBreakdown::total_tokens).sum();
    data.models.sort_by(|a, b| {
        b.cost
            .unwrap_or(0.0)
            .total_cmp(&a.cost.unwrap_or(0.0))
            .then_with(|| a.model.cmp(&b.model))
    });

    data.daily_usage = aggregate_daily(cache)
        .into_iter()
        .map(|day| DailyUsage {
            date: day.date,
            cost: Some(day.cost),
            tokens: day.total_tokens,
            messages: day.messages,
            sessions: day.sessions,
            generations: 0,
        })
        .collect();
    data.daily_usage.sort_by(|a, b| a.date.cmp(&b.date));

    data.first_seen = parse_timestamp(&cache.first_session_date);
    data.last_seen = cache
        .daily_activity
        .iter()
        .filter_map(|day| parse_date(&day.date))
        .max()
        .map(|date| date.and_time(chrono::NaiveTime::MIN).and_utc());

    data.metadata
        .insert("total_sessions".into(), cache.total_sessions.to_string());
    data.metadata
        .insert("total_messages".into(), cache.total_messages.to_string());
    if !cache.last_computed_date.is_empty() {
        data.metadata
            .insert("last_computed".into(), cache.last_computed_date.clone());
    }
    data
}

#[async_trait]
impl UsageProvider for ClaudeProvider {
    fn kind(&self) -> SourceKind {
        SourceKind::ClaudeCode
    }

    fn available(&self) -> bool {
        self.stats_cache.is_file()
    }

    async fn load(&self) -> Result<ProviderData> {
        let cache = self.read_cache().await?;
        let mut data = provider_data_from_cache(&cache);

        match load_all_sessions(&self.projects_dir).await {
            Ok(sessions) => {
                data.sessions = sessions.iter().rev().map(SessionInfo::from_session).collect();
            }
            Err(e) if e.is_source_missing() => {
                debug!(dir = %self.projects_dir.display(), "No session logs");
            }
            Err(e) => {
                warn!(dir = %self.projects_dir.display(), error = %e, "Failed to load session logs");
            }
        }

        Ok(data)
    }
}
