//! Time bucketing and cross-source merging.
//!
//! Everything here is a pure fold over already-parsed records. Functions that
//! depend on the current date take it as a parameter.

use std::collections::BTreeMap;

use chrono::{DateTime, Days, Months, NaiveDate, Utc};

use crate::models::{
    AggregatedData, BurnRate, DailyStats, DailyUsage, ModelBreakdown, PeriodSummaries,
    PeriodSummary, ProviderData, Session, SessionInfo, SourceKind, sum_costs,
};
use crate::parser::stats_cache::StatsCache;
use crate::pricing::{calculate_cost, calculate_output_cost, total_cost_from_model_usage};

/// A day-keyed record with a cost, for rate calculations.
pub trait DatedCost {
    /// Date as YYYY-MM-DD
    fn date(&self) -> &str;
    fn cost(&self) -> f64;
}

impl DatedCost for DailyStats {
    fn date(&self) -> &str {
        &self.date
    }

    fn cost(&self) -> f64 {
        self.cost
    }
}

impl DatedCost for DailyUsage {
    fn date(&self) -> &str {
        &self.date
    }

    fn cost(&self) -> f64 {
        self.cost.unwrap_or(0.0)
    }
}

fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// One `DailyStats` per activity day, joined with that day's model tokens.
///
/// The cache only has undivided per-model totals per day, so day cost prices
/// them all at the output rate. Days with tokens but no activity entry are
/// dropped.
pub fn aggregate_daily(cache: &StatsCache) -> Vec<DailyStats> {
    let tokens_by_date: BTreeMap<&str, &BTreeMap<String, u64>> = cache
        .daily_model_tokens
        .iter()
        .map(|day| (day.date.as_str(), &day.tokens_by_model))
        .collect();

    cache
        .daily_activity
        .iter()
        .map(|activity| {
            let tokens_by_model = tokens_by_date
                .get(activity.date.as_str())
                .map(|m| (*m).clone())
                .unwrap_or_default();
            let total_tokens = tokens_by_model.values().sum();
            let cost = tokens_by_model
                .iter()
                .map(|(model, tokens)| calculate_output_cost(model, *tokens))
                .sum();

            DailyStats {
                date: activity.date.clone(),
                messages: activity.message_count,
                sessions: activity.session_count,
                tool_calls: activity.tool_call_count,
                total_tokens,
                tokens_by_model,
                cost,
            }
        })
        .collect()
}

/// Fold days into a labelled summary.
pub fn period_summary(label: &str, days: &[DailyStats]) -> PeriodSummary {
    days.iter().fold(
        PeriodSummary {
            label: label.to_string(),
            day_count: days.len(),
            ..PeriodSummary::default()
        },
        |mut summary, day| {
            summary.messages += day.messages;
            summary.sessions += day.sessions;
            summary.tool_calls += day.tool_calls;
            summary.total_tokens += day.total_tokens;
            summary.cost += day.cost;
            summary
        },
    )
}

/// Days on or after `cutoff` (YYYY-MM-DD, compared as strings).
pub fn filter_days_since<D: DatedCost + Clone>(days: &[D], cutoff: &str) -> Vec<D> {
    days.iter().filter(|d| d.date() >= cutoff).cloned().collect()
}

/// Today, this week, this month and all-time summaries of a stats cache.
///
/// All-time cost comes from the cumulative per-model table, which has the
/// input/output/cache split, rather than from the day estimates.
pub fn compute_summaries(cache: &StatsCache, today: NaiveDate) -> PeriodSummaries {
    let days = aggregate_daily(cache);
    let today_key = date_key(today);
    let week_ago = date_key(today - Days::new(7));
    let month_ago = date_key(today.checked_sub_months(Months::new(1)).unwrap_or(today));

    let mut all_time = period_summary("All Time", &days);
    all_time.cost = total_cost_from_model_usage(&cache.model_token_usage());

    PeriodSummaries {
        today: period_summary("Today", &filter_days_since(&days, &today_key)),
        this_week: period_summary("This Week", &filter_days_since(&days, &week_ago)),
        this_month: period_summary("This Month", &filter_days_since(&days, &month_ago)),
        all_time,
    }
}

/// Average daily spend over the last week, projected to 30 days, with the
/// change against the week before.
pub fn compute_burn_rate<D: DatedCost>(days: &[D], today: NaiveDate) -> BurnRate {
    if days.is_empty() {
        return BurnRate::default();
    }

    let week_ago = date_key(today - Days::new(7));
    let two_weeks_ago = date_key(today - Days::new(14));

    let mut this_week_cost = 0.0;
    let mut this_week_days = 0usize;
    let mut prior_week_cost = 0.0;
    for day in days {
        let date = day.date();
        if date >= week_ago.as_str() {
            this_week_cost += day.cost();
            this_week_days += 1;
        } else if date >= two_weeks_ago.as_str() {
            prior_week_cost += day.cost();
        }
    }

    let daily_average = this_week_cost / this_week_days.max(1) as f64;
    let trend_vs_prior_week_percent = if prior_week_cost > 0.0 {
        (this_week_cost - prior_week_cost) / prior_week_cost * 100.0
    } else {
        0.0
    };

    BurnRate {
        daily_average,
        projected_monthly: daily_average * 30.0,
        trend_vs_prior_week_percent,
    }
}

fn earliest(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.min(y)),
        (x, None) | (None, x) => x,
    }
}

fn latest(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.max(y)),
        (x, None) | (None, x) => x,
    }
}

/// Combine per-source data into one aggregate.
///
/// Providers are ordered by source kind before folding, so the result does
/// not depend on the order they finished loading in.
pub fn merge(mut providers: Vec<ProviderData>) -> AggregatedData {
    providers.sort_by(|a, b| a.source.cmp(&b.source).then_with(|| a.name.cmp(&b.name)));

    let mut daily: BTreeMap<String, DailyUsage> = BTreeMap::new();
    let mut aggregated = AggregatedData::default();

    for provider in &providers {
        aggregated.total_cost = sum_costs(aggregated.total_cost, provider.total_cost);
        aggregated.total_tokens += provider.total_tokens;
        aggregated.total_sessions += provider.sessions.len() as u64;
        aggregated.first_seen = earliest(aggregated.first_seen, provider.first_seen);
        aggregated.last_seen = latest(aggregated.last_seen, provider.last_seen);

        for day in &provider.daily_usage {
            daily
                .entry(day.date.clone())
                .or_insert_with(|| DailyUsage::new(day.date.clone()))
                .absorb(day);
        }
    }

    aggregated.daily_usage = daily.into_values().collect();
    aggregated.providers = providers;
    aggregated
}

/// Shared per-source accumulator: folds sessions into daily and per-model
/// buckets and collects session summaries.
#[derive(Debug, Default)]
pub struct UsageBuckets {
    days: BTreeMap<String, DailyUsage>,
    models: BTreeMap<String, ModelBreakdown>,
    sessions: Vec<SessionInfo>,
    total_cost: f64,
    total_tokens: u64,
    first_seen: Option<DateTime<Utc>>,
    last_seen: Option<DateTime<Utc>>,
}

impl UsageBuckets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a session, counting all of its tokens.
    pub fn add_session(&mut self, date: Option<NaiveDate>, session: &Session) {
        self.add_session_with_tokens(date, session, session.total_tokens());
    }

    /// Add a session with an explicit token count for display totals.
    ///
    /// Cost is always priced per model from `session.models_used`. A session
    /// with no `date` contributes to every total except the daily breakdown.
    pub fn add_session_with_tokens(
        &mut self,
        date: Option<NaiveDate>,
        session: &Session,
        tokens: u64,
    ) {
        let mut session_cost = 0.0;
        for (model, usage) in &session.models_used {
            let cost = calculate_cost(model, usage);
            session_cost += cost;

            let breakdown = self
                .models
                .entry(model.clone())
                .or_insert_with(|| ModelBreakdown {
                    model: model.clone(),
                    cost: Some(0.0),
                    ..ModelBreakdown::default()
                });
            breakdown.input_tokens += usage.input_tokens;
            breakdown.output_tokens += usage.output_tokens;
            breakdown.cache_read += usage.cache_read;
            breakdown.cache_write += usage.cache_write;
            breakdown.cost = sum_costs(breakdown.cost, Some(cost));
        }
        self.total_cost += session_cost;
        self.total_tokens += tokens;

        if let Some(date) = date {
            let key = date_key(date);
            let day = self
                .days
                .entry(key.clone())
                .or_insert_with(|| DailyUsage::new(key));
            day.cost = sum_costs(day.cost, Some(session_cost));
            day.tokens += tokens;
            day.messages += session.message_count;
            day.sessions += 1;
        }

        self.first_seen = earliest(self.first_seen, session.start_time);
        self.last_seen = latest(self.last_seen, session.end_time.or(session.start_time));

        let mut info = SessionInfo::from_session(session);
        info.tokens = tokens;
        info.cost = Some(session_cost);
        self.sessions.push(info);
    }

    /// Count generations (responses) attributed to a model.
    pub fn add_generations(&mut self, model: &str, count: u64) {
        self.models
            .entry(model.to_string())
            .or_insert_with(|| ModelBreakdown {
                model: model.to_string(),
                cost: Some(0.0),
                ..ModelBreakdown::default()
            })
            .generations += count;
    }

    /// Finish into provider data. Models are ordered by cost, highest first;
    /// sessions most recent first.
    pub fn into_provider_data(self, source: SourceKind) -> ProviderData {
        let mut models: Vec<ModelBreakdown> = self.models.into_values().collect();
        models.sort_by(|a, b| {
            b.cost
                .unwrap_or(0.0)
                .total_cmp(&a.cost.unwrap_or(0.0))
                .then_with(|| a.model.cmp(&b.model))
        });

        let mut sessions = self.sessions;
        sessions.sort_by(|a, b| b.start_time.cmp(&a.start_time).then_with(|| a.id.cmp(&b.id)));

        let mut data = ProviderData::new(source);
        data.total_cost = Some(self.total_cost);
        data.daily_usage = self.days.into_values().collect();
        data.models = models;
        data.total_tokens = self.total_tokens;
        data.sessions = sessions;
        data.first_seen = self.first_seen;
        data.last_seen = self.last_seen;
        data
    }
}
