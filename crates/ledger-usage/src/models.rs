//! Data models for normalized usage records.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

use crate::pricing;

/// Token counts for one message or any aggregate of messages.
///
/// Addition is the only way counts change, so folding more records in never
/// lowers a total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Prompt tokens billed at the input rate
    pub input_tokens: u64,

    /// Generated tokens billed at the output rate
    pub output_tokens: u64,

    /// Tokens served from the prompt cache
    pub cache_read: u64,

    /// Tokens written into the prompt cache
    pub cache_write: u64,
}

impl TokenUsage {
    /// Create usage with input/output counts and no cache traffic.
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
            cache_read: 0,
            cache_write: 0,
        }
    }

    /// Set cache tokens.
    pub fn with_cache(mut self, read: u64, write: u64) -> Self {
        self.cache_read = read;
        self.cache_write = write;
        self
    }

    /// Total tokens (input + output + cache).
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens + self.cache_read + self.cache_write
    }

    pub fn is_zero(&self) -> bool {
        self.total() == 0
    }
}

impl Add for TokenUsage {
    type Output = TokenUsage;

    fn add(mut self, rhs: TokenUsage) -> TokenUsage {
        self += rhs;
        self
    }
}

impl AddAssign for TokenUsage {
    fn add_assign(&mut self, rhs: TokenUsage) {
        self.input_tokens += rhs.input_tokens;
        self.output_tokens += rhs.output_tokens;
        self.cache_read += rhs.cache_read;
        self.cache_write += rhs.cache_write;
    }
}

impl Sum for TokenUsage {
    fn sum<I: Iterator<Item = TokenUsage>>(iter: I) -> Self {
        iter.fold(TokenUsage::default(), Add::add)
    }
}

impl<'a> Sum<&'a TokenUsage> for TokenUsage {
    fn sum<I: Iterator<Item = &'a TokenUsage>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

/// One continuous interaction captured by a source.
///
/// Built once per parsed file or row and not modified after parsing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Source-provided session identifier (empty if none was found)
    pub id: String,

    /// Human label derived from a path or a stored title
    pub project: String,

    /// Earliest timestamp seen (`None` when the source had none)
    pub start_time: Option<DateTime<Utc>>,

    /// Latest timestamp seen
    pub end_time: Option<DateTime<Utc>>,

    /// Billable / counted messages
    pub message_count: u64,

    /// Messages sent by the user
    pub user_messages: u64,

    /// Session-level token total
    pub token_usage: TokenUsage,

    /// Token totals per model within this session
    pub models_used: BTreeMap<String, TokenUsage>,

    /// Last model observed, for sources that label a session with one model
    pub model: Option<String>,
}

impl Session {
    /// Create an empty session.
    pub fn new(id: impl Into<String>, project: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            project: project.into(),
            ..Self::default()
        }
    }

    /// Widen the start/end window to include `ts`.
    pub fn observe_timestamp(&mut self, ts: DateTime<Utc>) {
        if self.start_time.is_none_or(|start| ts < start) {
            self.start_time = Some(ts);
        }
        if self.end_time.is_none_or(|end| ts > end) {
            self.end_time = Some(ts);
        }
    }

    /// Add usage for `model` to both the session total and the per-model map.
    pub fn record_usage(&mut self, model: &str, usage: TokenUsage) {
        self.token_usage += usage;
        *self.models_used.entry(model.to_string()).or_default() += usage;
        self.model = Some(model.to_string());
    }

    /// Total tokens across all models.
    pub fn total_tokens(&self) -> u64 {
        self.token_usage.total()
    }

    /// Cost of the session, priced per model rather than at a blended rate.
    pub fn cost(&self) -> f64 {
        self.models_used
            .iter()
            .map(|(model, usage)| pricing::calculate_cost(model, usage))
            .sum()
    }

    /// Calendar date the session started on.
    pub fn start_date(&self) -> Option<NaiveDate> {
        self.start_time.map(|t| t.date_naive())
    }
}

/// Aggregated stats for one calendar day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyStats {
    /// Date as YYYY-MM-DD
    pub date: String,
    pub messages: u64,
    pub sessions: u64,
    pub tool_calls: u64,
    pub total_tokens: u64,
    pub tokens_by_model: BTreeMap<String, u64>,

    /// Estimated cost in USD
    pub cost: f64,
}

/// Aggregated stats for a labelled run of days.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodSummary {
    pub label: String,

    /// Number of days folded in
    pub day_count: usize,
    pub messages: u64,
    pub sessions: u64,
    pub tool_calls: u64,
    pub total_tokens: u64,
    pub cost: f64,
}

/// The four standard periods.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodSummaries {
    pub today: PeriodSummary,
    pub this_week: PeriodSummary,
    pub this_month: PeriodSummary,
    pub all_time: PeriodSummary,
}

/// Spending rate derived from recent days.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BurnRate {
    /// Average cost per active day over the last week
    pub daily_average: f64,

    /// `daily_average * 30`
    pub projected_monthly: f64,

    /// Percent change of this week's cost versus the week before
    pub trend_vs_prior_week_percent: f64,
}

/// The assistants whose logs are understood.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    ClaudeCode,
    Codex,
    Cursor,
    Gemini,
}

impl SourceKind {
    /// Every source, in display order.
    pub const ALL: [SourceKind; 4] = [
        SourceKind::ClaudeCode,
        SourceKind::Cursor,
        SourceKind::Gemini,
        SourceKind::Codex,
    ];

    /// Human-readable name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::ClaudeCode => "Claude Code",
            Self::Codex => "Codex",
            Self::Cursor => "Cursor",
            Self::Gemini => "Gemini",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// One calendar day of one source, or of all sources after merging.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyUsage {
    /// Date as YYYY-MM-DD
    pub date: String,

    /// `None` when no contributing source tracks cost
    pub cost: Option<f64>,
    pub tokens: u64,
    pub messages: u64,
    pub sessions: u64,

    /// Code generations (relational-store sources)
    pub generations: u64,
}

impl DailyUsage {
    pub fn new(date: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            ..Self::default()
        }
    }

    /// Fold another bucket for the same date into this one.
    pub fn absorb(&mut self, other: &DailyUsage) {
        self.cost = sum_costs(self.cost, other.cost);
        self.tokens += other.tokens;
        self.messages += other.messages;
        self.sessions += other.sessions;
        self.generations += other.generations;
    }
}

/// Per-model stats within one source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelBreakdown {
    /// Model name, or file extension for generation-count sources
    pub model: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_read: u64,
    pub cache_write: u64,
    pub cost: Option<f64>,
    pub generations: u64,
}

impl ModelBreakdown {
    /// Total tokens (input + output + cache).
    pub fn total_tokens(&self) -> u64 {
        self.input_tokens + self.output_tokens + self.cache_read + self.cache_write
    }

    pub fn usage(&self) -> TokenUsage {
        TokenUsage::new(self.input_tokens, self.output_tokens)
            .with_cache(self.cache_read, self.cache_write)
    }
}

/// A session as handed to the presentation layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub id: String,
    pub project: String,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub messages: u64,
    pub user_messages: u64,
    pub tokens: u64,
    pub cost: Option<f64>,
    pub model: Option<String>,
}

impl SessionInfo {
    /// Summarize a parsed session, pricing it per model.
    pub fn from_session(session: &Session) -> Self {
        Self {
            id: session.id.clone(),
            project: session.project.clone(),
            start_time: session.start_time,
            end_time: session.end_time,
            messages: session.message_count,
            user_messages: session.user_messages,
            tokens: session.total_tokens(),
            cost: Some(session.cost()),
            model: session.model.clone(),
        }
    }
}

/// Normalized and priced output of one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderData {
    pub source: SourceKind,

    /// Display name of the source
    pub name: String,

    /// `None` when the source has no cost data at all
    pub total_cost: Option<f64>,

    /// Per-day breakdown, sorted by date
    pub daily_usage: Vec<DailyUsage>,

    /// Per-model breakdown
    pub models: Vec<ModelBreakdown>,

    /// Tokens as the source counts them for display. Sources that report
    /// cached input inside `input_tokens` do not add it again.
    pub total_tokens: u64,

    pub sessions: Vec<SessionInfo>,

    /// Code generations (relational-store sources)
    pub generations: u64,

    pub first_seen: Option<DateTime<Utc>>,
    pub last_seen: Option<DateTime<Utc>>,

    /// Source-specific details
    pub metadata: BTreeMap<String, String>,
}

impl ProviderData {
    /// Empty data for a source.
    pub fn new(source: SourceKind) -> Self {
        Self {
            source,
            name: source.display_name().to_string(),
            total_cost: None,
            daily_usage: Vec::new(),
            models: Vec::new(),
            total_tokens: 0,
            sessions: Vec::new(),
            generations: 0,
            first_seen: None,
            last_seen: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Widen first/last seen to include `ts`.
    pub fn observe_timestamp(&mut self, ts: DateTime<Utc>) {
        if self.first_seen.is_none_or(|first| ts < first) {
            self.first_seen = Some(ts);
        }
        if self.last_seen.is_none_or(|last| ts > last) {
            self.last_seen = Some(ts);
        }
    }
}

/// A source whose load failed; the other sources are unaffected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadFailure {
    pub source: SourceKind,
    pub message: String,
}

/// Combined data from every source that loaded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregatedData {
    /// Per-source data, ordered by source kind
    pub providers: Vec<ProviderData>,

    /// `None` when no loaded source tracks cost
    pub total_cost: Option<f64>,

    /// Per-date sums across sources, sorted by date
    pub daily_usage: Vec<DailyUsage>,

    pub total_tokens: u64,
    pub total_sessions: u64,
    pub first_seen: Option<DateTime<Utc>>,
    pub last_seen: Option<DateTime<Utc>>,

    /// Sources that were present but failed to load
    pub failures: Vec<LoadFailure>,
}

/// Add two optional costs; absent stays absent only if both are absent.
pub fn sum_costs(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x + y),
        (Some(x), None) | (None, Some(x)) => Some(x),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_token_usage_total() {
        let usage = TokenUsage::new(100, 50).with_cache(200, 300);
        assert_eq!(usage.total(), 650); // 100 + 50 + 200 + 300
        assert!(!usage.is_zero());
        assert!(TokenUsage::default().is_zero());
    }

    #[test]
    fn test_token_usage_addition_identity() {
        let usage = TokenUsage::new(7, 3).with_cache(1, 2);
        assert_eq!(usage + TokenUsage::default(), usage);

        let summed: TokenUsage = [usage, usage, usage].iter().sum();
        assert_eq!(summed, TokenUsage::new(21, 9).with_cache(3, 6));
    }

    #[test]
    fn test_session_observe_timestamp() {
        let mut session = Session::new("s1", "proj");
        let t1 = Utc.with_ymd_and_hms(2026, 2, 1, 10, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2026, 2, 1, 9, 0, 0).unwrap();
        let t3 = Utc.with_ymd_and_hms(2026, 2, 1, 11, 0, 0).unwrap();

        session.observe_timestamp(t1);
        session.observe_timestamp(t2);
        session.observe_timestamp(t3);

        assert_eq!(session.start_time, Some(t2));
        assert_eq!(session.end_time, Some(t3));
        assert_eq!(
            session.start_date(),
            Some(NaiveDate::from_ymd_opt(2026, 2, 1).unwrap())
        );
    }

    #[test]
    fn test_session_record_usage_per_model() {
        let mut session = Session::new("s1", "proj");
        session.record_usage("claude-opus-4-6", TokenUsage::new(10, 5));
        session.record_usage("claude-sonnet-4-5", TokenUsage::new(1, 1));
        session.record_usage("claude-opus-4-6", TokenUsage::new(10, 5));

        assert_eq!(session.token_usage, TokenUsage::new(21, 11));
        assert_eq!(session.models_used["claude-opus-4-6"], TokenUsage::new(20, 10));
        assert_eq!(session.model.as_deref(), Some("claude-opus-4-6"));
    }

    #[test]
    fn test_sum_costs() {
        assert_eq!(sum_costs(None, None), None);
        assert_eq!(sum_costs(Some(1.5), None), Some(1.5));
        assert_eq!(sum_costs(None, Some(0.0)), Some(0.0));
        assert_eq!(sum_costs(Some(1.0), Some(2.0)), Some(3.0));
    }

    #[test]
    fn test_daily_usage_absorb() {
        let mut day = DailyUsage::new("2026-02-01");
        day.absorb(&DailyUsage {
            date: "2026-02-01".into(),
            cost: None,
            generations: 4,
            ..DailyUsage::default()
        });
        assert_eq!(day.cost, None);
        assert_eq!(day.generations, 4);

        day.absorb(&DailyUsage {
            date: "2026-02-01".into(),
            cost: Some(2.5),
            tokens: 100,
            messages: 3,
            sessions: 1,
            generations: 0,
        });
        assert_eq!(day.cost, Some(2.5));
        assert_eq!(day.tokens, 100);
        assert_eq!(day.sessions, 1);
    }

    #[test]
    fn test_source_kind_display() {
        assert_eq!(SourceKind::ClaudeCode.to_string(), "Claude Code");
        assert_eq!(
            serde_json::to_string(&SourceKind::ClaudeCode).unwrap(),
            "\"claude_code\""
        );
    }
}
