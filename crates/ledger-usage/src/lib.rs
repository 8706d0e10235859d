//! # ledger-usage
//!
//! Normalization and aggregation engine for locally stored AI coding
//! assistant usage logs.
//!
//! Reads the on-disk records of Claude Code, Codex, Cursor and Gemini CLI,
//! converts them into one record model, prices token volumes and folds them
//! into daily, period and burn-rate summaries.
//!
//! ## Layers
//!
//! - [`pricing`]: static model pricing table
//! - [`models`]: the normalized record model
//! - [`parser`]: one parser per on-disk format
//! - [`aggregate`]: time bucketing and cross-source merge
//! - [`provider`]: `available()` / `load()` per source, plus [`load_all`]
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//! use ledger_usage::{SourcePaths, load_all, providers};
//!
//! # async fn example() {
//! let paths = SourcePaths::from_home(Path::new("/home/dev"));
//! let data = load_all(&providers(&paths)).await;
//! if let Some(cost) = data.total_cost {
//!     println!("API-equivalent spend: ${cost:.2}");
//! }
//! # }
//! ```

pub mod aggregate;
pub mod error;
pub mod models;
pub mod parser;
pub mod pricing;
pub mod provider;

pub use aggregate::{
    DatedCost, UsageBuckets, aggregate_daily, compute_burn_rate, compute_summaries,
    filter_days_since, merge, period_summary,
};
pub use error::{Result, UsageError};
pub use models::{
    AggregatedData, BurnRate, DailyStats, DailyUsage, LoadFailure, ModelBreakdown,
    PeriodSummaries, PeriodSummary, ProviderData, Session, SessionInfo, SourceKind, TokenUsage,
};
pub use pricing::{ModelPricing, calculate_cost, get_pricing, normalize_model_name};
pub use provider::{Provider, SourcePaths, UsageProvider, load_all, providers};
