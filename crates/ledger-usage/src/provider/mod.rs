//! Provider facade over the source parsers.
//!
//! Every supported assistant implements [`UsageProvider`]. The closed set is
//! wrapped in [`Provider`] so callers can hold all four in one collection
//! without boxing.
//!
//! ```no_run
//! use std::path::Path;
//! use ledger_usage::provider::{SourcePaths, load_all, providers};
//!
//! # async fn example() {
//! let paths = SourcePaths::from_home(Path::new("/home/dev"));
//! let data = load_all(&providers(&paths)).await;
//! println!("{} sources loaded", data.providers.len());
//! # }
//! ```

mod claude;
mod codex;
mod cursor;
mod gemini;

pub use claude::ClaudeProvider;
pub use codex::CodexProvider;
pub use cursor::CursorProvider;
pub use gemini::GeminiProvider;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures_util::future::join_all;
use tracing::{debug, info, warn};

use crate::aggregate::merge;
use crate::error::Result;
use crate::models::{AggregatedData, LoadFailure, ProviderData, SourceKind};

/// A source of usage data.
#[async_trait]
pub trait UsageProvider: Send + Sync {
    /// Which source this is.
    fn kind(&self) -> SourceKind;

    /// Display name.
    fn name(&self) -> &'static str {
        self.kind().display_name()
    }

    /// Whether the source's data exists on this machine.
    fn available(&self) -> bool;

    /// Read, normalize and price everything the source has recorded.
    async fn load(&self) -> Result<ProviderData>;
}

/// The closed set of supported sources.
pub enum Provider {
    Claude(ClaudeProvider),
    Codex(CodexProvider),
    Cursor(CursorProvider),
    Gemini(GeminiProvider),
}

impl Provider {
    fn inner(&self) -> &dyn UsageProvider {
        match self {
            Provider::Claude(p) => p,
            Provider::Codex(p) => p,
            Provider::Cursor(p) => p,
            Provider::Gemini(p) => p,
        }
    }
}

#[async_trait]
impl UsageProvider for Provider {
    fn kind(&self) -> SourceKind {
        self.inner().kind()
    }

    fn available(&self) -> bool {
        self.inner().available()
    }

    async fn load(&self) -> Result<ProviderData> {
        self.inner().load().await
    }
}

/// On-disk locations of every source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePaths {
    pub claude_stats_cache: PathBuf,
    pub claude_projects_dir: PathBuf,
    pub codex_sessions_dir: PathBuf,
    pub cursor_db: PathBuf,
    pub gemini_dir: PathBuf,
}

impl SourcePaths {
    /// Default locations under a home directory.
    pub fn from_home(home: &Path) -> Self {
        Self {
            claude_stats_cache: home.join(".claude").join("stats-cache.json"),
            claude_projects_dir: home.join(".claude").join("projects"),
            codex_sessions_dir: home.join(".codex").join("sessions"),
            cursor_db: home
                .join(".cursor")
                .join("ai-tracking")
                .join("ai-code-tracking.db"),
            gemini_dir: home.join(".gemini"),
        }
    }

    pub fn with_claude_stats_cache(mut self, path: impl Into<PathBuf>) -> Self {
        self.claude_stats_cache = path.into();
        self
    }

    pub fn with_claude_projects_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.claude_projects_dir = path.into();
        self
    }

    pub fn with_codex_sessions_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.codex_sessions_dir = path.into();
        self
    }

    pub fn with_cursor_db(mut self, path: impl Into<PathBuf>) -> Self {
        self.cursor_db = path.into();
        self
    }

    pub fn with_gemini_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.gemini_dir = path.into();
        self
    }
}

/// Every provider, in display order.
pub fn providers(paths: &SourcePaths) -> Vec<Provider> {
    SourceKind::ALL
        .iter()
        .map(|kind| match kind {
            SourceKind::ClaudeCode => Provider::Claude(ClaudeProvider::new(
                &paths.claude_stats_cache,
                &paths.claude_projects_dir,
            )),
            SourceKind::Codex => Provider::Codex(CodexProvider::new(&paths.codex_sessions_dir)),
            SourceKind::Cursor => Provider::Cursor(CursorProvider::new(&paths.cursor_db)),
            SourceKind::Gemini => Provider::Gemini(GeminiProvider::new(&paths.gemini_dir)),
        })
        .collect()
}

/// Load every available provider concurrently and merge the results.
///
/// Unavailable sources are skipped. A source whose load fails is logged and
/// listed in [`AggregatedData::failures`]; the others are still merged.
pub async fn load_all(providers: &[Provider]) -> AggregatedData {
    let available: Vec<&Provider> = providers.iter().filter(|p| p.available()).collect();
    debug!(
        total = providers.len(),
        available = available.len(),
        "Loading usage sources"
    );

    let results = join_all(
        available
            .iter()
            .map(|provider| async move { (provider.kind(), provider.load().await) }),
    )
    .await;

    let mut loaded = Vec::with_capacity(results.len());
    let mut failures = Vec::new();
    for (source, result) in results {
        match result {
            Ok(data) => {
                info!(
                    source = %source,
                    sessions = data.sessions.len(),
                    days = data.daily_usage.len(),
                    "Loaded usage source"
                );
                loaded.push(data);
            }
            Err(e) => {
                warn!(source = %source, error = %e, "Failed to load usage source");
                failures.push(LoadFailure {
                    source,
                    message: e.friendly_message(),
                });
            }
        }
    }

    let mut aggregated = merge(loaded);
    failures.sort_by_key(|f| f.source);
    aggregated.failures = failures;
    aggregated
}
