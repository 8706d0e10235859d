//! Cursor: code generation counts and conversation list. No cost data.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::UsageProvider;
use crate::error::Result;
use crate::models::{DailyUsage, ModelBreakdown, ProviderData, SessionInfo, SourceKind};
use crate::parser::cursor_store::CursorStore;

/// Metadata note explaining the missing cost columns.
pub const COST_NOTE: &str =
    "Cursor tracks code generations, not token usage. Cost requires the Cursor billing API.";

pub struct CursorProvider {
    db_path: PathBuf,
}

impl CursorProvider {
    pub fn new(db_path: &Path) -> Self {
        Self {
            db_path: db_path.to_path_buf(),
        }
    }
}

/// Read everything the tracking database offers.
pub fn load_cursor_store(path: &Path) -> Result<ProviderData> {
    let store = CursorStore::open(path)?;
    let mut data = ProviderData::new(SourceKind::Cursor);

    data.generations = store.total_generations()?;

    data.daily_usage = store
        .daily_generations()?
        .into_iter()
        .map(|(date, generations)| DailyUsage {
            generations,
            ..DailyUsage::new(date)
        })
        .collect();

    data.models = store
        .generations_by_extension()?
        .into_iter()
        .map(|(extension, generations)| ModelBreakdown {
            model: extension,
            generations,
            ..ModelBreakdown::default()
        })
        .collect();

    data.sessions = store
        .conversations()?
        .into_iter()
        .map(|conversation| SessionInfo {
            project: conversation.project().to_string(),
            start_time: conversation.updated_at,
            end_time: conversation.updated_at,
            model: (!conversation.model.is_empty()).then_some(conversation.model),
            id: conversation.id,
            ..SessionInfo::default()
        })
        .collect();

    let (first, last) = store.date_range()?;
    data.first_seen = first;
    data.last_seen = last;

    for (source, count) in store.generations_by_source()? {
        data.metadata
            .insert(format!("source_{source}"), count.to_string());
    }
    data.metadata.insert("note".into(), COST_NOTE.into());

    Ok(data)
}

#[async_trait]
impl UsageProvider for CursorProvider {
    fn kind(&self) -> SourceKind {
        SourceKind::Cursor
    }

    fn available(&self) -> bool {
        self.db_path.is_file()
    }

    async fn load(&self) -> Result<ProviderData> {
        let path = self.db_path.clone();
        tokio::task::spawn_blocking(move || load_cursor_store(&path)).await?
    }
}
