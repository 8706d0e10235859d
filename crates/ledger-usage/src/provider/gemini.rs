//! Gemini CLI session documents.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use super::UsageProvider;
use crate::aggregate::UsageBuckets;
use crate::error::Result;
use crate::models::{ProviderData, SourceKind};
use crate::parser::session_document::{DocumentSession, has_chat_dirs, load_session_documents};

pub struct GeminiProvider {
    config_dir: PathBuf,
}

impl GeminiProvider {
    pub fn new(config_dir: &Path) -> Self {
        Self {
            config_dir: config_dir.to_path_buf(),
        }
    }
}

/// Fold parsed documents into provider data, bucketed by session start date.
pub fn provider_data_from_documents(documents: &[DocumentSession]) -> ProviderData {
    let mut buckets = UsageBuckets::new();
    for document in documents {
        buckets.add_session(document.session.start_date(), &document.session);
        for (model, responses) in &document.responses_by_model {
            buckets.add_generations(model, *responses);
        }
    }
    buckets.into_provider_data(SourceKind::Gemini)
}

#[async_trait]
impl UsageProvider for GeminiProvider {
    fn kind(&self) -> SourceKind {
        SourceKind::Gemini
    }

    /// Installed if any chat directory exists, or at least a settings file.
    fn available(&self) -> bool {
        has_chat_dirs(&self.config_dir) || self.config_dir.join("settings.json").is_file()
    }

    async fn load(&self) -> Result<ProviderData> {
        let dir = self.config_dir.clone();
        let documents = tokio::task::spawn_blocking(move || match load_session_documents(&dir) {
            Err(e) if e.is_source_missing() => {
                debug!(dir = %dir.display(), "Gemini installed but no sessions recorded");
                Ok(Vec::new())
            }
            other => other,
        })
        .await??;
        Ok(provider_data_from_documents(&documents))
    }
}
