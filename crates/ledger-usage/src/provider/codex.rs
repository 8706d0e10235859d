//! Codex CLI rollouts.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::UsageProvider;
use crate::aggregate::UsageBuckets;
use crate::error::Result;
use crate::models::{ProviderData, SourceKind};
use crate::parser::rollout::{RolloutSession, load_rollouts};

pub struct CodexProvider {
    sessions_dir: PathBuf,
}

impl CodexProvider {
    pub fn new(sessions_dir: &Path) -> Self {
        Self {
            sessions_dir: sessions_dir.to_path_buf(),
        }
    }
}

/// Fold parsed rollouts into provider data.
pub fn provider_data_from_rollouts(rollouts: &[RolloutSession]) -> ProviderData {
    let mut buckets = UsageBuckets::new();
    for rollout in rollouts {
        buckets.add_session_with_tokens(
            rollout.capture_date,
            &rollout.session,
            rollout.usage.billable_tokens(),
        );
    }
    let mut data = buckets.into_provider_data(SourceKind::Codex);
    data.metadata
        .insert("rollouts".into(), rollouts.len().to_string());
    data
}

#[async_trait]
impl UsageProvider for CodexProvider {
    fn kind(&self) -> SourceKind {
        SourceKind::Codex
    }

    fn available(&self) -> bool {
        self.sessions_dir.is_dir()
    }

    async fn load(&self) -> Result<ProviderData> {
        let dir = self.sessions_dir.clone();
        let rollouts = tokio::task::spawn_blocking(move || load_rollouts(&dir)).await??;
        Ok(provider_data_from_rollouts(&rollouts))
    }
}
