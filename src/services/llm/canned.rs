use async_trait::async_trait;
use std::time::Duration;

use super::{ProviderError, ResponseProvider};
use crate::kernel::fixtures::replies;
use crate::kernel::state::GameContext;

/// Offline provider: picks a canned coaching line from the game situation
/// and a few keywords. Optional latency makes the thinking floor visible.
#[derive(Debug, Clone, Default)]
pub struct CannedProvider {
    latency_ms: u64,
}

impl CannedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(latency_ms: u64) -> Self {
        Self { latency_ms }
    }

    pub fn pick(query: &str, context: GameContext) -> &'static str {
        match context {
            GameContext::Dead => replies::DEATH_ANALYSIS,
            GameContext::Shopping => replies::SHOP_ADVICE,
            GameContext::ObjectiveSpawn => replies::PROACTIVE_Q,
            GameContext::Normal => {
                if query.trim().is_empty() {
                    replies::DEFAULT
                } else if query.contains("打野") {
                    replies::JUNGLE_TRACKING
                } else if query.contains("死") || query.contains("复盘") {
                    replies::DEATH_ANALYSIS
                } else if query.contains("出什么") || query.contains("装备") {
                    replies::SHOP_ADVICE
                } else {
                    replies::ENCOURAGEMENT
                }
            }
        }
    }
}

#[async_trait]
impl ResponseProvider for CannedProvider {
    async fn generate(&self, query: &str, context: GameContext) -> Result<String, ProviderError> {
        if self.latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.latency_ms)).await;
        }
        Ok(Self::pick(query, context).to_string())
    }
}
