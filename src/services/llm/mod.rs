//! Response providers. The orchestrator treats the model as an opaque
//! `query + context -> text` function that may fail.

pub mod canned;
pub mod client;

use async_trait::async_trait;

use crate::kernel::state::GameContext;

pub use canned::CannedProvider;
pub use client::HttpProvider;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("provider request failed: {0}")]
    Request(String),
    #[error("provider returned status {0}")]
    Status(u16),
    #[error("provider timed out after {0}ms")]
    Timeout(u64),
    #[error("provider returned an empty reply")]
    Empty,
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        ProviderError::Request(e.to_string())
    }
}

#[async_trait]
pub trait ResponseProvider: Send + Sync {
    async fn generate(&self, query: &str, context: GameContext) -> Result<String, ProviderError>;
}
