use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{ProviderError, ResponseProvider};
use crate::config::ProviderConfig;
use crate::kernel::fixtures::{AI_NAME, DEFAULT_PROMPT};
use crate::kernel::state::GameContext;

#[derive(Clone)]
pub struct HttpProvider {
    client: Client,
    base_url: String,
    n_predict: usize,
    temperature: f32,
    top_p: f32,
}

#[derive(Serialize)]
struct CompletionRequest {
    prompt: String,
    stream: bool,
    n_predict: usize,
    temperature: f32,
    top_p: f32,
    stop: Vec<String>,
}

#[derive(Deserialize)]
struct CompletionResponse {
    content: String,
}

impl HttpProvider {
    pub fn new(config: &ProviderConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_millis(config.timeout_ms)) // network-level ceiling
                .build()
                .unwrap_or_default(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            n_predict: config.n_predict,
            temperature: config.temperature,
            top_p: config.top_p,
        }
    }

    /// Coach persona, steered by the current game situation.
    pub fn system_prompt(context: GameContext) -> String {
        format!(
            "You are \"Hextech Assistant\" ({}), a pro-level MOBA coach.\n\
             Current Game State: {}.\n\
             Tone: professional, concise, strategic. Language: Simplified Chinese.\n\
             Length: STRICTLY under 40 characters. Use game terminology (gank, farm, kiting, obj).\n\
             If the player is DEAD, give a quick post-mortem tip.\n\
             If the player is SHOPPING, recommend an item.\n\
             Otherwise give one specific tactical directive.",
            AI_NAME,
            context.tag()
        )
    }

    pub fn build_prompt(query: &str, context: GameContext) -> String {
        let query = if query.trim().is_empty() { DEFAULT_PROMPT } else { query };
        format!("System: {}\nUser: {}\nAssistant:", Self::system_prompt(context), query)
    }
}

#[async_trait]
impl ResponseProvider for HttpProvider {
    async fn generate(&self, query: &str, context: GameContext) -> Result<String, ProviderError> {
        let request_body = CompletionRequest {
            prompt: Self::build_prompt(query, context),
            stream: false,
            n_predict: self.n_predict,
            temperature: self.temperature,
            top_p: self.top_p,
            stop: vec!["User:".to_string(), "System:".to_string()],
        };

        let response = self
            .client
            .post(format!("{}/completion", self.base_url))
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::Status(response.status().as_u16()));
        }

        let body: CompletionResponse = response.json().await?;
        if body.content.is_empty() {
            return Err(ProviderError::Empty);
        }
        Ok(body.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_carries_context_and_query() {
        let prompt = HttpProvider::build_prompt("对面打野在哪", GameContext::ObjectiveSpawn);
        assert!(prompt.contains("OBJECTIVE_SPAWN"));
        assert!(prompt.contains("User: 对面打野在哪"));
        assert!(prompt.ends_with("Assistant:"));
    }

    #[test]
    fn blank_query_uses_default_prompt() {
        let prompt = HttpProvider::build_prompt("   ", GameContext::Normal);
        assert!(prompt.contains(DEFAULT_PROMPT));
    }

    #[tokio::test]
    async fn unreachable_server_is_request_error() {
        let provider = HttpProvider::new(&ProviderConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_ms: 500,
            ..ProviderConfig::default()
        });
        let err = provider.generate("hi", GameContext::Normal).await.unwrap_err();
        assert!(matches!(err, ProviderError::Request(_)));
    }
}
