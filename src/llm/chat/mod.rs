pub mod gemini;
pub mod ollama;
pub mod openai;

use async_trait::async_trait;
use reqwest::{ RequestBuilder, StatusCode };
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use super::{ LlmConfig, LlmType };
use self::gemini::GeminiChatClient;
use self::ollama::OllamaClient;
use self::openai::OpenAIChatClient;
use crate::models::chat::Turn;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider did not answer within {0:?}")]
    Timeout(Duration),
    #[error("provider request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider returned {status}: {body}")]
    Status {
        status: StatusCode,
        body: String,
    },
    #[error("provider returned no text")]
    EmptyResponse,
    #[error("provider misconfigured: {0}")]
    Config(String),
}

/// A hosted generation API: given a persona directive and an ordered,
/// role-tagged conversation, returns the next assistant reply.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn generate(&self, persona: &str, turns: &[Turn]) -> Result<String, ProviderError>;

    fn get_model(&self) -> String;
    fn get_base_url(&self) -> String;
}

pub fn new_client(config: &LlmConfig) -> Result<Arc<dyn ChatClient>, ProviderError> {
    let client: Arc<dyn ChatClient> = match config.llm_type {
        LlmType::Gemini => {
            let specific_client = GeminiChatClient::from_config(config)?;
            Arc::new(specific_client)
        }
        LlmType::OpenAI => {
            let specific_client = OpenAIChatClient::from_config(config)?;
            Arc::new(specific_client)
        }
        LlmType::Ollama => {
            let specific_client = OllamaClient::from_config(config)?;
            Arc::new(specific_client)
        }
    };
    Ok(client)
}

/// Sends a prepared request and decodes a JSON body, keeping the provider's
/// error body when the status is not a success.
pub(crate) async fn send_json<T: DeserializeOwned>(req: RequestBuilder) -> Result<T, ProviderError> {
    let resp = req.send().await?;
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ProviderError::Status { status, body });
    }
    Ok(resp.json::<T>().await?)
}

pub(crate) fn join_url(base_url: &str, route: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), route)
}
