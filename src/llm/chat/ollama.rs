use async_trait::async_trait;
use log::info;
use reqwest::Client as HttpClient;
use serde::{ Deserialize, Serialize };

use super::{ join_url, send_json, ChatClient, ProviderError };
use crate::llm::{ LlmConfig, LlmType };
use crate::models::chat::{ Speaker, Turn };

#[derive(Debug)]
pub struct OllamaClient {
    http: HttpClient,
    base_url: String,
    completion_model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatRequestMessage<'a>>,
    stream: bool,
}

#[derive(Serialize)]
struct ChatRequestMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: Option<ChatResponseMessage>,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: String,
}

impl OllamaClient {
    pub fn new(base_url: Option<String>, completion_model: Option<String>) -> Self {
        let model = completion_model.unwrap_or_else(|| "cogito:3b".to_string());
        let url = base_url.unwrap_or_else(|| "http://localhost:11434".into());

        Self {
            http: HttpClient::new(),
            base_url: url,
            completion_model: model,
        }
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, ProviderError> {
        if config.llm_type != LlmType::Ollama {
            return Err(ProviderError::Config("Invalid config type for OllamaClient".into()));
        }

        Ok(Self::new(config.base_url.clone(), config.completion_model.clone()))
    }
}

#[async_trait]
impl ChatClient for OllamaClient {
    async fn generate(&self, persona: &str, turns: &[Turn]) -> Result<String, ProviderError> {
        let url = join_url(&self.base_url, "/api/chat");
        info!("OllamaClient::generate() → model={} turns={}", self.completion_model, turns.len());

        let mut messages = Vec::with_capacity(turns.len() + 1);
        messages.push(ChatRequestMessage { role: "system", content: persona });
        messages.extend(
            turns.iter().map(|turn| ChatRequestMessage {
                role: match turn.role {
                    Speaker::User => "user",
                    Speaker::Assistant => "assistant",
                },
                content: &turn.message,
            })
        );

        let req = ChatRequest {
            model: &self.completion_model,
            messages,
            stream: false,
        };
        let resp: ChatResponse = send_json(self.http.post(&url).json(&req)).await?;

        resp.message
            .map(|m| m.content)
            .filter(|content| !content.is_empty())
            .ok_or(ProviderError::EmptyResponse)
    }

    fn get_model(&self) -> String {
        self.completion_model.clone()
    }

    fn get_base_url(&self) -> String {
        self.base_url.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    #[tokio::test]
    async fn generate_sends_non_streaming_chat() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/chat")
            .match_body(Matcher::PartialJson(json!({
                "model": "tiny",
                "stream": false,
                "messages": [
                    { "role": "system", "content": "persona" },
                    { "role": "user", "content": "hi" }
                ]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({ "message": { "role": "assistant", "content": "hey" }, "done": true }).to_string())
            .create_async().await;

        let client = OllamaClient::new(Some(server.url()), Some("tiny".into()));
        assert_eq!(client.generate("persona", &[Turn::user("hi")]).await.unwrap(), "hey");
        mock.assert_async().await;
    }

    #[test]
    fn rejects_foreign_config() {
        let config = LlmConfig::default();
        assert!(OllamaClient::from_config(&config).is_err());
    }
}
