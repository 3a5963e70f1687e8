use async_trait::async_trait;
use log::info;
use reqwest::{ Client as HttpClient, header::{ HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION } };
use serde::{ Deserialize, Serialize };

use super::{ join_url, send_json, ChatClient, ProviderError };
use crate::llm::LlmConfig;
use crate::models::chat::{ Speaker, Turn };

const DEFAULT_MODEL: &str = "gpt-4o";
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

pub struct OpenAIChatClient {
    http: HttpClient,
    model: String,
    base_url: String,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct OpenAIChatRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    temperature: f32,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    choices: Vec<OpenAIChoice>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
}

/// System directive first, then the conversation in order.
fn build_messages(persona: &str, turns: &[Turn]) -> Vec<OpenAIMessage> {
    std::iter::once(OpenAIMessage {
        role: "system".to_string(),
        content: persona.to_string(),
    })
        .chain(
            turns.iter().map(|turn| OpenAIMessage {
                role: match turn.role {
                    Speaker::User => "user".to_string(),
                    Speaker::Assistant => "assistant".to_string(),
                },
                content: turn.message.clone(),
            })
        )
        .collect()
}

impl OpenAIChatClient {
    pub fn new(
        api_key: String,
        model: Option<String>,
        base_url: Option<String>
    ) -> Result<Self, ProviderError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|e| ProviderError::Config(format!("Invalid API key format: {}", e)))?
        );

        let http = HttpClient::builder().default_headers(headers).build()?;

        Ok(Self {
            http,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, ProviderError> {
        let api_key = config.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ProviderError::Config("OpenAI API key is required".to_string()))?;

        Self::new(api_key, config.completion_model.clone(), config.base_url.clone())
    }
}

#[async_trait]
impl ChatClient for OpenAIChatClient {
    async fn generate(&self, persona: &str, turns: &[Turn]) -> Result<String, ProviderError> {
        let url = join_url(&self.base_url, "/chat/completions");
        info!("OpenAIChatClient::generate() → model={} turns={}", self.model, turns.len());

        let req = OpenAIChatRequest {
            model: self.model.clone(),
            messages: build_messages(persona, turns),
            temperature: 0.7,
        };
        let resp: OpenAIResponse = send_json(self.http.post(&url).json(&req)).await?;

        resp.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .filter(|content| !content.is_empty())
            .ok_or(ProviderError::EmptyResponse)
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }

    fn get_base_url(&self) -> String {
        self.base_url.clone()
    }
}
