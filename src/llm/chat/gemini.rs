use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::{ Deserialize, Serialize };
use log::info;

use super::{ join_url, send_json, ChatClient, ProviderError };
use crate::llm::LlmConfig;
use crate::models::chat::{ Speaker, Turn };

const DEFAULT_MODEL: &str = "gemini-2.5-pro";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

#[derive(Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    system_instruction: GeminiContent,
    contents: Vec<GeminiContent>,
}

#[derive(Serialize, Debug, PartialEq)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Debug, PartialEq)]
struct GeminiPart {
    text: String,
}

#[derive(Deserialize)]
struct GoogleResponse {
    #[serde(default)]
    candidates: Vec<GoogleCandidate>,
}

#[derive(Deserialize)]
struct GoogleCandidate {
    content: Option<GoogleContent>,
}

#[derive(Deserialize)]
struct GoogleContent {
    #[serde(default)]
    parts: Vec<GooglePart>,
}

#[derive(Deserialize)]
struct GooglePart {
    #[serde(default)]
    text: String,
}

impl GeminiRequest {
    fn new(persona: &str, turns: &[Turn]) -> Self {
        let contents = turns
            .iter()
            .map(|turn| GeminiContent {
                role: Some(match turn.role {
                    Speaker::User => "user",
                    Speaker::Assistant => "model",
                }),
                parts: vec![GeminiPart { text: turn.message.clone() }],
            })
            .collect();

        Self {
            system_instruction: GeminiContent {
                role: None,
                parts: vec![GeminiPart { text: persona.to_string() }],
            },
            contents,
        }
    }
}

pub struct GeminiChatClient {
    http: HttpClient,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiChatClient {
    pub fn new(api_key: String, model: Option<String>, base_url: Option<String>) -> Self {
        Self {
            http: HttpClient::new(),
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        }
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, ProviderError> {
        let api_key = config.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                ProviderError::Config("Google API key is required for GeminiChatClient".to_string())
            })?;

        Ok(Self::new(api_key, config.completion_model.clone(), config.base_url.clone()))
    }
}

#[async_trait]
impl ChatClient for GeminiChatClient {
    async fn generate(&self, persona: &str, turns: &[Turn]) -> Result<String, ProviderError> {
        let url = join_url(&self.base_url, &format!("/v1beta/models/{}:generateContent", self.model));
        info!("GeminiChatClient::generate() → model={} turns={}", self.model, turns.len());

        let payload = GeminiRequest::new(persona, turns);
        let resp: GoogleResponse = send_json(
            self.http.post(&url).header("x-goog-api-key", &self.api_key).json(&payload)
        ).await?;

        let text: String = resp.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| content.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(ProviderError::EmptyResponse);
        }
        Ok(text)
    }

    fn get_model(&self) -> String {
        self.model.clone()
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

    #[test]
    fn request_maps_roles_and_carries_persona() {
        let turns = vec![Turn::user("hi"), Turn::assistant("hello"), Turn::user("how?")];
        let value = serde_json::to_value(GeminiRequest::new("be kind", &turns)).unwrap();
        assert_eq!(
            value,
            json!({
                "systemInstruction": { "parts": [{ "text": "be kind" }] },
                "contents": [
                    { "role": "user", "parts": [{ "text": "hi" }] },
                    { "role": "model", "parts": [{ "text": "hello" }] },
                    { "role": "user", "parts": [{ "text": "how?" }] }
                ]
            })
        );
    }

    #[tokio::test]
    async fn generate_joins_text_parts_of_first_candidate() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1beta/models/gemini-test:generateContent")
            .match_header("x-goog-api-key", "secret")
            .match_body(Matcher::PartialJson(json!({
                "contents": [{ "role": "user", "parts": [{ "text": "hi" }] }]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "candidates": [
                        { "content": { "parts": [{ "text": "Hello " }, { "text": "there" }] } }
                    ]
                }).to_string()
            )
            .create_async().await;

        let client = GeminiChatClient::new(
            "secret".into(),
            Some("gemini-test".into()),
            Some(server.url())
        );
        let reply = client.generate("persona", &[Turn::user("hi")]).await.unwrap();
        assert_eq!(reply, "Hello there");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn error_status_keeps_provider_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", Matcher::Any)
            .with_status(429)
            .with_body("quota exhausted")
            .create_async().await;

        let client = GeminiChatClient::new("k".into(), None, Some(server.url()));
        match client.generate("p", &[Turn::user("hi")]).await {
            Err(ProviderError::Status { status, body }) => {
                assert_eq!(status.as_u16(), 429);
                assert_eq!(body, "quota exhausted");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn no_candidates_is_an_empty_response() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"candidates":[]}"#)
            .create_async().await;

        let client = GeminiChatClient::new("k".into(), None, Some(server.url()));
        let result = client.generate("p", &[Turn::user("hi")]).await;
        assert!(matches!(result, Err(ProviderError::EmptyResponse)));
    }
}
