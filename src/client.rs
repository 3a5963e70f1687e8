use crate::history::ConversationBuffer;
use crate::models::chat::{ ErrorResponse, RelayResponse, Turn };

use log::{ debug, warn };
use reqwest::{ Client as HttpClient, StatusCode };
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Shown in place of a reply when the relay could not answer.
pub const APOLOGY: &str = "Oops! Something went wrong. Please try again.";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("message is empty")]
    EmptyMessage,
    #[error("relay request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("relay answered {status}: {message}")]
    Status {
        status: StatusCode,
        message: String,
    },
}

#[derive(Serialize)]
struct OutgoingRequest<'a> {
    conversation: &'a [Turn],
}

/// One user's conversation with a relay. History stays in memory and is lost
/// when the session is dropped.
pub struct ChatSession {
    http: HttpClient,
    relay_url: String,
    buffer: ConversationBuffer,
}

impl ChatSession {
    pub fn new(
        relay_url: impl Into<String>,
        max_turns: usize,
        timeout: Duration
    ) -> Result<Self, ClientError> {
        let http = HttpClient::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            relay_url: relay_url.into(),
            buffer: ConversationBuffer::new(max_turns),
        })
    }

    pub fn history(&self) -> &ConversationBuffer {
        &self.buffer
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Sends `text` with the full history and records the reply.
    ///
    /// A failed exchange leaves the user turn in the history without a paired
    /// reply; nothing is retried.
    pub async fn send(&mut self, text: &str) -> Result<String, ClientError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ClientError::EmptyMessage);
        }

        self.buffer.append(Turn::user(text));
        debug!("Sending {} turns to {}", self.buffer.len(), self.relay_url);

        let resp = self.http
            .post(&self.relay_url)
            .json(&OutgoingRequest { conversation: self.buffer.snapshot() })
            .send().await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp
                .json::<ErrorResponse>().await
                .map(|e| e.error)
                .unwrap_or_else(|_| "Network response was not ok".to_string());
            warn!("Relay returned {}: {}", status, message);
            return Err(ClientError::Status { status, message });
        }

        let body: RelayResponse = resp.json().await?;
        self.buffer.append(Turn::assistant(body.message.clone()));
        Ok(body.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn session(server: &mockito::ServerGuard, max_turns: usize) -> ChatSession {
        ChatSession::new(format!("{}/chat", server.url()), max_turns, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn successful_exchange_records_both_turns() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat")
            .match_body(Matcher::Json(json!({
                "conversation": [{ "role": "user", "message": "hi" }]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"message":"Hello!"}"#)
            .create_async().await;

        let mut chat = session(&server, 10);
        assert_eq!(chat.send("  hi \n").await.unwrap(), "Hello!");
        assert_eq!(chat.history().snapshot(), &[Turn::user("hi"), Turn::assistant("Hello!")]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn failed_exchange_keeps_the_user_turn() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat")
            .with_status(500)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error":"Something went wrong on the server!"}"#)
            .create_async().await;

        let mut chat = session(&server, 10);
        match chat.send("hi").await {
            Err(ClientError::Status { status, message }) => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(message, "Something went wrong on the server!");
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(chat.history().snapshot(), &[Turn::user("hi")]);
    }

    #[tokio::test]
    async fn empty_input_sends_nothing() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("POST", "/chat").expect(0).create_async().await;

        let mut chat = session(&server, 10);
        assert!(matches!(chat.send("   ").await, Err(ClientError::EmptyMessage)));
        assert!(chat.history().is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn history_sent_upstream_stays_within_cap() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"message":"ok"}"#)
            .expect(6)
            .create_async().await;

        let mut chat = session(&server, 4);
        for n in 0..6 {
            chat.send(&format!("q{}", n)).await.unwrap();
            assert!(chat.history().len() <= 4);
        }
        assert_eq!(chat.history().snapshot().first(), Some(&Turn::user("q4")));

        chat.reset();
        assert!(chat.history().is_empty());
    }
}
