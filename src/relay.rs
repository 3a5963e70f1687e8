use crate::config::persona::PersonaStore;
use crate::history::most_recent;
use crate::llm::chat::{ ChatClient, ProviderError };
use crate::models::chat::RelayRequest;

use log::{ debug, warn };
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub const INVALID_INPUT_MESSAGE: &str = "Invalid conversation provided.";
pub const SERVER_ERROR_MESSAGE: &str = "Something went wrong on the server!";

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl RelayError {
    /// Text that is safe to show the caller. Provider and internal details
    /// stay in the operational log.
    pub fn public_message(&self) -> &'static str {
        match self {
            RelayError::InvalidInput(_) => INVALID_INPUT_MESSAGE,
            RelayError::Provider(_) | RelayError::Internal(_) => SERVER_ERROR_MESSAGE,
        }
    }
}

/// Stateless bridge between a client-held conversation and the generation
/// provider. Every call carries the full history it needs.
#[derive(Clone)]
pub struct ChatRelay {
    chat_client: Arc<dyn ChatClient>,
    persona: Arc<PersonaStore>,
    max_turns: usize,
    timeout: Duration,
}

impl ChatRelay {
    pub fn new(
        chat_client: Arc<dyn ChatClient>,
        persona: Arc<PersonaStore>,
        max_turns: usize,
        timeout: Duration
    ) -> Self {
        Self {
            chat_client,
            persona,
            max_turns: max_turns.max(1),
            timeout,
        }
    }

    pub fn persona(&self) -> &Arc<PersonaStore> {
        &self.persona
    }

    pub async fn handle(&self, request: RelayRequest) -> Result<String, RelayError> {
        if request.conversation.is_empty() {
            return Err(RelayError::InvalidInput("conversation is empty".into()));
        }

        let turns = most_recent(&request.conversation, self.max_turns).to_vec();
        if turns.len() < request.conversation.len() {
            debug!(
                "Truncated conversation from {} to {} turns",
                request.conversation.len(),
                turns.len()
            );
        }

        if let Err(e) = self.persona.reload_if_changed().await {
            warn!("Persona reload failed, keeping current directive: {}", e);
        }
        let persona = self.persona.current().await;

        let client = Arc::clone(&self.chat_client);
        let mut call = tokio::spawn(async move { client.generate(&persona.directive, &turns).await });

        let raw = match tokio::time::timeout(self.timeout, &mut call).await {
            Err(_) => {
                call.abort();
                return Err(ProviderError::Timeout(self.timeout).into());
            }
            Ok(Err(join_err)) => {
                return Err(RelayError::Internal(join_err.to_string()));
            }
            Ok(Ok(result)) => result?,
        };

        Ok(upgrade_insecure_links(&raw))
    }
}

/// Rewrites every `http://` reference to `https://`. Nothing else in the
/// reply is touched.
pub fn upgrade_insecure_links(text: &str) -> String {
    text.replace("http://", "https://")
}
