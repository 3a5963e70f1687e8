use serde::{ Serialize, Deserialize };
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    /// Browser clients tag replies as `model`, so that spelling is accepted too.
    #[serde(alias = "model")]
    Assistant,
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Speaker::User => write!(f, "user"),
            Speaker::Assistant => write!(f, "assistant"),
        }
    }
}

/// One message exchanged in a conversation, tagged with its speaker.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Speaker,
    pub message: String,
}

impl Turn {
    pub fn user(message: impl Into<String>) -> Self {
        Self { role: Speaker::User, message: message.into() }
    }

    pub fn assistant(message: impl Into<String>) -> Self {
        Self { role: Speaker::Assistant, message: message.into() }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RelayRequest {
    #[serde(default)]
    pub conversation: Vec<Turn>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayResponse {
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
