use serde::Deserialize;
use std::fs;
use std::path::{ Path, PathBuf };
use std::sync::Arc;
use std::time::SystemTime;
use thiserror::Error;
use tokio::sync::RwLock as TokioRwLock;
use log::info;

pub const DEFAULT_PERSONA_NAME: &str = "Grandma's Helper";

pub const DEFAULT_DIRECTIVE: &str = r#"You are "Grandma's Helper," a friendly and patient AI assistant.
You are speaking directly to my grandmother. Your goal is to make technology and the world feel accessible and interesting to her.

**Your Personality & Rules:**
1.  **Warm and Encouraging:** Always be positive. Start your answers with a friendly opening like "That's a great question!" or "Of course!".
2.  **Simple Language:** Explain things in the simplest terms possible. Avoid technical jargon completely. Use analogies related to everyday life (like gardening, cooking, or knitting) if it helps explain a concept.
3.  **Patient with Typos:** My grandmother may misspell words. NEVER point out her spelling mistakes or correct her. Simply understand her intent and answer the question as if it were spelled perfectly. This is very important.
4.  **Concise Answers:** Keep your paragraphs short (2-3 sentences). Use bullet points or numbered lists to break down information and make it easier to read.
5.  **Use Bolding:** Use **bold text** to highlight the most important words or names in your answer to help them stand out."#;

#[derive(Debug, Error)]
pub enum PersonaError {
    #[error("Persona file IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Persona JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Persona file '{0}' has an empty directive")]
    EmptyDirective(String),
}

fn default_name() -> String {
    DEFAULT_PERSONA_NAME.to_string()
}

/// Instructional text sent to the provider ahead of every conversation.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Persona {
    #[serde(default = "default_name")]
    pub name: String,
    pub directive: String,
    #[serde(skip)]
    pub last_modified: Option<SystemTime>,
}

impl Default for Persona {
    fn default() -> Self {
        Self {
            name: default_name(),
            directive: DEFAULT_DIRECTIVE.to_string(),
            last_modified: None,
        }
    }
}

fn parse_persona(
    path: &Path,
    content: &str,
    modified: Option<SystemTime>
) -> Result<Persona, PersonaError> {
    let mut persona: Persona = serde_json::from_str(content)?;
    if persona.directive.trim().is_empty() {
        return Err(PersonaError::EmptyDirective(path.display().to_string()));
    }
    persona.last_modified = modified;
    Ok(persona)
}

/// Startup load, before the runtime serves requests.
pub fn load_persona<P: AsRef<Path>>(path: P) -> Result<Persona, PersonaError> {
    let path = path.as_ref();
    let modified = fs::metadata(path)?.modified().ok();
    let file_content = fs::read_to_string(path)?;
    parse_persona(path, &file_content, modified)
}

/// Runs on the request path, so file access goes through `tokio::fs`.
pub async fn reload_persona_if_changed<P: AsRef<Path>>(
    path: P,
    current: &Persona
) -> Result<Option<Persona>, PersonaError> {
    let path = path.as_ref();
    let modified = tokio::fs::metadata(path).await?.modified().ok();
    if modified.is_some() && modified == current.last_modified {
        return Ok(None);
    }
    info!("Persona file changed, reloading from {}", path.display());
    let file_content = tokio::fs::read_to_string(path).await?;
    parse_persona(path, &file_content, modified).map(Some)
}

/// Shared, hot-reloadable persona. Without a backing file the built-in
/// directive is used and reloads are no-ops.
pub struct PersonaStore {
    path: Option<PathBuf>,
    current: TokioRwLock<Arc<Persona>>,
}

impl PersonaStore {
    pub fn new(path: Option<PathBuf>) -> Result<Self, PersonaError> {
        let persona = match &path {
            Some(p) => {
                info!("Loading persona from: {}", p.display());
                load_persona(p)?
            }
            None => {
                info!("No persona file configured, using built-in '{}'", DEFAULT_PERSONA_NAME);
                Persona::default()
            }
        };
        Ok(Self { path, current: TokioRwLock::new(Arc::new(persona)) })
    }

    pub fn fixed(persona: Persona) -> Self {
        Self { path: None, current: TokioRwLock::new(Arc::new(persona)) }
    }

    pub async fn current(&self) -> Arc<Persona> {
        Arc::clone(&*self.current.read().await)
    }

    pub async fn reload_if_changed(&self) -> Result<bool, PersonaError> {
        let Some(path) = &self.path else {
            return Ok(false);
        };
        let current = self.current().await;
        match reload_persona_if_changed(path, &current).await? {
            Some(persona) => {
                info!("Persona '{}' reloaded", persona.name);
                *self.current.write().await = Arc::new(persona);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
