pub mod cli;
pub mod client;
pub mod config;
pub mod history;
pub mod llm;
pub mod logging;
pub mod models;
pub mod relay;
pub mod server;

use cli::Args;
use config::persona::PersonaStore;
use llm::LlmConfig;
use llm::chat::new_client as new_chat_client;
use log::info;
use relay::ChatRelay;
use server::Server;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Server Address: {}", args.server_addr);
    info!("Chat LLM Type: {}", args.chat_llm_type);
    info!("Chat Model: {}", args.chat_model.as_deref().unwrap_or("adapter default"));
    info!("Persona Path: {:?}", args.persona_path);
    info!("Max Turns: {}", args.max_turns);
    info!("Provider Timeout: {}s", args.request_timeout_secs);
    info!("Log Directory: {}", args.log_dir.display());
    info!("TLS Enabled: {}", args.enable_tls);
    info!("-------------------------");

    let chat_config = LlmConfig {
        llm_type: args.chat_llm_type
            .parse()
            .map_err(|e| format!("Invalid chat LLM type: {}", e))?,
        base_url: args.chat_base_url.clone(),
        api_key: Some(args.chat_api_key.clone()).filter(|k| !k.is_empty()),
        completion_model: args.chat_model.clone(),
    };
    let chat_client = new_chat_client(&chat_config)?;
    info!(
        "Chat client configured: Type={}, Model={}, BaseURL={}",
        chat_config.llm_type,
        chat_client.get_model(),
        chat_client.get_base_url()
    );

    let persona = Arc::new(PersonaStore::new(args.persona_path.clone())?);
    let relay = ChatRelay::new(
        chat_client,
        persona,
        args.max_turns,
        Duration::from_secs(args.request_timeout_secs)
    );

    let server = Server::new(relay, args)?;
    server.run().await?;

    Ok(())
}
