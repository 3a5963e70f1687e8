use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Chat LLM Provider Args ---
    /// Type of LLM provider for chat completion (gemini, openai, ollama)
    #[arg(long, env = "CHAT_LLM_TYPE", default_value = "gemini")]
    pub chat_llm_type: String,

    /// Base URL for the Chat LLM provider API (e.g., http://localhost:11434 for Ollama)
    #[arg(long, env = "CHAT_BASE_URL")] // No default, let adapters handle defaults if None
    pub chat_base_url: Option<String>,

    /// API Key for the Chat LLM provider (e.g., Gemini, OpenAI)
    #[arg(long, env = "CHAT_API_KEY", default_value = "", hide_env_values = true)]
    pub chat_api_key: String,

    /// Model name for chat completion (e.g., gemini-2.5-pro, gpt-4o, llama3)
    #[arg(long, env = "CHAT_MODEL")] // No default, rely on adapter defaults if None
    pub chat_model: Option<String>,

    // --- Relay Args ---
    /// Optional JSON file holding the persona directive ({"name": ..., "directive": ...}).
    /// The built-in helper persona is used when unset.
    #[arg(long, env = "PERSONA_PATH")]
    pub persona_path: Option<PathBuf>,

    /// Maximum number of turns forwarded to the provider per request.
    #[arg(long, env = "MAX_TURNS", default_value = "10")]
    pub max_turns: usize,

    /// Upper bound in seconds for a single provider call.
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value = "30")]
    pub request_timeout_secs: u64,

    // --- Rate Limit Args ---
    /// Length of the rate limit window in seconds.
    #[arg(long, env = "RATE_LIMIT_WINDOW_SECS", default_value = "900")]
    pub rate_limit_window_secs: u64,

    /// Requests each client IP may make per window.
    #[arg(long, env = "RATE_LIMIT_MAX_REQUESTS", default_value = "25")]
    pub rate_limit_max_requests: u32,

    /// Key rate limiting on the rightmost X-Forwarded-For address (set when running behind one proxy).
    #[arg(long, env = "TRUST_PROXY", default_value = "false")]
    pub trust_proxy: bool,

    // --- Logging Args ---
    /// Directory for the daily rotating application log.
    #[arg(long, env = "LOG_DIR", default_value = "logs")]
    pub log_dir: PathBuf,

    /// Number of daily log files to keep.
    #[arg(long, env = "LOG_MAX_FILES", default_value = "14")]
    pub log_max_files: usize,

    // --- General App Args ---
    /// Host address and port for the server to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "0.0.0.0:3000")]
    pub server_addr: String,

    /// Optional path to the TLS certificate file (PEM format) for enabling HTTPS. Requires --tls-key-path.
    #[arg(long, env = "TLS_CERT_PATH")]
    pub tls_cert_path: Option<String>,

    /// Optional path to the TLS private key file (PEM format) for enabling HTTPS. Requires --tls-cert-path.
    #[arg(long, env = "TLS_KEY_PATH")]
    pub tls_key_path: Option<String>,

    #[arg(long, env = "ENABLE_TLS", default_value = "false")]
    pub enable_tls: bool,
}

/// Arguments for the terminal chat client.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Chat with a running relay from the terminal", long_about = None)]
pub struct ChatArgs {
    /// Relay endpoint that accepts the conversation.
    #[arg(long, env = "RELAY_URL", default_value = "http://127.0.0.1:3000/chat")]
    pub relay_url: String,

    /// Turns kept locally and sent with each message.
    #[arg(long, env = "MAX_TURNS", default_value = "10")]
    pub max_turns: usize,

    /// Seconds to wait for the relay to answer.
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value = "60")]
    pub request_timeout_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    // Reads declared defaults off the command so exported env vars cannot leak in.
    fn declared_default(id: &str) -> String {
        let command = Args::command();
        let arg = command
            .get_arguments()
            .find(|a| a.get_id() == id)
            .unwrap_or_else(|| panic!("no argument {}", id));
        arg.get_default_values()
            .iter()
            .map(|v| v.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(",")
    }

    #[test]
    fn defaults_match_the_hosted_deployment() {
        assert_eq!(declared_default("chat_llm_type"), "gemini");
        assert_eq!(declared_default("max_turns"), "10");
        assert_eq!(declared_default("request_timeout_secs"), "30");
        assert_eq!(declared_default("rate_limit_window_secs"), "900");
        assert_eq!(declared_default("rate_limit_max_requests"), "25");
        assert_eq!(declared_default("trust_proxy"), "false");
        assert_eq!(declared_default("log_max_files"), "14");
    }

    #[test]
    fn flags_override_defaults() {
        let args = Args::try_parse_from([
            "chat-relay",
            "--chat-llm-type",
            "ollama",
            "--max-turns",
            "6",
            "--trust-proxy",
        ]).unwrap();
        assert_eq!(args.chat_llm_type, "ollama");
        assert_eq!(args.max_turns, 6);
        assert!(args.trust_proxy);
    }
}
