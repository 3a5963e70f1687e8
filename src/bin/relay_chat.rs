use chat_relay::cli::ChatArgs;
use chat_relay::client::{ ChatSession, ClientError, APOLOGY };
use clap::Parser;
use dotenv::dotenv;
use log::warn;
use std::error::Error;
use std::io::Write;
use std::time::Duration;
use tokio::io::{ AsyncBufReadExt, BufReader };

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = ChatArgs::parse();

    let mut session = ChatSession::new(
        args.relay_url.clone(),
        args.max_turns,
        Duration::from_secs(args.request_timeout_secs)
    )?;

    println!("Chatting with {}. Type /reset to start over, /quit to leave.", args.relay_url);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        match line.trim() {
            "/quit" | "/exit" => break,
            "/reset" => {
                session.reset();
                println!("(conversation cleared)");
                continue;
            }
            "" => continue,
            _ => {}
        }

        println!("Thinking...");
        match session.send(&line).await {
            Ok(reply) => println!("{}\n", reply),
            Err(ClientError::EmptyMessage) => {}
            Err(e) => {
                warn!("Relay call failed: {}", e);
                println!("{}\n", APOLOGY);
            }
        }
    }

    Ok(())
}
