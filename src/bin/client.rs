//! Chat Relay - Terminal Client
//!
//! Usage: `chat_relay_client <username> [config.json]`
//!
//! Prints room activity using the configured templates. Typed text is
//! sent as a chat message; lines starting with `/` are sent as commands.

use std::env;
use std::process;

use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use chat_relay::codec;
use chat_relay::terminal::{format_notice, outbound_line, render};
use chat_relay::Config;

/// Default configuration file
const DEFAULT_CONFIG: &str = "config.json";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chat_relay=warn")),
        )
        .init();

    let mut args = env::args().skip(1);
    let Some(username) = args.next() else {
        eprintln!("You must provide the username as the first parameter");
        process::exit(1);
    };
    let config_path = args.next().unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let config = Config::load_or_default(&config_path)?;

    let stream = TcpStream::connect(config.listen_addr()).await?;
    let (reader, mut writer) = stream.into_split();

    // Single writer fed by both the handshake and the console
    let (line_tx, mut line_rx) = mpsc::unbounded_channel::<String>();
    tokio::spawn(async move {
        while let Some(line) = line_rx.recv().await {
            let mut bytes = line.into_bytes();
            bytes.push(b'\n');
            if writer.write_all(&bytes).await.is_err() {
                break;
            }
        }
    });

    let server_tx = line_tx.clone();
    let templates = config.templates.clone();
    let mut server_task = tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();

        while let Ok(Some(line)) = lines.next_line().await {
            let Some(cmd) = codec::decode(&line) else {
                continue;
            };

            if cmd.verb == "ready" {
                // the handshake - send out our username
                let _ = server_tx.send(codec::encode("user", None, &username));
                println!(
                    "{}",
                    render(&templates.has_entered_the_lobby_message, &[username.as_str()])
                );
                continue;
            }

            match format_notice(&templates, &cmd) {
                Some(text) => println!("{text}"),
                None => debug!("Unhandled server line: {}", line),
            }
        }
    });

    let mut stdin = BufReader::new(io::stdin()).lines();

    loop {
        tokio::select! {
            _ = &mut server_task => {
                eprintln!("Lost server connection");
                break;
            }
            input = stdin.next_line() => match input {
                Ok(Some(input)) => {
                    if let Some(line) = outbound_line(&input) {
                        if line_tx.send(line).is_err() {
                            break;
                        }
                    }
                }
                _ => break,
            },
        }
    }

    Ok(())
}
