use std::sync::Arc;

use anyhow::{bail, Context};
use parking_lot::Mutex;
use tracing::info;

use chat_stream_rs::config::Config;
use chat_stream_rs::logger;
use chat_stream_rs::services::{ChatDispatcher, SendMessageRequest};
use chat_stream_rs::utils::transcript::{transcript_callback, Transcript};

const USAGE: &str = "usage: chat_send [--no-stream] <message...>";

fn parse_args(args: &[String]) -> anyhow::Result<SendMessageRequest> {
    let mut stream = true;
    let mut words = Vec::new();
    for arg in args {
        match arg.as_str() {
            "--no-stream" => stream = false,
            "--stream" => stream = true,
            "-h" | "--help" => bail!(USAGE),
            _ => words.push(arg.as_str()),
        }
    }
    Ok(SendMessageRequest::new(words.join(" "), stream))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let request = parse_args(&args)?;

    let cfg = Config::init_global().context("failed to load config")?;
    logger::init_cli_logger(cfg).map_err(anyhow::Error::msg)?;

    let dispatcher = ChatDispatcher::from_config(cfg).context("failed to build http client")?;
    info!("sending to {}", dispatcher.endpoint());

    let transcript = Arc::new(Mutex::new(Transcript::new(std::io::stdout())));
    let callback = transcript_callback(transcript.clone());

    let result = dispatcher.send_message(request, Some(callback)).await;

    let mut transcript = transcript.lock();
    match result {
        Ok(last) => {
            transcript.finish();
            info!(done = last.done, "reply complete");
            Ok(())
        }
        Err(err) => {
            transcript.mark_error(&err.to_string());
            transcript.finish();
            Err(err.into())
        }
    }
}
