use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use planetchat::client::api::{ApiClient, ClientError, DEFAULT_API_URL, DEFAULT_REQUEST_TIMEOUT_SECS};
use planetchat::client::session::{ChatSession, guess_content_type};
use planetchat::client::timeline::{LocalStatus, TimelineEntry};
use planetchat::message::{Message, MessageKind};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("missing user name; pass --user or set CHAT_USER")]
    MissingUser,
    #[error("not a file path: {0}")]
    InvalidPath(PathBuf),
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "chat-cli", about = "Planet chat command-line client")]
struct Cli {
    #[arg(long, env = "CHAT_API_URL", default_value = DEFAULT_API_URL)]
    base_url: String,

    #[arg(long, env = "CHAT_USER")]
    user: Option<String>,

    #[arg(long, default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS)]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check that the server is up.
    Ping,
    /// Print the full history.
    List {
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    Send {
        text: String,
    },
    /// Upload an image or audio file and post it.
    Upload {
        path: PathBuf,
        #[arg(long, help = "Media type; guessed from the extension when omitted")]
        content_type: Option<String>,
    },
    /// Follow the room. Lines typed on stdin are sent; `/file <path>` sends a
    /// file and `/quit` exits.
    Watch {
        #[arg(long, default_value_t = 5)]
        poll_secs: u64,
    },
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(tracing::Level::WARN)
        .init();
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            tracing::warn!(error = %e, "failed to read .env");
        }
    }

    let cli = Cli::parse();
    let api = ApiClient::with_timeout(&cli.base_url, Duration::from_secs(cli.timeout_secs))?;

    match cli.command {
        Command::Ping => print_json(&api.health().await?),
        Command::List { json } => run_list(&api, json, cli.user.as_deref()).await,
        Command::Send { text } => {
            let session = open_session(api, cli.user.as_deref())?;
            let stored = session.send_text(&text).await?;
            println!("{}", stored.id);
            Ok(())
        }
        Command::Upload { path, content_type } => {
            let session = open_session(api, cli.user.as_deref())?;
            let stored = send_path(&session, &path, content_type.as_deref()).await?;
            println!("{}", stored.content);
            Ok(())
        }
        Command::Watch { poll_secs } => {
            let session = open_session(api, cli.user.as_deref())?;
            run_watch(&session, Duration::from_secs(poll_secs.max(1))).await
        }
    }
}

fn open_session(api: ApiClient, user: Option<&str>) -> Result<ChatSession, CliError> {
    let user = user.ok_or(CliError::MissingUser)?;
    Ok(ChatSession::new(api, user)?)
}

async fn run_list(api: &ApiClient, json: bool, user: Option<&str>) -> Result<(), CliError> {
    let messages = api.fetch_messages().await?;
    if json {
        return print_json(&serde_json::to_value(&messages)?);
    }
    for message in &messages {
        let mine = user.is_some_and(|u| u.trim() == message.sender);
        println!("{}", render(message, mine, None));
    }
    Ok(())
}

async fn send_path(session: &ChatSession, path: &Path, content_type: Option<&str>) -> Result<Message, CliError> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| CliError::InvalidPath(path.to_path_buf()))?;
    let bytes = tokio::fs::read(path).await?;
    let content_type = content_type.unwrap_or_else(|| guess_content_type(file_name));
    Ok(session.send_file(bytes, file_name, content_type).await?)
}

// =============================================================================
// WATCH
// =============================================================================

enum Input<'a> {
    Empty,
    Quit,
    File(&'a str),
    Text(&'a str),
}

fn parse_input(line: &str) -> Input<'_> {
    let line = line.trim();
    if line.is_empty() {
        Input::Empty
    } else if line == "/quit" {
        Input::Quit
    } else if let Some(path) = line.strip_prefix("/file ") {
        Input::File(path.trim())
    } else {
        Input::Text(line)
    }
}

async fn run_watch(session: &ChatSession, interval: Duration) -> Result<(), CliError> {
    let _poller = session.start_polling(interval);
    let mut changes = session.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    // id -> whether the entry was last shown as failed
    let mut shown: HashMap<String, bool> = HashMap::new();

    eprintln!("watching as {} (type /quit to leave)", session.user());
    loop {
        tokio::select! {
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                print_updates(&session.entries().await, session.user(), &mut shown);
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                let sent = match parse_input(&line) {
                    Input::Empty => continue,
                    Input::Quit => break,
                    Input::File(path) => send_path(session, Path::new(path), None).await,
                    Input::Text(text) => session.send_text(text).await.map_err(CliError::from),
                };
                if let Err(e) = sent {
                    eprintln!("send failed: {e}");
                }
            }
        }
    }
    Ok(())
}

/// Print entries not shown yet, and entries that just failed.
fn print_updates(entries: &[TimelineEntry], user: &str, shown: &mut HashMap<String, bool>) {
    for entry in entries {
        let message = entry.message();
        let failed = matches!(entry.status(), Some(LocalStatus::Failed(_)));
        let previous = shown.insert(message.id.clone(), failed);
        let fresh = previous.is_none() || (failed && previous == Some(false));
        if fresh {
            println!("{}", render(message, entry.is_mine(user), entry.status()));
        }
    }
}

fn render(message: &Message, mine: bool, status: Option<&LocalStatus>) -> String {
    let time = message.timestamp.get(11..19).unwrap_or(&message.timestamp);
    let who = if mine { "you" } else { message.sender.as_str() };
    let body = match message.kind {
        MessageKind::Text => message.content.clone(),
        MessageKind::Image => format!("[image] {}", message.content),
        MessageKind::Audio => format!("[audio] {}", message.content),
    };
    let suffix = match status {
        None | Some(LocalStatus::Sent) => String::new(),
        Some(LocalStatus::Sending) => " (sending)".to_owned(),
        Some(LocalStatus::Failed(reason)) => format!(" (failed: {reason})"),
    };
    format!("{time} {who}: {body}{suffix}")
}

fn print_json(value: &Value) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
