use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use parley_gateway::api::ApiServer;
use parley_gateway::memory;
use parley_gateway::orchestrator::{ConversationRequest, Orchestrator};
use parley_gateway::session::normalize_user_id;
use parley_gateway::voice::AudioClip;
use parley_gateway::Config;

/// Parley - Multilingual voice conversation gateway with session memory
#[derive(Parser)]
#[command(name = "parley", version, about)]
struct Cli {
    /// Config file (defaults to the per-user config directory)
    #[arg(short, long, env = "PARLEY_CONFIG")]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API (the default)
    Serve {
        /// Port to listen on, overriding config
        #[arg(long)]
        port: Option<u16>,
    },
    /// Run one conversation turn from an audio file
    Chat {
        /// Recorded speech (wav, mp3, webm, ...)
        audio: PathBuf,
        /// Reply language (name or code)
        #[arg(short, long)]
        language: Option<String>,
        /// User whose session to use
        #[arg(short, long)]
        user: Option<String>,
        /// Do not remember this exchange
        #[arg(long)]
        no_persist: bool,
    },
    /// Print a user's stored session
    History {
        /// User ID
        #[arg(short, long)]
        user: Option<String>,
    },
    /// Remove a user's stored session
    Forget {
        /// User ID
        #[arg(short, long)]
        user: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,parley_gateway=info",
        1 => "info,parley_gateway=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli
        .config
        .as_deref()
        .map_or_else(Config::load, Config::load_from);
    tracing::debug!(?config.memory, ?config.server, "loaded configuration");

    match cli.command.unwrap_or(Command::Serve { port: None }) {
        Command::Serve { port } => serve(&config, port).await,
        Command::Chat {
            audio,
            language,
            user,
            no_persist,
        } => chat(&config, &audio, language, user, !no_persist).await,
        Command::History { user } => history(&config, user.as_deref()),
        Command::Forget { user } => forget(&config, &user),
    }
}

async fn serve(config: &Config, port: Option<u16>) -> anyhow::Result<()> {
    let port = port.unwrap_or(config.server.port);
    tracing::info!(port, "starting parley gateway");

    let orchestrator = Arc::new(Orchestrator::from_config(config)?);
    ApiServer::new(orchestrator, port, config.server.max_audio_bytes)
        .run()
        .await?;

    Ok(())
}

async fn chat(
    config: &Config,
    audio_path: &Path,
    language: Option<String>,
    user: Option<String>,
    persist: bool,
) -> anyhow::Result<()> {
    let bytes = std::fs::read(audio_path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", audio_path.display()))?;
    let audio = AudioClip::new(bytes, AudioClip::mime_for_path(audio_path));

    let orchestrator = Orchestrator::from_config(config)?;
    let reply = orchestrator
        .converse(ConversationRequest {
            audio: Some(audio),
            language,
            user_id: user,
            persist,
        })
        .await;

    println!("You ({}): {}", reply.language, reply.transcript);
    println!("Assistant: {}", reply.text);

    match reply.audio {
        Some(speech) => {
            let out = reply_path(audio_path);
            std::fs::write(&out, &speech.bytes)?;
            println!("Reply audio: {}", out.display());
        }
        None => println!("(no reply audio; synthesis failed)"),
    }

    Ok(())
}

/// `recording.wav` → `recording.reply.mp3`
fn reply_path(audio_path: &Path) -> PathBuf {
    let stem = audio_path
        .file_stem()
        .map_or_else(|| "reply".into(), |s| s.to_string_lossy());
    audio_path.with_file_name(format!("{stem}.reply.mp3"))
}

fn history(config: &Config, user: Option<&str>) -> anyhow::Result<()> {
    let user_id = normalize_user_id(user);
    let store = memory::open(&config.memory)?;
    let state = store.load_user(&user_id);

    println!("User: {user_id}");
    println!("Preferred language: {}", state.preferred_language);
    if state.history.is_empty() {
        println!("No stored turns.");
    }
    for turn in &state.history {
        println!("[{}] {}", turn.role().as_str(), turn.content());
    }

    Ok(())
}

fn forget(config: &Config, user: &str) -> anyhow::Result<()> {
    let user_id = normalize_user_id(Some(user));
    let store = memory::open(&config.memory)?;
    store.remove_user(&user_id);
    println!("Forgot session for {user_id}");
    Ok(())
}
