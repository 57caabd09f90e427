//! clipspeak-hotkey: trigger client for the speech daemon.
//!
//! Default mode listens for global hotkeys (speak clipboard, replay,
//! quit) and reports every outcome as a desktop notification. One-shot
//! subcommands cover the same protocol actions for scripting:
//!
//! ```bash
//! clipspeak-hotkey speak "read this aloud"
//! clipspeak-hotkey voice alice
//! clipspeak-hotkey stop
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use clipspeak::client::{TtsClient, UnixTransport};
use clipspeak::clipboard;
use clipspeak::config::Config;
use clipspeak::hotkey::{HotkeyAction, HotkeyMonitor};
use clipspeak::notifier::Notifier;
use clipspeak::protocol::{Request, Response};

#[derive(Parser, Debug)]
#[command(name = "clipspeak-hotkey", about = "Hotkey client for clipspeakd")]
struct Args {
    /// Path to config.yaml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Socket path override
    #[arg(short, long)]
    socket: Option<PathBuf>,

    /// Enable verbose (debug) logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Speak the given text (or the clipboard when omitted)
    Speak { text: Option<String> },
    /// Replay the last generated audio
    Replay,
    /// Switch the daemon to another voice
    Voice { name: String },
    /// Stop the daemon
    Stop,
    /// Check whether the daemon is alive
    Ping,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = Config::load(args.config.as_deref());
    if let Some(socket) = args.socket {
        config.daemon.socket_path = socket;
    }

    let client = TtsClient::unix(&config.daemon.socket_path, &config.client);

    match args.command {
        Some(command) => run_one_shot(&client, command).await,
        None => run_hotkey_loop(&config, &client).await,
    }
}

/// Execute a single protocol action and print the outcome.
async fn run_one_shot(
    client: &TtsClient<UnixTransport>,
    command: Command,
) -> Result<(), Box<dyn std::error::Error>> {
    let request = match command {
        Command::Speak { text } => {
            let text = match text {
                Some(text) => text,
                None => clipboard::read_text()?,
            };
            Request::Speak { text }
        }
        Command::Replay => Request::Replay,
        Command::Voice { name } => Request::SwitchVoice { voice: name },
        Command::Stop => Request::Stop,
        Command::Ping => Request::Ping,
    };

    let response = client.call(&request).await?;
    match response.time {
        Some(time) => println!("{} ({time}s)", response.message),
        None => println!("{}", response.message),
    }

    if response.is_success() {
        Ok(())
    } else {
        Err(response.message.into())
    }
}

/// Listen for hotkeys until quit. A failed action notifies and keeps
/// listening; only the quit hotkey ends the loop.
async fn run_hotkey_loop(
    config: &Config,
    client: &TtsClient<UnixTransport>,
) -> Result<(), Box<dyn std::error::Error>> {
    let notifier = Notifier::new(config.feedback.notifications);

    // Require a responsive daemon before registering any triggers
    match client.ping().await {
        Ok(response) if response.is_success() => {
            info!("Connected to daemon at {}", config.daemon.socket_path.display());
        }
        Ok(response) => {
            error!("Daemon is unhealthy: {}", response.message);
            std::process::exit(1);
        }
        Err(e) => {
            error!("Daemon is not running: {e}");
            error!("Start it first with: clipspeakd");
            std::process::exit(1);
        }
    }

    notifier.notify("Clipspeak ready", "Hotkeys: speak clipboard / replay / quit");

    let (hotkey_tx, mut hotkey_rx) = mpsc::channel::<HotkeyAction>(16);
    let monitor = HotkeyMonitor::new(&config.hotkey, hotkey_tx);
    tokio::spawn(async move {
        monitor.run().await;
    });

    info!("Listening for hotkeys");

    let mut ping_interval =
        tokio::time::interval(Duration::from_secs(config.client.ping_interval_secs));
    ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick fires immediately; the startup ping already covered it
    ping_interval.tick().await;
    let mut daemon_up = true;

    loop {
        tokio::select! {
            action = hotkey_rx.recv() => {
                match action {
                    Some(HotkeyAction::SpeakClipboard) => {
                        on_speak(client, &notifier).await;
                    }
                    Some(HotkeyAction::ReplayLast) => {
                        on_replay(client, &notifier).await;
                    }
                    Some(HotkeyAction::Quit) => {
                        on_quit(client, &notifier).await;
                        break;
                    }
                    None => {
                        warn!("Hotkey channel closed");
                        break;
                    }
                }
            }
            _ = ping_interval.tick() => {
                // Proactively detect daemon disappearance between actions
                let alive = matches!(client.ping().await, Ok(r) if r.is_success());
                if daemon_up && !alive {
                    warn!("Daemon stopped responding");
                    notifier.notify("Clipspeak", "Daemon is not responding. Restart it with: clipspeakd");
                } else if !daemon_up && alive {
                    info!("Daemon is back");
                    notifier.notify("Clipspeak", "Daemon is back online");
                }
                daemon_up = alive;
            }
        }
    }

    info!("Hotkey client stopped");
    Ok(())
}

async fn on_speak(client: &TtsClient<UnixTransport>, notifier: &Notifier) {
    info!("Speak hotkey pressed");

    let text = match clipboard::read_text() {
        Ok(text) => text,
        Err(e) => {
            warn!("{e}");
            notifier.notify("Clipspeak error", &e);
            return;
        }
    };

    if text.trim().is_empty() {
        warn!("Clipboard is empty");
        notifier.notify("Clipspeak", "Clipboard is empty");
        return;
    }

    let preview: String = text.chars().take(50).collect();
    info!("Clipboard: \"{preview}...\"");
    notifier.notify("Clipspeak", "Reading text...");

    match client.call(&Request::Speak { text }).await {
        Ok(response) => notify_outcome(notifier, &response),
        Err(e) => {
            error!("Speak failed: {e}");
            notifier.notify("Clipspeak error", &e.to_string());
        }
    }
}

async fn on_replay(client: &TtsClient<UnixTransport>, notifier: &Notifier) {
    info!("Replay hotkey pressed");

    match client.call(&Request::Replay).await {
        Ok(response) => notify_outcome(notifier, &response),
        Err(e) => {
            error!("Replay failed: {e}");
            notifier.notify("Clipspeak error", &e.to_string());
        }
    }
}

/// The client owns its shutdown: the daemon's answer (or silence) does
/// not change the decision to exit.
async fn on_quit(client: &TtsClient<UnixTransport>, notifier: &Notifier) {
    info!("Quit hotkey pressed");

    match client.call(&Request::Stop).await {
        Ok(_) => info!("Daemon stopping"),
        Err(e) => warn!("Could not reach daemon to stop it: {e}"),
    }
    notifier.notify("Clipspeak", "Stopped");
}

fn notify_outcome(notifier: &Notifier, response: &Response) {
    if response.is_success() {
        match response.time {
            Some(time) => notifier.notify("Clipspeak", &format!("Done! ({time}s)")),
            None => notifier.notify("Clipspeak", &response.message),
        }
    } else {
        error!("Daemon error: {}", response.message);
        notifier.notify("Clipspeak error", &response.message);
    }
}
