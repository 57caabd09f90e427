//! clipspeakd: the resident speech synthesis daemon.
//!
//! Loads the synthesis engine and voice registry once, then serves
//! speak/replay/switch_voice/stop/ping requests over a Unix socket
//! until stopped by a client or a signal.

use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use clipspeak::config::Config;
use clipspeak::daemon::TtsDaemon;
use clipspeak::engine::{CommandEngine, Synthesizer};
use clipspeak::playback::{PlaybackScheduler, RodioOutput};
use clipspeak::voices::{scan_voice_dir, VoiceRegistry};

#[derive(Parser, Debug)]
#[command(name = "clipspeakd", about = "Speech synthesis daemon")]
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

    info!("clipspeakd starting");

    let mut config = Config::load(args.config.as_deref());
    if let Some(socket) = args.socket {
        config.daemon.socket_path = socket;
    }

    // Resolve the engine binary up front; a daemon without an engine is useless
    let engine = match CommandEngine::new(&config.engine) {
        Ok(engine) => engine,
        Err(e) => {
            error!("{e}");
            return Err(e.into());
        }
    };
    let synthesizer = Synthesizer::new(Box::new(engine), config.engine.max_text_chars);

    info!("Loading voices from {}", config.voices.dir.display());
    let entries = scan_voice_dir(&config.voices);
    let registry = match VoiceRegistry::from_entries(
        entries,
        &config.voices.default_voice,
        &config.voices.dir,
    ) {
        Ok(registry) => registry,
        Err(e) => {
            error!("{e}");
            return Err(e.into());
        }
    };

    let output = match RodioOutput::open() {
        Ok(output) => Arc::new(output),
        Err(e) => {
            error!("{e}");
            return Err(e.into());
        }
    };
    let playback = PlaybackScheduler::spawn(output);

    let mut daemon = TtsDaemon::new(&config.daemon, registry, synthesizer, playback);

    // SIGINT/SIGTERM clear the running flag; the accept loop notices
    // within one poll interval and shuts down cleanly
    let running = daemon.stop_flag();
    tokio::spawn(async move {
        let mut term = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        {
            Ok(term) => term,
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("Received SIGINT, shutting down"),
            _ = term.recv() => info!("Received SIGTERM, shutting down"),
        }
        running.store(false, Ordering::SeqCst);
    });

    daemon.run().await?;

    info!("clipspeakd stopped");
    Ok(())
}
