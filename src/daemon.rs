//! Daemon core: socket accept loop and request dispatch.
//!
//! INITIALIZING → LISTENING → STOPPING → STOPPED
//!
//! The daemon services exactly one connection at a time: read to EOF,
//! decode one request, dispatch, write one response, close. The
//! synthesis engine is stateful and non-reentrant, so this
//! single-request discipline is what keeps it (and the registry and
//! last-output slot) free of locks. Playback is the only concurrent
//! work, and the scheduler serializes it internally.

use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tracing::{info, warn};

use crate::config::DaemonConfig;
use crate::engine::Synthesizer;
use crate::error::InitError;
use crate::playback::PlaybackScheduler;
use crate::protocol::{Request, Response};
use crate::voices::VoiceRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonState {
    Initializing,
    Listening,
    Stopping,
    Stopped,
}

impl std::fmt::Display for DaemonState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initializing => write!(f, "INITIALIZING"),
            Self::Listening => write!(f, "LISTENING"),
            Self::Stopping => write!(f, "STOPPING"),
            Self::Stopped => write!(f, "STOPPED"),
        }
    }
}

pub struct TtsDaemon {
    socket_path: PathBuf,
    accept_poll: Duration,
    registry: VoiceRegistry,
    synthesizer: Synthesizer,
    playback: PlaybackScheduler,
    state: DaemonState,
    running: Arc<AtomicBool>,
}

impl TtsDaemon {
    pub fn new(
        config: &DaemonConfig,
        registry: VoiceRegistry,
        synthesizer: Synthesizer,
        playback: PlaybackScheduler,
    ) -> Self {
        Self {
            socket_path: config.socket_path.clone(),
            accept_poll: Duration::from_millis(config.accept_poll_ms),
            registry,
            synthesizer,
            playback,
            state: DaemonState::Initializing,
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Handle for signal tasks: clearing the flag makes the accept loop
    /// exit within one poll interval.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    pub fn state(&self) -> DaemonState {
        self.state
    }

    /// Bind the socket and serve requests until stopped.
    pub async fn run(&mut self) -> Result<(), InitError> {
        // A stale socket file from a crashed run blocks bind
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path)?;
        }

        let listener = UnixListener::bind(&self.socket_path).map_err(|source| InitError::Bind {
            path: self.socket_path.clone(),
            source,
        })?;

        // The channel is trusted because only the owning user can reach it
        if let Err(e) =
            std::fs::set_permissions(&self.socket_path, std::fs::Permissions::from_mode(0o600))
        {
            warn!("Failed to restrict socket permissions: {e}");
        }

        self.state = DaemonState::Listening;
        info!("State: INITIALIZING → LISTENING");
        info!("Listening on {}", self.socket_path.display());

        while self.running.load(Ordering::SeqCst) {
            match tokio::time::timeout(self.accept_poll, listener.accept()).await {
                Ok(Ok((stream, _addr))) => self.handle_connection(stream).await,
                Ok(Err(e)) => warn!("Accept failed: {e}"),
                // Timeout: loop around and re-check the running flag
                Err(_) => continue,
            }
        }

        self.state = DaemonState::Stopping;
        info!("State: LISTENING → STOPPING");

        drop(listener);
        if let Err(e) = std::fs::remove_file(&self.socket_path) {
            warn!("Failed to remove socket file: {e}");
        }

        self.state = DaemonState::Stopped;
        info!("State: STOPPING → STOPPED");
        Ok(())
    }

    /// One request/response cycle. Every failure path still answers and
    /// closes the connection; nothing here may poison the accept loop.
    async fn handle_connection(&mut self, mut stream: UnixStream) {
        let mut raw = Vec::new();
        if let Err(e) = stream.read_to_end(&mut raw).await {
            warn!("Failed to read request: {e}");
            return;
        }

        // A probe that connects and disconnects without sending anything
        if raw.is_empty() {
            return;
        }

        let text = String::from_utf8_lossy(&raw);
        let preview: String = text.chars().take(100).collect();
        info!("Request: {preview}");

        let response = match Request::decode(&text) {
            Ok(request) => self.dispatch(request).await,
            Err(e) => Response::err(e.to_string()),
        };

        if let Err(e) = stream.write_all(response.encode().as_bytes()).await {
            warn!("Failed to write response: {e}");
        }
        if let Err(e) = stream.shutdown().await {
            warn!("Failed to close connection: {e}");
        }
    }

    /// Route a decoded request. Only this path touches the registry, the
    /// engine, and the last-output slot.
    pub async fn dispatch(&mut self, request: Request) -> Response {
        match request {
            Request::Speak { text } => {
                match self.synthesizer.synthesize(&text, self.registry.current()) {
                    Ok(output) => {
                        let elapsed = output.elapsed.as_secs_f64();
                        self.playback.play(output.samples).await;
                        Response::ok_timed(format!("Generated in {elapsed:.2}s"), elapsed)
                    }
                    Err(e) => Response::err(e.to_string()),
                }
            }
            Request::Replay => match self.playback.replay().await {
                Ok(()) => Response::ok("Replaying audio"),
                Err(e) => Response::err(e.to_string()),
            },
            Request::SwitchVoice { voice } => match self.registry.select(&voice) {
                Ok(()) => Response::ok(format!("Switched to {voice}")),
                Err(e) => Response::err(e.to_string()),
            },
            Request::Stop => {
                info!("Stop requested");
                self.running.store(false, Ordering::SeqCst);
                Response::ok("Service stopping")
            }
            Request::Ping => Response::ok("Service is running"),
        }
    }
}
