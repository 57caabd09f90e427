//! Error types for clipspeak.
//!
//! Layered by who recovers: `InitError` is fatal to the daemon process,
//! `RequestError` is answered per-request over the socket, and
//! `TransportError`/`ClientError` live on the client side of the wire.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal startup failures. The daemon exits non-zero on any of these.
#[derive(Error, Debug)]
pub enum InitError {
    #[error("no voices found in {0}. Each voice needs a reference-codes file plus a matching .txt transcript.")]
    NoVoices(PathBuf),

    #[error("synthesis engine failed to initialize: {0}")]
    Engine(String),

    #[error("failed to bind socket {path}: {source}")]
    Bind {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Per-request failures. Always answered with a `status=error` response,
/// never allowed to take down the accept loop.
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("unknown action: {0}")]
    UnknownAction(String),

    #[error("empty text")]
    EmptyInput,

    #[error("voice '{0}' not found")]
    VoiceNotFound(String),

    #[error("no audio generated yet, nothing to replay")]
    NoAudioAvailable,

    #[error("synthesis failed: {0}")]
    SynthesisFailed(String),
}

/// Connection-level failures on the client. All of these are transient
/// and worth retrying: a daemon that is restarting or briefly busy looks
/// exactly like this.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("socket not found")]
    EndpointNotFound,

    #[error("connection refused")]
    ConnectionRefused,

    #[error("request timed out")]
    Timeout,

    #[error("connection error: {0}")]
    Connection(String),
}

/// Terminal outcomes of a client call, after any retries.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("daemon unreachable after {attempts} attempts ({last}). Restart it with: clipspeakd")]
    ServiceUnavailable {
        attempts: u32,
        #[source]
        last: TransportError,
    },

    #[error("malformed response from daemon: {0}")]
    MalformedResponse(String),
}
