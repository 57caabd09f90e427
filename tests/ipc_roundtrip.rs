//! End-to-end daemon/client exercise over a real Unix socket.
//!
//! Uses a fake engine and a silent audio output so the test runs
//! anywhere; everything else (socket, protocol, dispatch, retries) is
//! the real code path.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;

use clipspeak::client::TtsClient;
use clipspeak::config::{ClientConfig, DaemonConfig};
use clipspeak::daemon::TtsDaemon;
use clipspeak::engine::{SynthesisEngine, Synthesizer};
use clipspeak::error::ClientError;
use clipspeak::playback::AudioOutput;
use clipspeak::protocol::{Request, Response, Status};
use clipspeak::voices::{Voice, VoiceEntry, VoiceRegistry};

struct FakeEngine;

impl SynthesisEngine for FakeEngine {
    fn synthesize(&mut self, _text: &str, _voice: &Voice) -> Result<Vec<f32>, String> {
        Ok(vec![0.1; 240])
    }
}

struct SilentOutput;

impl AudioOutput for SilentOutput {
    fn play(&self, _samples: &[f32]) -> Result<(), String> {
        Ok(())
    }
}

fn test_registry() -> VoiceRegistry {
    let entries = ["dave", "alice"].into_iter().map(|name| VoiceEntry {
        name: name.into(),
        codes: vec![0u8; 4],
        transcript: "reference".into(),
    });
    VoiceRegistry::from_entries(entries, "dave", Path::new("samples")).unwrap()
}

async fn start_daemon(socket_path: &Path) -> tokio::task::JoinHandle<()> {
    let config = DaemonConfig {
        socket_path: socket_path.to_path_buf(),
        accept_poll_ms: 50,
    };
    let synthesizer = Synthesizer::new(Box::new(FakeEngine), 500);
    let playback = clipspeak::playback::PlaybackScheduler::spawn(Arc::new(SilentOutput));
    let mut daemon = TtsDaemon::new(&config, test_registry(), synthesizer, playback);

    let handle = tokio::spawn(async move {
        daemon.run().await.expect("daemon run failed");
    });

    // Wait for the socket to appear
    for _ in 0..100 {
        if socket_path.exists() {
            return handle;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("daemon never bound {}", socket_path.display());
}

fn test_client(socket_path: &Path) -> TtsClient<clipspeak::client::UnixTransport> {
    let config = ClientConfig {
        request_timeout_secs: 5,
        ping_timeout_ms: 500,
        retry_attempts: 3,
        retry_base_delay_ms: 10,
        ..ClientConfig::default()
    };
    TtsClient::unix(socket_path, &config)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn full_request_cycle_over_the_socket() {
    let dir = tempfile::tempdir().unwrap();
    let socket_path = dir.path().join("clipspeak-test.sock");
    let daemon = start_daemon(&socket_path).await;
    let client = test_client(&socket_path);

    // Liveness
    let response = client.ping().await.unwrap();
    assert_eq!(response.status, Status::Success);

    // Replay before any speak
    let response = client.call(&Request::Replay).await.unwrap();
    assert_eq!(response.status, Status::Error);

    // Speak carries elapsed time
    let response = client
        .call(&Request::Speak {
            text: "hello from the test".into(),
        })
        .await
        .unwrap();
    assert_eq!(response.status, Status::Success);
    assert!(response.time.is_some());

    // Replay now works
    let response = client.call(&Request::Replay).await.unwrap();
    assert_eq!(response.status, Status::Success);

    // Voice switching, both arms
    let response = client
        .call(&Request::SwitchVoice {
            voice: "alice".into(),
        })
        .await
        .unwrap();
    assert_eq!(response.status, Status::Success);

    let response = client
        .call(&Request::SwitchVoice {
            voice: "nobody".into(),
        })
        .await
        .unwrap();
    assert_eq!(response.status, Status::Error);
    assert!(response.message.contains("nobody"));

    // Empty speak is an error, not a crash
    let response = client
        .call(&Request::Speak { text: "  ".into() })
        .await
        .unwrap();
    assert_eq!(response.status, Status::Error);

    // Stop answers success, then the daemon tears down the socket
    let response = client.call(&Request::Stop).await.unwrap();
    assert_eq!(response.status, Status::Success);

    tokio::time::timeout(Duration::from_secs(2), daemon)
        .await
        .expect("daemon did not stop")
        .unwrap();
    assert!(!socket_path.exists(), "socket file must be removed");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unknown_and_malformed_requests_get_error_responses() {
    let dir = tempfile::tempdir().unwrap();
    let socket_path = dir.path().join("clipspeak-test.sock");
    let daemon = start_daemon(&socket_path).await;

    for (raw, needle) in [
        (r#"{"action":"shout"}"#, "unknown action"),
        (r#"{"action":"speak"}"#, "invalid request"),
        ("definitely not json", "invalid request"),
    ] {
        let mut stream = UnixStream::connect(&socket_path).await.unwrap();
        stream.write_all(raw.as_bytes()).await.unwrap();
        stream.shutdown().await.unwrap();

        let mut body = Vec::new();
        stream.read_to_end(&mut body).await.unwrap();
        let response = Response::decode(&body).unwrap();
        assert_eq!(response.status, Status::Error, "raw: {raw}");
        assert!(
            response.message.contains(needle),
            "raw: {raw}, message: {}",
            response.message
        );
    }

    // The daemon survived all of that
    let client = test_client(&socket_path);
    let response = client.ping().await.unwrap();
    assert_eq!(response.status, Status::Success);

    client.call(&Request::Stop).await.unwrap();
    let _ = tokio::time::timeout(Duration::from_secs(2), daemon).await;
}

#[tokio::test]
async fn missing_endpoint_exhausts_retries() {
    let client = test_client(Path::new("/tmp/clipspeak-definitely-missing.sock"));

    let err = client.call(&Request::Ping).await.unwrap_err();
    match err {
        ClientError::ServiceUnavailable { attempts, .. } => assert_eq!(attempts, 3),
        other => panic!("expected ServiceUnavailable, got {other:?}"),
    }
}
