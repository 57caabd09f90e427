//! Client connector: one connection per request, bounded retries.
//!
//! The transport is a trait seam so the retry policy can be exercised
//! against a fake in tests. A round trip is: connect, write the encoded
//! request, half-close the write side, read the response to EOF.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, TransportError};
use crate::protocol::{Request, Response};

#[async_trait]
pub trait Transport: Send + Sync {
    async fn round_trip(&self, request: &[u8], timeout: Duration) -> Result<Vec<u8>, TransportError>;
}

/// Unix-domain-socket transport against the daemon's well-known path.
pub struct UnixTransport {
    socket_path: PathBuf,
}

impl UnixTransport {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
        }
    }

    async fn exchange(&self, request: &[u8]) -> std::io::Result<Vec<u8>> {
        let mut stream = UnixStream::connect(&self.socket_path).await?;
        stream.write_all(request).await?;
        // Half-close signals end-of-request; the daemon reads to EOF
        stream.shutdown().await?;

        let mut response = Vec::new();
        stream.read_to_end(&mut response).await?;
        Ok(response)
    }
}

#[async_trait]
impl Transport for UnixTransport {
    async fn round_trip(&self, request: &[u8], timeout: Duration) -> Result<Vec<u8>, TransportError> {
        match tokio::time::timeout(timeout, self.exchange(request)).await {
            Ok(Ok(bytes)) => Ok(bytes),
            Ok(Err(e)) => Err(match e.kind() {
                ErrorKind::NotFound => TransportError::EndpointNotFound,
                ErrorKind::ConnectionRefused => TransportError::ConnectionRefused,
                _ => TransportError::Connection(e.to_string()),
            }),
            Err(_) => Err(TransportError::Timeout),
        }
    }
}

/// Bounded retries with linearly increasing backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Delay before the retry that follows `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

pub struct TtsClient<T: Transport> {
    transport: T,
    retry: RetryPolicy,
    request_timeout: Duration,
    ping_timeout: Duration,
}

impl TtsClient<UnixTransport> {
    pub fn unix(socket_path: impl Into<PathBuf>, config: &ClientConfig) -> Self {
        Self::new(UnixTransport::new(socket_path), config)
    }
}

impl<T: Transport> TtsClient<T> {
    pub fn new(transport: T, config: &ClientConfig) -> Self {
        Self {
            transport,
            retry: RetryPolicy {
                max_attempts: config.retry_attempts,
                base_delay: Duration::from_millis(config.retry_base_delay_ms),
            },
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            ping_timeout: Duration::from_millis(config.ping_timeout_ms),
        }
    }

    /// Send one request, retrying transient connection failures per the
    /// policy. A response that cannot be decoded is terminal and is not
    /// retried.
    pub async fn call(&self, request: &Request) -> Result<Response, ClientError> {
        let encoded = request.encode();
        let mut last_error = TransportError::EndpointNotFound;

        for attempt in 1..=self.retry.max_attempts {
            match self
                .transport
                .round_trip(encoded.as_bytes(), self.request_timeout)
                .await
            {
                Ok(raw) => {
                    return Response::decode(&raw).map_err(ClientError::MalformedResponse);
                }
                Err(e) => {
                    warn!("Attempt {attempt}/{} failed: {e}", self.retry.max_attempts);
                    last_error = e;
                    if attempt < self.retry.max_attempts {
                        let delay = self.retry.delay_after(attempt);
                        debug!("Retrying in {}ms", delay.as_millis());
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Err(ClientError::ServiceUnavailable {
            attempts: self.retry.max_attempts,
            last: last_error,
        })
    }

    /// Liveness probe: one short-timeout attempt, no retries. Retrying
    /// would only delay the "daemon gone" verdict.
    pub async fn ping(&self) -> Result<Response, ClientError> {
        let encoded = Request::Ping.encode();
        let raw = self
            .transport
            .round_trip(encoded.as_bytes(), self.ping_timeout)
            .await
            .map_err(|e| ClientError::ServiceUnavailable {
                attempts: 1,
                last: e,
            })?;
        Response::decode(&raw).map_err(ClientError::MalformedResponse)
    }
}
