//! Playback scheduling: fire-and-forget audio with strict serialization.
//!
//! A single worker task drains a queue of buffers, so at most one
//! playback is ever active and buffers play in the order they were
//! scheduled. The request path never waits on the audio device; by the
//! time playback finishes, the response has long been sent, so device
//! errors are logged rather than surfaced.

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::engine::SAMPLE_RATE;
use crate::error::RequestError;

/// Pending playbacks allowed before `play` would apply backpressure to
/// the request path. In practice the queue never gets past one or two.
const QUEUE_DEPTH: usize = 16;

/// Blocking audio device seam. `play` returns once the buffer has been
/// rendered to completion.
pub trait AudioOutput: Send + Sync {
    fn play(&self, samples: &[f32]) -> Result<(), String>;
}

/// Rodio-backed output. The stream handle stays alive for the process
/// lifetime; each playback gets a fresh sink on the shared mixer.
pub struct RodioOutput {
    stream: rodio::OutputStream,
}

impl RodioOutput {
    pub fn open() -> Result<Self, String> {
        let stream = rodio::OutputStreamBuilder::open_default_stream()
            .map_err(|e| format!("failed to open audio output: {e}"))?;
        Ok(Self { stream })
    }
}

impl AudioOutput for RodioOutput {
    fn play(&self, samples: &[f32]) -> Result<(), String> {
        let sink = rodio::Sink::connect_new(self.stream.mixer());
        let source = rodio::buffer::SamplesBuffer::new(1, SAMPLE_RATE, samples.to_vec());
        sink.append(source);
        sink.sleep_until_end();
        Ok(())
    }
}

pub struct PlaybackScheduler {
    tx: mpsc::Sender<Arc<Vec<f32>>>,
    /// Single-slot handle to the most recently scheduled buffer.
    last: Option<Arc<Vec<f32>>>,
}

impl PlaybackScheduler {
    /// Spawn the playback worker. Must be called from within a tokio
    /// runtime; the worker exits when the scheduler is dropped.
    pub fn spawn(output: Arc<dyn AudioOutput>) -> Self {
        let (tx, mut rx) = mpsc::channel::<Arc<Vec<f32>>>(QUEUE_DEPTH);

        tokio::spawn(async move {
            while let Some(buffer) = rx.recv().await {
                debug!(
                    "Playing {} samples ({:.1}s)",
                    buffer.len(),
                    buffer.len() as f32 / SAMPLE_RATE as f32
                );
                let out = output.clone();
                let result =
                    tokio::task::spawn_blocking(move || out.play(&buffer)).await;
                match result {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => warn!("Playback failed: {e}"),
                    Err(e) => warn!("Playback task panicked: {e}"),
                }
            }
        });

        Self { tx, last: None }
    }

    /// Store `samples` in the last-output slot and schedule playback
    /// without blocking the caller.
    pub async fn play(&mut self, samples: Vec<f32>) {
        let buffer = Arc::new(samples);
        self.last = Some(buffer.clone());
        self.enqueue(buffer).await;
    }

    /// Re-schedule the last generated buffer.
    pub async fn replay(&mut self) -> Result<(), RequestError> {
        let buffer = self
            .last
            .clone()
            .ok_or(RequestError::NoAudioAvailable)?;
        self.enqueue(buffer).await;
        Ok(())
    }

    async fn enqueue(&self, buffer: Arc<Vec<f32>>) {
        if self.tx.send(buffer).await.is_err() {
            warn!("Playback worker is gone, dropping buffer");
        }
    }
}
