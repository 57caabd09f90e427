//! Synthesis engine adapter: input policy, timing, and the subprocess
//! backend.
//!
//! The engine itself is a black box behind [`SynthesisEngine`]: text plus
//! a voice reference in, 24 kHz mono f32 samples out. The [`Synthesizer`]
//! adapter owns the input-length policy (truncate, never reject) and
//! measures wall-clock synthesis time for reporting.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::{InitError, RequestError};
use crate::voices::Voice;

pub const SAMPLE_RATE: u32 = 24000;

/// Black-box synthesis capability. Implementations block until the
/// audio is ready or the attempt has failed.
pub trait SynthesisEngine {
    fn synthesize(&mut self, text: &str, voice: &Voice) -> Result<Vec<f32>, String>;
}

/// Output of a successful synthesis call.
#[derive(Debug)]
pub struct SynthesisOutput {
    pub samples: Vec<f32>,
    pub elapsed: Duration,
}

/// Wraps an engine with the request-facing input policy.
pub struct Synthesizer {
    engine: Box<dyn SynthesisEngine + Send>,
    max_text_chars: usize,
}

impl Synthesizer {
    pub fn new(engine: Box<dyn SynthesisEngine + Send>, max_text_chars: usize) -> Self {
        Self {
            engine,
            max_text_chars,
        }
    }

    /// Synthesize `text` with `voice`.
    ///
    /// Empty-after-trim text is rejected without touching the engine.
    /// Over-budget text is truncated at a char boundary and logged;
    /// truncation is never an error. Engine failures are surfaced
    /// immediately, with no retry.
    pub fn synthesize(
        &mut self,
        text: &str,
        voice: &Voice,
    ) -> Result<SynthesisOutput, RequestError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(RequestError::EmptyInput);
        }

        let text = if text.chars().count() > self.max_text_chars {
            let truncated: String = text.chars().take(self.max_text_chars).collect();
            warn!("Text truncated to {} characters", self.max_text_chars);
            truncated
        } else {
            text.to_string()
        };

        let preview: String = text.chars().take(50).collect();
        info!("Generating with voice '{}': \"{preview}...\"", voice.name);

        let start = Instant::now();
        let samples = self
            .engine
            .synthesize(&text, voice)
            .map_err(RequestError::SynthesisFailed)?;
        let elapsed = start.elapsed();

        info!("Generated in {:.2}s", elapsed.as_secs_f64());
        Ok(SynthesisOutput { samples, elapsed })
    }
}

/// Subprocess-based engine backend.
///
/// Invokes a synthesis CLI per request:
///
/// ```text
/// <command> [args..] --ref-codes <file> --ref-text <file> --output <wav> --text <text>
/// ```
///
/// The reference codes and transcript are handed over as temp files, and
/// the 24 kHz WAV output is read back with hound.
pub struct CommandEngine {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandEngine {
    pub fn new(config: &EngineConfig) -> Result<Self, InitError> {
        let program = which::which(&config.command).map_err(|e| {
            InitError::Engine(format!("cannot find '{}' in PATH: {e}", config.command))
        })?;

        info!("Using synthesis engine: {}", program.display());
        Ok(Self {
            program,
            args: config.args.clone(),
        })
    }
}

impl SynthesisEngine for CommandEngine {
    fn synthesize(&mut self, text: &str, voice: &Voice) -> Result<Vec<f32>, String> {
        let mut codes_file = tempfile::Builder::new()
            .prefix("clipspeak_codes_")
            .tempfile()
            .map_err(|e| format!("failed to create temp file: {e}"))?;
        codes_file
            .write_all(&voice.codes)
            .map_err(|e| format!("failed to write reference codes: {e}"))?;

        let ref_text_file = tempfile::Builder::new()
            .prefix("clipspeak_ref_")
            .suffix(".txt")
            .tempfile()
            .map_err(|e| format!("failed to create temp file: {e}"))?;
        std::fs::write(ref_text_file.path(), &voice.transcript)
            .map_err(|e| format!("failed to write reference transcript: {e}"))?;

        let wav_file = tempfile::Builder::new()
            .prefix("clipspeak_out_")
            .suffix(".wav")
            .tempfile()
            .map_err(|e| format!("failed to create temp file: {e}"))?;

        debug!("Running {} for {} chars", self.program.display(), text.len());

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg("--ref-codes")
            .arg(codes_file.path())
            .arg("--ref-text")
            .arg(ref_text_file.path())
            .arg("--output")
            .arg(wav_file.path())
            .arg("--text")
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| format!("failed to run engine: {e}"))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail: String = stderr.lines().last().unwrap_or("").chars().take(200).collect();
            return Err(format!("engine exited with {}: {tail}", output.status));
        }

        read_wav_samples(wav_file.path())
    }
}

/// Read a WAV file into f32 samples, accepting both float and 16-bit
/// integer encodings.
fn read_wav_samples(path: &std::path::Path) -> Result<Vec<f32>, String> {
    let mut reader =
        hound::WavReader::open(path).map_err(|e| format!("failed to read engine output: {e}"))?;
    let spec = reader.spec();

    if spec.sample_rate != SAMPLE_RATE {
        warn!(
            "Engine produced {} Hz audio, expected {SAMPLE_RATE} Hz",
            spec.sample_rate
        );
    }

    let samples: Result<Vec<f32>, _> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect(),
        hound::SampleFormat::Int => reader
            .samples::<i16>()
            .map(|s| s.map(|v| f32::from(v) / 32768.0))
            .collect(),
    };

    samples.map_err(|e| format!("failed to decode engine output: {e}"))
}
