//! Configuration management for clipspeak.
//!
//! Loads config from YAML files in standard locations. Every section
//! has defaults, so both binaries run without a config file at all.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Well-known socket endpoint shared with the hotkey client.
    pub socket_path: PathBuf,
    /// Accept wakes up this often to re-check the running flag.
    pub accept_poll_ms: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from("/tmp/clipspeak.sock"),
            accept_poll_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VoicesConfig {
    /// Directory of `<name>.<codes_extension>` + `<name>.txt` pairs.
    pub dir: PathBuf,
    pub default_voice: String,
    pub codes_extension: String,
}

impl Default for VoicesConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("samples"),
            default_voice: "dave".into(),
            codes_extension: "pt".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Synthesis CLI resolved via PATH (or an absolute path).
    pub command: String,
    /// Extra arguments inserted before the generated ones.
    pub args: Vec<String>,
    /// Inputs longer than this many characters are truncated, not rejected.
    pub max_text_chars: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            command: "neutts".into(),
            args: vec![],
            max_text_chars: 500,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HotkeyConfig {
    pub speak_combo: Vec<String>,
    pub replay_combo: Vec<String>,
    pub quit_combo: Vec<String>,
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self {
            speak_combo: vec!["KEY_LEFTMETA".into(), "KEY_LEFTSHIFT".into(), "KEY_S".into()],
            replay_combo: vec!["KEY_LEFTMETA".into(), "KEY_LEFTSHIFT".into(), "KEY_R".into()],
            quit_combo: vec!["KEY_LEFTMETA".into(), "KEY_LEFTSHIFT".into(), "KEY_Q".into()],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Generous per-request deadline, sized well above worst-case synthesis.
    pub request_timeout_secs: u64,
    /// Short deadline for liveness pings.
    pub ping_timeout_ms: u64,
    /// Idle health-check interval in the hotkey client.
    pub ping_interval_secs: u64,
    pub retry_attempts: u32,
    pub retry_base_delay_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            ping_timeout_ms: 1500,
            ping_interval_secs: 30,
            retry_attempts: 3,
            retry_base_delay_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    pub notifications: bool,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            notifications: true,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub daemon: DaemonConfig,
    pub voices: VoicesConfig,
    pub engine: EngineConfig,
    pub hotkey: HotkeyConfig,
    pub client: ClientConfig,
    pub feedback: FeedbackConfig,
}

impl Config {
    /// Load configuration from YAML file.
    ///
    /// Searches standard locations if no path is provided:
    /// 1. ./config.yaml
    /// 2. ~/.config/clipspeak/config.yaml
    /// 3. /etc/clipspeak/config.yaml
    pub fn load(path: Option<&Path>) -> Self {
        let resolved = path.map(PathBuf::from).or_else(|| {
            let candidates = [
                std::env::current_dir().ok().map(|d| d.join("config.yaml")),
                dirs::home_dir().map(|h| h.join(".config/clipspeak/config.yaml")),
                Some(PathBuf::from("/etc/clipspeak/config.yaml")),
            ];
            candidates.into_iter().flatten().find(|p| p.exists())
        });

        let Some(config_path) = resolved else {
            info!("No config file found, using defaults");
            return Self::default();
        };

        match std::fs::read_to_string(&config_path) {
            Ok(contents) => match serde_yml::from_str(&contents) {
                Ok(config) => {
                    info!("Loaded config from {}", config_path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {e}, using defaults", config_path.display());
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read {}: {e}, using defaults", config_path.display());
                Self::default()
            }
        }
    }
}
