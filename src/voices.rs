//! Voice registry: named reference voices and the current-voice pointer.
//!
//! Voices are loaded once at daemon startup and never change afterwards;
//! only the current-voice selection moves. A voice is a pre-encoded
//! reference (opaque bytes produced offline by the engine's encoder)
//! paired with the transcript of that reference audio.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::VoicesConfig;
use crate::error::{InitError, RequestError};

/// A usable voice: both the reference encoding and its transcript are
/// guaranteed present.
#[derive(Debug, Clone)]
pub struct Voice {
    pub name: String,
    /// Producer-defined reference encoding, passed through untouched.
    pub codes: Arc<Vec<u8>>,
    pub transcript: String,
}

/// One enumerated voice from a voice source.
#[derive(Debug, Clone)]
pub struct VoiceEntry {
    pub name: String,
    pub codes: Vec<u8>,
    pub transcript: String,
}

#[derive(Debug)]
pub struct VoiceRegistry {
    voices: HashMap<String, Voice>,
    current: String,
}

impl VoiceRegistry {
    /// Build a registry from enumerated voices.
    ///
    /// Fatal when empty. The current voice starts at `preferred` when
    /// that name is registered, otherwise at the first name in sorted
    /// order so the pointer is always a valid key.
    pub fn from_entries(
        entries: impl IntoIterator<Item = VoiceEntry>,
        preferred: &str,
        source_dir: &Path,
    ) -> Result<Self, InitError> {
        let mut voices = HashMap::new();
        for entry in entries {
            voices.insert(
                entry.name.clone(),
                Voice {
                    name: entry.name,
                    codes: Arc::new(entry.codes),
                    transcript: entry.transcript,
                },
            );
        }

        if voices.is_empty() {
            return Err(InitError::NoVoices(source_dir.to_path_buf()));
        }

        let current = if voices.contains_key(preferred) {
            preferred.to_string()
        } else {
            let first = {
                let mut names: Vec<&String> = voices.keys().collect();
                names.sort();
                names[0].clone()
            };
            warn!("Default voice '{preferred}' not found, using '{first}'");
            first
        };

        info!("Loaded {} voice(s), current: {current}", voices.len());
        Ok(Self { voices, current })
    }

    /// Move the current-voice pointer. Rejects unknown names without
    /// touching any state.
    pub fn select(&mut self, name: &str) -> Result<(), RequestError> {
        if !self.voices.contains_key(name) {
            return Err(RequestError::VoiceNotFound(name.to_string()));
        }
        self.current = name.to_string();
        info!("Switched to voice: {name}");
        Ok(())
    }

    pub fn current(&self) -> &Voice {
        // Invariant: `current` is always a valid key (checked at
        // construction and in select)
        &self.voices[&self.current]
    }

}

/// Scan a voice directory for `<name>.<ext>` reference-code files paired
/// with `<name>.txt` transcripts. Unpaired or unreadable entries are
/// skipped with a warning; the caller decides whether an empty result is
/// fatal.
pub fn scan_voice_dir(config: &VoicesConfig) -> Vec<VoiceEntry> {
    let dir = &config.dir;
    let mut entries = Vec::new();

    let read_dir = match std::fs::read_dir(dir) {
        Ok(rd) => rd,
        Err(e) => {
            warn!("Cannot read voices dir {}: {e}", dir.display());
            return entries;
        }
    };

    for dir_entry in read_dir.flatten() {
        let path = dir_entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(config.codes_extension.as_str()) {
            continue;
        }
        let Some(name) = path.file_stem().and_then(|s| s.to_str()).map(String::from) else {
            continue;
        };

        let transcript_path = path.with_extension("txt");
        if !transcript_path.exists() {
            warn!("Voice '{name}' has no transcript, skipping");
            continue;
        }

        let codes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Failed to read voice '{name}': {e}");
                continue;
            }
        };
        let transcript = match std::fs::read_to_string(&transcript_path) {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                warn!("Failed to read transcript for '{name}': {e}");
                continue;
            }
        };

        info!("Found voice: {name}");
        entries.push(VoiceEntry {
            name,
            codes,
            transcript,
        });
    }

    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn entry(name: &str) -> VoiceEntry {
        VoiceEntry {
            name: name.into(),
            codes: vec![1, 2, 3],
            transcript: format!("reference for {name}"),
        }
    }

    #[test]
    fn empty_registry_is_fatal() {
        let err = VoiceRegistry::from_entries([], "dave", Path::new("samples")).unwrap_err();
        assert!(matches!(err, InitError::NoVoices(_)));
    }

    #[test]
    fn preferred_voice_wins_when_present() {
        let registry =
            VoiceRegistry::from_entries([entry("alice"), entry("dave")], "dave", Path::new("x"))
                .unwrap();
        assert_eq!(registry.current().name, "dave");
    }

    #[test]
    fn missing_preferred_falls_back_to_first_sorted() {
        let registry =
            VoiceRegistry::from_entries([entry("zoe"), entry("alice")], "dave", Path::new("x"))
                .unwrap();
        assert_eq!(registry.current().name, "alice");
    }

    #[test]
    fn select_unknown_leaves_current_unchanged() {
        let mut registry =
            VoiceRegistry::from_entries([entry("alice"), entry("dave")], "dave", Path::new("x"))
                .unwrap();

        let err = registry.select("nobody").unwrap_err();
        assert!(matches!(err, RequestError::VoiceNotFound(_)));
        assert_eq!(registry.current().name, "dave");

        registry.select("alice").unwrap();
        assert_eq!(registry.current().name, "alice");
    }

    #[test]
    fn scan_skips_unpaired_references() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("dave.pt"), b"codes").unwrap();
        std::fs::write(dir.path().join("dave.txt"), "hello there\n").unwrap();
        std::fs::write(dir.path().join("orphan.pt"), b"codes").unwrap();
        std::fs::write(dir.path().join("readme.md"), "ignored").unwrap();

        let config = VoicesConfig {
            dir: PathBuf::from(dir.path()),
            default_voice: "dave".into(),
            codes_extension: "pt".into(),
        };
        let entries = scan_voice_dir(&config);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "dave");
        assert_eq!(entries[0].transcript, "hello there");
    }
}
