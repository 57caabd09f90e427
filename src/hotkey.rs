//! Global hotkey detection using evdev.
//!
//! Monitors all keyboard devices and maps configured key combos to
//! client actions. An action fires once when its combo becomes fully
//! held, and re-arms when any of its keys is released.

use crate::config::HotkeyConfig;
use evdev::{Device, EventType, InputEventKind, Key};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// User-facing actions triggered by hotkeys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyAction {
    SpeakClipboard,
    ReplayLast,
    Quit,
}

impl std::fmt::Display for HotkeyAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SpeakClipboard => write!(f, "speak-clipboard"),
            Self::ReplayLast => write!(f, "replay-last"),
            Self::Quit => write!(f, "quit"),
        }
    }
}

/// Resolve a key name like "KEY_LEFTMETA" to an evdev Key code.
/// evdev has no name lookup, so common keys are mapped by hand.
fn resolve_key(name: &str) -> Option<Key> {
    let key = match name {
        "KEY_LEFTMETA" => Key::KEY_LEFTMETA,
        "KEY_RIGHTMETA" => Key::KEY_RIGHTMETA,
        "KEY_LEFTALT" => Key::KEY_LEFTALT,
        "KEY_RIGHTALT" => Key::KEY_RIGHTALT,
        "KEY_LEFTCTRL" => Key::KEY_LEFTCTRL,
        "KEY_RIGHTCTRL" => Key::KEY_RIGHTCTRL,
        "KEY_LEFTSHIFT" => Key::KEY_LEFTSHIFT,
        "KEY_RIGHTSHIFT" => Key::KEY_RIGHTSHIFT,
        "KEY_SPACE" => Key::KEY_SPACE,
        "KEY_ESC" => Key::KEY_ESC,
        "KEY_A" => Key::KEY_A,
        "KEY_B" => Key::KEY_B,
        "KEY_C" => Key::KEY_C,
        "KEY_D" => Key::KEY_D,
        "KEY_E" => Key::KEY_E,
        "KEY_F" => Key::KEY_F,
        "KEY_G" => Key::KEY_G,
        "KEY_H" => Key::KEY_H,
        "KEY_I" => Key::KEY_I,
        "KEY_J" => Key::KEY_J,
        "KEY_K" => Key::KEY_K,
        "KEY_L" => Key::KEY_L,
        "KEY_M" => Key::KEY_M,
        "KEY_N" => Key::KEY_N,
        "KEY_O" => Key::KEY_O,
        "KEY_P" => Key::KEY_P,
        "KEY_Q" => Key::KEY_Q,
        "KEY_R" => Key::KEY_R,
        "KEY_S" => Key::KEY_S,
        "KEY_T" => Key::KEY_T,
        "KEY_U" => Key::KEY_U,
        "KEY_V" => Key::KEY_V,
        "KEY_W" => Key::KEY_W,
        "KEY_X" => Key::KEY_X,
        "KEY_Y" => Key::KEY_Y,
        "KEY_Z" => Key::KEY_Z,
        "KEY_F1" => Key::KEY_F1,
        "KEY_F2" => Key::KEY_F2,
        "KEY_F3" => Key::KEY_F3,
        "KEY_F4" => Key::KEY_F4,
        "KEY_F5" => Key::KEY_F5,
        "KEY_F6" => Key::KEY_F6,
        "KEY_F7" => Key::KEY_F7,
        "KEY_F8" => Key::KEY_F8,
        "KEY_F9" => Key::KEY_F9,
        "KEY_F10" => Key::KEY_F10,
        "KEY_F11" => Key::KEY_F11,
        "KEY_F12" => Key::KEY_F12,
        _ => {
            warn!("Unknown key name: {name}");
            return None;
        }
    };
    Some(key)
}

struct ComboBinding {
    keys: HashSet<Key>,
    action: HotkeyAction,
    active: bool,
}

/// Shared state for tracking pressed keys across devices.
struct MonitorState {
    pressed_keys: HashSet<Key>,
    bindings: Vec<ComboBinding>,
}

pub struct HotkeyMonitor {
    state: Arc<Mutex<MonitorState>>,
    tx: mpsc::Sender<HotkeyAction>,
}

impl HotkeyMonitor {
    pub fn new(config: &HotkeyConfig, tx: mpsc::Sender<HotkeyAction>) -> Self {
        let mut bindings = Vec::new();
        for (names, action) in [
            (&config.speak_combo, HotkeyAction::SpeakClipboard),
            (&config.replay_combo, HotkeyAction::ReplayLast),
            (&config.quit_combo, HotkeyAction::Quit),
        ] {
            let keys: HashSet<Key> = names.iter().filter_map(|s| resolve_key(s)).collect();
            if keys.is_empty() || keys.len() != names.len() {
                warn!("Ignoring incomplete combo for {action}");
                continue;
            }
            bindings.push(ComboBinding {
                keys,
                action,
                active: false,
            });
        }

        info!("Hotkey bindings: {} configured", bindings.len());

        Self {
            state: Arc::new(Mutex::new(MonitorState {
                pressed_keys: HashSet::new(),
                bindings,
            })),
            tx,
        }
    }

    /// Find all keyboard input devices.
    fn find_keyboards() -> Vec<Device> {
        let mut keyboards = Vec::new();

        for (_path, device) in evdev::enumerate() {
            if let Some(keys) = device.supported_keys() {
                if keys.contains(Key::KEY_A) && keys.contains(Key::KEY_ENTER) {
                    info!("Found keyboard: {}", device.name().unwrap_or("unknown"));
                    keyboards.push(device);
                }
            }
        }

        keyboards
    }

    /// Monitor a single device for key events.
    async fn monitor_device(
        device: Device,
        state: Arc<Mutex<MonitorState>>,
        tx: mpsc::Sender<HotkeyAction>,
    ) {
        let name = device.name().unwrap_or("unknown").to_string();
        debug!("Monitoring {name}");

        let mut events = match device.into_event_stream() {
            Ok(stream) => stream,
            Err(e) => {
                warn!("Cannot create event stream for {name}: {e}");
                return;
            }
        };

        loop {
            match events.next_event().await {
                Ok(event) => {
                    if event.event_type() != EventType::KEY {
                        continue;
                    }

                    let key = match event.kind() {
                        InputEventKind::Key(k) => k,
                        _ => continue,
                    };

                    // 0 = release, 1 = press, 2 = repeat
                    let fired = {
                        let mut state = state.lock().unwrap();
                        match event.value() {
                            1 => {
                                state.pressed_keys.insert(key);
                            }
                            0 => {
                                state.pressed_keys.remove(&key);
                            }
                            _ => continue,
                        }
                        state.update_bindings()
                    };

                    for action in fired {
                        debug!("Hotkey fired: {action}");
                        let _ = tx.try_send(action);
                    }
                }
                Err(e) => {
                    warn!("Device {name} disconnected: {e}");
                    break;
                }
            }
        }
    }

    /// Start monitoring all keyboards. Runs until all devices disconnect.
    pub async fn run(self) {
        let keyboards = Self::find_keyboards();
        if keyboards.is_empty() {
            warn!(
                "No keyboards found. Make sure you're in the 'input' group: \
                 sudo usermod -aG input $USER"
            );
            return;
        }

        info!("Monitoring {} keyboard(s)", keyboards.len());

        let mut handles = Vec::new();
        for device in keyboards {
            let state = Arc::clone(&self.state);
            let tx = self.tx.clone();
            handles.push(tokio::spawn(Self::monitor_device(device, state, tx)));
        }

        for handle in handles {
            let _ = handle.await;
        }
    }
}

impl MonitorState {
    /// Re-evaluate every binding against the pressed-key set, returning
    /// actions whose combos just became active.
    fn update_bindings(&mut self) -> Vec<HotkeyAction> {
        let mut fired = Vec::new();
        for binding in &mut self.bindings {
            let now_active = binding.keys.is_subset(&self.pressed_keys);
            if now_active && !binding.active {
                fired.push(binding.action);
            }
            binding.active = now_active;
        }
        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with_default_bindings() -> MonitorState {
        let config = HotkeyConfig::default();
        let bindings = [
            (&config.speak_combo, HotkeyAction::SpeakClipboard),
            (&config.replay_combo, HotkeyAction::ReplayLast),
            (&config.quit_combo, HotkeyAction::Quit),
        ]
        .into_iter()
        .map(|(names, action)| ComboBinding {
            keys: names.iter().filter_map(|s| resolve_key(s)).collect(),
            action,
            active: false,
        })
        .collect();

        MonitorState {
            pressed_keys: HashSet::new(),
            bindings,
        }
    }

    #[test]
    fn combo_fires_once_until_released() {
        let mut state = state_with_default_bindings();

        state.pressed_keys.insert(Key::KEY_LEFTMETA);
        state.pressed_keys.insert(Key::KEY_LEFTSHIFT);
        assert!(state.update_bindings().is_empty());

        state.pressed_keys.insert(Key::KEY_S);
        assert_eq!(state.update_bindings(), vec![HotkeyAction::SpeakClipboard]);

        // Held combo does not re-fire
        assert!(state.update_bindings().is_empty());

        // Release and press again re-arms it
        state.pressed_keys.remove(&Key::KEY_S);
        assert!(state.update_bindings().is_empty());
        state.pressed_keys.insert(Key::KEY_S);
        assert_eq!(state.update_bindings(), vec![HotkeyAction::SpeakClipboard]);
    }

    #[test]
    fn distinct_combos_map_to_distinct_actions() {
        let mut state = state_with_default_bindings();

        state.pressed_keys.insert(Key::KEY_LEFTMETA);
        state.pressed_keys.insert(Key::KEY_LEFTSHIFT);
        state.pressed_keys.insert(Key::KEY_Q);
        assert_eq!(state.update_bindings(), vec![HotkeyAction::Quit]);

        state.pressed_keys.remove(&Key::KEY_Q);
        assert!(state.update_bindings().is_empty());

        // Replay combo with the modifiers still held
        state.pressed_keys.insert(Key::KEY_R);
        assert_eq!(state.update_bindings(), vec![HotkeyAction::ReplayLast]);
    }

    #[test]
    fn unknown_key_names_disable_the_combo() {
        let config = HotkeyConfig {
            speak_combo: vec!["KEY_BOGUS".into()],
            ..HotkeyConfig::default()
        };
        let (tx, _rx) = mpsc::channel(4);
        let monitor = HotkeyMonitor::new(&config, tx);
        assert_eq!(monitor.state.lock().unwrap().bindings.len(), 2);
    }
}
