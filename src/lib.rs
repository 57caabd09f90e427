//! clipspeak: hotkey-triggered speech synthesis with a resident engine.
//!
//! The expensive synthesis engine lives in one long-running daemon
//! (`clipspeakd`) behind a Unix-domain socket; short-lived trigger
//! clients (`clipspeak-hotkey`) send it one JSON request per connection.

pub mod client;
pub mod clipboard;
pub mod config;
pub mod daemon;
pub mod engine;
pub mod error;
pub mod hotkey;
pub mod notifier;
pub mod playback;
pub mod protocol;
pub mod voices;
