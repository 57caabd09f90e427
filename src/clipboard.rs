//! Clipboard access via arboard.

use arboard::Clipboard;

/// Read the current clipboard text. A fresh handle per read keeps the
/// X11/Wayland connection out of long-lived state.
pub fn read_text() -> Result<String, String> {
    let mut clipboard = Clipboard::new().map_err(|e| format!("clipboard unavailable: {e}"))?;
    clipboard
        .get_text()
        .map_err(|e| format!("failed to read clipboard: {e}"))
}
