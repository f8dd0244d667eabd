//! User settings persistence.
//!
//! Settings are stored as JSON in the user's config directory
//! (e.g., `~/.config/shareshot/settings.json` on Linux).

use crate::ui::OverlayStyle;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default capture chord.
pub const DEFAULT_HOTKEY: &str = "Ctrl+F9";

/// User-configurable settings persisted between sessions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Place every capture on the clipboard as well as saving it.
    pub copy_to_clipboard: bool,
    /// Hand captures to the share sink.
    pub share_enabled: bool,
    /// Client credential for the share sink.
    pub client_id: Option<String>,
    /// Global capture chord, e.g. `Ctrl+F9`.
    pub hotkey: String,
    /// Folder override; the pictures folder is used when unset.
    pub save_dir: Option<PathBuf>,
    /// Overlay appearance.
    pub overlay: OverlayStyle,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            copy_to_clipboard: true,
            share_enabled: false,
            client_id: None,
            hotkey: DEFAULT_HOTKEY.to_string(),
            save_dir: None,
            overlay: OverlayStyle::default(),
        }
    }
}

impl Settings {
    /// Returns the path to the settings file.
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "shareshot").map(|dirs| {
            let config_dir = dirs.config_dir();
            if !config_dir.exists() {
                let _ = fs::create_dir_all(config_dir);
            }
            config_dir.join("settings.json")
        })
    }

    /// Loads settings from disk, falling back to defaults if not found.
    pub fn load() -> Self {
        Self::config_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    /// Loads settings from `path`; a missing or unreadable file yields defaults.
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                log::warn!("Ignoring invalid settings file {}: {}", path.display(), e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }
}
