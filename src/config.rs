// Configuration management
//
// Display-layer settings with TOML persistence. Unknown or missing fields
// fall back to defaults so old config files keep loading.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::PathBuf;

/// Default configuration file path
const CONFIG_FILE: &str = "display_config.toml";

/// Display-layer configuration
///
/// Recognized at construction/reload; runtime changes require recreating
/// the window.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Initial window scale relative to the base resolution (1-8)
    pub scale: u32,

    /// Enable VSync
    pub vsync: bool,

    /// Target frame rate in Hz
    pub target_fps: u32,

    /// Start in fullscreen
    pub fullscreen: bool,

    /// Ignore all pointer handling (cursor stays visible, no lock)
    pub disable_mouse: bool,

    /// Ignore keyboard hotkeys (fullscreen toggle, screenshot, exit)
    pub disable_kb_hotkeys: bool,

    /// Double-click in fullscreen toggles hiding and locking the pointer
    pub mouse_hide_and_lock: bool,

    /// Keep the pointer visible while fullscreen
    pub show_mouse_in_fullscreen: bool,

    /// Confine the pointer to the window while fullscreen
    pub lock_mouse_in_fullscreen: bool,

    /// Hide the pointer after it sits idle
    pub hide_mouse_after_idletime: bool,

    /// Idle timeout in milliseconds before the pointer hides
    pub hide_mouse_idletime: u32,

    /// Default maximum of the host-shell progress gauge
    pub progress_gauge_max: u32,

    /// Directory screenshots are written to
    pub screenshot_directory: PathBuf,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig {
            scale: 1,
            vsync: true,
            target_fps: 60,
            fullscreen: false,
            disable_mouse: false,
            disable_kb_hotkeys: false,
            mouse_hide_and_lock: false,
            show_mouse_in_fullscreen: false,
            lock_mouse_in_fullscreen: true,
            hide_mouse_after_idletime: false,
            hide_mouse_idletime: 2000,
            progress_gauge_max: 100,
            screenshot_directory: PathBuf::from("screenshots"),
        }
    }
}

impl DisplayConfig {
    /// Load configuration from file or create default
    ///
    /// If the configuration file doesn't exist, creates a default
    /// configuration and saves it to the file.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|_| {
            let config = Self::default();
            // Try to save the default config, but don't fail if we can't
            let _ = config.save();
            config
        })
    }

    /// Load configuration from file
    pub fn load() -> Result<Self, io::Error> {
        let contents = fs::read_to_string(CONFIG_FILE)?;
        toml::from_str(&contents).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<(), io::Error> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(CONFIG_FILE, contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DisplayConfig::default();
        assert!(config.lock_mouse_in_fullscreen);
        assert!(!config.mouse_hide_and_lock);
        assert_eq!(config.hide_mouse_idletime, 2000);
        assert_eq!(config.progress_gauge_max, 100);
        assert_eq!(config.target_fps, 60);
    }

    #[test]
    fn test_serialization_round_trip() {
        let config = DisplayConfig::default();
        let toml_str = toml::to_string(&config).expect("Failed to serialize");
        let deserialized: DisplayConfig =
            toml::from_str(&toml_str).expect("Failed to deserialize");

        assert_eq!(config.scale, deserialized.scale);
        assert_eq!(config.hide_mouse_idletime, deserialized.hide_mouse_idletime);
        assert_eq!(
            config.screenshot_directory,
            deserialized.screenshot_directory
        );
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: DisplayConfig = toml::from_str("disable_mouse = true\n").unwrap();
        assert!(config.disable_mouse);
        assert!(config.lock_mouse_in_fullscreen);
        assert_eq!(config.hide_mouse_idletime, 2000);
    }
}
