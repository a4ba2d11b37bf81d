//! Application settings and persistence management
//!
//! This module handles loading, saving, and managing user preferences
//! that persist between sessions.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_LANGUAGE;

/// Application settings that persist between sessions
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub download_directory: PathBuf,
    pub default_language: String,
    pub last_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        let desktop = dirs::desktop_dir().unwrap_or_else(|| home.join("Desktop"));
        Self {
            download_directory: desktop,
            default_language: DEFAULT_LANGUAGE.to_string(),
            last_dir: home,
        }
    }
}

impl Settings {
    /// Get the path where settings are stored
    pub fn get_path() -> std::io::Result<PathBuf> {
        #[cfg(windows)]
        {
            let exe_path = std::env::current_exe()?;
            let exe_dir = exe_path.parent().ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::NotFound, "Failed to get executable directory")
            })?;
            Ok(exe_dir.join("subgrab_settings.json"))
        }

        #[cfg(target_os = "macos")]
        {
            let home_dir = dirs::home_dir().ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::NotFound, "Failed to get home directory")
            })?;
            let app_support = home_dir.join("Library/Application Support/subgrab");
            std::fs::create_dir_all(&app_support)?;
            Ok(app_support.join("settings.json"))
        }

        #[cfg(not(any(windows, target_os = "macos")))]
        {
            let app_dir = match xdg::BaseDirectories::new() {
                Ok(xdg_dirs) => xdg_dirs.get_config_home().join("subgrab"),
                Err(_) => {
                    let home_dir = dirs::home_dir().ok_or_else(|| {
                        std::io::Error::new(std::io::ErrorKind::NotFound, "Failed to get home directory")
                    })?;
                    home_dir.join(".subgrab")
                }
            };
            std::fs::create_dir_all(&app_dir)?;
            Ok(app_dir.join("settings.json"))
        }
    }

    /// Load settings from disk, falling back to defaults if the file is missing or corrupt
    pub fn load() -> Self {
        match Self::get_path() {
            Ok(path) => Self::load_from(&path),
            Err(e) => {
                crate::warn!("Failed to get settings path: {}. Using defaults.", e);
                Settings::default()
            }
        }
    }

    /// Load settings from a specific file
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(settings) => {
                    crate::info!("Settings loaded from {}", path.display());
                    settings
                }
                Err(e) => {
                    crate::warn!("Failed to parse settings file: {}. Using defaults.", e);
                    Settings::default()
                }
            },
            Err(e) => {
                crate::debug!("Settings file not found or unreadable: {}. Using defaults.", e);
                Settings::default()
            }
        }
    }

    /// Save settings to disk
    pub fn save(&self) -> Result<(), String> {
        let path = Self::get_path().map_err(|e| format!("Failed to get settings path: {}", e))?;
        self.save_to(&path)
    }

    /// Rewrite the whole record at `path`
    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize settings: {}", e))?;
        std::fs::write(path, json).map_err(|e| format!("Failed to write settings file: {}", e))?;
        crate::debug!("Settings saved to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_then_load_keeps_every_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = Settings {
            download_directory: dir.path().join("subs"),
            default_language: "fre".to_string(),
            last_dir: dir.path().to_path_buf(),
        };
        settings.save_to(&path).unwrap();
        assert_eq!(Settings::load_from(&path), settings);
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(Settings::load_from(&path), Settings::default());
    }

    #[test]
    fn missing_keys_take_default_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"default_language": "spa"}"#).unwrap();

        let loaded = Settings::load_from(&path);
        assert_eq!(loaded.default_language, "spa");
        assert_eq!(loaded.download_directory, Settings::default().download_directory);
    }

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = Settings::load_from(&dir.path().join("absent.json"));
        assert_eq!(loaded.default_language, DEFAULT_LANGUAGE);
    }
}
