//! Common utility functions and validation helpers
//!
//! This module provides utility functions for file names, message
//! truncation, opening folders, and input validation.

use std::path::Path;

use crate::config::SUBTITLE_EXTENSIONS;

/// Common utility functions used throughout the application
pub struct Utils;

impl Utils {
    /// Safely get the file name from a path, returning a default if not available
    pub fn get_file_name(path: &Path) -> String {
        path.file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("Unknown")
            .to_string()
    }

    /// Lowercased extension of a path, empty when there is none
    pub fn extension_lowercase(path: &Path) -> String {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_default()
    }

    /// Truncate a string to at most `max_len` characters, adding an ellipsis if needed
    pub fn truncate_string(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len {
            return s.to_string();
        }
        let keep = max_len.saturating_sub(3);
        let mut truncated: String = s.chars().take(keep).collect();
        truncated.push_str("...");
        truncated
    }

    /// Check if a path is a subtitle file based on its extension
    pub fn is_subtitle_file(path: &Path) -> bool {
        let ext = Self::extension_lowercase(path);
        SUBTITLE_EXTENSIONS.iter().any(|&s| s == ext)
    }

    /// Open the containing folder of a file in the system's file explorer
    pub fn open_containing_folder(path: &Path) -> Result<(), String> {
        let _folder = path.parent().ok_or("No parent folder")?;
        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            let canonical = path.canonicalize().map_err(|e| e.to_string())?;
            let path_str = canonical.to_string_lossy().replace('/', "\\");
            let mut cmd = std::process::Command::new("explorer.exe");
            cmd.arg("/select,").arg(&path_str);
            cmd.creation_flags(0x08000000); // CREATE_NO_WINDOW
            cmd.spawn().map_err(|e| e.to_string())?;
        }
        #[cfg(target_os = "macos")]
        {
            let status = std::process::Command::new("open")
                .arg("-R")
                .arg(path)
                .status()
                .map_err(|e| e.to_string())?;
            if !status.success() {
                return Err(format!("open failed: {:?}", status));
            }
        }
        #[cfg(not(any(windows, target_os = "macos")))]
        {
            let canonical = _folder.canonicalize().map_err(|e| e.to_string())?;
            let status = std::process::Command::new("xdg-open")
                .arg(canonical)
                .status()
                .map_err(|e| e.to_string())?;
            if !status.success() {
                return Err(format!("xdg-open failed: {:?}", status));
            }
        }
        Ok(())
    }
}

/// Input validation utilities
pub struct Validation;

impl Validation {
    /// Validate that a folder path exists and is a directory
    pub fn is_valid_folder(path: &Path) -> bool {
        !path.as_os_str().is_empty() && path.is_dir()
    }

    /// Accept two or three letter ISO 639 codes, optionally with a region (`pt-BR`)
    pub fn is_valid_language_code(code: &str) -> bool {
        let mut parts = code.splitn(2, '-');
        let base = parts.next().unwrap_or_default();
        let base_ok = (2..=3).contains(&base.len()) && base.chars().all(|c| c.is_ascii_alphabetic());
        let region_ok = parts
            .next()
            .map(|r| (2..=3).contains(&r.len()) && r.chars().all(|c| c.is_ascii_alphanumeric()))
            .unwrap_or(true);
        base_ok && region_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_keeps_short_strings() {
        assert_eq!(Utils::truncate_string("network down", 200), "network down");
    }

    #[test]
    fn truncate_caps_length_with_ellipsis() {
        let long = "x".repeat(500);
        let out = Utils::truncate_string(&long, 200);
        assert_eq!(out.chars().count(), 200);
        assert!(out.ends_with("..."));
    }

    #[test]
    fn truncate_respects_multibyte_characters() {
        let long = "é".repeat(300);
        let out = Utils::truncate_string(&long, 200);
        assert_eq!(out.chars().count(), 200);
    }

    #[test]
    fn language_codes() {
        assert!(Validation::is_valid_language_code("eng"));
        assert!(Validation::is_valid_language_code("pt-BR"));
        assert!(!Validation::is_valid_language_code("english"));
        assert!(!Validation::is_valid_language_code("e1"));
        assert!(!Validation::is_valid_language_code(""));
    }

    #[test]
    fn subtitle_extension_check_ignores_case() {
        assert!(Utils::is_subtitle_file(Path::new("/tmp/Show.S01E01.SRT")));
        assert!(Utils::is_subtitle_file(Path::new("a.ass")));
        assert!(!Utils::is_subtitle_file(Path::new("a.mkv")));
    }
}
