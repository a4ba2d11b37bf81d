//! Subtitle file discovery and language helpers
//!
//! The provider library's save routine does not report which files it wrote,
//! so downloads are located by comparing directory snapshots taken before and
//! after the save, with a modification-time window as fallback for files that
//! were overwritten in place.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::config::RECENT_FILE_CAP;
use crate::helper_functions::Utils;

/// Utilities for working with subtitle files and language codes
pub struct SubtitleUtils;

impl SubtitleUtils {
    /// List subtitle files in `directory`, newest first.
    ///
    /// Never fails: an unreadable or missing directory yields an empty list.
    pub fn list_subtitle_files(directory: &Path) -> Vec<(SystemTime, PathBuf)> {
        let entries = match directory.read_dir() {
            Ok(entries) => entries,
            Err(e) => {
                crate::debug!("Cannot list {}: {}", directory.display(), e);
                return Vec::new();
            }
        };

        let mut files: Vec<(SystemTime, PathBuf)> = entries
            .flatten()
            .filter_map(|entry| {
                let path = entry.path();
                if !Utils::is_subtitle_file(&path) {
                    return None;
                }
                let metadata = entry.metadata().ok()?;
                if !metadata.is_file() {
                    return None;
                }
                Some((metadata.modified().ok()?, path))
            })
            .collect();

        files.sort_by(|a, b| b.cmp(a));
        files
    }

    /// Set of subtitle paths currently present in `directory`
    pub fn snapshot(directory: &Path) -> HashSet<PathBuf> {
        Self::list_subtitle_files(directory)
            .into_iter()
            .map(|(_, path)| path)
            .collect()
    }

    /// Subtitle files written to `directory` since `before` was taken, newest first.
    ///
    /// When nothing new appeared (a same-named file was overwritten), falls back
    /// to files modified within `window` of now, capped at [`RECENT_FILE_CAP`].
    pub fn detect_new(before: &HashSet<PathBuf>, directory: &Path, window: Duration) -> Vec<PathBuf> {
        let after = Self::list_subtitle_files(directory);

        let created: Vec<PathBuf> = after
            .iter()
            .filter(|(_, path)| !before.contains(path))
            .map(|(_, path)| path.clone())
            .collect();
        if !created.is_empty() {
            crate::debug!("Detected {} new subtitle file(s) in {}", created.len(), directory.display());
            return created;
        }

        let now = SystemTime::now();
        let recent: Vec<PathBuf> = after
            .into_iter()
            .filter(|(modified, _)| match now.duration_since(*modified) {
                Ok(age) => age <= window,
                // Clock skew: stamped in the future
                Err(_) => true,
            })
            .take(RECENT_FILE_CAP)
            .map(|(_, path)| path)
            .collect();
        crate::debug!(
            "No new files in {}, {} recently modified file(s) within {}s",
            directory.display(),
            recent.len(),
            window.as_secs()
        );
        recent
    }

    /// Language typed by the user, or `default` when the field is blank
    pub fn resolve_language(input: &str, default: &str) -> String {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            default.trim().to_lowercase()
        } else {
            trimmed.to_lowercase()
        }
    }

    /// Convert an ISO 639-2 language code to a human-readable name
    pub fn language_code_to_name(code: &str) -> &str {
        match code {
            "eng" => "English",
            "fre" | "fra" => "French",
            "spa" => "Spanish",
            "ger" | "deu" => "German",
            "ita" => "Italian",
            "por" => "Portuguese",
            "dut" | "nld" => "Dutch",
            "pol" => "Polish",
            "rus" => "Russian",
            "swe" => "Swedish",
            "fin" => "Finnish",
            "dan" => "Danish",
            "nor" => "Norwegian",
            "cze" | "ces" => "Czech",
            "hun" => "Hungarian",
            "rum" | "ron" => "Romanian",
            "bul" => "Bulgarian",
            "hrv" => "Croatian",
            "gre" | "ell" => "Greek",
            "tur" => "Turkish",
            "ukr" => "Ukrainian",
            "heb" => "Hebrew",
            "ara" => "Arabic",
            "jpn" => "Japanese",
            "kor" => "Korean",
            "chi" | "zho" => "Chinese",
            "tha" => "Thai",
            "vie" => "Vietnamese",
            "ind" => "Indonesian",
            "hin" => "Hindi",
            "per" | "fas" => "Persian",
            _ => code,
        }
    }
}
