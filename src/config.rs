//! Configuration constants for the Subgrab subtitle downloader
//!
//! This module contains application-wide configuration values including
//! recognized subtitle formats, detection limits, and UI settings.

/// The current application version (keep in sync with Cargo.toml)
pub const APP_VERSION: &str = "0.3.0";

/// Subtitle file extensions the scanner reports
pub static SUBTITLE_EXTENSIONS: &[&str] = &["srt", "sub", "ssa", "ass", "vtt"];

/// Extension of the target subtitle format
pub static TARGET_EXTENSION: &str = "srt";

/// Extensions the normalizer knows how to convert to SRT
pub static CONVERTIBLE_EXTENSIONS: &[&str] = &["ass", "ssa", "vtt"];

/// Language used when neither the user nor the settings file names one
pub static DEFAULT_LANGUAGE: &str = "eng";

/// How far back the overwrite fallback looks for recently written files
pub static DETECTION_WINDOW_SECS: u64 = 120;

/// Maximum number of files returned by the overwrite fallback
pub static RECENT_FILE_CAP: usize = 6;

/// Maximum length of an error message shown in the job table
pub static MAX_MESSAGE_LEN: usize = 200;

/// Default window size
pub static WINDOW_SIZE: [f32; 2] = [880.0, 560.0];

/// Minimum window size
pub static MIN_WINDOW_SIZE: [f32; 2] = [640.0, 420.0];
