//! Data structures and types for the Subgrab subtitle downloader
//!
//! This module contains jobs, job status, per-job outcomes, the events the
//! worker sends to the window, and the window's own state.

use std::fmt;
use std::path::PathBuf;
use std::sync::mpsc::Receiver;
use std::sync::Arc;

use crate::settings::Settings;
use crate::worker::JobRunner;

/// Display handle of a job; keys its row in the job table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A queued subtitle search; immutable once created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: JobId,
    pub query: String,
    /// Language field content at submission, possibly blank
    pub language_input: String,
}

/// Status of a subtitle search job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Queued,
    Searching,
    Downloading,
    Converting,
    Downloaded,
    NotFound,
    Partial,
    Error,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Downloaded | Self::NotFound | Self::Partial | Self::Error)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Queued => "Queued",
            Self::Searching => "Searching",
            Self::Downloading => "Downloading",
            Self::Converting => "Converting",
            Self::Downloaded => "Downloaded",
            Self::NotFound => "Not Found",
            Self::Partial => "Partial",
            Self::Error => "Error",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Terminal result of processing one job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutcome {
    pub status: JobStatus,
    pub message: String,
    pub saved_path: Option<PathBuf>,
}

impl JobOutcome {
    pub fn downloaded(path: PathBuf) -> Self {
        Self {
            status: JobStatus::Downloaded,
            message: "Downloaded".to_string(),
            saved_path: Some(path),
        }
    }

    pub fn not_found() -> Self {
        Self {
            status: JobStatus::NotFound,
            message: "No matching subtitles found".to_string(),
            saved_path: None,
        }
    }

    pub fn partial(path: PathBuf, reason: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Partial,
            message: reason.into(),
            saved_path: Some(path),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Error,
            message: message.into(),
            saved_path: None,
        }
    }
}

/// Messages from the job runner to the window
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    JobAdded {
        id: JobId,
        query: String,
    },
    JobUpdated {
        id: JobId,
        status: JobStatus,
        message: String,
        saved_path: Option<PathBuf>,
    },
    DownloadRecorded(PathBuf),
    StatusLine(String),
    JobsCleared(Vec<JobId>),
}

/// One row of the job table
#[derive(Debug, Clone)]
pub struct JobRow {
    pub id: JobId,
    pub query: String,
    pub status: JobStatus,
    pub message: String,
    pub saved_path: Option<PathBuf>,
}

/// Main window state
pub struct SubtitleDownloader {
    pub runner: Arc<JobRunner>,
    pub events: Receiver<WorkerEvent>,
    pub settings: Settings,

    // Input fields
    pub query_input: String,
    pub language_input: String,

    // Presentation of runner state
    pub rows: Vec<JobRow>,
    pub downloads: Vec<PathBuf>,
    pub status: String,

    // Dependency state
    pub python_version: Option<String>,
    pub subliminal_installed: bool,
    pub dependency_checked: bool,
    pub installing_subliminal: bool,
    pub dependency_receiver: Option<Receiver<(Option<String>, bool)>>,
    pub install_receiver: Option<Receiver<Result<(), String>>>,
}
