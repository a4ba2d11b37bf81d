//! Application logic for the Subgrab subtitle downloader
//!
//! This module wires settings, the provider and the job runner together and
//! applies worker events to the window state.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread;

use rfd::FileDialog;

use crate::data_structures::{JobRow, JobStatus, SubtitleDownloader, WorkerEvent};
use crate::helper_functions::{Utils, Validation};
use crate::normalizer::FormatNormalizer;
use crate::provider::{SubliminalProvider, SubtitleProvider, UnavailableProvider};
use crate::python_manager::PythonManager;
use crate::settings::Settings;
use crate::worker::{EventSink, JobRunner, RunnerConfig};

// Use the logging macros directly from the crate root
use crate::{debug, error, info, warn};

impl SubtitleDownloader {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        info!("Initializing SubtitleDownloader");
        let settings = Settings::load();
        info!(
            "Loaded settings: download_directory={}, default_language={}",
            settings.download_directory.display(),
            settings.default_language
        );

        let provider: Arc<dyn SubtitleProvider> = match SubliminalProvider::new() {
            Ok(provider) => Arc::new(provider),
            Err(e) => {
                error!("Subtitle provider setup failed: {}", e);
                Arc::new(UnavailableProvider::new(e.to_string()))
            }
        };

        let (tx, rx) = mpsc::channel();
        let ctx = cc.egui_ctx.clone();
        let sink = EventSink::new(tx).with_waker(move || ctx.request_repaint());
        let runner = JobRunner::new(
            provider,
            FormatNormalizer::default(),
            RunnerConfig::new(settings.download_directory.clone(), settings.default_language.clone()),
            sink,
        );

        let mut app = Self::from_parts(Arc::new(runner), rx, settings);
        app.start_dependency_check();
        app
    }

    /// Window state around an existing runner and its event stream
    pub fn from_parts(runner: Arc<JobRunner>, events: Receiver<WorkerEvent>, settings: Settings) -> Self {
        Self {
            runner,
            events,
            settings,
            query_input: String::new(),
            language_input: String::new(),
            rows: Vec::new(),
            downloads: Vec::new(),
            status: "Enter a show, movie or file name to search for subtitles".to_string(),
            python_version: None,
            subliminal_installed: false,
            dependency_checked: false,
            installing_subliminal: false,
            dependency_receiver: None,
            install_receiver: None,
        }
    }

    /// Save the current user settings to disk
    pub fn save_current_settings(&self) {
        if let Err(e) = self.settings.save() {
            warn!("Failed to save settings: {}", e);
        } else {
            debug!("Settings saved successfully");
        }
    }

    /// Drain pending worker events into the window state
    pub fn poll_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            self.apply_event(event);
        }
    }

    pub fn apply_event(&mut self, event: WorkerEvent) {
        match event {
            WorkerEvent::JobAdded { id, query } => self.rows.push(JobRow {
                id,
                query,
                status: JobStatus::Queued,
                message: String::new(),
                saved_path: None,
            }),
            WorkerEvent::JobUpdated {
                id,
                status,
                message,
                saved_path,
            } => {
                if let Some(row) = self.rows.iter_mut().find(|r| r.id == id) {
                    row.status = status;
                    row.message = message;
                    if saved_path.is_some() {
                        row.saved_path = saved_path;
                    }
                } else {
                    debug!("Update for unknown job {}", id);
                }
            }
            WorkerEvent::DownloadRecorded(path) => self.downloads.push(path),
            WorkerEvent::StatusLine(line) => self.status = line,
            WorkerEvent::JobsCleared(ids) => self.rows.retain(|r| !ids.contains(&r.id)),
        }
    }

    /// Validate the input fields and hand a new job to the runner
    pub fn submit(&mut self) {
        let query = self.query_input.trim().to_string();
        if query.is_empty() {
            self.status = "Please enter a show, movie or file name".to_string();
            return;
        }
        let language = self.language_input.trim();
        if !language.is_empty() && !Validation::is_valid_language_code(language) {
            self.status = format!("Invalid language code: {}", language);
            return;
        }

        if self.runner.submit_query(&query, language).is_some() {
            self.query_input.clear();
        }
    }

    pub fn stop_after_current(&mut self) {
        self.runner.request_stop();
    }

    pub fn clear_queue(&mut self) {
        self.runner.clear_pending();
    }

    pub fn is_busy(&self) -> bool {
        self.runner.is_running()
    }

    /// Rows still waiting for a terminal status
    pub fn unfinished_jobs(&self) -> usize {
        self.rows.iter().filter(|r| !r.status.is_terminal()).count()
    }

    /// Ask for a new default download folder, starting from the last one used
    pub fn choose_folder(&mut self) {
        let mut dialog = FileDialog::new();
        if Validation::is_valid_folder(&self.settings.last_dir) {
            dialog = dialog.set_directory(&self.settings.last_dir);
        }
        if let Some(folder) = dialog.pick_folder() {
            self.set_download_folder(folder);
        }
    }

    pub fn set_download_folder(&mut self, folder: PathBuf) {
        if !Validation::is_valid_folder(&folder) {
            warn!("Ignoring invalid download folder: {}", folder.display());
            self.status = format!("Not a folder: {}", folder.display());
            return;
        }
        info!("Download folder set to {}", folder.display());
        self.settings.download_directory = folder.clone();
        self.settings.last_dir = folder.clone();
        self.save_current_settings();
        self.runner.set_download_directory(folder);
    }

    pub fn open_folder_of(&mut self, path: &Path) {
        if let Err(e) = Utils::open_containing_folder(path) {
            warn!("Failed to open folder for {}: {}", path.display(), e);
            self.status = format!("Could not open folder: {}", e);
        }
    }

    /// Look for Python and subliminal off the UI thread
    pub fn start_dependency_check(&mut self) {
        let (tx, rx) = mpsc::channel();
        self.dependency_checked = false;
        self.dependency_receiver = Some(rx);
        thread::spawn(move || {
            let version = PythonManager::get_version();
            let subliminal = version.is_some() && PythonManager::is_subliminal_installed();
            let _ = tx.send((version, subliminal));
        });
    }

    pub fn poll_dependency_check(&mut self) {
        let Some(rx) = &self.dependency_receiver else {
            return;
        };
        let Ok((version, subliminal)) = rx.try_recv() else {
            return;
        };
        info!("Python version: {:?}, subliminal installed: {}", version, subliminal);
        self.python_version = version;
        self.subliminal_installed = subliminal;
        self.dependency_checked = true;
        self.dependency_receiver = None;
        if !subliminal && !self.installing_subliminal {
            self.status = "Subliminal is not installed. Searches will fail until it is.".to_string();
        }
    }

    pub fn start_subliminal_install(&mut self) {
        if self.installing_subliminal {
            return;
        }
        info!("User initiated Subliminal installation");
        self.installing_subliminal = true;
        self.status = "Installing Subliminal...".to_string();

        let (tx, rx) = mpsc::channel();
        self.install_receiver = Some(rx);
        thread::spawn(move || {
            let _ = tx.send(PythonManager::install_subliminal());
        });
    }

    pub fn poll_install(&mut self) {
        let Some(rx) = &self.install_receiver else {
            return;
        };
        let Ok(result) = rx.try_recv() else {
            return;
        };
        self.installing_subliminal = false;
        self.install_receiver = None;
        match result {
            Ok(()) => {
                info!("Subliminal installation completed successfully");
                self.status = "Subliminal installed.".to_string();
                self.start_dependency_check();
            }
            Err(e) => {
                error!("Subliminal installation failed: {}", e);
                self.status = format!("Subliminal install failed: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::JobId;

    fn app() -> SubtitleDownloader {
        let (tx, _unused) = mpsc::channel();
        let runner = JobRunner::new(
            Arc::new(UnavailableProvider::new("test")),
            FormatNormalizer::default(),
            RunnerConfig::new(PathBuf::from("unused"), "eng".to_string()),
            EventSink::new(tx),
        );
        let (_events_tx, events_rx) = mpsc::channel();
        SubtitleDownloader::from_parts(Arc::new(runner), events_rx, Settings::default())
    }

    fn added(n: u64, query: &str) -> WorkerEvent {
        WorkerEvent::JobAdded {
            id: JobId(n),
            query: query.to_string(),
        }
    }

    #[test]
    fn updates_land_on_their_row() {
        let mut app = app();
        app.apply_event(added(1, "Show S01E01"));
        app.apply_event(added(2, "Show S01E02"));
        app.apply_event(WorkerEvent::JobUpdated {
            id: JobId(2),
            status: JobStatus::Downloaded,
            message: "Downloaded".to_string(),
            saved_path: Some(PathBuf::from("/tmp/Show S01E02.en.srt")),
        });

        assert_eq!(app.rows[0].status, JobStatus::Queued);
        assert_eq!(app.rows[1].status, JobStatus::Downloaded);
        assert_eq!(app.rows[1].saved_path, Some(PathBuf::from("/tmp/Show S01E02.en.srt")));
    }

    #[test]
    fn unfinished_count_ignores_terminal_rows() {
        let mut app = app();
        for n in 1..=3 {
            app.apply_event(added(n, "q"));
        }
        app.apply_event(WorkerEvent::JobUpdated {
            id: JobId(1),
            status: JobStatus::NotFound,
            message: "No matching subtitles found".to_string(),
            saved_path: None,
        });
        app.apply_event(WorkerEvent::JobUpdated {
            id: JobId(2),
            status: JobStatus::Converting,
            message: String::new(),
            saved_path: None,
        });
        assert_eq!(app.unfinished_jobs(), 2);
    }

    #[test]
    fn cleared_rows_are_removed_and_others_kept() {
        let mut app = app();
        for n in 1..=3 {
            app.apply_event(added(n, "q"));
        }
        app.apply_event(WorkerEvent::JobsCleared(vec![JobId(2), JobId(3)]));
        assert_eq!(app.rows.len(), 1);
        assert_eq!(app.rows[0].id, JobId(1));
    }

    #[test]
    fn downloads_and_status_lines_are_recorded() {
        let mut app = app();
        app.apply_event(WorkerEvent::DownloadRecorded(PathBuf::from("a.srt")));
        app.apply_event(WorkerEvent::StatusLine("Idle - queue finished".to_string()));
        assert_eq!(app.downloads, vec![PathBuf::from("a.srt")]);
        assert_eq!(app.status, "Idle - queue finished");
    }

    #[test]
    fn invalid_input_is_not_queued() {
        let mut app = app();
        app.query_input = "   ".to_string();
        app.submit();
        assert!(app.status.contains("Please enter"));

        app.query_input = "Show S01E01".to_string();
        app.language_input = "english!".to_string();
        app.submit();
        assert!(app.status.contains("Invalid language code"));
        assert_eq!(app.query_input, "Show S01E01");
        assert_eq!(app.runner.pending_count(), 0);
        assert!(!app.is_busy());
    }

    #[test]
    fn missing_folder_is_rejected() {
        let mut app = app();
        let before = app.settings.download_directory.clone();
        app.set_download_folder(PathBuf::from("/definitely/not/here"));
        assert_eq!(app.settings.download_directory, before);
        assert!(app.status.starts_with("Not a folder"));
    }
}
