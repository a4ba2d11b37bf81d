//! Background job runner
//!
//! A single worker thread drains the [`JobQueue`] one job at a time. It starts
//! itself when work arrives while idle and returns to idle when the queue is
//! empty or a stop-after-current request is seen. Every job ends in a
//! [`JobOutcome`]; a failing job never stops the loop.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::config::{DETECTION_WINDOW_SECS, MAX_MESSAGE_LEN, TARGET_EXTENSION};
use crate::data_structures::{Job, JobId, JobOutcome, JobStatus, WorkerEvent};
use crate::helper_functions::Utils;
use crate::job_queue::{JobQueue, NextJob};
use crate::normalizer::FormatNormalizer;
use crate::provider::{Candidate, ProviderError, SearchTarget, SubtitleProvider};
use crate::subtitle_utils::SubtitleUtils;
use crate::{debug, error, info, warn};

/// Delivers worker events to the window thread.
///
/// Sending never blocks; a closed receiver is ignored. The optional waker is
/// called after each event so an idle UI repaints.
#[derive(Clone)]
pub struct EventSink {
    tx: Sender<WorkerEvent>,
    waker: Option<Arc<dyn Fn() + Send + Sync>>,
}

impl EventSink {
    pub fn new(tx: Sender<WorkerEvent>) -> Self {
        Self { tx, waker: None }
    }

    pub fn with_waker(mut self, waker: impl Fn() + Send + Sync + 'static) -> Self {
        self.waker = Some(Arc::new(waker));
        self
    }

    pub fn send(&self, event: WorkerEvent) {
        let _ = self.tx.send(event);
        if let Some(waker) = &self.waker {
            waker();
        }
    }
}

/// Settings the worker reads at the start of every job
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub download_directory: PathBuf,
    pub default_language: String,
    pub detection_window: Duration,
}

impl RunnerConfig {
    pub fn new(download_directory: PathBuf, default_language: String) -> Self {
        Self {
            download_directory,
            default_language,
            detection_window: Duration::from_secs(DETECTION_WINDOW_SECS),
        }
    }
}

struct RunnerInner {
    queue: JobQueue,
    provider: Arc<dyn SubtitleProvider>,
    normalizer: FormatNormalizer,
    config: Mutex<RunnerConfig>,
    events: EventSink,
}

/// Owner of the job queue and the single background worker
pub struct JobRunner {
    inner: Arc<RunnerInner>,
    next_id: AtomicU64,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl JobRunner {
    pub fn new(
        provider: Arc<dyn SubtitleProvider>,
        normalizer: FormatNormalizer,
        config: RunnerConfig,
        events: EventSink,
    ) -> Self {
        Self {
            inner: Arc::new(RunnerInner {
                queue: JobQueue::new(),
                provider,
                normalizer,
                config: Mutex::new(config),
                events,
            }),
            next_id: AtomicU64::new(1),
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Queue a search and start the worker if it is idle.
    ///
    /// Returns `None` for a blank query.
    pub fn submit_query(&self, query: &str, language_input: &str) -> Option<JobId> {
        let query = query.trim();
        if query.is_empty() {
            return None;
        }

        let id = JobId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let job = Job {
            id,
            query: query.to_string(),
            language_input: language_input.to_string(),
        };
        info!("Queued job {}: {}", id, query);

        // Row first, so the worker's first update always has somewhere to land
        self.inner.events.send(WorkerEvent::JobAdded {
            id,
            query: job.query.clone(),
        });
        self.inner.events.send(WorkerEvent::StatusLine("Job added to queue".to_string()));

        if self.inner.queue.push(job) {
            self.start_worker();
        }
        Some(id)
    }

    /// Let the current job finish, then stop. Returns false when nothing is running.
    pub fn request_stop(&self) -> bool {
        let accepted = self.inner.queue.request_stop();
        let line = if accepted {
            info!("Stop requested after current job");
            "Will stop after the current job finishes"
        } else {
            "Not currently processing"
        };
        self.inner.events.send(WorkerEvent::StatusLine(line.to_string()));
        accepted
    }

    /// Drop every job that has not started yet
    pub fn clear_pending(&self) -> Vec<JobId> {
        let cleared = self.inner.queue.clear();
        info!("Cleared {} pending job(s)", cleared.len());
        self.inner.events.send(WorkerEvent::JobsCleared(cleared.clone()));
        self.inner.events.send(WorkerEvent::StatusLine("Queue cleared".to_string()));
        cleared
    }

    /// Directory used by jobs that start after this call
    pub fn set_download_directory(&self, path: PathBuf) {
        if let Ok(mut config) = self.inner.config.lock() {
            config.download_directory = path.clone();
        }
        self.inner.events.send(WorkerEvent::StatusLine(format!(
            "Default download folder set to: {}",
            path.display()
        )));
    }

    pub fn download_directory(&self) -> PathBuf {
        self.inner
            .config
            .lock()
            .map(|c| c.download_directory.clone())
            .unwrap_or_default()
    }

    pub fn is_running(&self) -> bool {
        self.inner.queue.state().running
    }

    pub fn pending_count(&self) -> usize {
        self.inner.queue.len()
    }

    /// Wait for every worker thread started so far to exit
    pub fn join_worker(&self) {
        let handles: Vec<JoinHandle<()>> = match self.workers.lock() {
            Ok(mut workers) => workers.drain(..).collect(),
            Err(_) => return,
        };
        for handle in handles {
            if handle.join().is_err() {
                error!("Subtitle worker panicked");
            }
        }
    }

    fn start_worker(&self) {
        let inner = Arc::clone(&self.inner);
        let spawned = thread::Builder::new()
            .name("subtitle-worker".to_string())
            .spawn(move || inner.run());

        match spawned {
            Ok(handle) => {
                if let Ok(mut workers) = self.workers.lock() {
                    workers.retain(|h| !h.is_finished());
                    workers.push(handle);
                }
            }
            Err(e) => {
                error!("Failed to start subtitle worker: {}", e);
                self.inner.queue.abort_start();
                self.inner
                    .events
                    .send(WorkerEvent::StatusLine(format!("Could not start worker: {}", e)));
            }
        }
    }
}

/// Returns the queue to idle if the worker unwinds, so the next submit starts a new one
struct IdleOnPanic<'a>(&'a JobQueue);

impl Drop for IdleOnPanic<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            error!("Subtitle worker panicked; queue returned to idle");
            self.0.abort_start();
        }
    }
}

impl RunnerInner {
    fn run(&self) {
        info!("Subtitle worker started");
        let _guard = IdleOnPanic(&self.queue);
        loop {
            let job = match self.queue.next_job() {
                NextJob::Run(job) => job,
                NextJob::Drained => {
                    info!("Subtitle worker idle, queue finished");
                    self.events.send(WorkerEvent::StatusLine("Idle - queue finished".to_string()));
                    return;
                }
                NextJob::Stopped => {
                    info!("Subtitle worker stopped after current job");
                    self.events.send(WorkerEvent::StatusLine("Stopped after current job".to_string()));
                    return;
                }
            };

            let outcome = self.process_job(&job);
            self.finish(&job, outcome);
        }
    }

    fn update(&self, id: JobId, status: JobStatus, message: &str) {
        self.events.send(WorkerEvent::JobUpdated {
            id,
            status,
            message: message.to_string(),
            saved_path: None,
        });
    }

    fn finish(&self, job: &Job, outcome: JobOutcome) {
        info!("Job {} '{}' finished: {} {}", job.id, job.query, outcome.status, outcome.message);
        let line = match outcome.status {
            JobStatus::Downloaded => format!("Downloaded subtitle for: {}", job.query),
            JobStatus::NotFound => format!("No subtitles found for: {}", job.query),
            JobStatus::Partial => format!("Partial download for: {}", job.query),
            _ => format!("Error searching/downloading for: {}", job.query),
        };

        self.events.send(WorkerEvent::JobUpdated {
            id: job.id,
            status: outcome.status,
            message: Utils::truncate_string(&outcome.message, MAX_MESSAGE_LEN),
            saved_path: outcome.saved_path.clone(),
        });
        if outcome.status == JobStatus::Downloaded {
            if let Some(path) = outcome.saved_path {
                self.events.send(WorkerEvent::DownloadRecorded(path));
            }
        }
        self.events.send(WorkerEvent::StatusLine(line));
    }

    /// Run one job to a terminal outcome
    fn process_job(&self, job: &Job) -> JobOutcome {
        self.update(job.id, JobStatus::Searching, "");
        self.events
            .send(WorkerEvent::StatusLine(format!("Searching for: {}", job.query)));

        let target = SearchTarget::from_query(&job.query);
        let config = match self.config.lock() {
            Ok(config) => config.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        let language = SubtitleUtils::resolve_language(&job.language_input, &config.default_language);
        debug!("Job {} language {} ({})", job.id, language, SubtitleUtils::language_code_to_name(&language));

        let directory = config.download_directory.as_path();
        if let Err(e) = std::fs::create_dir_all(directory) {
            warn!("Cannot create download folder {}: {}", directory.display(), e);
            return JobOutcome::error(format!("Cannot create download folder: {}", e));
        }

        match self.search_and_save(job, &target, &language, directory, config.detection_window) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Job {} failed: {}", job.id, e);
                JobOutcome::error(Utils::truncate_string(&e.to_string(), MAX_MESSAGE_LEN))
            }
        }
    }

    fn search_and_save(
        &self,
        job: &Job,
        target: &SearchTarget,
        language: &str,
        directory: &Path,
        window: Duration,
    ) -> Result<JobOutcome, ProviderError> {
        self.update(job.id, JobStatus::Searching, "Querying providers...");
        let candidates = self.provider.search_best(target, language)?;
        let srt = target_format_only(&candidates);

        if !srt.is_empty() {
            let detected = self.save_and_detect(job, target, &srt, directory, window)?;
            let Some(path) = pick_srt(&detected) else {
                return Ok(JobOutcome::error("Saved but the subtitle file could not be located"));
            };
            return Ok(JobOutcome::downloaded(path));
        }

        // Providers occasionally come back empty on the first query
        debug!("No SRT candidates for '{}', retrying once", target.query);
        let retry = self.provider.search_best(target, language)?;
        let retry_srt = target_format_only(&retry);
        // An empty retry must not discard a real first result
        let chosen = if !retry_srt.is_empty() {
            retry_srt
        } else if !retry.is_empty() {
            retry
        } else {
            candidates
        };
        if chosen.is_empty() {
            return Ok(JobOutcome::not_found());
        }

        let detected = self.save_and_detect(job, target, &chosen, directory, window)?;
        if detected.is_empty() {
            return Ok(JobOutcome::error("Saved but the subtitle file could not be located"));
        }

        self.update(job.id, JobStatus::Converting, "Converting to SRT...");
        let normalized = self.normalizer.normalize_to_srt(&detected);

        if let Some((path, _)) = normalized.iter().find(|(p, r)| r.is_ok() && is_target_file(p)) {
            return Ok(JobOutcome::downloaded(path.clone()));
        }
        let (path, result) = &normalized[0];
        let reason = match result {
            Err(reason) => reason.clone(),
            Ok(()) => format!("Kept original format (.{})", Utils::extension_lowercase(path)),
        };
        Ok(JobOutcome::partial(path.clone(), reason))
    }

    fn save_and_detect(
        &self,
        job: &Job,
        target: &SearchTarget,
        candidates: &[Candidate],
        directory: &Path,
        window: Duration,
    ) -> Result<Vec<PathBuf>, ProviderError> {
        let before = SubtitleUtils::snapshot(directory);
        self.update(job.id, JobStatus::Downloading, "Saving subtitle(s)...");
        self.provider.save(target, candidates, directory)?;
        Ok(SubtitleUtils::detect_new(&before, directory, window))
    }
}

fn target_format_only(candidates: &[Candidate]) -> Vec<Candidate> {
    candidates.iter().filter(|c| c.is_target_format()).cloned().collect()
}

fn is_target_file(path: &Path) -> bool {
    Utils::extension_lowercase(path) == TARGET_EXTENSION
}

/// First detected SRT file, else the newest detected file
fn pick_srt(detected: &[PathBuf]) -> Option<PathBuf> {
    detected
        .iter()
        .find(|p| is_target_file(p))
        .or_else(|| detected.first())
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::{self, Receiver};

    const VALID_ASS: &str = "[Events]\nFormat: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\nDialogue: 0,0:00:01.00,0:00:02.00,Default,,0,0,0,,Hello\n";

    /// Provider whose behaviour is picked by words in the query:
    /// "fail" raises, "missing" finds nothing, "ghost" saves nothing,
    /// "anime" offers only an ASS subtitle, "flaky" offers ASS once and then
    /// nothing, "broken" saves an unreadable ASS file, "vobsub" offers a .sub,
    /// "panic" panics, anything else one SRT.
    struct FakeProvider {
        searches: Mutex<Vec<(String, String)>>,
        started: Mutex<Sender<String>>,
        gate: Mutex<Option<Receiver<()>>>,
    }

    impl FakeProvider {
        fn new(gated: bool) -> (Arc<Self>, Receiver<String>, Option<Sender<()>>) {
            let (started_tx, started_rx) = mpsc::channel();
            let (gate_tx, gate_rx) = mpsc::channel();
            let provider = Arc::new(Self {
                searches: Mutex::new(Vec::new()),
                started: Mutex::new(started_tx),
                gate: Mutex::new(gated.then_some(gate_rx)),
            });
            (provider, started_rx, gated.then_some(gate_tx))
        }

        fn queries(&self) -> Vec<String> {
            self.searches.lock().unwrap().iter().map(|(q, _)| q.clone()).collect()
        }
    }

    impl SubtitleProvider for FakeProvider {
        fn search_best(&self, target: &SearchTarget, language: &str) -> Result<Vec<Candidate>, ProviderError> {
            let previous_calls = {
                let mut searches = self.searches.lock().unwrap();
                let n = searches.iter().filter(|(q, _)| *q == target.query).count();
                searches.push((target.query.clone(), language.to_string()));
                n
            };
            let _ = self.started.lock().unwrap().send(target.query.clone());
            if let Some(gate) = self.gate.lock().unwrap().as_ref() {
                gate.recv_timeout(Duration::from_secs(10)).unwrap();
            }

            let q = &target.query;
            if q.contains("fail") {
                return Err(ProviderError::Search(format!("ConnectionError: {}", "network unreachable ".repeat(40))));
            }
            if q.contains("panic") {
                panic!("provider blew up");
            }
            if q.contains("missing") || (q.contains("flaky") && previous_calls > 0) {
                return Ok(Vec::new());
            }
            let format = if q.contains("anime") || q.contains("flaky") || q.contains("broken") {
                "ass"
            } else if q.contains("vobsub") {
                "sub"
            } else {
                "srt"
            };
            Ok(vec![Candidate {
                id: format!("fake:{}", q),
                provider: "fake".to_string(),
                format: format.to_string(),
                language: language.to_string(),
            }])
        }

        fn save(&self, target: &SearchTarget, candidates: &[Candidate], directory: &Path) -> Result<(), ProviderError> {
            if target.query.contains("ghost") {
                return Ok(());
            }
            for c in candidates {
                let path = directory.join(format!("{}.en.{}", target.query, c.format));
                let body = match c.format.as_str() {
                    "ass" if target.query.contains("broken") => "not a subtitle at all\n",
                    "ass" => VALID_ASS,
                    "sub" => "{1}{25}Hi\n",
                    _ => "1\n00:00:01,000 --> 00:00:02,000\nHi\n",
                };
                std::fs::write(path, body).map_err(|e| ProviderError::Save(e.to_string()))?;
            }
            Ok(())
        }
    }

    fn runner_for(provider: Arc<FakeProvider>, dir: &Path) -> (JobRunner, Receiver<WorkerEvent>) {
        let (tx, rx) = mpsc::channel();
        let runner = JobRunner::new(
            provider,
            FormatNormalizer::default(),
            RunnerConfig::new(dir.join("downloads"), "eng".to_string()),
            EventSink::new(tx),
        );
        (runner, rx)
    }

    fn final_update(events: &[WorkerEvent], id: JobId) -> (JobStatus, String, Option<PathBuf>) {
        events
            .iter()
            .rev()
            .find_map(|e| match e {
                WorkerEvent::JobUpdated { id: i, status, message, saved_path } if *i == id => {
                    Some((*status, message.clone(), saved_path.clone()))
                }
                _ => None,
            })
            .expect("job was never updated")
    }

    fn wait_started(started: &Receiver<String>, query: &str) {
        let got = started.recv_timeout(Duration::from_secs(10)).unwrap();
        assert_eq!(got, query);
    }

    #[test]
    fn srt_candidate_ends_downloaded_and_is_recorded_once() {
        let dir = tempfile::tempdir().unwrap();
        let (provider, _started, _) = FakeProvider::new(false);
        let (runner, rx) = runner_for(provider, dir.path());

        let id = runner.submit_query("Show S01E01", "eng").unwrap();
        runner.join_worker();
        let events: Vec<WorkerEvent> = rx.try_iter().collect();

        let (status, _, saved) = final_update(&events, id);
        assert_eq!(status, JobStatus::Downloaded);
        let saved = saved.unwrap();
        assert_eq!(saved, dir.path().join("downloads").join("Show S01E01.en.srt"));
        assert!(saved.exists());
        let recorded = events
            .iter()
            .filter(|e| **e == WorkerEvent::DownloadRecorded(saved.clone()))
            .count();
        assert_eq!(recorded, 1);
        assert!(!runner.is_running());
    }

    #[test]
    fn jobs_run_in_submission_order() {
        let dir = tempfile::tempdir().unwrap();
        let (provider, started, gate) = FakeProvider::new(true);
        let gate = gate.unwrap();
        let (runner, _rx) = runner_for(provider.clone(), dir.path());

        runner.submit_query("first", "").unwrap();
        wait_started(&started, "first");
        runner.submit_query("second", "").unwrap();
        runner.submit_query("third", "").unwrap();
        assert!(runner.is_running());
        assert_eq!(runner.pending_count(), 2);

        for _ in 0..3 {
            gate.send(()).unwrap();
        }
        runner.join_worker();
        assert_eq!(provider.queries(), vec!["first", "second", "third"]);
        assert_eq!(runner.pending_count(), 0);
    }

    #[test]
    fn stop_after_current_leaves_rest_queued() {
        let dir = tempfile::tempdir().unwrap();
        let (provider, started, gate) = FakeProvider::new(true);
        let gate = gate.unwrap();
        let (runner, rx) = runner_for(provider.clone(), dir.path());

        let first = runner.submit_query("one", "").unwrap();
        wait_started(&started, "one");
        runner.submit_query("two", "").unwrap();
        runner.submit_query("three", "").unwrap();
        assert!(runner.request_stop());
        gate.send(()).unwrap();
        runner.join_worker();

        let events: Vec<WorkerEvent> = rx.try_iter().collect();
        assert_eq!(final_update(&events, first).0, JobStatus::Downloaded);
        assert_eq!(provider.queries(), vec!["one"]);
        assert_eq!(runner.pending_count(), 2);
        assert!(!runner.is_running());
        assert!(events.contains(&WorkerEvent::StatusLine("Stopped after current job".to_string())));
    }

    #[test]
    fn provider_fault_is_truncated_and_next_job_runs() {
        let dir = tempfile::tempdir().unwrap();
        let (provider, started, gate) = FakeProvider::new(true);
        let gate = gate.unwrap();
        let (runner, rx) = runner_for(provider.clone(), dir.path());

        let failing = runner.submit_query("fail hard", "").unwrap();
        wait_started(&started, "fail hard");
        let next = runner.submit_query("Show S01E02", "").unwrap();
        gate.send(()).unwrap();
        gate.send(()).unwrap();
        runner.join_worker();

        let events: Vec<WorkerEvent> = rx.try_iter().collect();
        let (status, message, saved) = final_update(&events, failing);
        assert_eq!(status, JobStatus::Error);
        assert!(message.chars().count() <= MAX_MESSAGE_LEN);
        assert!(message.ends_with("..."));
        assert!(saved.is_none());
        assert_eq!(final_update(&events, next).0, JobStatus::Downloaded);
    }

    #[test]
    fn empty_results_are_retried_once_then_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let (provider, _started, _) = FakeProvider::new(false);
        let (runner, rx) = runner_for(provider.clone(), dir.path());

        let id = runner.submit_query("missing show", "").unwrap();
        runner.join_worker();

        let events: Vec<WorkerEvent> = rx.try_iter().collect();
        assert_eq!(final_update(&events, id).0, JobStatus::NotFound);
        assert_eq!(provider.queries(), vec!["missing show", "missing show"]);
    }

    #[test]
    fn ass_only_result_is_converted_to_srt() {
        let dir = tempfile::tempdir().unwrap();
        let (provider, _started, _) = FakeProvider::new(false);
        let (runner, rx) = runner_for(provider, dir.path());

        let id = runner.submit_query("anime ep1", "jpn").unwrap();
        runner.join_worker();

        let events: Vec<WorkerEvent> = rx.try_iter().collect();
        let (status, _, saved) = final_update(&events, id);
        assert_eq!(status, JobStatus::Downloaded);
        let downloads = dir.path().join("downloads");
        assert_eq!(saved, Some(downloads.join("anime ep1.en.srt")));
        assert!(!downloads.join("anime ep1.en.ass").exists());
        assert!(events
            .iter()
            .any(|e| matches!(e, WorkerEvent::JobUpdated { status: JobStatus::Converting, .. })));
    }

    #[test]
    fn save_without_a_new_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let (provider, _started, _) = FakeProvider::new(false);
        let (runner, rx) = runner_for(provider, dir.path());

        let id = runner.submit_query("ghost episode", "").unwrap();
        runner.join_worker();

        let events: Vec<WorkerEvent> = rx.try_iter().collect();
        let (status, message, _) = final_update(&events, id);
        assert_eq!(status, JobStatus::Error);
        assert!(message.contains("could not be located"));
        assert!(!events.iter().any(|e| matches!(e, WorkerEvent::DownloadRecorded(_))));
    }

    #[test]
    fn blank_language_uses_configured_default() {
        let dir = tempfile::tempdir().unwrap();
        let (provider, _started, _) = FakeProvider::new(false);
        let (runner, _rx) = runner_for(provider.clone(), dir.path());

        runner.submit_query("Show S02E01", "  ").unwrap();
        runner.join_worker();
        runner.submit_query("Show S02E02", "FRE").unwrap();
        runner.join_worker();

        let languages: Vec<String> = provider.searches.lock().unwrap().iter().map(|(_, l)| l.clone()).collect();
        assert_eq!(languages, vec!["eng", "fre"]);
    }

    #[test]
    fn clearing_drops_only_pending_jobs() {
        let dir = tempfile::tempdir().unwrap();
        let (provider, started, gate) = FakeProvider::new(true);
        let gate = gate.unwrap();
        let (runner, rx) = runner_for(provider.clone(), dir.path());

        let running = runner.submit_query("current", "").unwrap();
        wait_started(&started, "current");
        let a = runner.submit_query("later a", "").unwrap();
        let b = runner.submit_query("later b", "").unwrap();

        assert_eq!(runner.clear_pending(), vec![a, b]);
        gate.send(()).unwrap();
        runner.join_worker();

        let events: Vec<WorkerEvent> = rx.try_iter().collect();
        assert!(events.contains(&WorkerEvent::JobsCleared(vec![a, b])));
        assert_eq!(final_update(&events, running).0, JobStatus::Downloaded);
        assert_eq!(provider.queries(), vec!["current"]);
    }

    #[test]
    fn blank_query_is_rejected_and_stop_while_idle_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let (provider, _started, _) = FakeProvider::new(false);
        let (runner, _rx) = runner_for(provider, dir.path());

        assert_eq!(runner.submit_query("   ", "eng"), None);
        assert!(!runner.is_running());
        assert!(!runner.request_stop());
    }

    #[test]
    fn folder_change_applies_to_later_jobs() {
        let dir = tempfile::tempdir().unwrap();
        let (provider, _started, _) = FakeProvider::new(false);
        let (runner, rx) = runner_for(provider, dir.path());

        let other = dir.path().join("elsewhere");
        runner.set_download_directory(other.clone());
        assert_eq!(runner.download_directory(), other);

        let id = runner.submit_query("Show S03E01", "").unwrap();
        runner.join_worker();
        let events: Vec<WorkerEvent> = rx.try_iter().collect();
        assert_eq!(final_update(&events, id).2, Some(other.join("Show S03E01.en.srt")));
    }

    #[test]
    fn empty_retry_keeps_the_first_result() {
        let dir = tempfile::tempdir().unwrap();
        let (provider, _started, _) = FakeProvider::new(false);
        let (runner, rx) = runner_for(provider.clone(), dir.path());

        let id = runner.submit_query("flaky ep3", "").unwrap();
        runner.join_worker();

        let events: Vec<WorkerEvent> = rx.try_iter().collect();
        let (status, _, saved) = final_update(&events, id);
        assert_eq!(status, JobStatus::Downloaded);
        assert_eq!(saved, Some(dir.path().join("downloads").join("flaky ep3.en.srt")));
        assert_eq!(provider.queries(), vec!["flaky ep3", "flaky ep3"]);
    }

    #[test]
    fn failed_conversion_keeps_original_as_partial() {
        let dir = tempfile::tempdir().unwrap();
        let (provider, _started, _) = FakeProvider::new(false);
        let (runner, rx) = runner_for(provider, dir.path());

        let id = runner.submit_query("broken ep1", "").unwrap();
        runner.join_worker();

        let events: Vec<WorkerEvent> = rx.try_iter().collect();
        let (status, message, saved) = final_update(&events, id);
        let original = dir.path().join("downloads").join("broken ep1.en.ass");
        assert_eq!(status, JobStatus::Partial);
        assert!(message.starts_with("Conversion failed"));
        assert_eq!(saved, Some(original.clone()));
        assert!(original.exists());
        assert!(!events.iter().any(|e| matches!(e, WorkerEvent::DownloadRecorded(_))));
    }

    #[test]
    fn unconvertible_format_is_kept_as_partial() {
        let dir = tempfile::tempdir().unwrap();
        let (provider, _started, _) = FakeProvider::new(false);
        let (runner, rx) = runner_for(provider, dir.path());

        let id = runner.submit_query("vobsub movie", "").unwrap();
        runner.join_worker();

        let events: Vec<WorkerEvent> = rx.try_iter().collect();
        let (status, message, saved) = final_update(&events, id);
        let original = dir.path().join("downloads").join("vobsub movie.en.sub");
        assert_eq!(status, JobStatus::Partial);
        assert_eq!(message, "Kept original format (.sub)");
        assert_eq!(saved, Some(original.clone()));
        assert!(original.exists());
        assert!(!events.iter().any(|e| matches!(e, WorkerEvent::DownloadRecorded(_))));
    }

    #[test]
    fn panicking_job_does_not_wedge_the_queue() {
        let dir = tempfile::tempdir().unwrap();
        let (provider, _started, _) = FakeProvider::new(false);
        let (runner, rx) = runner_for(provider, dir.path());

        runner.submit_query("panic now", "").unwrap();
        runner.join_worker();
        assert!(!runner.is_running());

        let id = runner.submit_query("Show S04E01", "").unwrap();
        runner.join_worker();
        let events: Vec<WorkerEvent> = rx.try_iter().collect();
        assert_eq!(final_update(&events, id).0, JobStatus::Downloaded);
    }
}
