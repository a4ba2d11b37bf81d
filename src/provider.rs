//! Subtitle provider seam and its subliminal-backed implementation
//!
//! Search and ranking belong to subliminal. The crate talks to it through a
//! small bridge script run with the system Python: `search` pickles the parsed
//! video and its best subtitles into a session file, `save` reloads that
//! session and writes the selected candidates to disk.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Deserialize;

use crate::config::TARGET_EXTENSION;
use crate::python_manager::PythonManager;
use crate::debug;

const BRIDGE_SCRIPT: &str = include_str!("../resources/subliminal_bridge.py");

/// Search sessions kept per query: a save may pick candidates from the
/// first search when the retry came back empty
const SESSIONS_PER_QUERY: usize = 2;

/// What the provider library is asked to find subtitles for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTarget {
    pub query: String,
    /// File names offered to the library's name parser, in order
    pub name_hints: Vec<String>,
}

impl SearchTarget {
    /// Build a target from free text; the query is dressed up as a video file name
    /// so the library's parser can pick out title, season and episode
    pub fn from_query(query: &str) -> Self {
        let query = query.trim();
        Self {
            query: query.to_string(),
            name_hints: vec![format!("{} .mkv", query), format!("{}.mkv", query)],
        }
    }
}

/// One subtitle offered by a provider; opaque apart from its format
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Candidate {
    pub id: String,
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub language: String,
}

impl Candidate {
    /// Whether the candidate is already in the target format.
    ///
    /// An unreported format counts as SRT, the provider library's default.
    pub fn is_target_format(&self) -> bool {
        self.format.is_empty()
            || self.format.eq_ignore_ascii_case(TARGET_EXTENSION)
            || self.format.eq_ignore_ascii_case("subrip")
    }
}

/// Errors surfaced by a provider call
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("subtitle provider unavailable: {0}")]
    Unavailable(String),

    #[error("failed to start provider: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("search failed: {0}")]
    Search(String),

    #[error("save failed: {0}")]
    Save(String),

    #[error("unexpected provider output: {0}")]
    Protocol(String),
}

/// Search/save interface of the subtitle provider layer.
///
/// Both calls may be slow and may fail; neither is cancellable.
pub trait SubtitleProvider: Send + Sync {
    /// Best subtitles for `target` in `language`, best first
    fn search_best(&self, target: &SearchTarget, language: &str) -> Result<Vec<Candidate>, ProviderError>;

    /// Write `candidates` (from the last search of `target`) into `directory`
    fn save(&self, target: &SearchTarget, candidates: &[Candidate], directory: &Path) -> Result<(), ProviderError>;
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BridgeReply {
    Failure {
        error: String,
        #[serde(default)]
        kind: String,
    },
    Search {
        #[serde(default)]
        parsed: bool,
        candidates: Vec<Candidate>,
    },
    Save {
        saved: usize,
    },
}

/// Parse the single JSON line printed by the bridge script
fn parse_reply(stdout: &str, stderr: &str) -> Result<BridgeReply, ProviderError> {
    let line = stdout.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or_default();
    let reply: BridgeReply = serde_json::from_str(line).map_err(|e| {
        let detail = if stderr.trim().is_empty() { line } else { stderr.trim() };
        ProviderError::Protocol(format!("{} ({})", e, detail))
    })?;
    match reply {
        BridgeReply::Failure { error, kind } if kind == "unavailable" => Err(ProviderError::Unavailable(error)),
        other => Ok(other),
    }
}

/// Drop all but the newest sessions of one query, returning the dropped paths
fn retire_old_sessions(kept: &mut Vec<PathBuf>) -> Vec<PathBuf> {
    let excess = kept.len().saturating_sub(SESSIONS_PER_QUERY);
    kept.drain(..excess).collect()
}

/// Provider backed by the subliminal Python package
pub struct SubliminalProvider {
    session_dir: PathBuf,
    sessions: std::sync::Mutex<HashMap<String, Vec<PathBuf>>>,
    counter: AtomicU64,
}

impl SubliminalProvider {
    pub fn new() -> Result<Self, ProviderError> {
        let session_dir = PythonManager::ensure_cache_dir()?;
        Ok(Self {
            session_dir,
            sessions: std::sync::Mutex::new(HashMap::new()),
            counter: AtomicU64::new(0),
        })
    }

    fn run_bridge(&self, args: &[String]) -> Result<BridgeReply, ProviderError> {
        let python = PythonManager::python_command()
            .ok_or_else(|| ProviderError::Unavailable("Python 3 was not found".to_string()))?;

        let mut full_args: Vec<&str> = vec!["-c", BRIDGE_SCRIPT];
        full_args.extend(args.iter().map(String::as_str));
        debug!("Running subliminal bridge: {} {}", python, args.join(" "));

        let output = PythonManager::run_command_hidden(&python, &full_args, &HashMap::new())?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        parse_reply(&stdout, &stderr)
    }

    fn session_path(&self, target: &SearchTarget) -> PathBuf {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        let path = self
            .session_dir
            .join(format!("session-{}-{}.pickle", std::process::id(), n));
        if let Ok(mut sessions) = self.sessions.lock() {
            let kept = sessions.entry(target.query.clone()).or_default();
            kept.push(path.clone());
            for old in retire_old_sessions(kept) {
                let _ = std::fs::remove_file(old);
            }
        }
        path
    }
}

impl SubtitleProvider for SubliminalProvider {
    fn search_best(&self, target: &SearchTarget, language: &str) -> Result<Vec<Candidate>, ProviderError> {
        let session = self.session_path(target);
        let mut args = vec![
            "search".to_string(),
            "--session".to_string(),
            session.display().to_string(),
            format!("--language={}", language),
            format!("--query={}", target.query),
        ];
        for hint in &target.name_hints {
            args.push(format!("--name={}", hint));
        }

        match self.run_bridge(&args)? {
            BridgeReply::Search { parsed, candidates } => {
                debug!(
                    "Search for '{}' returned {} candidate(s), name parsed: {}",
                    target.query,
                    candidates.len(),
                    parsed
                );
                Ok(candidates)
            }
            BridgeReply::Failure { error, .. } => Err(ProviderError::Search(error)),
            BridgeReply::Save { .. } => Err(ProviderError::Protocol("save reply to a search".to_string())),
        }
    }

    fn save(&self, target: &SearchTarget, candidates: &[Candidate], directory: &Path) -> Result<(), ProviderError> {
        let sessions = self
            .sessions
            .lock()
            .ok()
            .and_then(|s| s.get(&target.query).cloned())
            .filter(|kept| !kept.is_empty())
            .ok_or_else(|| ProviderError::Save(format!("no search session for '{}'", target.query)))?;

        let ids: Vec<&str> = candidates.iter().map(|c| c.id.as_str()).collect();
        let mut args = vec!["save".to_string()];
        for session in &sessions {
            args.push("--session".to_string());
            args.push(session.display().to_string());
        }
        args.extend([
            "--directory".to_string(),
            directory.display().to_string(),
            format!("--ids={}", ids.join(",")),
        ]);

        match self.run_bridge(&args)? {
            BridgeReply::Save { saved } => {
                debug!("Provider saved {} subtitle(s) to {}", saved, directory.display());
                Ok(())
            }
            BridgeReply::Failure { error, .. } => Err(ProviderError::Save(error)),
            BridgeReply::Search { .. } => Err(ProviderError::Protocol("search reply to a save".to_string())),
        }
    }
}

/// Stand-in used when the real provider could not be set up; every call fails
pub struct UnavailableProvider {
    reason: String,
}

impl UnavailableProvider {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

impl SubtitleProvider for UnavailableProvider {
    fn search_best(&self, _target: &SearchTarget, _language: &str) -> Result<Vec<Candidate>, ProviderError> {
        Err(ProviderError::Unavailable(self.reason.clone()))
    }

    fn save(&self, _target: &SearchTarget, _candidates: &[Candidate], _directory: &Path) -> Result<(), ProviderError> {
        Err(ProviderError::Unavailable(self.reason.clone()))
    }
}

impl Drop for SubliminalProvider {
    fn drop(&mut self) {
        if let Ok(sessions) = self.sessions.lock() {
            for path in sessions.values().flatten() {
                let _ = std::fs::remove_file(path);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_offers_both_name_forms() {
        let target = SearchTarget::from_query("  Show S01E01 ");
        assert_eq!(target.query, "Show S01E01");
        assert_eq!(target.name_hints, vec!["Show S01E01 .mkv".to_string(), "Show S01E01.mkv".to_string()]);
    }

    #[test]
    fn candidate_format_check() {
        let mut c = Candidate {
            id: "opensubtitles:1".to_string(),
            provider: "opensubtitles".to_string(),
            format: "SRT".to_string(),
            language: "en".to_string(),
        };
        assert!(c.is_target_format());
        c.format = "ass".to_string();
        assert!(!c.is_target_format());
    }

    #[test]
    fn search_reply_is_decoded() {
        let out = "noise\n{\"parsed\": true, \"candidates\": [{\"id\": \"p:1\", \"provider\": \"p\", \"format\": \"srt\", \"language\": \"en\"}]}\n";
        match parse_reply(out, "").unwrap() {
            BridgeReply::Search { parsed, candidates } => {
                assert!(parsed);
                assert_eq!(candidates.len(), 1);
                assert_eq!(candidates[0].id, "p:1");
            }
            other => panic!("unexpected reply {:?}", other),
        }
    }

    #[test]
    fn missing_library_maps_to_unavailable() {
        let out = r#"{"error": "subliminal is not installed: No module named 'subliminal'", "kind": "unavailable"}"#;
        assert!(matches!(parse_reply(out, ""), Err(ProviderError::Unavailable(_))));
    }

    #[test]
    fn garbage_output_is_a_protocol_error() {
        let err = parse_reply("", "Traceback: boom").unwrap_err();
        assert!(matches!(err, ProviderError::Protocol(_)));
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn bridge_parses_every_code_form_the_window_accepts() {
        // eng (639-3), fre (639-2/B), en / pt-br (IETF, lowercased by the worker)
        assert!(BRIDGE_SCRIPT.contains("Language.fromalpha3b"));
        assert!(BRIDGE_SCRIPT.contains("Language.fromietf(ietf_case(c))"));
        assert!(BRIDGE_SCRIPT.contains("p.upper() if len(p) == 2"));
    }

    #[test]
    fn only_the_newest_sessions_are_kept() {
        let mut kept: Vec<PathBuf> = (0..3).map(|n| PathBuf::from(format!("s{}.pickle", n))).collect();
        let dropped = retire_old_sessions(&mut kept);
        assert_eq!(dropped, vec![PathBuf::from("s0.pickle")]);
        assert_eq!(kept, vec![PathBuf::from("s1.pickle"), PathBuf::from("s2.pickle")]);
    }
}
