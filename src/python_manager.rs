//! Python and subliminal discovery and installation
//!
//! The subtitle provider layer is the `subliminal` Python package. This module
//! locates a Python 3 interpreter, checks whether subliminal can be imported,
//! installs it on request, and runs child processes without a console window.

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

use once_cell::sync::OnceCell;

use crate::{debug, error, info, warn};

/// Interpreter found on first lookup
static PYTHON: OnceCell<Option<String>> = OnceCell::new();

/// Python and subliminal management utilities
pub struct PythonManager;

impl PythonManager {
    /// Candidate interpreter commands, most specific first
    fn interpreter_candidates() -> Vec<&'static str> {
        #[cfg(target_os = "macos")]
        {
            vec!["/opt/homebrew/bin/python3", "/usr/local/bin/python3", "python3", "python"]
        }

        #[cfg(windows)]
        {
            vec!["python", "py", "python3"]
        }

        #[cfg(not(any(windows, target_os = "macos")))]
        {
            vec!["python3", "python"]
        }
    }

    /// Version string of a command if it is a Python 3 interpreter
    fn python3_version(cmd: &str) -> Option<String> {
        if which::which(cmd).is_err() {
            return None;
        }
        let output = Self::run_command_hidden(cmd, &["--version"], &HashMap::new()).ok()?;
        if !output.status.success() {
            return None;
        }
        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let version = if !stdout.is_empty() { stdout } else { stderr };
        debug!("Python version output for {}: {}", cmd, version);
        version.starts_with("Python 3.").then_some(version)
    }

    /// Command of the first usable Python 3 interpreter, cached for the session
    pub fn python_command() -> Option<String> {
        PYTHON
            .get_or_init(|| {
                let found = Self::interpreter_candidates()
                    .into_iter()
                    .find(|cmd| Self::python3_version(cmd).is_some())
                    .map(str::to_string);
                match &found {
                    Some(cmd) => {
                        info!("Using Python interpreter: {}", cmd);
                    }
                    None => {
                        warn!("No Python 3 interpreter found");
                    }
                }
                found
            })
            .clone()
    }

    /// Version of the selected interpreter
    pub fn get_version() -> Option<String> {
        Self::python_command().and_then(|cmd| Self::python3_version(&cmd))
    }

    /// Check whether subliminal and babelfish can be imported
    pub fn is_subliminal_installed() -> bool {
        let Some(python) = Self::python_command() else {
            return false;
        };
        match Self::run_command_hidden(
            &python,
            &["-c", "import subliminal, babelfish; print('subliminal available')"],
            &HashMap::new(),
        ) {
            Ok(output) => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                let available = output.status.success() && stdout.contains("subliminal available");
                debug!("subliminal import check: {}", available);
                available
            }
            Err(e) => {
                debug!("subliminal import check failed to run: {}", e);
                false
            }
        }
    }

    /// Install subliminal into the user site of the selected interpreter
    pub fn install_subliminal() -> Result<(), String> {
        let python = Self::python_command().ok_or_else(|| "Python 3 was not found".to_string())?;
        info!("Installing subliminal with {}", python);

        let attempts: [&[&str]; 2] = [
            &["-m", "pip", "install", "--user", "subliminal", "babelfish"],
            // Externally managed environments (PEP 668)
            &["-m", "pip", "install", "--user", "--break-system-packages", "subliminal", "babelfish"],
        ];

        let mut last_error = String::new();
        for args in attempts {
            match Self::run_command_hidden(&python, args, &HashMap::new()) {
                Ok(output) if output.status.success() => {
                    info!("subliminal installed successfully");
                    return Ok(());
                }
                Ok(output) => {
                    last_error = String::from_utf8_lossy(&output.stderr).trim().to_string();
                    warn!("pip install attempt failed: {}", last_error);
                }
                Err(e) => {
                    last_error = e.to_string();
                    warn!("Failed to run pip: {}", last_error);
                }
            }
        }
        error!("Failed to install subliminal: {}", last_error);
        Err(last_error)
    }

    /// Directory for provider session files and the subliminal cache
    pub fn ensure_cache_dir() -> io::Result<PathBuf> {
        let cache_dir = std::env::temp_dir().join("subgrab_cache");
        if !cache_dir.exists() {
            std::fs::create_dir_all(&cache_dir)?;
        }
        Ok(cache_dir)
    }

    /// Run a command with hidden console window, capturing output
    pub fn run_command_hidden(cmd: &str, args: &[&str], env_vars: &HashMap<String, String>) -> io::Result<Output> {
        let mut command = Command::new(cmd);
        command.envs(env_vars);
        command.args(args);
        command.stdin(Stdio::null());
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());
        command.env("PYTHONIOENCODING", "utf-8");
        command.env("PYTHONUNBUFFERED", "1");

        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            command.creation_flags(0x08000000); // CREATE_NO_WINDOW
        }

        command.output()
    }
}
