//! Asynchronous logging for Subgrab
//!
//! Log lines are handed to a background thread that batches them into a log
//! file, and are mirrored to the `log` facade so `env_logger` can print them.

use std::collections::VecDeque;
use std::io::Write;
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Mutex;
use std::time::Duration;

/// Number of buffered entries that triggers a flush
const FLUSH_THRESHOLD: usize = 10;

/// Asynchronous logger that writes to file without blocking the caller
pub struct AsyncLogger {
    sender: mpsc::Sender<LogMessage>,
    handle: Option<std::thread::JoinHandle<()>>,
}

/// Messages understood by the logger thread
#[derive(Clone)]
pub enum LogMessage {
    Entry { level: &'static str, text: String },
    Shutdown,
}

/// Resolve the log file location for the current platform
fn log_file_path() -> Result<PathBuf, Box<dyn std::error::Error>> {
    #[cfg(windows)]
    {
        let exe_path = std::env::current_exe()?;
        let exe_dir = exe_path.parent().ok_or("Failed to get executable directory")?;
        Ok(exe_dir.join("subgrab_log.txt"))
    }

    #[cfg(not(windows))]
    {
        let app_dir = match xdg::BaseDirectories::new() {
            Ok(xdg_dirs) => xdg_dirs.get_cache_home().join("subgrab"),
            Err(_) => dirs::home_dir().ok_or("Failed to get home directory")?.join(".subgrab"),
        };
        std::fs::create_dir_all(&app_dir)?;
        Ok(app_dir.join("subgrab.log"))
    }
}

impl AsyncLogger {
    /// Create a logger appending to the platform log file
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let log_path = log_file_path()?;
        let log_file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        let (tx, rx) = mpsc::channel::<LogMessage>();
        let handle = std::thread::Builder::new()
            .name("subgrab-logger".to_string())
            .spawn(move || {
                let mut file = std::io::BufWriter::new(log_file);
                let mut buffer: VecDeque<String> = VecDeque::new();

                loop {
                    match rx.recv_timeout(Duration::from_millis(250)) {
                        Ok(LogMessage::Entry { level, text }) => {
                            let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
                            buffer.push_back(format!("[{} {}] {}", level, timestamp, text));
                            if buffer.len() < FLUSH_THRESHOLD {
                                continue;
                            }
                        }
                        Ok(LogMessage::Shutdown) | Err(mpsc::RecvTimeoutError::Disconnected) => {
                            for entry in buffer.drain(..) {
                                let _ = writeln!(file, "{}", entry);
                            }
                            let _ = file.flush();
                            return;
                        }
                        // Idle: flush whatever is pending
                        Err(mpsc::RecvTimeoutError::Timeout) => {}
                    }

                    if !buffer.is_empty() {
                        for entry in buffer.drain(..) {
                            let _ = writeln!(file, "{}", entry);
                        }
                        let _ = file.flush();
                    }
                }
            })?;

        Ok(AsyncLogger {
            sender: tx,
            handle: Some(handle),
        })
    }

    /// Queue a log line; never blocks on disk
    pub fn log(&self, level: &'static str, message: &str) {
        let _ = self.sender.send(LogMessage::Entry {
            level,
            text: message.to_string(),
        });
    }

    /// Flush and stop the logger thread
    pub fn shutdown(mut self) {
        let _ = self.sender.send(LogMessage::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

// Global logger instance
pub(crate) static LOGGER: Mutex<Option<AsyncLogger>> = Mutex::new(None);

/// Initialize stderr logging and the global file logger
pub fn setup_logging() -> Result<(), Box<dyn std::error::Error>> {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();

    let logger = AsyncLogger::new()?;
    let mut guard = LOGGER.lock().map_err(|e| format!("Failed to lock logger: {}", e))?;
    *guard = Some(logger);
    Ok(())
}

/// Stop the global file logger, flushing pending lines
pub fn shutdown_logging() {
    if let Ok(mut guard) = LOGGER.lock() {
        if let Some(logger) = guard.take() {
            logger.shutdown();
        }
    }
}

/// Send a message to the `log` facade and the global file logger
pub fn log_message(level: &'static str, message: &str) {
    match level {
        "ERROR" => log::error!(target: "subgrab", "{}", message),
        "WARN" => log::warn!(target: "subgrab", "{}", message),
        "DEBUG" => log::debug!(target: "subgrab", "{}", message),
        _ => log::info!(target: "subgrab", "{}", message),
    }

    // DEBUG lines stay out of the file
    if level == "DEBUG" {
        return;
    }
    if let Ok(guard) = LOGGER.lock() {
        if let Some(logger) = &*guard {
            logger.log(level, message);
        }
    }
}

#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        $crate::logging::log_message("INFO", &format!($($arg)*));
    };
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::logging::log_message("WARN", &format!($($arg)*));
    };
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::logging::log_message("ERROR", &format!($($arg)*));
    };
}

#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {
        $crate::logging::log_message("DEBUG", &format!($($arg)*));
    };
}
