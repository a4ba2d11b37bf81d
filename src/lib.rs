//! Subgrab - Subtitle Downloader Library
//!
//! Queues free-text subtitle searches, runs them one at a time through the
//! subliminal Python package and normalizes the results to SRT.

pub mod config;
pub mod data_structures;
pub mod logging;
pub mod settings;
pub mod python_manager;
pub mod subtitle_utils;
pub mod subtitle_convert;
pub mod normalizer;
pub mod provider;
pub mod job_queue;
pub mod worker;
pub mod app;
pub mod gui;
pub mod helper_functions;

// Re-export commonly used items
pub use config::*;
pub use data_structures::*;
pub use logging::*;
pub use settings::*;
pub use helper_functions::*;
