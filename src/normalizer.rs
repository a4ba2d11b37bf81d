//! Conversion of downloaded subtitles to SRT
//!
//! Every input path produces exactly one output entry; failures are reported
//! inline and never propagate.

use std::path::{Path, PathBuf};

use crate::config::{CONVERTIBLE_EXTENSIONS, TARGET_EXTENSION};
use crate::helper_functions::Utils;
use crate::subtitle_convert::{SubtitleConverter, SubtitleFormat};
use crate::{info, warn};

/// Result for one normalized file: the resulting path and the failure reason, if any
pub type NormalizedFile = (PathBuf, Result<(), String>);

/// Converts non-SRT subtitle files to SRT next to the original
pub struct FormatNormalizer {
    converter: Option<Box<dyn SubtitleConverter>>,
}

impl FormatNormalizer {
    pub fn new(converter: Box<dyn SubtitleConverter>) -> Self {
        Self { converter: Some(converter) }
    }

    /// A normalizer without a conversion backend; convertible files are reported as failures
    pub fn without_converter() -> Self {
        Self { converter: None }
    }

    /// Normalize each path to SRT, preserving input order
    pub fn normalize_to_srt(&self, paths: &[PathBuf]) -> Vec<NormalizedFile> {
        paths.iter().map(|path| self.normalize_one(path)).collect()
    }

    fn normalize_one(&self, path: &Path) -> NormalizedFile {
        let ext = Utils::extension_lowercase(path);
        if ext == TARGET_EXTENSION || !CONVERTIBLE_EXTENSIONS.contains(&ext.as_str()) {
            return (path.to_path_buf(), Ok(()));
        }

        let Some(converter) = &self.converter else {
            warn!("Subtitle converter unavailable, leaving {} as is", path.display());
            return (path.to_path_buf(), Err("subtitle converter unavailable".to_string()));
        };

        let target = path.with_extension(TARGET_EXTENSION);
        let converted = converter
            .load(path)
            .and_then(|document| converter.save(&document, &target, SubtitleFormat::Srt));

        match converted {
            Ok(()) => {
                info!("Converted {} to {}", path.display(), target.display());
                if let Err(e) = std::fs::remove_file(path) {
                    warn!("Converted but could not delete {}: {}", path.display(), e);
                }
                (target, Ok(()))
            }
            Err(e) => {
                warn!("Failed to convert {}: {}", path.display(), e);
                (path.to_path_buf(), Err(format!("Conversion failed: {}", e)))
            }
        }
    }
}

impl Default for FormatNormalizer {
    fn default() -> Self {
        Self::new(Box::new(crate::subtitle_convert::NativeConverter))
    }
}
