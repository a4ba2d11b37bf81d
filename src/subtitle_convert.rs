//! Subtitle document loading and SubRip output
//!
//! Provides the [`SubtitleConverter`] seam used by the format normalizer and a
//! native implementation that reads ASS/SSA and WebVTT and writes SRT.

use std::path::Path;

use crate::helper_functions::Utils;

/// Subtitle formats the converter knows by name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtitleFormat {
    Srt,
    Ass,
    Ssa,
    Vtt,
}

impl SubtitleFormat {
    /// Guess the format from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        match Utils::extension_lowercase(path).as_str() {
            "srt" => Some(Self::Srt),
            "ass" => Some(Self::Ass),
            "ssa" => Some(Self::Ssa),
            "vtt" => Some(Self::Vtt),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Srt => "srt",
            Self::Ass => "ass",
            Self::Ssa => "ssa",
            Self::Vtt => "vtt",
        }
    }
}

/// A single timed subtitle line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cue {
    pub start_ms: u64,
    pub end_ms: u64,
    pub text: String,
}

/// Format-independent subtitle content
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubtitleDocument {
    pub cues: Vec<Cue>,
}

/// Errors raised while loading or writing subtitle documents
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("no subtitle cues found")]
    Empty,

    #[error("unsupported subtitle format: {0}")]
    Unsupported(String),
}

/// Load/save interface of a subtitle conversion backend
pub trait SubtitleConverter: Send + Sync {
    fn load(&self, path: &Path) -> Result<SubtitleDocument, ConvertError>;

    fn save(&self, document: &SubtitleDocument, new_path: &Path, format: SubtitleFormat) -> Result<(), ConvertError>;
}

/// In-process converter for ASS, SSA and WebVTT input
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeConverter;

impl SubtitleConverter for NativeConverter {
    fn load(&self, path: &Path) -> Result<SubtitleDocument, ConvertError> {
        let format = SubtitleFormat::from_path(path)
            .ok_or_else(|| ConvertError::Unsupported(Utils::extension_lowercase(path)))?;
        let bytes = std::fs::read(path)?;
        let content = String::from_utf8_lossy(&bytes);
        let content = content.trim_start_matches('\u{feff}');

        let document = match format {
            SubtitleFormat::Ass | SubtitleFormat::Ssa => parse_ass(content)?,
            SubtitleFormat::Vtt => parse_vtt(content)?,
            SubtitleFormat::Srt => return Err(ConvertError::Unsupported("srt input".to_string())),
        };
        if document.cues.is_empty() {
            return Err(ConvertError::Empty);
        }
        Ok(document)
    }

    fn save(&self, document: &SubtitleDocument, new_path: &Path, format: SubtitleFormat) -> Result<(), ConvertError> {
        if format != SubtitleFormat::Srt {
            return Err(ConvertError::Unsupported(format.extension().to_string()));
        }
        std::fs::write(new_path, render_srt(document))?;
        Ok(())
    }
}

/// Render cues as SubRip text
pub fn render_srt(document: &SubtitleDocument) -> String {
    let mut out = String::new();
    for (index, cue) in document.cues.iter().enumerate() {
        out.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            index + 1,
            format_srt_time(cue.start_ms),
            format_srt_time(cue.end_ms),
            cue.text.trim()
        ));
    }
    out
}

/// Format milliseconds as `HH:MM:SS,mmm`
fn format_srt_time(total_ms: u64) -> String {
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1_000;
    let millis = total_ms % 1_000;
    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}

const DEFAULT_ASS_FORMAT: &[&str] = &[
    "layer", "start", "end", "style", "name", "marginl", "marginr", "marginv", "effect", "text",
];

fn parse_ass(content: &str) -> Result<SubtitleDocument, ConvertError> {
    let mut in_events = false;
    let mut fields: Vec<String> = DEFAULT_ASS_FORMAT.iter().map(|s| s.to_string()).collect();
    let mut cues = Vec::new();

    for (idx, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.starts_with('[') && line.ends_with(']') {
            in_events = line.eq_ignore_ascii_case("[events]");
            continue;
        }
        if !in_events {
            continue;
        }

        if let Some(rest) = strip_prefix_ignore_case(line, "Format:") {
            fields = rest.split(',').map(|f| f.trim().to_ascii_lowercase()).collect();
            continue;
        }
        let Some(rest) = strip_prefix_ignore_case(line, "Dialogue:") else {
            continue;
        };

        // Text is the last field and may itself contain commas
        let values: Vec<&str> = rest.trim_start().splitn(fields.len(), ',').collect();
        let field = |name: &str| {
            fields
                .iter()
                .position(|f| f == name)
                .and_then(|i| values.get(i))
                .map(|v| v.trim())
        };
        let parse_err = |message: &str| ConvertError::Parse {
            line: idx + 1,
            message: message.to_string(),
        };

        let start = field("start").ok_or_else(|| parse_err("missing start time"))?;
        let end = field("end").ok_or_else(|| parse_err("missing end time"))?;
        let start_ms = parse_ass_time(start).ok_or_else(|| parse_err("bad start time"))?;
        let end_ms = parse_ass_time(end).ok_or_else(|| parse_err("bad end time"))?;
        let text = clean_ass_text(field("text").unwrap_or_default());

        if !text.is_empty() {
            cues.push(Cue { start_ms, end_ms, text });
        }
    }

    cues.sort_by_key(|c| (c.start_ms, c.end_ms));
    Ok(SubtitleDocument { cues })
}

fn strip_prefix_ignore_case<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    let head = line.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        line.get(prefix.len()..)
    } else {
        None
    }
}

/// `H:MM:SS.cc`
fn parse_ass_time(value: &str) -> Option<u64> {
    let mut parts = value.split(':');
    let hours: u64 = parts.next()?.trim().parse().ok()?;
    let minutes: u64 = parts.next()?.trim().parse().ok()?;
    let seconds = parts.next()?.trim();
    if parts.next().is_some() {
        return None;
    }
    let (secs, frac) = seconds.split_once('.').unwrap_or((seconds, "0"));
    let secs: u64 = secs.parse().ok()?;
    let frac_ms = fraction_to_ms(frac)?;
    Some(((hours * 60 + minutes) * 60 + secs) * 1000 + frac_ms)
}

/// Decimal fraction digits as milliseconds ("5" -> 500, "25" -> 250, "125" -> 125)
fn fraction_to_ms(frac: &str) -> Option<u64> {
    if frac.is_empty() || !frac.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let digits: String = frac.chars().chain(std::iter::repeat('0')).take(3).collect();
    digits.parse().ok()
}

fn clean_ass_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut depth = 0usize;
    for c in text.chars() {
        match c {
            '{' => depth += 1,
            '}' if depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out.replace("\\N", "\n")
        .replace("\\n", "\n")
        .replace("\\h", " ")
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn parse_vtt(content: &str) -> Result<SubtitleDocument, ConvertError> {
    let lines: Vec<&str> = content.lines().collect();
    let mut cues = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i].trim();
        if line.is_empty() {
            i += 1;
            continue;
        }
        if line.starts_with("WEBVTT") || line.starts_with("NOTE") || line == "STYLE" || line == "REGION" {
            while i < lines.len() && !lines[i].trim().is_empty() {
                i += 1;
            }
            continue;
        }

        // Optional cue identifier before the timing line
        let timing_idx = if line.contains("-->") {
            i
        } else if i + 1 < lines.len() && lines[i + 1].contains("-->") {
            i + 1
        } else {
            i += 1;
            continue;
        };

        let (start_ms, end_ms) = parse_vtt_timing(lines[timing_idx]).ok_or_else(|| ConvertError::Parse {
            line: timing_idx + 1,
            message: "bad cue timing".to_string(),
        })?;

        let mut text_lines = Vec::new();
        i = timing_idx + 1;
        while i < lines.len() && !lines[i].trim().is_empty() {
            let cleaned = strip_vtt_tags(lines[i].trim());
            if !cleaned.is_empty() {
                text_lines.push(cleaned);
            }
            i += 1;
        }
        if !text_lines.is_empty() {
            cues.push(Cue {
                start_ms,
                end_ms,
                text: text_lines.join("\n"),
            });
        }
    }

    Ok(SubtitleDocument { cues })
}

fn parse_vtt_timing(line: &str) -> Option<(u64, u64)> {
    let (start, rest) = line.split_once("-->")?;
    // Cue settings follow the end time
    let end = rest.split_whitespace().next()?;
    Some((parse_vtt_time(start.trim())?, parse_vtt_time(end)?))
}

/// `HH:MM:SS.mmm` or `MM:SS.mmm`
fn parse_vtt_time(value: &str) -> Option<u64> {
    let parts: Vec<&str> = value.split(':').collect();
    let (hours, minutes, seconds) = match parts.as_slice() {
        [h, m, s] => (h.parse::<u64>().ok()?, m.parse::<u64>().ok()?, *s),
        [m, s] => (0, m.parse::<u64>().ok()?, *s),
        _ => return None,
    };
    let (secs, frac) = seconds.split_once('.').unwrap_or((seconds, "0"));
    let secs: u64 = secs.parse().ok()?;
    Some(((hours * 60 + minutes) * 60 + secs) * 1000 + fraction_to_ms(frac)?)
}

fn strip_vtt_tags(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_tag = false;
    for c in text.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .trim()
        .to_string()
}
