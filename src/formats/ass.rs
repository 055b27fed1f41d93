use std::fmt::Write;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::errors::SubtitleError;
use crate::file_utils::FileManager;
use crate::subtitle_processor::TimedSegment;
use crate::text_normalizer::{flatten_ass_line_breaks, normalize, strip_override_tags};
use crate::timecode::{format_ass_time, parse_ass_time_with, TimeParseMode};

use super::normalize_line_endings;

/// Header shipped with the crate: Script Info, `Default`/`OP`/`ED` styles and the Events format line
pub const DEFAULT_STYLE_TEMPLATE: &str = include_str!("../../assets/default_style.ass");

/// Replacement for ASCII commas in dialogue text (FULLWIDTH COMMA)
pub const FULLWIDTH_COMMA: char = '\u{FF0C}';

// A Dialogue line has ten comma-separated fields; the last one is the text
const DIALOGUE_FIELDS: usize = 10;

/// Opaque header block written verbatim before the dialogue lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleTemplate {
    header: String,
}

impl StyleTemplate {
    pub fn new(header: impl Into<String>) -> Self {
        StyleTemplate {
            header: header.into(),
        }
    }

    /// Load a user template, decoding it like any subtitle file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SubtitleError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(SubtitleError::NotFound(format!("style template {:?}", path)));
        }
        Ok(Self::new(FileManager::read_subtitle_file(path)?))
    }

    pub fn as_str(&self) -> &str {
        &self.header
    }
}

impl Default for StyleTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_STYLE_TEMPLATE)
    }
}

/// Style names used for the opening, ending and everything in between
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleMap {
    #[serde(default = "default_opening_style")]
    pub opening: String,

    #[serde(default = "default_ending_style")]
    pub ending: String,

    #[serde(default = "default_dialogue_style")]
    pub default: String,
}

fn default_opening_style() -> String {
    "OP".to_string()
}

fn default_ending_style() -> String {
    "ED".to_string()
}

fn default_dialogue_style() -> String {
    "Default".to_string()
}

impl Default for StyleMap {
    fn default() -> Self {
        StyleMap {
            opening: default_opening_style(),
            ending: default_ending_style(),
            default: default_dialogue_style(),
        }
    }
}

/// Position-based style selection
#[derive(Debug, Clone, PartialEq)]
pub struct StyleRules {
    pub style_map: StyleMap,

    /// Segments starting before this many seconds use the opening style
    pub opening_threshold_secs: f64,

    /// Segments ending after this fraction of the final end time use the ending style
    pub ending_fraction: f64,
}

impl Default for StyleRules {
    fn default() -> Self {
        StyleRules {
            style_map: StyleMap::default(),
            opening_threshold_secs: 60.0,
            ending_fraction: 0.9,
        }
    }
}

impl StyleRules {
    /// Pick the style for a segment; opening wins over ending
    pub fn style_for(&self, segment: &TimedSegment, final_end: f64) -> &str {
        if segment.start < self.opening_threshold_secs {
            &self.style_map.opening
        } else if segment.end > final_end * self.ending_fraction {
            &self.style_map.ending
        } else {
            &self.style_map.default
        }
    }
}

/// Everything the ASS writer needs besides the segments
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssStyling {
    pub template: StyleTemplate,
    pub rules: StyleRules,
}

impl AssStyling {
    pub fn new(template: StyleTemplate, rules: StyleRules) -> Self {
        AssStyling { template, rules }
    }
}

/// Parse `Dialogue:` lines from ASS/SSA content
pub fn parse(content: &str, mode: TimeParseMode) -> Vec<TimedSegment> {
    let content = normalize_line_endings(content);
    let mut segments = Vec::new();

    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim_start_matches('\u{FEFF}').trim_start();
        if !line.starts_with("Dialogue:") {
            continue;
        }
        match parse_dialogue_line(line, mode) {
            Ok(Some(segment)) => segments.push(segment),
            Ok(None) => debug!("Skipping dialogue on line {}: empty text", line_no + 1),
            Err(e) => debug!("Skipping dialogue on line {}: {}", line_no + 1, e),
        }
    }
    segments
}

fn parse_dialogue_line(line: &str, mode: TimeParseMode) -> Result<Option<TimedSegment>, SubtitleError> {
    let fields: Vec<&str> = line.splitn(DIALOGUE_FIELDS, ',').collect();
    if fields.len() < DIALOGUE_FIELDS {
        return Err(SubtitleError::format(format!(
            "expected {} fields, found {}",
            DIALOGUE_FIELDS,
            fields.len()
        )));
    }

    let start = parse_ass_time_with(fields[1], mode)?;
    let end = parse_ass_time_with(fields[2], mode)?;
    let text = clean_dialogue_text(fields[DIALOGUE_FIELDS - 1]);

    if text.is_empty() {
        return Ok(None);
    }
    Ok(Some(TimedSegment::new(start, end, text)))
}

/// Turn raw ASS dialogue text into one clean line: line breaks flattened, override tags removed
pub fn clean_dialogue_text(raw: &str) -> String {
    normalize(&strip_override_tags(&flatten_ass_line_breaks(raw)))
}

/// Make text safe for the last Dialogue field
pub fn escape_dialogue_text(text: &str) -> String {
    let single_line = text.replace(['\r', '\n'], " ");
    normalize(&single_line.replace(',', &FULLWIDTH_COMMA.to_string()))
}

/// Render one Dialogue line (without the trailing newline)
pub fn dialogue_line(segment: &TimedSegment, style: &str) -> String {
    render_dialogue(segment, style, &escape_dialogue_text(&segment.text))
}

fn render_dialogue(segment: &TimedSegment, style: &str, escaped_text: &str) -> String {
    format!(
        "Dialogue: 0,{},{},{},,0,0,0,,{}",
        format_ass_time(segment.start),
        format_ass_time(segment.end),
        style,
        escaped_text
    )
}

/// Serialize segments after the template, choosing a style per segment
pub fn serialize(segments: &[TimedSegment], styling: &AssStyling) -> String {
    let header = styling.template.as_str();
    let mut out = String::with_capacity(header.len() + segments.len() * 64);
    out.push_str(header);
    if !header.ends_with('\n') {
        out.push('\n');
    }

    let final_end = segments.last().map(|segment| segment.end).unwrap_or(0.0);
    for segment in segments {
        let text = escape_dialogue_text(&segment.text);
        if text.is_empty() {
            debug!("Dropping empty dialogue at {}", format_ass_time(segment.start));
            continue;
        }
        let style = styling.rules.style_for(segment, final_end);
        // Writing into a String cannot fail
        let _ = writeln!(out, "{}", render_dialogue(segment, style, &text));
    }
    out
}
