use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::anyhow;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::errors::SubtitleError;
use crate::file_utils::FileManager;
use crate::formats::{self, AssStyling};
use crate::timecode::TimeParseMode;

// @module: Subtitle document model, format dispatch and file I/O

/// One timed subtitle entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedSegment {
    /// Start time in seconds
    pub start: f64,

    /// End time in seconds
    pub end: f64,

    /// Dialogue text as one logical line
    pub text: String,
}

impl TimedSegment {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        TimedSegment {
            start,
            end,
            text: text.into(),
        }
    }

    /// Length of the span in seconds (negative for degenerate spans)
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Whether the span ends before it starts.
    ///
    /// Such spans are kept as-is; transcription occasionally produces them.
    pub fn is_degenerate(&self) -> bool {
        self.end < self.start
    }
}

/// Supported subtitle formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtitleFormat {
    Srt,
    Ass,
    Ssa,
    Vtt,
}

impl SubtitleFormat {
    /// Every format, in the order used for file discovery
    pub const ALL: [SubtitleFormat; 4] = [Self::Srt, Self::Ass, Self::Ssa, Self::Vtt];

    /// Resolve a format from a file extension (case-insensitive, dot optional)
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.trim_start_matches('.').to_lowercase().as_str() {
            "srt" => Some(Self::Srt),
            "ass" => Some(Self::Ass),
            "ssa" => Some(Self::Ssa),
            "vtt" => Some(Self::Vtt),
            _ => None,
        }
    }

    /// Resolve a format from a path's extension
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|ext| Self::from_extension(&ext.to_string_lossy()))
    }

    /// File extension without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Srt => "srt",
            Self::Ass => "ass",
            Self::Ssa => "ssa",
            Self::Vtt => "vtt",
        }
    }

    /// ASS and SSA share the `Dialogue:` grammar
    pub fn is_ass_family(&self) -> bool {
        matches!(self, Self::Ass | Self::Ssa)
    }
}

impl fmt::Display for SubtitleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

impl FromStr for SubtitleFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        Self::from_extension(s).ok_or_else(|| anyhow!("Invalid subtitle format: {}", s))
    }
}

/// Identity of the video a document was extracted from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    /// Video file name (no directory)
    pub video_name: String,

    /// Hex SHA-256 of the video content
    pub video_hash: String,
}

impl Provenance {
    /// Hash a video file and capture its name
    pub fn for_video<P: AsRef<Path>>(video_path: P) -> Result<Self, SubtitleError> {
        let video_path = video_path.as_ref();
        if !video_path.is_file() {
            return Err(SubtitleError::NotFound(format!("video file {:?}", video_path)));
        }
        let video_name = video_path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        let video_hash = FileManager::hash_file(video_path)?;
        Ok(Provenance {
            video_name,
            video_hash,
        })
    }
}

/// Metadata carried alongside the segments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Format the segments were read from
    pub source_format: SubtitleFormat,

    /// Source video identity, used to validate cached documents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<Provenance>,
}

/// Ordered timed segments plus metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleDocument {
    pub segments: Vec<TimedSegment>,
    pub metadata: DocumentMetadata,
}

impl SubtitleDocument {
    /// Create an empty document tagged with its source format
    pub fn new(source_format: SubtitleFormat) -> Self {
        Self::with_segments(source_format, Vec::new())
    }

    pub fn with_segments(source_format: SubtitleFormat, segments: Vec<TimedSegment>) -> Self {
        SubtitleDocument {
            segments,
            metadata: DocumentMetadata {
                source_format,
                provenance: None,
            },
        }
    }

    /// Attach the identity of the source video
    pub fn with_provenance(mut self, provenance: Provenance) -> Self {
        self.metadata.provenance = Some(provenance);
        self
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// End time of the last segment in document order
    pub fn final_end(&self) -> Option<f64> {
        self.segments.last().map(|segment| segment.end)
    }

    /// Build a document with the same timing and metadata and rewritten text
    pub fn map_text<F>(&self, mut f: F) -> Self
    where
        F: FnMut(usize, &TimedSegment) -> String,
    {
        let segments = self
            .segments
            .iter()
            .enumerate()
            .map(|(i, segment)| TimedSegment::new(segment.start, segment.end, f(i, segment)))
            .collect();
        SubtitleDocument {
            segments,
            metadata: self.metadata.clone(),
        }
    }

    /// Parse subtitle text in the given format (best effort, strict ASS times)
    pub fn parse_str(content: &str, format: SubtitleFormat) -> Self {
        Self::parse_str_with(content, format, TimeParseMode::Strict)
    }

    /// Parse subtitle text with an explicit ASS time policy
    pub fn parse_str_with(content: &str, format: SubtitleFormat, mode: TimeParseMode) -> Self {
        let segments = match format {
            SubtitleFormat::Srt => formats::srt::parse(content),
            SubtitleFormat::Ass | SubtitleFormat::Ssa => formats::ass::parse(content, mode),
            SubtitleFormat::Vtt => formats::vtt::parse(content),
        };
        Self::with_segments(format, segments)
    }

    /// Read, decode and parse a subtitle file; the format comes from its extension, else its content
    pub fn parse_file<P: AsRef<Path>>(path: P, mode: TimeParseMode) -> Result<Self, SubtitleError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(SubtitleError::NotFound(format!("subtitle file {:?}", path)));
        }
        let (content, format) = FileManager::read_subtitle_with_format(path)?;
        let document = Self::parse_str_with(&content, format, mode);
        debug!(
            "Parsed {} segments from {:?} ({})",
            document.len(),
            path.file_name().unwrap_or_default(),
            format
        );
        Ok(document)
    }

    /// Serialize to SRT text
    pub fn to_srt_string(&self) -> String {
        formats::srt::serialize(&self.segments)
    }

    /// Serialize to WebVTT text
    pub fn to_vtt_string(&self) -> String {
        formats::vtt::serialize(&self.segments)
    }

    /// Serialize to styled ASS text (without the BOM)
    pub fn to_ass_string(&self, styling: &AssStyling) -> String {
        formats::ass::serialize(&self.segments, styling)
    }

    /// Serialize to any supported format; SSA output uses the ASS writer
    pub fn serialize(&self, format: SubtitleFormat, styling: &AssStyling) -> String {
        match format {
            SubtitleFormat::Srt => self.to_srt_string(),
            SubtitleFormat::Vtt => self.to_vtt_string(),
            SubtitleFormat::Ass | SubtitleFormat::Ssa => self.to_ass_string(styling),
        }
    }

    /// Write the document in the given format.
    ///
    /// ASS/SSA output is written as UTF-8 with a byte-order mark, everything else as
    /// plain UTF-8.
    pub fn write_to_file<P: AsRef<Path>>(
        &self,
        path: P,
        format: SubtitleFormat,
        styling: &AssStyling,
    ) -> Result<(), SubtitleError> {
        let path = path.as_ref();
        let content = self.serialize(format, styling);
        if format.is_ass_family() {
            FileManager::write_with_bom(path, &content)
        } else {
            FileManager::write_utf8(path, &content)
        }
    }
}

impl fmt::Display for SubtitleDocument {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Subtitle Document")?;
        writeln!(f, "Format: {}", self.metadata.source_format)?;
        if let Some(provenance) = &self.metadata.provenance {
            writeln!(f, "Video: {}", provenance.video_name)?;
        }
        writeln!(f, "Segments: {}", self.segments.len())?;
        Ok(())
    }
}
